//! Event category bitmask.
//!
//! A subscription is a set of categories. The bit values are part of the
//! public contract: `CREATE = 1`, `MODIFY = 2`, `DELETE = 4`, `RENAME = 8`,
//! `FILE_WRITE = 16`.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::WatchError;

bitflags! {
    /// Categories of filesystem change a caller can subscribe to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventFlags: u32 {
        const CREATE = 1 << 0;
        const MODIFY = 1 << 1;
        const DELETE = 1 << 2;
        const RENAME = 1 << 3;
        const FILE_WRITE = 1 << 4;

        const ALL_FLAGS = Self::CREATE.bits()
            | Self::MODIFY.bits()
            | Self::DELETE.bits()
            | Self::RENAME.bits()
            | Self::FILE_WRITE.bits();
    }
}

/// Rendering order for category names.
const DISPLAY_ORDER: [(EventFlags, &str); 5] = [
    (EventFlags::CREATE, "CREATE"),
    (EventFlags::DELETE, "DELETE"),
    (EventFlags::MODIFY, "MODIFY"),
    (EventFlags::FILE_WRITE, "FILE_WRITE"),
    (EventFlags::RENAME, "RENAME"),
];

impl EventFlags {
    /// Names of the set categories, in display order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        DISPLAY_ORDER
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }

    /// Look up a single category by name (case-insensitive).
    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "create" => Some(Self::CREATE),
            "modify" => Some(Self::MODIFY),
            "delete" => Some(Self::DELETE),
            "rename" => Some(Self::RENAME),
            "file_write" | "write" => Some(Self::FILE_WRITE),
            "all" | "all_flags" => Some(Self::ALL_FLAGS),
            "none" => Some(Self::empty()),
            _ => None,
        }
    }
}

impl fmt::Display for EventFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for name in self.names() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for EventFlags {
    type Err = WatchError;

    /// Parse `"create,modify"`, `"MODIFY|FILE_WRITE"`, `"all"` or `""`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split([',', '|'])
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .try_fold(Self::empty(), |acc, token| {
                Self::from_token(token)
                    .map(|flag| acc | flag)
                    .ok_or_else(|| WatchError::InvalidFlags {
                        token: token.to_string(),
                    })
            })
    }
}

impl Serialize for EventFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//! # Channels
//!
//! A channel names one category of cross-process message. Every bus channel
//! carries the [`CHANNEL_PREFIX`] so it can never collide with a name the
//! host runtime reserves for itself, and every channel has a sibling reply
//! channel named `<channel>-reply`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by all bus channel names.
pub const CHANNEL_PREFIX: &str = "ipc-";

/// Suffix of the sub-channel that carries deferred replies.
pub const REPLY_SUFFIX: &str = "-reply";

/// A namespaced bus channel name.
///
/// Construction is idempotent with respect to the prefix:
/// `Channel::new("circuit-client")` and `Channel::new("ipc-circuit-client")`
/// name the same channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    /// Create a channel, adding the bus prefix when it is missing.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        if name.starts_with(CHANNEL_PREFIX) {
            Self(name.to_string())
        } else {
            Self(format!("{CHANNEL_PREFIX}{name}"))
        }
    }

    /// The sibling channel replies are pushed on.
    ///
    /// Always appends [`REPLY_SUFFIX`], so every channel has its own reply
    /// channel, even one whose name already ends in `-reply`.
    #[must_use]
    pub fn reply(&self) -> Self {
        Self(format!("{}{REPLY_SUFFIX}", self.0))
    }

    /// Whether the name ends in [`REPLY_SUFFIX`].
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.0.ends_with(REPLY_SUFFIX)
    }

    /// The request channel a reply channel belongs to.
    ///
    /// Returns `self` unchanged for request channels.
    #[must_use]
    pub fn request(&self) -> Self {
        match self.0.strip_suffix(REPLY_SUFFIX) {
            Some(base) => Self(base.to_string()),
            None => self.clone(),
        }
    }

    /// Feature name without the bus prefix, e.g. `circuit-client`.
    #[must_use]
    pub fn feature(&self) -> &str {
        self.0.strip_prefix(CHANNEL_PREFIX).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for Channel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

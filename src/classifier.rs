//! UDP destination port to feed mapping

use serde::Serialize;
use std::fmt;

pub const DEFAULT_FEED_A_PORT: u16 = 14310;
pub const DEFAULT_FEED_B_PORT: u16 = 15310;

/// One of the two redundant feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Feed {
    A,
    B,
}

impl Feed {
    pub const BOTH: [Feed; 2] = [Feed::A, Feed::B];
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feed::A => f.write_str("A"),
            Feed::B => f.write_str("B"),
        }
    }
}

/// Two-entry port table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedClassifier {
    port_a: u16,
    port_b: u16,
}

impl FeedClassifier {
    pub fn new(port_a: u16, port_b: u16) -> Self {
        FeedClassifier { port_a, port_b }
    }

    /// Feed carried on `port`, or None for any other traffic
    pub fn classify(&self, port: u16) -> Option<Feed> {
        if port == self.port_a {
            Some(Feed::A)
        } else if port == self.port_b {
            Some(Feed::B)
        } else {
            None
        }
    }

    pub fn port(&self, feed: Feed) -> u16 {
        match feed {
            Feed::A => self.port_a,
            Feed::B => self.port_b,
        }
    }
}

impl Default for FeedClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_A_PORT, DEFAULT_FEED_B_PORT)
    }
}

//! Deterministic shard tags for cart events.
//!
//! Every event of a cart carries the same tag, so a consumer reading one
//! tag sees each cart's events in log order. Carts on different tags are
//! unordered relative to each other.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cart::CartId;

/// Default number of shards.
pub const DEFAULT_SHARDS: u32 = 4;
/// Default tag name prefix; the shard number is appended.
pub const DEFAULT_TAG_PREFIX: &str = "ShoppingCartEvent";

/// Name of one shard of the cart event stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaggingError {
    #[error("Shard count must be greater than zero")]
    ZeroShards,

    #[error("Tag prefix must not be empty")]
    EmptyPrefix,
}

/// Maps cart ids onto a fixed set of tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardTagger {
    prefix: String,
    shards: u32,
}

impl ShardTagger {
    pub fn new(prefix: impl Into<String>, shards: u32) -> Result<Self, TaggingError> {
        let prefix = prefix.into();
        if shards == 0 {
            return Err(TaggingError::ZeroShards);
        }
        if prefix.is_empty() {
            return Err(TaggingError::EmptyPrefix);
        }
        Ok(Self { prefix, shards })
    }

    pub fn shards(&self) -> u32 {
        self.shards
    }

    /// Shard index for `cart_id`, stable across processes and builds.
    pub fn shard_for(&self, cart_id: &CartId) -> u32 {
        let digest = Sha256::digest(cart_id.as_str().as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let shard = u64::from_be_bytes(head) % u64::from(self.shards);
        // Always below `shards`, which is a u32.
        shard as u32
    }

    pub fn tag_for(&self, cart_id: &CartId) -> Tag {
        self.tag(self.shard_for(cart_id))
    }

    pub fn tag(&self, shard: u32) -> Tag {
        Tag(format!("{}{}", self.prefix, shard))
    }

    /// Every tag, in shard order.
    pub fn all_tags(&self) -> Vec<Tag> {
        (0..self.shards).map(|shard| self.tag(shard)).collect()
    }
}

impl Default for ShardTagger {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_TAG_PREFIX.to_string(),
            shards: DEFAULT_SHARDS,
        }
    }
}

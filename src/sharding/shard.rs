//! Shard functions
//!
//! Deterministic key → directory-name mappings. A function's string form
//! is the descriptor persisted in a sharded store.

use std::fmt;
use std::str::FromStr;

use crate::error::{AtlasError, Result};
use crate::key::Key;
use crate::wrapper::KeyTransform;

use super::is_reserved;

/// Leading part of every descriptor
pub const SHARD_PREFIX: &str = "/repo/flatfs/shard/";

/// Descriptor format version
pub const SHARD_VERSION: &str = "v1";

/// Fill character for keys shorter than the shard width
const PADDING: char = '_';

/// Fan-out policy, parameterized by the shard width `n`
///
/// Every policy reads the key's flattened form (separators removed).
/// Keys too short for the policy are padded with `_` first:
///
/// | Policy | Segment of `abcdef` with n = 2 | Segment of `a` with n = 2 |
/// |--------|-------------------------------|---------------------------|
/// | `Prefix` | `ab` | `a_` |
/// | `Suffix` | `ef` | `_a` |
/// | `NextToLast` | `de` | `__` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShardFn {
    /// First `n` characters, right-padded
    Prefix(usize),

    /// Last `n` characters, left-padded
    Suffix(usize),

    /// The `n` characters before the last one, left-padded to `n + 1`
    NextToLast(usize),
}

impl ShardFn {
    /// Policy name as it appears in the descriptor
    pub fn name(&self) -> &'static str {
        match self {
            ShardFn::Prefix(_) => "prefix",
            ShardFn::Suffix(_) => "suffix",
            ShardFn::NextToLast(_) => "next-to-last",
        }
    }

    /// Shard width
    pub fn width(&self) -> usize {
        match self {
            ShardFn::Prefix(n) | ShardFn::Suffix(n) | ShardFn::NextToLast(n) => *n,
        }
    }

    /// Directory name for `key`
    ///
    /// Never empty and never `.`/`..`-like: an all-dot segment has its
    /// dots replaced by `_` so it survives key normalization.
    pub fn segment(&self, key: &Key) -> String {
        let chars: Vec<char> = key.flattened().chars().collect();

        let segment: String = match *self {
            ShardFn::Prefix(n) => {
                let mut s: String = chars.iter().take(n).collect();
                s.extend(std::iter::repeat(PADDING).take(n.saturating_sub(chars.len())));
                s
            }
            ShardFn::Suffix(n) => {
                let padded = left_pad(&chars, n);
                padded[padded.len() - n..].iter().collect()
            }
            ShardFn::NextToLast(n) => {
                let padded = left_pad(&chars, n + 1);
                let end = padded.len() - 1;
                padded[end - n..end].iter().collect()
            }
        };

        if segment.is_empty() {
            PADDING.to_string()
        } else if segment.chars().all(|c| c == '.') {
            segment.replace('.', "_")
        } else {
            segment
        }
    }
}

fn left_pad(chars: &[char], width: usize) -> Vec<char> {
    let mut padded = vec![PADDING; width.saturating_sub(chars.len())];
    padded.extend_from_slice(chars);
    padded
}

impl fmt::Display for ShardFn {
    /// `/repo/flatfs/shard/v1/next-to-last/2`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}/{}/{}",
            SHARD_PREFIX,
            SHARD_VERSION,
            self.name(),
            self.width()
        )
    }
}

impl FromStr for ShardFn {
    type Err = AtlasError;

    /// Accepts the full descriptor or the short `<name>/<n>` form;
    /// surrounding whitespace is ignored
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || AtlasError::InvalidShardDescriptor(trimmed.to_string());

        let body = match trimmed.strip_prefix(SHARD_PREFIX) {
            Some(rest) => {
                let (version, rest) = rest.split_once('/').ok_or_else(invalid)?;
                if version != SHARD_VERSION {
                    return Err(AtlasError::InvalidShardDescriptor(format!(
                        "unsupported version {} in {}",
                        version, trimmed
                    )));
                }
                rest
            }
            None => trimmed,
        };

        let (name, width) = body.split_once('/').ok_or_else(invalid)?;
        let n: usize = width.parse().map_err(|_| invalid())?;
        if n == 0 {
            return Err(invalid());
        }

        match name {
            "prefix" => Ok(ShardFn::Prefix(n)),
            "suffix" => Ok(ShardFn::Suffix(n)),
            "next-to-last" => Ok(ShardFn::NextToLast(n)),
            _ => Err(invalid()),
        }
    }
}

/// Parse a persisted descriptor
pub fn parse_shard_fn(s: &str) -> Result<ShardFn> {
    s.parse()
}

// =============================================================================
// Key Transform
// =============================================================================

/// Places each key one directory below its shard segment
///
/// `/hello` → `/ll/hello` under `NextToLast(2)`.
#[derive(Debug, Clone)]
pub struct ShardTransform {
    shard: ShardFn,
}

impl ShardTransform {
    pub fn new(shard: ShardFn) -> Self {
        Self { shard }
    }

    pub fn shard_fn(&self) -> &ShardFn {
        &self.shard
    }
}

impl KeyTransform for ShardTransform {
    fn convert(&self, key: &Key) -> Key {
        Key::new(self.shard.segment(key)).child(key)
    }

    fn invert(&self, key: &Key) -> Key {
        let list = key.list();
        if list.len() < 2 {
            return key.clone();
        }
        Key::with_namespaces(&list[1..])
    }

    /// Sharded keys are always nested; the descriptor and README are not
    fn admits(&self, raw: &Key) -> bool {
        !is_reserved(raw) && raw.list().len() >= 2
    }
}

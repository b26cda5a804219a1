//! Block selectors for state reads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The block a storage read is answered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlockTag {
    #[default]
    Latest,
    Pending,
    Earliest,
    Safe,
    Finalized,
    Number(u64),
}

impl BlockTag {
    /// The JSON-RPC parameter form: a tag name or a `0x` quantity.
    pub fn to_param(self) -> String {
        match self {
            BlockTag::Latest => "latest".into(),
            BlockTag::Pending => "pending".into(),
            BlockTag::Earliest => "earliest".into(),
            BlockTag::Safe => "safe".into(),
            BlockTag::Finalized => "finalized".into(),
            BlockTag::Number(n) => format!("{n:#x}"),
        }
    }

    pub fn is_pinned(self) -> bool {
        matches!(self, BlockTag::Number(_) | BlockTag::Earliest)
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTag::Number(n) => write!(f, "{n}"),
            other => write!(f, "{}", other.to_param()),
        }
    }
}

impl FromStr for BlockTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "latest" => return Ok(BlockTag::Latest),
            "pending" => return Ok(BlockTag::Pending),
            "earliest" => return Ok(BlockTag::Earliest),
            "safe" => return Ok(BlockTag::Safe),
            "finalized" => return Ok(BlockTag::Finalized),
            _ => {}
        }
        parse_quantity(s)
            .or_else(|| s.parse().ok())
            .map(BlockTag::Number)
            .ok_or_else(|| format!("invalid block tag '{s}'"))
    }
}

/// Parse a `0x`-prefixed JSON-RPC quantity.
pub fn parse_quantity(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x")?;
    u64::from_str_radix(digits, 16).ok()
}

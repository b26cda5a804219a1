//! Descriptor files and field specs.
//!
//! A descriptor file is YAML:
//!
//! ```yaml
//! name: locks
//! slot: 0
//! address: "0x5FbDB2315678afecb367f032d93F642f64180aa3"
//! fields:
//!   - { name: user, type: address }
//!   - { name: startTime, type: uint64 }
//!   - { name: amount, type: uint256 }
//! ```
//!
//! Fields without placement are packed the way solc packs struct members.
//! Giving every field `word` and `offset` (and optionally `bits`) pins the
//! layout instead; mixing the two styles is an error, and so is `bits` on a
//! field that is otherwise packed.

use alloy_primitives::{Address, U256};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::error::{DescriptorError, DescriptorFileError};
use crate::layout::{ArrayDescriptor, FieldLayout, SolType};

/// A slot written either as a YAML integer or a decimal / `0x` hex string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Number(u64),
    Text(String),
}

impl SlotValue {
    pub fn to_u256(&self) -> Result<U256, DescriptorFileError> {
        match self {
            SlotValue::Number(n) => Ok(U256::from(*n)),
            SlotValue::Text(s) => parse_slot(s),
        }
    }
}

/// Parse a slot number given in decimal or `0x`-prefixed hex.
pub fn parse_slot(s: &str) -> Result<U256, DescriptorFileError> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => U256::from_str_radix(digits, 16),
        None => U256::from_str_radix(s, 10),
    };
    parsed.map_err(|_| DescriptorFileError::InvalidSlot(s.to_string()))
}

/// Parse a 20-byte hex contract address.
pub fn parse_address(s: &str) -> Result<Address, DescriptorFileError> {
    Address::from_str(s.trim()).map_err(|_| DescriptorFileError::InvalidAddress(s.to_string()))
}

/// One field entry as written in a descriptor file or on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub word: Option<u32>,
    #[serde(default)]
    pub offset: Option<u16>,
    /// Overrides the type's natural width.
    #[serde(default)]
    pub bits: Option<u16>,
}

impl FieldSpec {
    /// `bits` only makes sense next to an explicit offset, so it counts too.
    fn is_placed(&self) -> bool {
        self.word.is_some() || self.offset.is_some() || self.bits.is_some()
    }
}

/// `name:type` or `name:type@word:offset`, e.g. `startTime:uint64@0:160`.
impl FromStr for FieldSpec {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || DescriptorError::UnsupportedType { ty: s.to_string() };
        let (head, placement) = match s.split_once('@') {
            Some((head, placement)) => (head, Some(placement)),
            None => (s, None),
        };
        let (name, ty) = head.split_once(':').ok_or_else(unsupported)?;
        if name.trim().is_empty() {
            return Err(unsupported());
        }

        let (word, offset) = match placement {
            Some(p) => {
                let (word, offset) = p.split_once(':').ok_or_else(unsupported)?;
                (
                    Some(word.trim().parse().map_err(|_| unsupported())?),
                    Some(offset.trim().parse().map_err(|_| unsupported())?),
                )
            }
            None => (None, None),
        };

        Ok(Self {
            name: name.trim().to_string(),
            ty: ty.trim().to_string(),
            word,
            offset,
            bits: None,
        })
    }
}

/// Build a descriptor from field specs, packing or pinning as described in
/// the module docs.
pub fn build_descriptor(
    name: impl Into<String>,
    declared_slot: U256,
    slots_per_element: Option<u32>,
    fields: &[FieldSpec],
) -> Result<ArrayDescriptor, DescriptorError> {
    let placed = fields.iter().filter(|f| f.is_placed()).count();

    if placed == 0 {
        let typed = fields
            .iter()
            .map(|f| Ok((f.name.clone(), f.ty.parse::<SolType>()?)))
            .collect::<Result<Vec<_>, DescriptorError>>()?;
        let mut descriptor = ArrayDescriptor::packed(name, declared_slot, &typed)?;
        // trailing words the members do not touch still belong to the element
        if let Some(spe) = slots_per_element {
            descriptor.slots_per_element = spe;
            descriptor.validate()?;
        }
        return Ok(descriptor);
    }

    let mut layouts = Vec::with_capacity(fields.len());
    for f in fields {
        let (Some(word), Some(offset)) = (f.word, f.offset) else {
            return Err(DescriptorError::MixedPlacement {
                field: f.name.clone(),
            });
        };
        let ty: SolType = f.ty.parse()?;
        let width = f.bits.unwrap_or_else(|| ty.bit_width());
        layouts.push(FieldLayout::new(f.name.clone(), ty.kind(), width, offset, word));
    }
    let spe = slots_per_element
        .unwrap_or_else(|| layouts.iter().map(|l| l.word_index + 1).max().unwrap_or(0));

    let descriptor = ArrayDescriptor::new(name, declared_slot, spe, layouts);
    descriptor.validate()?;
    Ok(descriptor)
}

/// The on-disk descriptor format.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptorFile {
    pub name: String,
    pub slot: SlotValue,
    #[serde(default)]
    pub slots_per_element: Option<u32>,
    pub fields: Vec<FieldSpec>,
    /// Default contract address for the CLI.
    #[serde(default)]
    pub address: Option<String>,
    /// Default RPC endpoint for the CLI.
    #[serde(default)]
    pub rpc_url: Option<String>,
}

impl DescriptorFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, DescriptorFileError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, DescriptorFileError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Resolve into a validated `ArrayDescriptor`.
    pub fn descriptor(&self) -> Result<ArrayDescriptor, DescriptorFileError> {
        let slot = self.slot.to_u256()?;
        Ok(build_descriptor(
            self.name.clone(),
            slot,
            self.slots_per_element,
            &self.fields,
        )?)
    }

    pub fn contract_address(&self) -> Result<Option<Address>, DescriptorFileError> {
        self.address.as_deref().map(parse_address).transpose()
    }
}

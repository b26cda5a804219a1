//! Array descriptors: where a dynamic array lives and how its elements pack.
//!
//! Slot numbers and packing cannot be recovered at runtime; they come from the
//! contract source or its compiler storage layout output. An
//! [`ArrayDescriptor`] carries that knowledge so the decoder itself stays
//! generic over contracts.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DescriptorError;

/// Semantic type of a decoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// 20-byte account address, rendered as `0x` + 40 hex digits.
    Address,
    /// Unsigned integer of any width up to 256 bits.
    Uint,
    /// Solidity `bool`, one byte wide when packed.
    Bool,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Address => write!(f, "address"),
            FieldKind::Uint => write!(f, "uint"),
            FieldKind::Bool => write!(f, "bool"),
        }
    }
}

/// A Solidity value type as written in a struct declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolType {
    Address,
    Bool,
    /// `uintN`, width in bits (8..=256, multiple of 8).
    Uint(u16),
}

impl SolType {
    /// Bits the type occupies in storage.
    pub fn bit_width(self) -> u16 {
        match self {
            SolType::Address => 160,
            SolType::Bool => 8,
            SolType::Uint(bits) => bits,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            SolType::Address => FieldKind::Address,
            SolType::Bool => FieldKind::Bool,
            SolType::Uint(_) => FieldKind::Uint,
        }
    }
}

impl FromStr for SolType {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || DescriptorError::UnsupportedType { ty: s.to_string() };
        match s.trim() {
            "address" | "address payable" => Ok(SolType::Address),
            "bool" => Ok(SolType::Bool),
            "uint" => Ok(SolType::Uint(256)),
            other => {
                let bits: u16 = other
                    .strip_prefix("uint")
                    .ok_or_else(unsupported)?
                    .parse()
                    .map_err(|_| unsupported())?;
                if bits == 0 || bits > 256 || bits % 8 != 0 {
                    return Err(unsupported());
                }
                Ok(SolType::Uint(bits))
            }
        }
    }
}

impl fmt::Display for SolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolType::Address => write!(f, "address"),
            SolType::Bool => write!(f, "bool"),
            SolType::Uint(bits) => write!(f, "uint{bits}"),
        }
    }
}

/// Placement of one struct field inside an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub name: String,
    pub kind: FieldKind,
    pub bit_width: u16,
    /// Bit offset from the least significant end of the word.
    pub bit_offset: u16,
    /// Which of the element's words holds the field.
    pub word_index: u32,
}

impl FieldLayout {
    pub fn new(
        name: impl Into<String>,
        kind: FieldKind,
        bit_width: u16,
        bit_offset: u16,
        word_index: u32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            bit_width,
            bit_offset,
            word_index,
        }
    }

    pub fn address(name: impl Into<String>, bit_offset: u16, word_index: u32) -> Self {
        Self::new(name, FieldKind::Address, 160, bit_offset, word_index)
    }

    pub fn uint(name: impl Into<String>, bit_width: u16, bit_offset: u16, word_index: u32) -> Self {
        Self::new(name, FieldKind::Uint, bit_width, bit_offset, word_index)
    }

    pub fn boolean(name: impl Into<String>, bit_offset: u16, word_index: u32) -> Self {
        Self::new(name, FieldKind::Bool, 8, bit_offset, word_index)
    }

    fn end_bit(&self) -> u32 {
        u32::from(self.bit_offset) + u32::from(self.bit_width)
    }
}

/// The shape of a dynamic array of packed structs in contract storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayDescriptor {
    /// Label used when printing records, e.g. `locks`.
    pub name: String,
    /// Slot the compiler assigned to the array variable (holds the length).
    pub declared_slot: U256,
    pub slots_per_element: u32,
    pub fields: Vec<FieldLayout>,
}

impl ArrayDescriptor {
    pub fn new(
        name: impl Into<String>,
        declared_slot: U256,
        slots_per_element: u32,
        fields: Vec<FieldLayout>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_slot,
            slots_per_element,
            fields,
        }
    }

    /// Lay out `fields` the way solc packs struct members.
    ///
    /// Members go low-order first into the current word; a member that does
    /// not fit in what is left starts the next word.
    pub fn packed<S: AsRef<str>>(
        name: impl Into<String>,
        declared_slot: U256,
        fields: &[(S, SolType)],
    ) -> Result<Self, DescriptorError> {
        let mut layouts = Vec::with_capacity(fields.len());
        let mut word = 0u32;
        let mut used = 0u16;

        for (field_name, ty) in fields {
            let width = ty.bit_width();
            if used > 0 && u32::from(used) + u32::from(width) > 256 {
                word += 1;
                used = 0;
            }
            layouts.push(FieldLayout::new(field_name.as_ref(), ty.kind(), width, used, word));
            used = used.saturating_add(width);
        }

        let descriptor = Self::new(name, declared_slot, word + 1, layouts);
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check the descriptor for internal consistency. Performs no I/O.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.slots_per_element == 0 {
            return Err(DescriptorError::ZeroSlotsPerElement);
        }
        if self.fields.is_empty() {
            return Err(DescriptorError::NoFields);
        }

        for (i, field) in self.fields.iter().enumerate() {
            if field.bit_width == 0 {
                return Err(DescriptorError::ZeroWidth {
                    field: field.name.clone(),
                });
            }
            if field.end_bit() > 256 {
                return Err(DescriptorError::OutOfRange {
                    field: field.name.clone(),
                    offset: field.bit_offset,
                    end: field.end_bit(),
                });
            }
            if field.word_index >= self.slots_per_element {
                return Err(DescriptorError::WordOutOfRange {
                    field: field.name.clone(),
                    word: field.word_index,
                    slots_per_element: self.slots_per_element,
                });
            }
            let width_ok = match field.kind {
                FieldKind::Address => field.bit_width == 160,
                FieldKind::Bool => field.bit_width <= 8,
                FieldKind::Uint => true,
            };
            if !width_ok {
                return Err(DescriptorError::BadWidthForKind {
                    field: field.name.clone(),
                    kind: field.kind.to_string(),
                    width: field.bit_width,
                });
            }

            for other in &self.fields[..i] {
                if other.name == field.name {
                    return Err(DescriptorError::DuplicateField {
                        field: field.name.clone(),
                    });
                }
                let disjoint = field.end_bit() <= u32::from(other.bit_offset)
                    || other.end_bit() <= u32::from(field.bit_offset);
                if other.word_index == field.word_index && !disjoint {
                    return Err(DescriptorError::Overlap {
                        first: other.name.clone(),
                        second: field.name.clone(),
                        word: field.word_index,
                    });
                }
            }
        }
        Ok(())
    }

    /// Fields stored in word `word` of an element, in declaration order.
    pub fn fields_in_word(&self, word: u32) -> impl Iterator<Item = &FieldLayout> {
        self.fields.iter().filter(move |f| f.word_index == word)
    }
}

//! Decoded array elements.

use alloy_primitives::{Address, U256};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::layout::FieldKind;
use crate::word::StorageWord;

/// A single decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
}

impl FieldValue {
    /// Interpret the already shifted and masked bits of a field.
    pub fn from_bits(kind: FieldKind, bits: U256) -> Self {
        match kind {
            FieldKind::Address => {
                let bytes = bits.to_be_bytes::<32>();
                FieldValue::Address(Address::from_slice(&bytes[12..]))
            }
            FieldKind::Uint => FieldValue::Uint(bits),
            FieldKind::Bool => FieldValue::Bool(!bits.is_zero()),
        }
    }

    /// Extract a field of `kind` from `word`.
    pub fn extract(word: StorageWord, kind: FieldKind, offset: u16, width: u16) -> Self {
        Self::from_bits(kind, word.extract(offset, width))
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            FieldValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            FieldValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // always 40 lowercase digits, never checksummed or trimmed
            FieldValue::Address(a) => write!(f, "0x{}", hex::encode(a.as_slice())),
            FieldValue::Uint(v) => write!(f, "{v}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            // addresses as hex, integers as decimal strings so u256 survives JSON
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

/// One element of the decoded array, fields in descriptor order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub index: u64,
    pub fields: Vec<(String, FieldValue)>,
}

impl DecodedRecord {
    pub fn new(index: u64) -> Self {
        Self {
            index,
            fields: Vec::new(),
        }
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Render as `locks[0]: user:0x… ,startTime:42,amount:1000`.
    ///
    /// The first separator is ` ,` and every later one a bare `,`.
    pub fn render_line(&self, array_name: &str) -> String {
        let mut line = format!("{array_name}[{}]: ", self.index);
        for (i, (name, value)) in self.fields.iter().enumerate() {
            match i {
                0 => {}
                1 => line.push_str(" ,"),
                _ => line.push(','),
            }
            line.push_str(&format!("{name}:{value}"));
        }
        line
    }
}

struct FieldMap<'a>(&'a [(String, FieldValue)]);

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for DecodedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("DecodedRecord", 2)?;
        record.serialize_field("index", &self.index)?;
        record.serialize_field("fields", &FieldMap(&self.fields))?;
        record.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DecodedRecord {
        DecodedRecord {
            index: 0,
            fields: vec![
                ("user".into(), FieldValue::Address(Address::repeat_byte(0xaa))),
                ("startTime".into(), FieldValue::Uint(U256::from(42u8))),
                (
                    "amount".into(),
                    FieldValue::Uint(U256::from(1_000_000_000_000_000_000u64)),
                ),
            ],
        }
    }

    #[test]
    fn address_is_zero_padded() {
        let v = FieldValue::from_bits(FieldKind::Address, U256::from(1u8));
        assert_eq!(v.to_string(), format!("0x{}1", "0".repeat(39)));
    }

    #[test]
    fn address_ignores_high_bits_of_input() {
        let v = FieldValue::from_bits(FieldKind::Address, U256::from(0xabu8));
        assert_eq!(v.as_address().unwrap()[19], 0xab);
    }

    #[test]
    fn bool_from_bits() {
        assert_eq!(FieldValue::from_bits(FieldKind::Bool, U256::ZERO), FieldValue::Bool(false));
        assert_eq!(FieldValue::from_bits(FieldKind::Bool, U256::from(1u8)), FieldValue::Bool(true));
    }

    #[test]
    fn line_format() {
        let line = sample().render_line("locks");
        assert_eq!(
            line,
            format!(
                "locks[0]: user:0x{} ,startTime:42,amount:1000000000000000000",
                "aa".repeat(20)
            )
        );
    }

    #[test]
    fn lookup_by_name() {
        let r = sample();
        assert_eq!(r.get("startTime").and_then(FieldValue::as_uint), Some(U256::from(42u8)));
        assert!(r.get("missing").is_none());
    }

    #[test]
    fn json_keeps_big_integers_exact() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["index"], 0);
        assert_eq!(json["fields"]["amount"], "1000000000000000000");
        assert_eq!(json["fields"]["user"], format!("0x{}", "aa".repeat(20)));
    }
}

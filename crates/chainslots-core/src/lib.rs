//! # chainslots-core
//!
//! Decode Solidity dynamic arrays of packed structs straight from raw EVM
//! storage, without ABI getters.
//!
//! - [`ArrayDescriptor`]: declared slot and per-field bit packing
//! - [`StorageReader`]: the `eth_getStorageAt` capability the decoder consumes
//! - [`StorageArrayDecoder`]: length read, keccak base slot, per-element word reads
//! - [`DecodedRecord`]: one element, fields in declaration order
//! - [`config`]: YAML descriptor files and `name:type` field specs

pub mod config;
pub mod decoder;
pub mod error;
pub mod layout;
pub mod reader;
pub mod record;
pub mod slot;
pub mod word;

pub use config::{DescriptorFile, FieldSpec};
pub use decoder::{decode_array, DecoderOptions, StorageArrayDecoder};
pub use error::{DecodeError, DescriptorError, DescriptorFileError, StorageReadError};
pub use layout::{ArrayDescriptor, FieldKind, FieldLayout, SolType};
pub use reader::{MemoryStorage, StorageReader};
pub use record::{DecodedRecord, FieldValue};
pub use slot::dynamic_array_base_slot;
pub use word::StorageWord;

pub use alloy_primitives::{Address, U256};

//! `StorageArrayDecoder`: rebuild a dynamic array of packed structs from raw
//! storage reads.
//!
//! # Algorithm
//! 1. validate the descriptor (no I/O on failure)
//! 2. read the length from the declared slot; stop after that one read if zero
//! 3. `base = keccak256(declared_slot)`
//! 4. for each element, read its `slots_per_element` words from
//!    `base + i * slots_per_element` and slice every field out of its word
//!
//! The first failed read aborts the whole pass; no partial result is returned
//! and nothing is retried. Each read sees whatever state the reader serves, so
//! unless the reader is pinned to one block the length and the elements may
//! come from different blocks.

use alloy_primitives::{Address, U256};
use futures::future;

use crate::error::{DecodeError, StorageReadError};
use crate::layout::ArrayDescriptor;
use crate::reader::StorageReader;
use crate::record::{DecodedRecord, FieldValue};
use crate::slot::{dynamic_array_base_slot, element_word_slot};
use crate::word::StorageWord;

/// Tuning knobs for a decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Issue the reads for one element's words concurrently.
    pub concurrent_words: bool,
    /// Reject arrays whose stored length exceeds this many elements.
    pub max_length: u64,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            concurrent_words: false,
            max_length: u64::MAX,
        }
    }
}

/// Stateless decoder; one instance can serve any number of calls.
#[derive(Debug, Clone, Default)]
pub struct StorageArrayDecoder {
    options: DecoderOptions,
}

impl StorageArrayDecoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> DecoderOptions {
        self.options
    }

    /// Decode the array `descriptor` describes from `address`'s storage.
    pub async fn decode_array<R>(
        &self,
        address: Address,
        descriptor: &ArrayDescriptor,
        reader: &R,
    ) -> Result<Vec<DecodedRecord>, DecodeError>
    where
        R: StorageReader + ?Sized,
    {
        descriptor.validate()?;

        let length_word = reader.read(address, descriptor.declared_slot).await?;
        let raw_length = length_word.to_u256();
        tracing::debug!(
            array = %descriptor.name,
            contract = %address,
            slot = %descriptor.declared_slot,
            length = %raw_length,
            "read array length"
        );
        if raw_length.is_zero() {
            return Ok(Vec::new());
        }

        let length = u64::try_from(raw_length)
            .ok()
            .filter(|len| *len <= self.options.max_length)
            .ok_or(DecodeError::LengthTooLarge {
                length: raw_length,
                limit: self.options.max_length,
            })?;

        let base = dynamic_array_base_slot(descriptor.declared_slot);
        tracing::debug!(base = %format!("0x{base:x}"), "computed array data base slot");

        let mut records = Vec::with_capacity(usize::try_from(length).unwrap_or(0).min(1024));
        for index in 0..length {
            let words = self.read_element(address, descriptor, base, index, reader).await?;
            records.push(decode_element(descriptor, index, &words));
        }

        tracing::debug!(array = %descriptor.name, records = records.len(), "decode complete");
        Ok(records)
    }

    async fn read_element<R>(
        &self,
        address: Address,
        descriptor: &ArrayDescriptor,
        base: U256,
        index: u64,
        reader: &R,
    ) -> Result<Vec<StorageWord>, StorageReadError>
    where
        R: StorageReader + ?Sized,
    {
        let slots: Vec<U256> = (0..descriptor.slots_per_element)
            .map(|w| element_word_slot(base, index, descriptor.slots_per_element, w))
            .collect();

        if self.options.concurrent_words {
            return future::try_join_all(slots.iter().map(|slot| reader.read(address, *slot))).await;
        }

        let mut words = Vec::with_capacity(slots.len());
        for slot in slots {
            tracing::trace!(index, slot = %format!("0x{slot:x}"), "reading element word");
            words.push(reader.read(address, slot).await?);
        }
        Ok(words)
    }
}

/// Slice every field of element `index` out of its words.
///
/// `words[w]` must hold word `w` of the element; the descriptor must already
/// be validated.
pub fn decode_element(descriptor: &ArrayDescriptor, index: u64, words: &[StorageWord]) -> DecodedRecord {
    let mut record = DecodedRecord::new(index);
    for field in &descriptor.fields {
        let word = words
            .get(field.word_index as usize)
            .copied()
            .unwrap_or_default();
        let value = FieldValue::extract(word, field.kind, field.bit_offset, field.bit_width);
        record.fields.push((field.name.clone(), value));
    }
    record
}

/// Decode with default options.
pub async fn decode_array<R>(
    address: Address,
    descriptor: &ArrayDescriptor,
    reader: &R,
) -> Result<Vec<DecodedRecord>, DecodeError>
where
    R: StorageReader + ?Sized,
{
    StorageArrayDecoder::default()
        .decode_array(address, descriptor, reader)
        .await
}

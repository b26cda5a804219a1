//! The storage-read capability the decoder consumes, plus an in-memory
//! implementation for tests and offline use.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::StorageReadError;
use crate::layout::ArrayDescriptor;
use crate::record::FieldValue;
use crate::slot::{dynamic_array_base_slot, element_word_slot};
use crate::word::{insert_bits, StorageWord};

/// Reads one raw storage word of a contract.
///
/// Mirrors `eth_getStorageAt`. Implementations must be `Send + Sync` so a
/// decoder can issue reads from several tasks; the trait is object-safe.
#[async_trait]
pub trait StorageReader: Send + Sync {
    async fn read(&self, address: Address, slot: U256) -> Result<StorageWord, StorageReadError>;
}

#[async_trait]
impl<R: StorageReader + ?Sized> StorageReader for Arc<R> {
    async fn read(&self, address: Address, slot: U256) -> Result<StorageWord, StorageReadError> {
        (**self).read(address, slot).await
    }
}

/// In-memory contract storage. Unset slots read as zero, like the EVM.
///
/// Thread-safe via `Arc<RwLock<_>>`; clones share the same storage.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<RwLock<HashMap<(Address, U256), StorageWord>>>,
    reads: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, address: Address, slot: U256, word: impl Into<StorageWord>) {
        if let Ok(mut slots) = self.slots.write() {
            slots.insert((address, slot), word.into());
        }
    }

    /// Number of `read` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Lay out `records` as the array described by `descriptor`: the length at
    /// the declared slot and each element packed from its base slot.
    ///
    /// Each record lists its values in the descriptor's field order.
    pub fn set_array(&self, address: Address, descriptor: &ArrayDescriptor, records: &[Vec<FieldValue>]) {
        self.set(address, descriptor.declared_slot, U256::from(records.len()));
        let base = dynamic_array_base_slot(descriptor.declared_slot);

        for (index, values) in records.iter().enumerate() {
            let mut words = vec![U256::ZERO; descriptor.slots_per_element as usize];
            for (field, value) in descriptor.fields.iter().zip(values) {
                let bits = match value {
                    FieldValue::Address(a) => U256::from_be_slice(a.as_slice()),
                    FieldValue::Uint(v) => *v,
                    FieldValue::Bool(b) => U256::from(u8::from(*b)),
                };
                if let Some(word) = words.get_mut(field.word_index as usize) {
                    *word = insert_bits(*word, bits, field.bit_offset, field.bit_width);
                }
            }
            for (w, word) in words.into_iter().enumerate() {
                let slot = element_word_slot(
                    base,
                    index as u64,
                    descriptor.slots_per_element,
                    w as u32,
                );
                self.set(address, slot, word);
            }
        }
    }
}

#[async_trait]
impl StorageReader for MemoryStorage {
    async fn read(&self, address: Address, slot: U256) -> Result<StorageWord, StorageReadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let slots = self
            .slots
            .read()
            .map_err(|_| StorageReadError::new(slot, "storage lock poisoned"))?;
        Ok(slots.get(&(address, slot)).copied().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_slots_read_zero() {
        let storage = MemoryStorage::new();
        let word = storage.read(Address::ZERO, U256::from(5u8)).await.unwrap();
        assert!(word.is_zero());
        assert_eq!(storage.read_count(), 1);
    }

    #[tokio::test]
    async fn set_then_read() {
        let storage = MemoryStorage::new();
        let addr = Address::repeat_byte(0x11);
        storage.set(addr, U256::from(3u8), U256::from(99u8));
        let word = storage.read(addr, U256::from(3u8)).await.unwrap();
        assert_eq!(word.to_u256(), U256::from(99u8));
        // other contracts do not see it
        let other = storage.read(Address::ZERO, U256::from(3u8)).await.unwrap();
        assert!(other.is_zero());
    }

    #[tokio::test]
    async fn reads_through_arc_dyn() {
        let storage = MemoryStorage::new();
        storage.set(Address::ZERO, U256::ZERO, U256::from(1u8));
        let reader: Arc<dyn StorageReader> = Arc::new(storage.clone());
        let word = reader.read(Address::ZERO, U256::ZERO).await.unwrap();
        assert_eq!(word.to_u256(), U256::from(1u8));
        assert_eq!(storage.read_count(), 1);
    }
}

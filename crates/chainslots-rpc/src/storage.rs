//! `eth_getStorageAt`-backed `StorageReader`.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use chainslots_core::{Address, StorageReadError, StorageReader, StorageWord, U256};

use crate::block::{parse_quantity, BlockTag};
use crate::error::TransportError;
use crate::transport::{call, RpcTransport};

/// Reads contract storage over JSON-RPC at a fixed block.
///
/// The block tag is set once and used for every read, so pinning it to a
/// number makes a whole decode pass see one consistent state. With the
/// default `latest`, each read is answered against whatever block is current.
pub struct RpcStorageReader<T> {
    transport: T,
    block: BlockTag,
    next_id: AtomicU64,
}

impl<T: RpcTransport> RpcStorageReader<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            block: BlockTag::Latest,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_block(mut self, block: BlockTag) -> Self {
        self.block = block;
        self
    }

    pub fn block(&self) -> BlockTag {
        self.block
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Current head block number (`eth_blockNumber`).
    pub async fn block_number(&self) -> Result<u64, TransportError> {
        let raw: String = call(&self.transport, self.next_id(), "eth_blockNumber", vec![]).await?;
        parse_quantity(&raw).ok_or_else(|| TransportError::InvalidResponse {
            method: "eth_blockNumber".into(),
            reason: format!("not a quantity: {raw}"),
        })
    }

    /// Resolve the current head once and read every later slot at it.
    pub async fn pin_latest(&mut self) -> Result<u64, TransportError> {
        let number = self.block_number().await?;
        tracing::debug!(block = number, url = %self.transport.url(), "pinned storage reads");
        self.block = BlockTag::Number(number);
        Ok(number)
    }

    /// Raw `eth_getStorageAt(address, slot, block)`.
    pub async fn get_storage_at(&self, address: Address, slot: U256) -> Result<StorageWord, TransportError> {
        let params = vec![
            Value::String(format!("0x{}", hex::encode(address.as_slice()))),
            Value::String(format!("0x{slot:x}")),
            Value::String(self.block.to_param()),
        ];
        let raw: String = call(&self.transport, self.next_id(), "eth_getStorageAt", params).await?;
        StorageWord::from_hex(&raw).ok_or_else(|| TransportError::InvalidResponse {
            method: "eth_getStorageAt".into(),
            reason: format!("not a 32-byte word: {raw}"),
        })
    }
}

#[async_trait]
impl<T: RpcTransport> StorageReader for RpcStorageReader<T> {
    async fn read(&self, address: Address, slot: U256) -> Result<StorageWord, StorageReadError> {
        tracing::trace!(contract = %address, slot = %format!("0x{slot:x}"), block = %self.block, "eth_getStorageAt");
        self.get_storage_at(address, slot)
            .await
            .map_err(|e| {
                let transient = e.is_retryable();
                tracing::debug!(slot = %format!("0x{slot:x}"), transient, error = %e, "storage read failed");
                StorageReadError::with_source(slot, format!("eth_getStorageAt at {}", self.block), e, transient)
            })
    }
}

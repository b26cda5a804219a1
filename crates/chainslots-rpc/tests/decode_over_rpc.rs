//! Decode through `RpcStorageReader` against a mock JSON-RPC node.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chainslots_core::{
    config::parse_slot, decode_array, Address, ArrayDescriptor, DecodeError, FieldValue,
    MemoryStorage, SolType, StorageReader, StorageWord, U256,
};
use chainslots_rpc::{
    BlockTag, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcStorageReader, RpcTransport,
    TransportError,
};
use serde_json::Value;

// ─── Mock node ────────────────────────────────────────────────────────────────

/// Serves `eth_getStorageAt` from a slot map and `eth_blockNumber` from a
/// fixed head. Slots listed in `broken` answer with a node error.
struct MockNode {
    slots: HashMap<U256, StorageWord>,
    head: u64,
    broken: Vec<U256>,
    blocks_seen: Mutex<Vec<String>>,
}

impl MockNode {
    async fn from_memory(storage: &MemoryStorage, address: Address, slots: &[U256]) -> Self {
        let mut map = HashMap::new();
        for slot in slots {
            map.insert(*slot, storage.read(address, *slot).await.unwrap());
        }
        Self {
            slots: map,
            head: 0x1234,
            broken: Vec::new(),
            blocks_seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RpcTransport for MockNode {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let result = match req.method.as_str() {
            "eth_blockNumber" => Value::String(format!("{:#x}", self.head)),
            "eth_getStorageAt" => {
                let slot = parse_slot(req.params[1].as_str().unwrap()).unwrap();
                self.blocks_seen
                    .lock()
                    .unwrap()
                    .push(req.params[2].as_str().unwrap().to_string());
                if self.broken.contains(&slot) {
                    return Ok(JsonRpcResponse {
                        jsonrpc: "2.0".into(),
                        id: req.id,
                        result: None,
                        error: Some(JsonRpcError {
                            code: -32000,
                            message: "missing trie node".into(),
                            data: None,
                        }),
                    });
                }
                let word = self.slots.get(&slot).copied().unwrap_or_default();
                Value::String(word.to_string())
            }
            other => panic!("unexpected method {other}"),
        };
        Ok(JsonRpcResponse::success(req.id, result))
    }

    fn url(&self) -> &str {
        "mock://node"
    }
}

fn locks() -> ArrayDescriptor {
    ArrayDescriptor::packed(
        "locks",
        U256::ZERO,
        &[
            ("user", SolType::Address),
            ("startTime", SolType::Uint(64)),
            ("amount", SolType::Uint(256)),
        ],
    )
    .unwrap()
}

fn contract() -> Address {
    Address::repeat_byte(0x5f)
}

/// Two locks laid out in memory, plus the slots a node must serve for them.
async fn two_locks_node() -> MockNode {
    let storage = MemoryStorage::new();
    let rows = vec![
        vec![
            FieldValue::Address(Address::repeat_byte(0xaa)),
            FieldValue::Uint(U256::from(42u8)),
            FieldValue::Uint(U256::from(1_000_000_000_000_000_000u64)),
        ],
        vec![
            FieldValue::Address(Address::with_last_byte(1)),
            FieldValue::Uint(U256::from(u64::MAX)),
            FieldValue::Uint(U256::from(7u8)),
        ],
    ];
    storage.set_array(contract(), &locks(), &rows);

    let base = chainslots_core::dynamic_array_base_slot(U256::ZERO);
    let slots: Vec<U256> = std::iter::once(U256::ZERO)
        .chain((0..4u8).map(|i| base + U256::from(i)))
        .collect();
    MockNode::from_memory(&storage, contract(), &slots).await
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn decodes_two_locks() {
    let reader = RpcStorageReader::new(two_locks_node().await);
    let records = decode_array(contract(), &locks(), &reader).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].render_line("locks"),
        format!(
            "locks[0]: user:0x{} ,startTime:42,amount:1000000000000000000",
            "aa".repeat(20)
        )
    );
    assert_eq!(
        records[1].render_line("locks"),
        format!(
            "locks[1]: user:0x{}01 ,startTime:18446744073709551615,amount:7",
            "00".repeat(19)
        )
    );
}

#[tokio::test]
async fn pinned_reader_uses_one_block_for_every_read() {
    let mut reader = RpcStorageReader::new(two_locks_node().await);
    reader.pin_latest().await.unwrap();
    assert_eq!(reader.block(), BlockTag::Number(0x1234));

    decode_array(contract(), &locks(), &reader).await.unwrap();
    let seen = reader.transport().blocks_seen.lock().unwrap();
    assert_eq!(seen.len(), 5);
    assert!(seen.iter().all(|b| b == "0x1234"));
}

#[tokio::test]
async fn node_error_aborts_the_pass() {
    let mut node = two_locks_node().await;
    let base = chainslots_core::dynamic_array_base_slot(U256::ZERO);
    node.broken.push(base + U256::from(2u8));

    let reader = RpcStorageReader::new(node);
    let err = decode_array(contract(), &locks(), &reader).await.unwrap_err();
    match err {
        DecodeError::StorageRead(e) => {
            assert_eq!(e.slot, base + U256::from(2u8));
            assert!(!e.is_transient());
            let source = std::error::Error::source(&e).map(|s| s.to_string()).unwrap_or_default();
            assert!(source.contains("missing trie node"), "source: {source}");
        }
        other => panic!("expected a storage read error, got {other:?}"),
    }
}

//! End-to-end decode tests against in-memory storage.
//!
//! Each test lays out a `LockInfo[]` array the way solc would store it and
//! checks what the decoder reads back.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chainslots_core::{
    decode_array, dynamic_array_base_slot, word::insert_bits, Address, ArrayDescriptor,
    DecodeError, DescriptorFile, FieldLayout, FieldValue, MemoryStorage, StorageReadError,
    StorageReader, StorageWord, U256,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn contract() -> Address {
    "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap()
}

fn locks() -> ArrayDescriptor {
    ArrayDescriptor::new(
        "locks",
        U256::ZERO,
        2,
        vec![
            FieldLayout::address("user", 0, 0),
            FieldLayout::uint("startTime", 64, 160, 0),
            FieldLayout::uint("amount", 256, 0, 1),
        ],
    )
}

fn fixture_path(name: &str) -> std::path::PathBuf {
    let mut p = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("../../fixtures/descriptors");
    p.push(name);
    p
}

/// Serves `inner` but fails the `fail_at`-th read (0-based).
struct FailingReader {
    inner: MemoryStorage,
    fail_at: usize,
    reads: AtomicUsize,
}

#[async_trait]
impl StorageReader for FailingReader {
    async fn read(&self, address: Address, slot: U256) -> Result<StorageWord, StorageReadError> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if n == self.fail_at {
            return Err(StorageReadError::new(slot, "connection refused"));
        }
        self.inner.read(address, slot).await
    }
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_lock_scenario() {
    let storage = MemoryStorage::new();
    let base = dynamic_array_base_slot(U256::ZERO);
    let user = U256::from_be_slice(&[0xaa; 20]);
    let packed = insert_bits(user, U256::from(42u8), 160, 64);

    storage.set(contract(), U256::ZERO, U256::from(1u8));
    storage.set(contract(), base, packed);
    storage.set(
        contract(),
        base + U256::from(1u8),
        U256::from(1_000_000_000_000_000_000u64),
    );

    let records = decode_array(contract(), &locks(), &storage).await.unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.get("user").unwrap().to_string(), format!("0x{}", "aa".repeat(20)));
    assert_eq!(r.get("startTime"), Some(&FieldValue::Uint(U256::from(42u8))));
    assert_eq!(
        r.get("amount"),
        Some(&FieldValue::Uint(U256::from(1_000_000_000_000_000_000u64)))
    );
    assert_eq!(
        r.render_line("locks"),
        format!(
            "locks[0]: user:0x{} ,startTime:42,amount:1000000000000000000",
            "aa".repeat(20)
        )
    );
    // length + two words
    assert_eq!(storage.read_count(), 3);
}

#[tokio::test]
async fn empty_array_performs_one_read() {
    let storage = MemoryStorage::new();
    storage.set(contract(), U256::ZERO, U256::ZERO);
    let records = decode_array(contract(), &locks(), &storage).await.unwrap();
    assert!(records.is_empty());
    assert_eq!(storage.read_count(), 1);
}

#[tokio::test]
async fn stored_values_come_back_unchanged() {
    let storage = MemoryStorage::new();
    let d = locks();
    let rows: Vec<Vec<FieldValue>> = (0..5u64)
        .map(|i| {
            vec![
                FieldValue::Address(Address::with_last_byte(i as u8 + 1)),
                FieldValue::Uint(U256::from(1_700_000_000u64 + i)),
                FieldValue::Uint(U256::MAX - U256::from(i)),
            ]
        })
        .collect();
    storage.set_array(contract(), &d, &rows);

    let records = decode_array(contract(), &d, &storage).await.unwrap();
    assert_eq!(records.len(), rows.len());
    for (i, (record, row)) in records.iter().zip(&rows).enumerate() {
        assert_eq!(record.index, i as u64);
        let values: Vec<FieldValue> = record.fields.iter().map(|(_, v)| *v).collect();
        assert_eq!(&values, row);
    }
    assert_eq!(storage.read_count(), 1 + 5 * 2);
}

#[tokio::test]
async fn packed_field_ignores_noisy_neighbours() {
    let storage = MemoryStorage::new();
    let base = dynamic_array_base_slot(U256::ZERO);
    // every bit set, then startTime = 42 written into bits 160..224
    let noisy = insert_bits(U256::MAX, U256::from(42u8), 160, 64);
    storage.set(contract(), U256::ZERO, U256::from(1u8));
    storage.set(contract(), base, noisy);

    let records = decode_array(contract(), &locks(), &storage).await.unwrap();
    let r = &records[0];
    assert_eq!(r.get("startTime"), Some(&FieldValue::Uint(U256::from(42u8))));
    assert_eq!(r.get("user").unwrap().to_string(), format!("0x{}", "ff".repeat(20)));
}

#[tokio::test]
async fn address_with_leading_zeros_is_padded() {
    let storage = MemoryStorage::new();
    let base = dynamic_array_base_slot(U256::ZERO);
    storage.set(contract(), U256::ZERO, U256::from(1u8));
    storage.set(contract(), base, U256::from(1u8));

    let records = decode_array(contract(), &locks(), &storage).await.unwrap();
    let user = records[0].get("user").unwrap().to_string();
    assert_eq!(user.len(), 42);
    assert_eq!(user, format!("0x{}1", "0".repeat(39)));
}

#[tokio::test]
async fn address_at_nonzero_offset_is_honoured() {
    let d = ArrayDescriptor::new(
        "flags",
        U256::from(3u8),
        1,
        vec![
            FieldLayout::boolean("active", 0, 0),
            FieldLayout::address("owner", 8, 0),
        ],
    );
    let storage = MemoryStorage::new();
    let owner = Address::repeat_byte(0x42);
    storage.set_array(
        contract(),
        &d,
        &[vec![FieldValue::Bool(true), FieldValue::Address(owner)]],
    );

    let records = decode_array(contract(), &d, &storage).await.unwrap();
    assert_eq!(records[0].get("active"), Some(&FieldValue::Bool(true)));
    assert_eq!(records[0].get("owner"), Some(&FieldValue::Address(owner)));
}

// ─── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn length_read_failure_propagates() {
    let reader = FailingReader {
        inner: MemoryStorage::new(),
        fail_at: 0,
        reads: AtomicUsize::new(0),
    };
    let err = decode_array(contract(), &locks(), &reader).await.unwrap_err();
    assert!(matches!(err, DecodeError::StorageRead(ref e) if e.slot == U256::ZERO));
}

#[tokio::test]
async fn element_read_failure_returns_no_records() {
    let inner = MemoryStorage::new();
    let rows = vec![
        vec![
            FieldValue::Address(Address::repeat_byte(1)),
            FieldValue::Uint(U256::from(1u8)),
            FieldValue::Uint(U256::from(10u8)),
        ];
        3
    ];
    inner.set_array(contract(), &locks(), &rows);

    // length ok, first element ok, second element's second word fails
    let reader = FailingReader {
        inner,
        fail_at: 4,
        reads: AtomicUsize::new(0),
    };
    let err = decode_array(contract(), &locks(), &reader).await.unwrap_err();
    let read_err = match err {
        DecodeError::StorageRead(e) => e,
        other => panic!("expected a storage read error, got {other:?}"),
    };
    let base = dynamic_array_base_slot(U256::ZERO);
    assert_eq!(read_err.slot, base + U256::from(3u8));
    assert!(read_err.to_string().contains("connection refused"));
}

// ─── Descriptor fixtures ──────────────────────────────────────────────────────

#[test]
fn fixture_descriptors_agree() {
    let packed = DescriptorFile::load(&fixture_path("locks.yaml")).expect("fixture not found");
    let explicit =
        DescriptorFile::load(&fixture_path("locks-explicit.yaml")).expect("fixture not found");
    assert_eq!(packed.descriptor().unwrap(), locks());
    assert_eq!(explicit.descriptor().unwrap(), locks());
    assert_eq!(packed.rpc_url.as_deref(), Some("http://127.0.0.1:8545"));
}

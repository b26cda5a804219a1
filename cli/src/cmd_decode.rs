//! `chainslots decode`: read an array straight from contract storage.
//!
//! Reads the length from the declared slot, then every element word from the
//! keccak base slot, and prints one line per element:
//!
//! ```text
//! locks[0]: user:0xf39f… ,startTime:1718000000,amount:1000000000000000000
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::time::Duration;

use chainslots_core::config::parse_address;
use chainslots_core::{
    Address, ArrayDescriptor, DecodeError, DecodedRecord, DecoderOptions, DescriptorFile,
    StorageArrayDecoder, StorageReader,
};
use chainslots_rpc::{
    BlockTag, HttpClientConfig, HttpRpcClient, RetryConfig, RetryPolicy, RpcStorageReader,
    RpcTransport,
};

use crate::descriptor_args::DescriptorArgs;

pub const RPC_ENV: &str = "CHAINSLOTS_RPC_URL";
pub const DEFAULT_RPC: &str = "http://127.0.0.1:8545";

#[derive(Debug, Clone, Args)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub descriptor: DescriptorArgs,

    /// Contract address (overrides the descriptor file's `address`)
    #[arg(short, long)]
    pub address: Option<String>,

    /// RPC URL (overrides env CHAINSLOTS_RPC_URL and the descriptor's `rpc_url`)
    #[arg(long)]
    pub rpc: Option<String>,

    /// Block to read at: latest, pending, safe, finalized, earliest or a number
    #[arg(long, default_value = "latest")]
    pub block: BlockTag,

    /// Resolve the head block once and read every slot at it
    #[arg(long, conflicts_with = "block")]
    pub pin_block: bool,

    /// Read the words of each element concurrently
    #[arg(long)]
    pub concurrent: bool,

    /// Refuse arrays longer than this
    #[arg(long, default_value_t = 100_000)]
    pub max_length: u64,

    /// Retry the whole pass this many times on transient read failures
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: &DecodeArgs) -> Result<()> {
    let (descriptor, file) = args.descriptor.resolve()?;
    let address = resolve_address(args.address.as_deref(), file.as_ref())?;
    let rpc_url = resolve_rpc_url(
        args.rpc.as_deref(),
        std::env::var(RPC_ENV).ok().as_deref(),
        file.as_ref(),
    );

    tracing::info!(array = %descriptor.name, contract = %address, rpc = %rpc_url, "decoding");

    let client = HttpRpcClient::new(
        &rpc_url,
        HttpClientConfig {
            request_timeout: Duration::from_secs(args.timeout),
        },
    )?;
    let reader = open_reader(client, args.block, args.pin_block).await?;

    let decoder = StorageArrayDecoder::new(DecoderOptions {
        concurrent_words: args.concurrent,
        max_length: args.max_length,
    });
    let policy = RetryPolicy::new(RetryConfig::with_max_retries(args.retries));
    let records = decode_with_retries(&decoder, address, &descriptor, &reader, &policy).await?;

    if records.is_empty() {
        tracing::info!(array = %descriptor.name, "array is empty");
    }
    let output = render(&records, &descriptor.name, args.json)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Build the storage reader, resolving the head block first when `pin` is set.
pub async fn open_reader<T: RpcTransport>(
    transport: T,
    block: BlockTag,
    pin: bool,
) -> Result<RpcStorageReader<T>> {
    let mut reader = RpcStorageReader::new(transport).with_block(block);
    if pin {
        let url = reader.transport().url().to_string();
        let number = reader
            .pin_latest()
            .await
            .with_context(|| format!("fetching head block from {url}"))?;
        tracing::info!(block = number, "reading at pinned block");
    }
    Ok(reader)
}

/// Run the decode pass, re-running it from the length read after transient
/// read failures until `policy` gives up. Anything else fails at once.
pub async fn decode_with_retries<R>(
    decoder: &StorageArrayDecoder,
    address: Address,
    descriptor: &ArrayDescriptor,
    reader: &R,
    policy: &RetryPolicy,
) -> Result<Vec<DecodedRecord>>
where
    R: StorageReader + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        match decoder.decode_array(address, descriptor, reader).await {
            Ok(records) => return Ok(records),
            Err(DecodeError::StorageRead(e)) if e.is_transient() => {
                attempt += 1;
                let Some(delay) = policy.next_delay(attempt) else {
                    return Err(e.into());
                };
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying decode pass");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn resolve_address(flag: Option<&str>, file: Option<&DescriptorFile>) -> Result<Address> {
    if let Some(addr) = flag {
        return Ok(parse_address(addr)?);
    }
    file.map(DescriptorFile::contract_address)
        .transpose()?
        .flatten()
        .ok_or_else(|| anyhow!("--address is required (or set `address` in the descriptor)"))
}

/// Flag, then environment, then descriptor file, then the local dev node.
fn resolve_rpc_url(flag: Option<&str>, env: Option<&str>, file: Option<&DescriptorFile>) -> String {
    flag.or(env)
        .or_else(|| file.and_then(|f| f.rpc_url.as_deref()))
        .unwrap_or(DEFAULT_RPC)
        .to_string()
}

/// One line per record, or a JSON array.
pub fn render(records: &[DecodedRecord], name: &str, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(records)?);
    }
    Ok(records
        .iter()
        .map(|r| r.render_line(name))
        .collect::<Vec<_>>()
        .join("\n"))
}

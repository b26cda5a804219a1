//! chainslots CLI: dump Solidity dynamic arrays from raw contract storage.
//!
//! # Commands
//! ```text
//! chainslots decode    --address <addr> --descriptor <file.yaml> [--rpc <url>] [--json]
//! chainslots decode    --address <addr> --slot 0 --field user:address --field startTime:uint64 --field amount:uint256
//! chainslots layout    --descriptor <file.yaml> [--json]
//! chainslots base-slot <slot>
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

mod cmd_decode;
mod cmd_layout;
mod descriptor_args;
mod logging;

use cmd_decode::DecodeArgs;
use descriptor_args::DescriptorArgs;
use logging::{init_tracing, LogConfig};

#[derive(Parser)]
#[command(
    name = "chainslots",
    about = "Decode dynamic arrays of packed structs straight from EVM storage",
    long_about = "
chainslots reads a Solidity dynamic array from raw storage slots via
eth_getStorageAt: the length from the declared slot, the elements from
keccak256(slot). No ABI or getter is needed, only the slot and struct layout.

ENVIRONMENT VARIABLES:
  CHAINSLOTS_RPC_URL   RPC URL used when --rpc is not given
  RUST_LOG             log filter (overrides -v)
",
    version
)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and decode an array from a contract's storage
    Decode(DecodeArgs),

    /// Show the resolved element layout without touching the network
    Layout {
        #[command(flatten)]
        descriptor: DescriptorArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print keccak256(slot), where a dynamic array's data starts
    #[command(name = "base-slot")]
    BaseSlot {
        /// Declared slot (decimal or 0x hex)
        slot: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&LogConfig {
        level: if cli.verbose { "debug" } else { "warn" }.into(),
        json: cli.log_json,
    });

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Decode(args) => cmd_decode::run(&args).await,
        Commands::Layout { descriptor, json } => cmd_layout::run_layout(&descriptor, json),
        Commands::BaseSlot { slot } => cmd_layout::run_base_slot(&slot),
    }
}

use std::io::{self, BufRead};
use std::path::PathBuf;

use abi_decode::config::{self, OutputFormat};
use abi_decode::domain::abi::{AbiRegistry, DecodedCall, FunctionSignature};
use abi_decode::infrastructure::{AbiLoader, SharedDecoder};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "abi_decode=warn";

#[derive(Debug, Parser)]
#[command(
    name = "abi-decode",
    version,
    about = "Decode Ethereum transaction call data against a contract ABI"
)]
struct Args {
    /// ABI JSON file or compiler artifact with an "abi" field
    #[arg(long)]
    abi: Option<PathBuf>,

    /// Extra function signature, e.g. "transfer(address,uint256)". Repeatable.
    #[arg(long = "signature", short = 's')]
    signatures: Vec<String>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Hex call data (0x prefix optional). Read one per line from stdin when omitted.
    calldata: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::load();
    init_tracing(config.log.as_deref());

    let registry = build_registry(&args, &config)?;
    let format = args.format.or(config.format).unwrap_or_default();

    let inputs = if args.calldata.is_empty() {
        read_stdin_lines()?
    } else {
        args.calldata
    };
    debug!(inputs = inputs.len(), functions = registry.len(), "decoding");

    let decoder = SharedDecoder::new(registry);
    let mut failures = 0usize;
    for (input, result) in inputs.iter().zip(decoder.decode_batch(&inputs)) {
        match result {
            Ok(call) => match format {
                OutputFormat::Text => println!("{}", format_call(&call)),
                OutputFormat::Json => println!("{}", serde_json::to_string(&call)?),
            },
            Err(err) => {
                failures += 1;
                warn!(%input, "decode failed");
                eprintln!("{}: {err}", short_input(input));
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} inputs failed to decode", inputs.len());
    }
    Ok(())
}

fn init_tracing(directive: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_registry(args: &Args, config: &config::Config) -> Result<AbiRegistry> {
    let abi_path = args.abi.clone().or_else(|| config.abi_path());

    let mut registry = match &abi_path {
        Some(path) => AbiLoader::load_file(path)?,
        None => AbiRegistry::new(),
    };
    for sig in &args.signatures {
        let function = FunctionSignature::parse(sig)?;
        registry
            .insert(function)
            .with_context(|| format!("add signature '{sig}'"))?;
    }

    if registry.is_empty() {
        bail!("no functions to decode with: pass --abi <file> or --signature <sig>");
    }
    Ok(registry)
}

fn read_stdin_lines() -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.context("read stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

/// Render a decoded call as a signature line followed by one line per argument
fn format_call(call: &DecodedCall) -> String {
    let mut out = call.signature.clone();
    for (idx, arg) in call.arguments.iter().enumerate() {
        out.push_str(&format!("\n  {}: {} = {}", arg.display_name(idx), arg.kind, arg.value));
    }
    out
}

fn short_input(input: &str) -> String {
    if input.len() <= 18 {
        return input.to_string();
    }
    let start: String = input.chars().take(10).collect();
    format!("{start}… ({} chars)", input.len())
}

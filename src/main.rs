//! marklink console: main entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  CLI (clap)  ──▶  LinkConfig + schema document (serde)    │
//! │                                                           │
//! │  SerialLink (Transport)   LogExchangeSink (ExchangeSink)  │
//! │  ─────────────── Port Trait Boundary ─────────────────    │
//! │  Session ─▶ Framer          SchemaRegistry ─▶ PacketSchema │
//! └───────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use marklink::adapters::log_sink::LogExchangeSink;
use marklink::adapters::serial::{SerialLink, is_valid_device_path};
use marklink::config::LinkConfig;
use marklink::link::Session;
use marklink::packet::loader::load_registry;
use marklink::packet::{SchemaRegistry, SearchTag};

// ── Arguments ─────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "marklink",
    about = "Send schema-defined packets over a mark/space framed serial link"
)]
struct Cli {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3.
    #[arg(value_parser = parse_device)]
    device: String,

    /// Log every exchange on the `exchange` target.
    #[arg(short = 'v', short_alias = 'V', long)]
    verbose: bool,

    /// Schema document (JSON).
    #[arg(long, value_name = "PATH", default_value = "dtCommandsTMEV.json")]
    schema: PathBuf,

    /// Link configuration (JSON); defaults when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print every registered schema.
    #[arg(long)]
    list: bool,

    /// Send a command by name or search tag and print the reply. Repeatable.
    #[arg(long, value_name = "NAME|TAG")]
    send: Vec<String>,
}

fn parse_device(s: &str) -> Result<String, String> {
    if is_valid_device_path(s) {
        Ok(s.to_string())
    } else if cfg!(windows) {
        Err(format!("'{s}' is not a COM port (COM1..COM999)"))
    } else {
        Err(format!("'{s}' is not a /dev/tty* device"))
    }
}

/// Registry key for a tag string or a schema name.
fn resolve(registry: &SchemaRegistry, target: &str) -> Option<SearchTag> {
    if let Ok(tag) = target.to_ascii_uppercase().parse::<SearchTag>() {
        if registry.lookup_by_tag(&tag).is_some() {
            return Some(tag);
        }
    }
    registry
        .iter()
        .find(|(_, schema)| schema.name().eq_ignore_ascii_case(target))
        .map(|(tag, _)| *tag)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    info!("marklink v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => LinkConfig::from_file(path)?,
        None => LinkConfig::default(),
    };
    let mut registry = load_registry(&cli.schema)?;

    if cli.list {
        print!("{registry}");
    }
    if cli.send.is_empty() {
        return Ok(());
    }

    let link = SerialLink::open(&cli.device, &config)
        .map_err(marklink::Error::from)
        .with_context(|| format!("opening {}", cli.device))?;
    let mut session = Session::new(link, config);
    if cli.verbose {
        session = session.with_sink(Box::new(LogExchangeSink::new()));
    }

    for target in &cli.send {
        let Some(tag) = resolve(&registry, target) else {
            warn!("no schema named or tagged '{}'", target);
            continue;
        };

        match session.exchange(&mut registry, &tag) {
            Ok(reply) => {
                if let Some(schema) = registry.lookup_by_tag(&reply) {
                    println!("{} [{}] {}", reply, schema.direction_label(), schema.name());
                    print!("{schema}");
                }
            }
            Err(e) if e.is_fatal() => {
                return Err(e).with_context(|| format!("sending {target}"));
            }
            Err(e) => warn!("{}: {}", target, e),
        }
    }

    Ok(())
}

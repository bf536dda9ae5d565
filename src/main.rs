//! GCN Recompiler
//!
//! Translates a decoded GCN shader listing into IR and prints the result.

use anyhow::{bail, Context};
use clap::Parser;
use gr_core::config::Config;
use gr_gcn::{translate_shader, GcnInst, ShaderInfo};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "gcn-recompiler",
    about = "Translate decoded GCN shader blocks into IR"
)]
struct Args {
    /// Shader listing in JSON: shader info plus one instruction list per block
    input: PathBuf,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the updated shader info as JSON after translation
    #[arg(long, action = clap::ArgAction::SetTrue)]
    emit_info: bool,
}

/// Input format read from disk
#[derive(Debug, Serialize, Deserialize)]
struct ProgramListing {
    #[serde(default)]
    info: ShaderInfo,
    blocks: Vec<Vec<GcnInst>>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load().context("loading default config")?,
    };
    gr_core::logging::init(config.debug.log_level);

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let listing: ProgramListing = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", args.input.display()))?;
    if listing.blocks.is_empty() {
        bail!("{} contains no blocks", args.input.display());
    }

    info!(
        "Translating {} blocks of a {:?} shader",
        listing.blocks.len(),
        listing.info.stage
    );
    let mut shader_info = listing.info;
    let blocks = translate_shader(&listing.blocks, &mut shader_info, &config.translator)
        .with_context(|| format!("translating {}", args.input.display()))?;

    if config.debug.dump_ir {
        for block in &blocks {
            print!("{block}");
        }
    } else {
        info!("IR dump disabled in config");
    }

    if args.emit_info {
        let json = serde_json::to_string_pretty(&shader_info)?;
        println!("{json}");
    }
    Ok(())
}

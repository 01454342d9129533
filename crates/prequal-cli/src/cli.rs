use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "prequal")]
#[command(bin_name = "prequal")]
#[command(version)]
#[command(about = "Interactive loan pre-qualification wizard")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Use this step registry instead of ~/.config/prequal/wizard.toml"
    )]
    pub registry: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Write a diagnostics log under ~/.config/prequal/diagnostics"
    )]
    pub diagnostics: bool,

    #[arg(
        long = "param",
        value_name = "KEY=VALUE",
        value_parser = parse_param,
        help = "Prefill the field whose registry `param` matches KEY"
    )]
    pub params: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Run environment and registry checks")]
    Doctor,
    #[command(about = "Show the visible step sequence for a branch")]
    Steps {
        #[arg(long, value_name = "ID", help = "Branch to select before listing")]
        branch: Option<String>,
    },
    #[command(about = "Write the built-in step registry to the config path")]
    Init {
        #[arg(long, help = "Overwrite an existing registry file")]
        force: bool,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got '{raw}'"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("expected KEY=VALUE, got '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

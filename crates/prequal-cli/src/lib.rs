pub mod cli;
pub mod diagnostics;
pub mod dispatch;

use anyhow::{Context, Result};
use clap::Parser;
use prequal_app::{App, JsonFileSink};
use prequal_core::config::resolve_submissions_dir;
use tracing::error;

use crate::cli::Cli;
use crate::diagnostics::DiagnosticsSession;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let diagnostics = DiagnosticsSession::initialize(cli.diagnostics)?;
    if let Some(path) = diagnostics.path() {
        eprintln!("Diagnostics enabled: {}", path.display());
    }

    let submissions_dir =
        resolve_submissions_dir().context("failed to resolve submissions directory")?;
    let sink = JsonFileSink::new(submissions_dir);
    let app = App::new(&sink).with_registry_override(cli.registry.clone());

    let result = dispatch::run_with_deps(cli, &app);
    if let Err(failure) = &result {
        error!(error = %format!("{failure:#}"), "command failed");
    }
    result
}

mod session;
mod sink;
mod submit;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use prequal_core::config::{RegistrySource, load_active_registry, resolve_registry_path};
use prequal_core::doctor::{DoctorReport, run_doctor};
use prequal_core::registry::{StepRegistry, install_builtin_registry};
use tracing::info;

pub use session::{ChoiceEffect, Session};
pub use sink::{JsonFileSink, Submission, SubmissionReceipt, SubmissionSink};
pub use submit::SubmitOutcome;

pub struct App<'a> {
    pub sink: &'a dyn SubmissionSink,
    registry_override: Option<PathBuf>,
}

impl<'a> App<'a> {
    pub fn new(sink: &'a dyn SubmissionSink) -> Self {
        Self {
            sink,
            registry_override: None,
        }
    }

    /// Uses `path` instead of the default registry location.
    pub fn with_registry_override(mut self, path: Option<PathBuf>) -> Self {
        self.registry_override = path;
        self
    }

    pub fn registry_override(&self) -> Option<&Path> {
        self.registry_override.as_deref()
    }

    pub fn doctor(&self) -> Result<DoctorReport> {
        Ok(run_doctor(self.registry_override()))
    }

    pub fn load_registry(&self) -> Result<(StepRegistry, RegistrySource)> {
        let (registry, source) = load_active_registry(self.registry_override()).map_err(|error| {
            anyhow!("{error}\nRun `prequal doctor` to inspect the registry setup.")
        })?;

        info!(source = %source.describe(), steps = registry.steps().len(), "registry loaded");
        Ok((registry, source))
    }

    pub fn start_session(&self, params: &[(String, String)]) -> Result<Session> {
        let (registry, _) = self.load_registry()?;
        let mut session = Session::new(registry);
        session.apply_params(params);
        Ok(session)
    }

    /// Writes the built-in registry to the override path, or the default config path.
    pub fn init_registry(&self, force: bool) -> Result<PathBuf> {
        let path = match self.registry_override() {
            Some(path) => path.to_path_buf(),
            None => resolve_registry_path().context("failed to resolve registry path")?,
        };
        install_builtin_registry(&path, force).map_err(|error| anyhow!("{error}"))?;
        info!(path = %path.display(), "installed built-in registry");
        Ok(path)
    }
}

use std::fmt;
use std::path::Path;

use crate::config::{resolve_registry_path, resolve_submissions_dir};
use crate::registry::{StepRegistry, load_registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Pass,
    Fail,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorCheck {
    pub name: String,
    pub state: CheckState,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    pub fn has_failures(&self) -> bool {
        self.checks
            .iter()
            .any(|check| check.state == CheckState::Fail)
    }

    pub fn summary(&self) -> String {
        let passed = self
            .checks
            .iter()
            .filter(|check| check.state == CheckState::Pass)
            .count();
        let failed = self.checks.len().saturating_sub(passed);
        format!("{passed} passed, {failed} failed")
    }
}

/// `registry_override` is the `--registry` path, if one was given.
pub fn run_doctor(registry_override: Option<&Path>) -> DoctorReport {
    let mut checks = Vec::new();

    let registry_path = match registry_override {
        Some(path) => Ok(path.to_path_buf()),
        None => resolve_registry_path(),
    };

    match registry_path {
        Ok(path) if path.exists() => {
            checks.push(pass_check(
                "registry file exists",
                format!("found at {}", path.display()),
            ));
            checks.push(match load_registry(&path) {
                Ok(registry) => registry_valid_check(&registry),
                Err(error) => fail_check("registry parses and validates", error.to_string()),
            });
        }
        Ok(path) if registry_override.is_some() => {
            checks.push(fail_check(
                "registry file exists",
                format!("expected at {}", path.display()),
            ));
            push_skipped_checks(
                &mut checks,
                &["registry parses and validates"],
                "registry file is missing",
            );
        }
        Ok(path) => {
            checks.push(pass_check(
                "registry file exists",
                format!(
                    "no file at {}, using the built-in registry",
                    path.display()
                ),
            ));
            checks.push(match StepRegistry::builtin() {
                Ok(registry) => registry_valid_check(&registry),
                Err(error) => fail_check("registry parses and validates", error.to_string()),
            });
        }
        Err(error) => {
            checks.push(fail_check("config path resolves", error.to_string()));
            push_skipped_checks(
                &mut checks,
                &["registry file exists", "registry parses and validates"],
                "config path could not be resolved",
            );
        }
    }

    checks.push(match resolve_submissions_dir() {
        Ok(path) => pass_check(
            "submissions directory resolves",
            format!("submissions are written to {}", path.display()),
        ),
        Err(error) => fail_check("submissions directory resolves", error.to_string()),
    });

    DoctorReport { checks }
}

fn registry_valid_check(registry: &StepRegistry) -> DoctorCheck {
    pass_check(
        "registry parses and validates",
        format!(
            "{} steps in {} sections, {} branches",
            registry.steps().len(),
            registry.sections().len(),
            registry.branches().len()
        ),
    )
}

fn pass_check(name: &str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        state: CheckState::Pass,
        details: details.into(),
    }
}

fn fail_check(name: &str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        state: CheckState::Fail,
        details: details.into(),
    }
}

fn skipped_check(name: &str, reason: &str) -> DoctorCheck {
    fail_check(name, format!("skipped because {reason}"))
}

fn push_skipped_checks(checks: &mut Vec<DoctorCheck>, names: &[&str], reason: &str) {
    checks.extend(
        names
            .iter()
            .copied()
            .map(|name| skipped_check(name, reason)),
    );
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn check_state_display_is_uppercase_label() {
        assert_eq!(CheckState::Pass.to_string(), "PASS");
        assert_eq!(CheckState::Fail.to_string(), "FAIL");
    }

    #[test]
    fn doctor_summary_counts_pass_and_fail() {
        let report = DoctorReport {
            checks: vec![
                pass_check("a", "ok"),
                fail_check("b", "no"),
                pass_check("c", "ok"),
            ],
        };

        assert_eq!(report.summary(), "2 passed, 1 failed");
        assert!(report.has_failures());
    }

    #[test]
    fn explicit_registry_is_checked() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("wizard.toml");
        fs::write(&path, crate::registry::builtin_registry_toml()).expect("write registry");

        let report = run_doctor(Some(&path));
        let valid = report
            .checks
            .iter()
            .find(|check| check.name == "registry parses and validates")
            .expect("validation check");
        assert_eq!(valid.state, CheckState::Pass);
        assert_eq!(valid.details, "9 steps in 5 sections, 2 branches");
    }

    #[test]
    fn invalid_explicit_registry_fails_validation() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("wizard.toml");
        fs::write(&path, "version = 2\n").expect("write registry");

        let report = run_doctor(Some(&path));
        assert!(report.has_failures());
        assert_eq!(report.checks[1].state, CheckState::Fail);
    }

    #[test]
    fn missing_explicit_registry_skips_validation() {
        let temp = tempfile::tempdir().expect("temp dir");
        let report = run_doctor(Some(&temp.path().join("absent.toml")));

        assert_eq!(report.checks[0].state, CheckState::Fail);
        assert_eq!(
            report.checks[1].details,
            "skipped because registry file is missing"
        );
    }
}

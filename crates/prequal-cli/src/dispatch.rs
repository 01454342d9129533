use anyhow::{Result, bail};
use comfy_table::{Cell, ContentArrangement, Table};
use prequal_app::App;
use prequal_core::doctor::{CheckState, DoctorReport};
use prequal_core::registry::{BranchId, StepRegistry};
use prequal_core::wizard::VisibleSequence;
use prequal_tui::WizardOutcome;

use crate::cli::{Cli, Command};

pub fn run_with_deps(cli: Cli, app: &App<'_>) -> Result<()> {
    match cli.command {
        Some(Command::Doctor) => run_doctor_command(app),
        Some(Command::Steps { branch }) => run_steps_command(app, branch.as_deref()),
        Some(Command::Init { force }) => run_init_command(app, force),
        None => run_root_command(app, &cli.params),
    }
}

fn run_root_command(app: &App<'_>, params: &[(String, String)]) -> Result<()> {
    let session = app.start_session(params)?;

    match prequal_tui::run_wizard(app, session)? {
        WizardOutcome::Submitted(receipt) => match receipt.path {
            Some(path) => println!("Submission saved to {}", path.display()),
            None => println!("Submission handed off."),
        },
        WizardOutcome::Canceled => println!("Canceled. Nothing was submitted."),
    }

    Ok(())
}

fn run_doctor_command(app: &App<'_>) -> Result<()> {
    let report = app.doctor()?;
    print_doctor_report(&report);
    Ok(())
}

fn print_doctor_report(report: &DoctorReport) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Check", "Status", "Details"]);

    for check in &report.checks {
        let status = match check.state {
            CheckState::Pass => "PASS",
            CheckState::Fail => "FAIL",
        };

        table.add_row(vec![
            Cell::new(check.name.as_str()),
            Cell::new(status),
            Cell::new(check.details.as_str()),
        ]);
    }

    println!("{table}");
    println!("{}", report.summary());
}

fn run_steps_command(app: &App<'_>, branch: Option<&str>) -> Result<()> {
    let (registry, source) = app.load_registry()?;
    let branch = branch.map(BranchId::new);
    if let Some(branch) = &branch
        && !registry.has_branch(branch)
    {
        bail!(
            "unknown branch '{branch}'; declared branches: {}",
            declared_branches(&registry)
        );
    }

    let sequence = VisibleSequence::derive(&registry, branch.as_ref());
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Index", "Ordinal", "Step", "Section", "Branch"]);

    for (index, step) in sequence.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index),
            Cell::new(step.ordinal),
            Cell::new(step.id.as_str()),
            Cell::new(step.section.as_str()),
            Cell::new(
                step.branch
                    .as_ref()
                    .map(|branch| branch.as_str())
                    .unwrap_or("-"),
            ),
        ]);
    }

    println!("Registry: {}", source.describe());
    println!("{table}");
    println!("{} visible steps", sequence.len());
    Ok(())
}

fn run_init_command(app: &App<'_>, force: bool) -> Result<()> {
    let path = app.init_registry(force)?;
    println!("Wrote built-in registry to {}", path.display());
    Ok(())
}

fn declared_branches(registry: &StepRegistry) -> String {
    if registry.branches().is_empty() {
        return "(none)".to_string();
    }
    registry
        .branches()
        .iter()
        .map(|branch| branch.id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

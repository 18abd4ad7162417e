use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chainup_core::{extract_base_address, variant_for, StepAction, UpgradeName, UpgradePlan};
use chainup_ledger::{is_first_upgrade_of_this_version, CompletionLedger, LedgerStore};
use chainup_orchestrator::{
    clear_pending_plan, read_pending_plan, write_pending_plan, PassThroughMigrations, UpgradeApp,
    UpgradeDetails, VersionMap,
};

use crate::render::{render_status_line, OutputStyle};

/// Command-line names are user input, so unknown ones are errors here
/// rather than reaching the handler.
pub(crate) fn parse_upgrade_name_arg(value: &str) -> Result<UpgradeName> {
    UpgradeName::parse(value).ok_or_else(|| {
        let known = UpgradeName::ALL
            .iter()
            .map(|name| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!("unknown upgrade name '{value}' (expected one of: {known})")
    })
}

pub(crate) fn format_names_lines() -> Vec<String> {
    UpgradeName::ALL
        .iter()
        .map(|name| {
            let variant = variant_for(*name);
            format!(
                "{name}\tprimary={}\tvariant={}",
                if name.is_primary() { "yes" } else { "no" },
                if variant.is_none() {
                    "-"
                } else {
                    variant.as_str()
                }
            )
        })
        .collect()
}

pub(crate) fn run_status_command(state_dir: &Path, style: OutputStyle) -> Result<Vec<String>> {
    let ledger = LedgerStore::new(state_dir).load()?;
    let mut lines = vec![format!("state dir: {}", state_dir.display())];

    let records = ledger.records();
    if records.is_empty() {
        lines.push("no completed upgrades recorded".to_string());
    }
    for record in records {
        lines.push(render_status_line(
            style,
            "ok",
            &format!("completed {} at height {}", record.name, record.height),
        ));
    }

    let mode = if is_first_upgrade_of_this_version(&ledger) {
        "first-time"
    } else {
        "repeat"
    };
    lines.push(format!("next upgrade: {mode}"));

    let pending = read_pending_plan(state_dir)?;
    lines.push(match pending {
        Some(record) => format!(
            "pending plan: {} (fingerprint={})",
            record.details.plan.name, record.fingerprint
        ),
        None => "pending plan: none".to_string(),
    });
    Ok(lines)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlanRequest {
    pub(crate) name: String,
    pub(crate) height: u64,
    pub(crate) info: Option<String>,
    pub(crate) commit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlanOutcome {
    pub(crate) first_time: bool,
    pub(crate) details: UpgradeDetails,
    pub(crate) fingerprint: String,
    pub(crate) committed: bool,
}

/// Runs the handler with pass-through migrations against the stored ledger.
/// A commit records the pending plan and then the completion, which is what
/// the node does after a successful handler run.
pub(crate) fn run_plan_command(state_dir: &Path, request: &PlanRequest) -> Result<PlanOutcome> {
    let name = parse_upgrade_name_arg(&request.name)?;
    if request.commit && request.height == 0 {
        bail!("--commit requires a non-zero --height");
    }

    let store = LedgerStore::new(state_dir);
    let ledger = store.load()?;
    let done_height = ledger.done_height(name.as_str());
    if request.commit && done_height != 0 {
        bail!("upgrade {name} already completed at height {done_height}");
    }

    let first_time = is_first_upgrade_of_this_version(&ledger);
    let mut app = UpgradeApp::new(ledger, PassThroughMigrations);
    let plan = UpgradePlan::new(name.as_str(), request.height)
        .with_info(request.info.clone().unwrap_or_default());
    app.apply_upgrade(&plan, &VersionMap::new())
        .with_context(|| format!("upgrade {name} failed at height {}", request.height))?;
    let details = app
        .take_upgrade_details()
        .ok_or_else(|| anyhow!("upgrade {name} recorded no pending plan"))?;

    let fingerprint = if request.commit {
        let record = write_pending_plan(state_dir, &details)?;
        store.record_done(name.as_str(), request.height)?;
        record.fingerprint
    } else {
        details
            .core_proposals
            .fingerprint()
            .context("failed to fingerprint execution plan")?
    };

    Ok(PlanOutcome {
        first_time,
        details,
        fingerprint,
        committed: request.commit,
    })
}

fn format_action(action: &StepAction) -> String {
    match action {
        StepAction::Module(specifier) => format!("module {specifier}"),
        StepAction::Arbitrary(payload) => {
            format!("payload {}", String::from_utf8_lossy(payload.as_bytes()))
        }
    }
}

pub(crate) fn format_plan_lines(details: &UpgradeDetails) -> Vec<String> {
    let mut lines = Vec::new();
    for (index, step) in details.core_proposals.steps().iter().enumerate() {
        for action in step.actions() {
            lines.push(format!("step {}: {}", index + 1, format_action(action)));
        }
    }
    if lines.is_empty() {
        lines.push("no execution steps".to_string());
    }
    lines
}

pub(crate) fn format_plan_outcome_lines(outcome: &PlanOutcome, style: OutputStyle) -> Vec<String> {
    let plan = &outcome.details.plan;
    let mut lines = vec![format!(
        "upgrade {} at height {} ({})",
        plan.name,
        plan.height,
        if outcome.first_time {
            "first-time"
        } else {
            "repeat"
        }
    )];
    lines.extend(format_plan_lines(&outcome.details));
    lines.push(format!("fingerprint: {}", outcome.fingerprint));
    lines.push(if outcome.committed {
        render_status_line(
            style,
            "ok",
            &format!("recorded pending plan and completion of {}", plan.name),
        )
    } else {
        render_status_line(style, "skip", "dry run; nothing recorded")
    });
    lines
}

pub(crate) fn run_mark_done_command(state_dir: &Path, name: &str, height: u64) -> Result<String> {
    let name = parse_upgrade_name_arg(name)?;
    LedgerStore::new(state_dir).record_done(name.as_str(), height)?;
    Ok(format!("recorded completion of {name} at height {height}"))
}

pub(crate) fn run_pending_command(
    state_dir: &Path,
    clear: bool,
    style: OutputStyle,
) -> Result<Vec<String>> {
    if clear {
        let line = if clear_pending_plan(state_dir)? {
            render_status_line(style, "ok", "cleared pending plan")
        } else {
            render_status_line(style, "skip", "no pending plan to clear")
        };
        return Ok(vec![line]);
    }

    let Some(record) = read_pending_plan(state_dir)? else {
        return Ok(vec!["no pending plan".to_string()]);
    };
    let mut lines = vec![format!(
        "pending plan for {} at height {}",
        record.details.plan.name, record.details.plan.height
    )];
    lines.extend(format_plan_lines(&record.details));
    lines.push(format!("fingerprint: {}", record.fingerprint));
    Ok(lines)
}

pub(crate) fn run_address_command(addr: &str) -> Result<String> {
    extract_base_address(addr)
        .with_context(|| format!("failed to extract base address of '{addr}'"))
}

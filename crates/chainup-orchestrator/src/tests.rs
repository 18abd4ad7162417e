use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chainup_core::{StepAction, UpgradeName, UpgradePlan};
use chainup_ledger::MemoryLedger;
use serde_json::Value;

use super::*;

static TEST_STATE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_state_root() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_STATE_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "chainup-orchestrator-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ))
}

#[derive(Debug, Default)]
struct RecordingMigrations {
    calls: Vec<String>,
    bump: VersionMap,
    fail_modules: Option<MigrationError>,
    fail_params: Option<MigrationError>,
}

impl ModuleMigrations for RecordingMigrations {
    fn run_migrations(&mut self, from_vm: &VersionMap) -> Result<VersionMap, MigrationError> {
        self.calls.push("run_migrations".to_string());
        if let Some(err) = &self.fail_modules {
            return Err(err.clone());
        }
        let mut migrated = from_vm.clone();
        for (module, version) in &self.bump {
            migrated.insert(module.clone(), *version);
        }
        Ok(migrated)
    }

    fn migrate_params(&mut self, module: &str) -> Result<(), MigrationError> {
        self.calls.push(format!("migrate_params:{module}"));
        match &self.fail_params {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn app() -> UpgradeApp<MemoryLedger, RecordingMigrations> {
    UpgradeApp::new(MemoryLedger::new(), RecordingMigrations::default())
}

fn from_vm() -> VersionMap {
    VersionMap::from([("bank".to_string(), 2), ("swingset".to_string(), 2)])
}

fn payload_json(action: &StepAction) -> Value {
    let StepAction::Arbitrary(payload) = action else {
        panic!("expected arbitrary action, got {action:?}");
    };
    payload.to_value().expect("payload must be JSON")
}

fn module_of(action: &StepAction) -> &str {
    let StepAction::Module(specifier) = action else {
        panic!("expected module action, got {action:?}");
    };
    specifier
}

#[test]
fn one_time_steps_follow_fixed_order() {
    let steps = one_time_steps(UpgradeName::Main).expect("steps must build");
    assert_eq!(steps.len(), 8);

    let electorate = payload_json(&steps[0].actions()[0]);
    assert_eq!(electorate["module"], REPLACE_ELECTORATE_MODULE);
    assert_eq!(electorate["entrypoint"], DEFAULT_PROPOSAL_ENTRYPOINT);
    assert_eq!(electorate["args"][0]["variant"], "MAINNET");

    let price_feeds = payload_json(&steps[1].actions()[0]);
    assert_eq!(price_feeds["module"], UPDATE_PRICE_FEEDS_MODULE);
    assert_eq!(price_feeds["args"][0]["variant"], "MAINNET");

    let modules: Vec<&str> = steps[2..]
        .iter()
        .map(|step| {
            assert_eq!(step.actions().len(), 1);
            module_of(&step.actions()[0])
        })
        .collect();
    assert_eq!(modules, VERSION_MODULE_STEPS.to_vec());
    assert_eq!(modules[0], "@agoric/builders/scripts/vats/add-auction.js");
    assert_eq!(modules[1], "@agoric/builders/scripts/vats/upgradeVaults.js");
}

#[test]
fn one_time_steps_are_deterministic() {
    for name in UpgradeName::ALL {
        assert_eq!(
            one_time_steps(name).expect("steps must build"),
            one_time_steps(name).expect("steps must build")
        );
    }
}

#[test]
fn basic_upgrade_uses_empty_variant() {
    let steps = one_time_steps(UpgradeName::Basic).expect("steps must build");
    assert_eq!(payload_json(&steps[0].actions()[0])["args"][0]["variant"], "");
    assert_eq!(payload_json(&steps[1].actions()[0])["args"][0]["variant"], "");
}

#[test]
fn handlers_are_registered_for_every_name() {
    let handlers = upgrade_handlers();
    assert_eq!(handlers.len(), UpgradeName::ALL.len());
    for (name, handler) in handlers {
        assert_eq!(handler.target(), name);
    }
}

#[test]
fn first_upgrade_schedules_one_time_steps_and_migrates() {
    let mut app = UpgradeApp::new(
        MemoryLedger::new(),
        RecordingMigrations {
            bump: VersionMap::from([("swingset".to_string(), 3)]),
            ..RecordingMigrations::default()
        },
    );
    let plan = UpgradePlan::new("UNRELEASED_main", 100);

    let migrated = app
        .apply_upgrade(&plan, &from_vm())
        .expect("upgrade must succeed");

    assert_eq!(migrated.get("swingset"), Some(&3));
    assert_eq!(migrated.get("bank"), Some(&2));
    assert_eq!(app.phase(), UpgradePhase::Done);
    assert_eq!(
        app.migrations().calls,
        vec!["run_migrations", "migrate_params:swingset"]
    );

    let details = app.upgrade_details().expect("plan must be recorded");
    assert_eq!(details.plan, plan);
    assert_eq!(
        details.core_proposals.steps(),
        one_time_steps(UpgradeName::Main)
            .expect("steps must build")
            .as_slice()
    );
}

#[test]
fn reapply_after_first_upgrade_only_carries_plan_steps() {
    let mut app = app();
    app.apply_upgrade(&UpgradePlan::new("UNRELEASED_main", 100), &from_vm())
        .expect("first upgrade must succeed");
    let first = app.take_upgrade_details().expect("first plan recorded");
    assert_eq!(first.core_proposals.len(), 8);
    app.ledger_mut()
        .record_done("UNRELEASED_main", 100)
        .expect("completion must record");

    let reapply = UpgradePlan::new("UNRELEASED_REAPPLY", 200).with_info(
        r#"{"coreProposals":["@agoric/builders/scripts/vats/extra.js"]}"#,
    );
    app.apply_upgrade(&reapply, &from_vm())
        .expect("reapply must succeed");

    assert_eq!(app.phase(), UpgradePhase::Done);
    let details = app.upgrade_details().expect("plan must be recorded");
    assert_eq!(details.core_proposals.len(), 1);
    assert_eq!(
        module_of(&details.core_proposals.steps()[0].actions()[0]),
        "@agoric/builders/scripts/vats/extra.js"
    );
    assert_eq!(
        app.migrations().calls,
        vec![
            "run_migrations",
            "migrate_params:swingset",
            "run_migrations",
            "migrate_params:swingset"
        ]
    );
}

#[test]
fn second_primary_name_is_a_repeat() {
    let mut app = app();
    app.ledger_mut()
        .record_done("UNRELEASED_devnet", 10)
        .expect("completion must record");

    app.apply_upgrade(&UpgradePlan::new("UNRELEASED_main", 20), &from_vm())
        .expect("repeat upgrade must succeed");

    assert!(app
        .upgrade_details()
        .expect("plan must be recorded")
        .core_proposals
        .is_empty());
    assert_eq!(app.migrations().calls.len(), 2);
}

#[test]
fn first_upgrade_under_secondary_name_fails_before_any_work() {
    let mut app = app();
    let err = app
        .apply_upgrade(&UpgradePlan::new("UNRELEASED_REAPPLY", 5), &from_vm())
        .expect_err("secondary first upgrade must fail");

    assert!(matches!(
        err,
        UpgradeError::NonPrimaryFirstUpgrade { ref name } if name == "UNRELEASED_REAPPLY"
    ));
    assert_eq!(err.to_string(), "cannot run UNRELEASED_REAPPLY as first upgrade");
    assert_eq!(app.phase(), UpgradePhase::FirstTime);
    assert!(app.upgrade_details().is_none());
    assert!(app.migrations().calls.is_empty());
}

#[test]
fn variant_follows_handler_target_not_plan_name() {
    let mut app = app();
    let handler = app
        .handler(UpgradeName::A3pIntegration)
        .expect("handler registered");

    handler
        .handle(&mut app, &UpgradePlan::new("UNRELEASED_main", 3), &from_vm())
        .expect("upgrade must succeed");

    let details = app.upgrade_details().expect("plan must be recorded");
    let electorate = payload_json(&details.core_proposals.steps()[0].actions()[0]);
    assert_eq!(electorate["args"][0]["variant"], "A3P_INTEGRATION");
}

#[test]
fn plan_info_steps_run_after_built_in_steps() {
    let mut app = app();
    let plan = UpgradePlan::new("UNRELEASED_devnet", 9).with_info(
        r#"{"coreProposals":{"steps":[["x.js","y.js"],["z.js"]]}}"#,
    );

    app.apply_upgrade(&plan, &from_vm())
        .expect("upgrade must succeed");

    let steps = app
        .upgrade_details()
        .expect("plan must be recorded")
        .core_proposals
        .steps()
        .to_vec();
    assert_eq!(steps.len(), 10);
    assert_eq!(payload_json(&steps[0].actions()[0])["args"][0]["variant"], "DEVNET");
    assert_eq!(steps[8].actions().len(), 2);
    assert_eq!(module_of(&steps[9].actions()[0]), "z.js");
}

#[test]
fn malformed_plan_info_aborts_before_migrations() {
    let mut app = app();
    let plan = UpgradePlan::new("UNRELEASED_main", 9).with_info("{not json");

    let err = app
        .apply_upgrade(&plan, &from_vm())
        .expect_err("malformed info must fail");

    assert!(matches!(err, UpgradeError::PlanInfo(_)));
    assert_eq!(app.phase(), UpgradePhase::Planning);
    assert!(app.upgrade_details().is_none());
    assert!(app.migrations().calls.is_empty());
}

#[test]
fn module_migration_failure_aborts_upgrade() {
    let mut app = UpgradeApp::new(
        MemoryLedger::new(),
        RecordingMigrations {
            fail_modules: Some(MigrationError::new("bank", "store missing")),
            ..RecordingMigrations::default()
        },
    );

    let err = app
        .apply_upgrade(&UpgradePlan::new("UNRELEASED_BASIC", 4), &from_vm())
        .expect_err("migration failure must abort");

    assert!(matches!(err, UpgradeError::Migration(ref inner) if inner.module == "bank"));
    assert_eq!(app.phase(), UpgradePhase::Committing);
    assert!(app.upgrade_details().is_none());
    assert_eq!(app.migrations().calls, vec!["run_migrations"]);
}

#[test]
fn params_migration_failure_aborts_upgrade() {
    let mut app = UpgradeApp::new(
        MemoryLedger::new(),
        RecordingMigrations {
            fail_params: Some(MigrationError::new("swingset", "bad params")),
            ..RecordingMigrations::default()
        },
    );

    let err = app
        .apply_upgrade(&UpgradePlan::new("UNRELEASED_BASIC", 4), &from_vm())
        .expect_err("params failure must abort");

    assert_eq!(
        err.to_string(),
        "migration of module 'swingset' failed: bad params"
    );
    assert!(app.upgrade_details().is_none());
}

#[test]
fn take_upgrade_details_hands_off_once() {
    let mut app = app();
    app.apply_upgrade(&UpgradePlan::new("UNRELEASED_BASIC", 1), &from_vm())
        .expect("upgrade must succeed");

    assert!(app.take_upgrade_details().is_some());
    assert!(app.take_upgrade_details().is_none());
}

#[test]
fn pass_through_migrations_keep_versions() {
    let mut app = UpgradeApp::new(MemoryLedger::new(), PassThroughMigrations);
    let migrated = app
        .apply_upgrade(&UpgradePlan::new("UNRELEASED_BASIC", 1), &from_vm())
        .expect("upgrade must succeed");
    assert_eq!(migrated, from_vm());
}

#[test]
#[should_panic(expected = "invalid upgrade name: UNRELEASED_bogus")]
fn unknown_plan_name_is_fatal() {
    let mut app = app();
    let _ = app.apply_upgrade(&UpgradePlan::new("UNRELEASED_bogus", 1), &from_vm());
}

#[test]
#[should_panic(expected = "execution controller initialized")]
fn handler_refuses_to_run_after_controller_boot() {
    let mut app = app();
    app.mark_controller_initialized();
    let _ = app.apply_upgrade(&UpgradePlan::new("UNRELEASED_main", 1), &from_vm());
}

#[test]
fn pending_plan_round_trip_and_clear() {
    let root = test_state_root();
    let mut app = app();
    app.apply_upgrade(&UpgradePlan::new("UNRELEASED_main", 77), &from_vm())
        .expect("upgrade must succeed");
    let details = app.take_upgrade_details().expect("plan recorded");

    assert!(read_pending_plan(&root).expect("read").is_none());
    let written = write_pending_plan(&root, &details).expect("pending plan must write");
    assert_eq!(
        written.fingerprint,
        details.core_proposals.fingerprint().expect("fingerprint")
    );

    let read = read_pending_plan(&root)
        .expect("read must succeed")
        .expect("pending plan must exist");
    assert_eq!(read, written);

    let err = write_pending_plan(&root, &details).expect_err("second plan must be refused");
    assert!(err.to_string().contains("upgrade=UNRELEASED_main"));

    assert!(clear_pending_plan(&root).expect("clear"));
    assert!(!clear_pending_plan(&root).expect("clear again"));
    assert!(read_pending_plan(&root).expect("read").is_none());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn tampered_pending_plan_is_rejected() {
    let root = test_state_root();
    let details = UpgradeDetails {
        plan: UpgradePlan::new("UNRELEASED_BASIC", 3),
        core_proposals: chainup_core::ExecutionPlan::from_steps(vec![
            chainup_core::Step::for_modules(["a.js"]),
        ]),
    };
    write_pending_plan(&root, &details).expect("pending plan must write");

    let path = pending_plan_path(&root);
    let raw = fs::read_to_string(&path).expect("read pending plan");
    fs::write(&path, raw.replace("a.js", "b.js")).expect("tamper pending plan");

    let err = read_pending_plan(&root).expect_err("tampered plan must fail");
    assert!(err.to_string().contains("fingerprint mismatch"));

    let _ = fs::remove_dir_all(root);
}

//! Tests for the filter compiler.

use super::*;
use crate::model::{BootId, Priority};
use crate::source::memory::{Faults, MatchCall, MemoryStore, Record};

fn render(calls: &[MatchCall]) -> String {
    calls
        .iter()
        .map(|call| match call {
            MatchCall::Flush => "flush".to_string(),
            MatchCall::Match { field, value } => format!("{}={}", field, value),
            MatchCall::Conjunction => "AND".to_string(),
            MatchCall::Disjunction => "OR".to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn compile_to_log(spec: &FilterSpec) -> (ApplyReport, String) {
    let store = MemoryStore::new();
    let mut journal = store.open_journal();
    let report = compile(spec, &mut journal);
    (report, render(&store.match_log()))
}

fn boot(id: &str) -> BootId {
    BootId::new(id).expect("valid boot id")
}

// ===== Plan shape =====

#[test]
fn empty_spec_yields_empty_plan() {
    let plan = FilterPlan::from_spec(&FilterSpec::new());
    assert!(plan.is_empty());
}

#[test]
fn empty_spec_only_flushes() {
    let (report, log) = compile_to_log(&FilterSpec::new());
    assert_eq!(log, "flush");
    assert_eq!(report, ApplyReport::default());
}

#[test]
fn one_group_per_non_empty_selector_list() {
    let spec = FilterSpec::new()
        .with_system_units(["a.service"])
        .with_user_units(["b.service"])
        .with_executables(["/usr/bin/c"]);
    let kinds: Vec<GroupKind> = FilterPlan::from_spec(&spec)
        .groups()
        .iter()
        .map(|g| g.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            GroupKind::SystemUnits,
            GroupKind::UserUnits,
            GroupKind::Executables
        ]
    );
}

#[test]
fn kernel_group_widens_to_userspace_without_selectors() {
    let spec = FilterSpec::new().with_kernel_messages(true);
    let plan = FilterPlan::from_spec(&spec);
    assert_eq!(plan.groups().len(), 1);
    let values: Vec<&str> = plan.groups()[0]
        .terms
        .iter()
        .map(|t| t.value.as_str())
        .collect();
    assert_eq!(values, vec!["kernel", "audit", "journal", "syslog", "stdout", "driver"]);
}

#[test]
fn kernel_group_stays_narrow_with_selectors() {
    let spec = FilterSpec::new()
        .with_kernel_messages(true)
        .with_system_units(["a.service"]);
    let plan = FilterPlan::from_spec(&spec);
    assert_eq!(plan.groups()[0].kind, GroupKind::Kernel);
    assert_eq!(plan.groups()[0].terms.len(), 2);
    assert_eq!(plan.groups()[1].kind, GroupKind::SystemUnits);
}

#[test]
fn common_constraints_alone_use_userspace_group() {
    let spec = FilterSpec::new().with_priority_ceiling(Some(Priority::Alert));
    let plan = FilterPlan::from_spec(&spec);
    assert_eq!(plan.groups().len(), 1);
    assert_eq!(plan.groups()[0].kind, GroupKind::Userspace);
}

#[test]
fn empty_boot_list_adds_no_boot_terms() {
    let spec = FilterSpec::new().with_system_units(["a.service"]);
    let plan = FilterPlan::from_spec(&spec);
    assert!(plan.groups()[0]
        .terms
        .iter()
        .all(|t| t.field != fields::BOOT_ID));
}

// ===== Emitted calls =====

#[test]
fn every_group_restates_boot_and_priority() {
    let spec = FilterSpec::new()
        .with_boots([boot("b1"), boot("b2")])
        .with_priority_ceiling(Some(Priority::Critical))
        .with_system_units(["a.service", "b.service"])
        .with_executables(["/usr/bin/x"]);
    let (report, log) = compile_to_log(&spec);

    insta::assert_snapshot!(log, @r"
    flush
    _SYSTEMD_UNIT=a.service
    _SYSTEMD_UNIT=b.service
    _BOOT_ID=b1
    _BOOT_ID=b2
    PRIORITY=0
    PRIORITY=1
    PRIORITY=2
    OR
    _EXE=/usr/bin/x
    _BOOT_ID=b1
    _BOOT_ID=b2
    PRIORITY=0
    PRIORITY=1
    PRIORITY=2
    ");
    assert_eq!(report.groups, 2);
    assert_eq!(report.applied, 13);
    assert_eq!(report.skipped, 0);
}

#[test]
fn no_disjunction_before_first_or_after_last_group() {
    let spec = FilterSpec::new()
        .with_kernel_messages(true)
        .with_user_units(["u.service"]);
    let store = MemoryStore::new();
    let mut journal = store.open_journal();
    compile(&spec, &mut journal);
    let log = store.match_log();

    assert_eq!(log.first(), Some(&MatchCall::Flush));
    assert_ne!(log.get(1), Some(&MatchCall::Disjunction));
    assert_ne!(log.last(), Some(&MatchCall::Disjunction));
    let disjunctions = log.iter().filter(|c| **c == MatchCall::Disjunction).count();
    assert_eq!(disjunctions, 1);
}

#[test]
fn recompiling_flushes_previous_clauses() {
    let store = MemoryStore::from_records(vec![
        Record::new(1, 1).with_field(fields::SYSTEMD_UNIT, "a.service"),
        Record::new(2, 2).with_field(fields::SYSTEMD_UNIT, "b.service"),
    ]);
    let mut journal = store.open_journal();
    compile(&FilterSpec::new().with_system_units(["a.service"]), &mut journal);
    compile(&FilterSpec::new().with_system_units(["b.service"]), &mut journal);

    journal.seek_head().expect("seek head");
    assert!(journal.next().expect("next"));
    assert_eq!(
        journal.field(fields::SYSTEMD_UNIT).expect("field").as_deref(),
        Some("b.service")
    );
    assert!(!journal.next().expect("next"));
}

#[test]
fn failing_clause_is_skipped_and_rest_applies() {
    let store = MemoryStore::new();
    store.set_faults(Faults {
        failing_matches: vec![(fields::SYSTEMD_UNIT.to_string(), "bad.service".to_string())],
        ..Faults::default()
    });
    let mut journal = store.open_journal();
    let spec = FilterSpec::new().with_system_units(["bad.service", "good.service"]);
    let report = compile(&spec, &mut journal);

    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 1);
    assert!(store.match_log().contains(&MatchCall::Match {
        field: fields::SYSTEMD_UNIT.to_string(),
        value: "good.service".to_string(),
    }));
}

//! Tests for the in-memory journal store.

use super::*;

fn record(seq: u64, unit: &str, transport: &str) -> Record {
    Record::new(1_700_000_000_000_000 + seq, seq * 10)
        .with_field(fields::BOOT_ID, "boot-a")
        .with_field(fields::SYSTEMD_UNIT, unit)
        .with_field(fields::TRANSPORT, transport)
        .with_field(fields::MESSAGE, format!("message {}", seq))
}

fn store_with(n: u64) -> MemoryStore {
    MemoryStore::from_records((1..=n).map(|i| record(i, &format!("u{}.service", i % 3), "journal")))
}

fn collect_forward(journal: &mut MemoryJournal) -> Vec<String> {
    let mut messages = Vec::new();
    while journal.next().expect("next") {
        messages.push(
            journal
                .field(fields::MESSAGE)
                .expect("field")
                .expect("message present"),
        );
    }
    messages
}

// ===== Positioning =====

#[test]
fn next_after_seek_head_walks_all_entries() {
    let store = store_with(4);
    let mut journal = store.open_journal();
    journal.seek_head().expect("seek head");

    assert_eq!(
        collect_forward(&mut journal),
        vec!["message 1", "message 2", "message 3", "message 4"]
    );
}

#[test]
fn previous_after_seek_head_reports_no_more() {
    let store = store_with(2);
    let mut journal = store.open_journal();
    journal.seek_head().expect("seek head");
    assert!(!journal.previous().expect("previous"));
}

#[test]
fn previous_after_seek_tail_returns_newest_first() {
    let store = store_with(3);
    let mut journal = store.open_journal();
    journal.seek_tail().expect("seek tail");
    assert!(journal.previous().expect("previous"));
    assert_eq!(
        journal.field(fields::MESSAGE).expect("field").as_deref(),
        Some("message 3")
    );
    assert!(!journal.next().expect("next"), "nothing after the tail");
}

#[test]
fn field_without_current_entry_fails() {
    let store = store_with(1);
    let journal = store.open_journal();
    let err = journal.field(fields::MESSAGE).expect_err("no current entry");
    assert_eq!(err.errno(), EADDRNOTAVAIL);
}

#[test]
fn seek_cursor_then_next_lands_on_cursor_entry() {
    let store = store_with(5);
    let mut journal = store.open_journal();
    journal.seek_head().expect("seek head");
    journal.next().expect("next");
    journal.next().expect("next");
    let cursor = journal.cursor().expect("cursor");

    let mut other = store.open_journal();
    other.seek_cursor(&cursor).expect("seek cursor");
    assert!(other.next().expect("next"));
    assert!(other.test_cursor(&cursor).expect("test cursor"));
}

#[test]
fn seek_cursor_then_previous_lands_on_cursor_entry() {
    let store = store_with(5);
    let mut journal = store.open_journal();
    journal.seek_tail().expect("seek tail");
    journal.previous().expect("previous");
    journal.previous().expect("previous");
    let cursor = journal.cursor().expect("cursor");

    journal.seek_cursor(&cursor).expect("seek cursor");
    assert!(journal.previous().expect("previous"));
    assert!(journal.test_cursor(&cursor).expect("test cursor"));
}

#[test]
fn skewed_seek_cursor_lands_on_wrong_entry() {
    let store = store_with(5);
    let mut journal = store.open_journal();
    journal.seek_head().expect("seek head");
    journal.next().expect("next");
    journal.next().expect("next");
    let cursor = journal.cursor().expect("cursor");

    store.set_faults(Faults {
        seek_cursor_skew: 2,
        ..Faults::default()
    });
    journal.seek_cursor(&cursor).expect("seek cursor");
    journal.next().expect("next");
    assert!(!journal.test_cursor(&cursor).expect("test cursor"));
}

#[test]
fn seek_cursor_rejects_foreign_token() {
    let store = store_with(1);
    let mut journal = store.open_journal();
    let foreign = Cursor::new("not-a-cursor").expect("non-empty");
    let err = journal.seek_cursor(&foreign).expect_err("unparsable cursor");
    assert_eq!(err.errno(), EINVAL);
}

// ===== Matching grammar =====

#[test]
fn repeated_field_matches_are_ored() {
    let store = store_with(6);
    let mut journal = store.open_journal();
    journal.add_match(fields::SYSTEMD_UNIT, "u1.service").expect("match");
    journal.add_match(fields::SYSTEMD_UNIT, "u2.service").expect("match");
    journal.seek_head().expect("seek head");

    assert_eq!(
        collect_forward(&mut journal),
        vec!["message 1", "message 2", "message 4", "message 5"]
    );
}

#[test]
fn different_fields_in_one_group_are_anded() {
    let store = MemoryStore::from_records(vec![
        record(1, "a.service", "journal"),
        record(2, "a.service", "stdout"),
        record(3, "b.service", "stdout"),
    ]);
    let mut journal = store.open_journal();
    journal.add_match(fields::SYSTEMD_UNIT, "a.service").expect("match");
    journal.add_match(fields::TRANSPORT, "stdout").expect("match");
    journal.seek_head().expect("seek head");

    assert_eq!(collect_forward(&mut journal), vec!["message 2"]);
}

#[test]
fn disjunction_ors_groups() {
    let store = MemoryStore::from_records(vec![
        record(1, "a.service", "journal"),
        record(2, "b.service", "kernel"),
        record(3, "c.service", "stdout"),
    ]);
    let mut journal = store.open_journal();
    journal.add_match(fields::SYSTEMD_UNIT, "a.service").expect("match");
    journal.add_disjunction().expect("disjunction");
    journal.add_match(fields::TRANSPORT, "kernel").expect("match");
    journal.seek_head().expect("seek head");

    assert_eq!(collect_forward(&mut journal), vec!["message 1", "message 2"]);
}

#[test]
fn conjunction_ands_disjunctions() {
    let store = MemoryStore::from_records(vec![
        record(1, "a.service", "journal"),
        record(2, "a.service", "kernel"),
        record(3, "b.service", "kernel"),
    ]);
    let mut journal = store.open_journal();
    journal.add_match(fields::SYSTEMD_UNIT, "a.service").expect("match");
    journal.add_conjunction().expect("conjunction");
    journal.add_match(fields::TRANSPORT, "kernel").expect("match");
    journal.seek_head().expect("seek head");

    assert_eq!(collect_forward(&mut journal), vec!["message 2"]);
}

#[test]
fn leading_disjunction_is_a_no_op() {
    let store = store_with(3);
    let mut journal = store.open_journal();
    journal.add_disjunction().expect("disjunction");
    journal.seek_head().expect("seek head");
    assert_eq!(collect_forward(&mut journal).len(), 3);
}

#[test]
fn flush_matches_restores_everything() {
    let store = store_with(3);
    let mut journal = store.open_journal();
    journal.add_match(fields::SYSTEMD_UNIT, "nope").expect("match");
    journal.flush_matches();
    journal.seek_head().expect("seek head");
    assert_eq!(collect_forward(&mut journal).len(), 3);
}

#[test]
fn match_log_records_calls_in_order() {
    let store = store_with(1);
    let mut journal = store.open_journal();
    journal.flush_matches();
    journal.add_match("A", "1").expect("match");
    journal.add_disjunction().expect("disjunction");

    assert_eq!(
        store.match_log(),
        vec![
            MatchCall::Flush,
            MatchCall::Match {
                field: "A".to_string(),
                value: "1".to_string()
            },
            MatchCall::Disjunction,
        ]
    );
}

#[test]
fn failing_match_is_reported_and_not_applied() {
    let store = store_with(3);
    store.set_faults(Faults {
        failing_matches: vec![(fields::SYSTEMD_UNIT.to_string(), "u1.service".to_string())],
        ..Faults::default()
    });
    let mut journal = store.open_journal();
    let err = journal
        .add_match(fields::SYSTEMD_UNIT, "u1.service")
        .expect_err("injected failure");
    assert_eq!(err.status(), -EIO);

    journal.seek_head().expect("seek head");
    assert_eq!(collect_forward(&mut journal).len(), 3);
}

// ===== Store-level behavior =====

#[test]
fn unique_values_ignores_matches_and_sorts() {
    let store = store_with(6);
    let mut journal = store.open_journal();
    journal.add_match(fields::SYSTEMD_UNIT, "u1.service").expect("match");
    let units = journal.unique_values(fields::SYSTEMD_UNIT).expect("unique");
    assert_eq!(units, vec!["u0.service", "u1.service", "u2.service"]);
}

#[test]
fn append_notifies_subscribers() {
    let store = store_with(1);
    let listener = store.subscribe().expect("memory store supports updates");
    assert!(!listener.drain());
    store.append(record(2, "x.service", "journal"));
    assert!(listener.drain());
}

#[test]
fn closed_store_fails_to_open() {
    let store = store_with(1);
    store.close();
    assert!(matches!(store.open(), Err(ProviderError::Unavailable(_))));
}

#[test]
fn current_boot_id_is_boot_of_newest_record() {
    let store = MemoryStore::from_records(vec![
        Record::new(1, 1).with_field(fields::BOOT_ID, "old"),
        Record::new(2, 1).with_field(fields::BOOT_ID, "new"),
    ]);
    assert_eq!(store.current_boot_id().map(|b| b.to_string()), Some("new".to_string()));
}

#[test]
fn step_failure_after_limit() {
    let store = store_with(5);
    store.set_faults(Faults {
        fail_steps_after: Some(2),
        ..Faults::default()
    });
    let mut journal = store.open_journal();
    journal.seek_head().expect("seek head");
    assert!(journal.next().expect("first step"));
    assert!(journal.next().expect("second step"));
    assert!(journal.next().is_err(), "third step should fail");
}

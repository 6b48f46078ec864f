//! Shared fixtures for integration tests.

#![allow(dead_code)]

use jlv::model::LogEntry;
use jlv::source::{fields, MemoryStore, Record};
use jlv::state::JournalView;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::Level;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

pub const BASE_USEC: u64 = 1_700_000_000_000_000;

/// Record for a userspace entry.
pub fn unit_record(clock: u64, boot: &str, unit: &str, priority: u8) -> Record {
    Record::new(BASE_USEC + clock * 1_000, clock)
        .with_field(fields::BOOT_ID, boot)
        .with_field(fields::SYSTEMD_UNIT, unit)
        .with_field(fields::TRANSPORT, "journal")
        .with_field(fields::PRIORITY, priority.to_string())
        .with_field(fields::MESSAGE, format!("{} says hello at {}", unit, clock))
}

/// Record for a kernel entry (no unit).
pub fn kernel_record(clock: u64, boot: &str, priority: u8) -> Record {
    Record::new(BASE_USEC + clock * 1_000, clock)
        .with_field(fields::BOOT_ID, boot)
        .with_field(fields::TRANSPORT, "kernel")
        .with_field(fields::PRIORITY, priority.to_string())
        .with_field(fields::MESSAGE, format!("kernel event {}", clock))
}

/// Store with `boots` boots; each boot logs three rounds over `units` units
/// (`unit_1` ..), each round followed by one kernel message. Executables
/// cycle over `/usr/lib/exe_0` .. `/usr/lib/exe_3`.
pub fn boots_and_units(boots: usize, units: usize) -> MemoryStore {
    let mut records = Vec::new();
    let mut clock = 0u64;
    for b in 1..=boots {
        let boot = format!("boot_{}", b);
        for _round in 0..3 {
            for u in 1..=units {
                clock += 1;
                records.push(
                    unit_record(clock, &boot, &format!("unit_{}", u), (clock % 8) as u8)
                        .with_field(fields::EXE, format!("/usr/lib/exe_{}", u % 4)),
                );
            }
            clock += 1;
            records.push(kernel_record(clock, &boot, (clock % 8) as u8));
        }
    }
    MemoryStore::from_records(records)
}

/// Store of `n` userspace entries with messages `e0001`, `e0002`, ...
pub fn numbered(n: u64) -> MemoryStore {
    MemoryStore::from_records((1..=n).map(|i| {
        Record::new(BASE_USEC + i, i)
            .with_field(fields::BOOT_ID, "boot_1")
            .with_field(fields::TRANSPORT, "journal")
            .with_field(fields::MESSAGE, format!("e{:04}", i))
    }))
}

/// Fetch until the view has nothing more to add.
pub fn drain(view: &JournalView) {
    while view.can_fetch_more() {
        if view.fetch_more().is_empty() {
            break;
        }
    }
}

pub fn messages(entries: &[LogEntry]) -> Vec<String> {
    entries.iter().map(|e| e.message().to_string()).collect()
}

// ===== Log capture =====

/// Collects events so tests can count warnings and errors.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl EventLog {
    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.events
            .lock()
            .expect("event log lock")
            .iter()
            .filter(|(l, m)| *l == level && m.contains(needle))
            .count()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for EventLog {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events
            .lock()
            .expect("event log lock")
            .push((*event.metadata().level(), visitor.0));
    }
}

/// Run `f` with a thread-local subscriber that records every event.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, EventLog) {
    let log = EventLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, log)
}

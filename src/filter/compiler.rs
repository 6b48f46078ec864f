//! Filter compiler.
//!
//! Maps a [`FilterSpec`] onto the store's fixed match grammar. The journal has no
//! global AND spanning OR-ed groups, so every group restates the boot and
//! priority constraints:
//!
//! ```text
//! (kernel-transport ∧ boots ∧ prio) ∨ (system-units ∧ boots ∧ prio) ∨ (user-units ∧ …) ∨ (exes ∧ …)
//! ```
//!
//! Compilation is split into a pure [`FilterPlan`] and [`FilterPlan::apply`],
//! which issues the calls and tolerates individual clause failures.

use crate::model::FilterSpec;
use crate::source::{fields, Journal};
use tracing::{debug, warn};

/// Which selector a clause group came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Kernel transports (plus userspace transports when nothing else narrows).
    Kernel,
    /// `_SYSTEMD_UNIT` allow-list.
    SystemUnits,
    /// `_SYSTEMD_USER_UNIT` allow-list.
    UserUnits,
    /// `_EXE` allow-list.
    Executables,
    /// Userspace transports only; used when only boot/priority constraints apply.
    Userspace,
}

/// One `field=value` match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Journal field name.
    pub field: &'static str,
    /// Exact value to match.
    pub value: String,
}

impl Term {
    fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// A group of terms; implicit AND across fields, OR within a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseGroup {
    /// Selector the group was built from.
    pub kind: GroupKind,
    /// Terms in the order they are added.
    pub terms: Vec<Term>,
}

/// Clause groups to be OR-ed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPlan {
    groups: Vec<ClauseGroup>,
}

/// Outcome of applying a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Clause groups in the plan.
    pub groups: usize,
    /// Match calls the store accepted.
    pub applied: usize,
    /// Match or disjunction calls that failed and were skipped.
    pub skipped: usize,
}

impl FilterPlan {
    /// Build the clause groups for `spec`.
    pub fn from_spec(spec: &FilterSpec) -> Self {
        let common = common_terms(spec);
        let mut groups = Vec::new();

        if spec.kernel_messages() {
            let mut transports: Vec<&str> = fields::KERNEL_TRANSPORTS.to_vec();
            if !spec.has_selectors() {
                transports.extend_from_slice(fields::USERSPACE_TRANSPORTS);
            }
            groups.push(selector_group(
                GroupKind::Kernel,
                fields::TRANSPORT,
                transports,
                &common,
            ));
        }

        let selectors = [
            (GroupKind::SystemUnits, fields::SYSTEMD_UNIT, spec.system_units()),
            (GroupKind::UserUnits, fields::SYSTEMD_USER_UNIT, spec.user_units()),
            (GroupKind::Executables, fields::EXE, spec.executables()),
        ];
        for (kind, field, values) in selectors {
            if !values.is_empty() {
                groups.push(selector_group(kind, field, values, &common));
            }
        }

        if groups.is_empty() && spec.has_common_constraints() {
            groups.push(selector_group(
                GroupKind::Userspace,
                fields::TRANSPORT,
                fields::USERSPACE_TRANSPORTS.iter().copied(),
                &common,
            ));
        }

        Self { groups }
    }

    /// Groups in application order.
    pub fn groups(&self) -> &[ClauseGroup] {
        &self.groups
    }

    /// True when the plan applies no clauses, i.e. the store yields everything.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Replace all matches on `journal` with this plan.
    ///
    /// A failing match call is logged and skipped; the remaining clauses still apply.
    pub fn apply(&self, journal: &mut dyn Journal) -> ApplyReport {
        journal.flush_matches();
        let mut report = ApplyReport {
            groups: self.groups.len(),
            ..ApplyReport::default()
        };

        for (index, group) in self.groups.iter().enumerate() {
            if index > 0 {
                if let Err(error) = journal.add_disjunction() {
                    warn!(%error, group = ?group.kind, "Failed to add disjunction");
                    report.skipped += 1;
                }
            }
            for term in &group.terms {
                match journal.add_match(term.field, &term.value) {
                    Ok(()) => report.applied += 1,
                    Err(error) => {
                        warn!(
                            field = term.field,
                            value = %term.value,
                            %error,
                            "Skipping filter clause"
                        );
                        report.skipped += 1;
                    }
                }
            }
        }

        debug!(?report, "Filter applied");
        report
    }
}

/// Compile `spec` and apply it to `journal`.
pub fn compile(spec: &FilterSpec, journal: &mut dyn Journal) -> ApplyReport {
    FilterPlan::from_spec(spec).apply(journal)
}

fn common_terms(spec: &FilterSpec) -> Vec<Term> {
    let boots = spec
        .boots()
        .iter()
        .map(|boot| Term::new(fields::BOOT_ID, boot.as_str()));
    let priorities = spec
        .priority_ceiling()
        .into_iter()
        .flat_map(|ceiling| ceiling.at_or_above())
        .map(|p| Term::new(fields::PRIORITY, p.level().to_string()));
    boots.chain(priorities).collect()
}

fn selector_group<S: AsRef<str>>(
    kind: GroupKind,
    field: &'static str,
    values: impl IntoIterator<Item = S>,
    common: &[Term],
) -> ClauseGroup {
    let mut terms: Vec<Term> = values
        .into_iter()
        .map(|v| Term::new(field, v.as_ref()))
        .collect();
    terms.extend_from_slice(common);
    ClauseGroup { kind, terms }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;

//! Filter specification value type.

use crate::model::{BootId, Priority};

/// Describes which journal entries the view should show.
///
/// Replaced wholesale on every change; there is no partial update.
/// Empty lists mean "no constraint", not "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    boots: Vec<BootId>,
    priority_ceiling: Option<Priority>,
    system_units: Vec<String>,
    user_units: Vec<String>,
    executables: Vec<String>,
    kernel_messages: bool,
}

impl FilterSpec {
    /// Empty filter: every entry matches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only keep entries from these boots.
    pub fn with_boots(mut self, boots: impl IntoIterator<Item = BootId>) -> Self {
        self.boots = boots.into_iter().collect();
        self
    }

    /// Only keep entries with priority level `<= ceiling`.
    pub fn with_priority_ceiling(mut self, ceiling: Option<Priority>) -> Self {
        self.priority_ceiling = ceiling;
        self
    }

    /// Only keep entries from these system units (`_SYSTEMD_UNIT`).
    pub fn with_system_units<S: Into<String>>(mut self, units: impl IntoIterator<Item = S>) -> Self {
        self.system_units = units.into_iter().map(Into::into).collect();
        self
    }

    /// Only keep entries from these user units (`_SYSTEMD_USER_UNIT`).
    pub fn with_user_units<S: Into<String>>(mut self, units: impl IntoIterator<Item = S>) -> Self {
        self.user_units = units.into_iter().map(Into::into).collect();
        self
    }

    /// Only keep entries from these executable paths (`_EXE`).
    pub fn with_executables<S: Into<String>>(mut self, exes: impl IntoIterator<Item = S>) -> Self {
        self.executables = exes.into_iter().map(Into::into).collect();
        self
    }

    /// Include kernel-transport entries.
    pub fn with_kernel_messages(mut self, enabled: bool) -> Self {
        self.kernel_messages = enabled;
        self
    }

    /// Boot allow-list.
    pub fn boots(&self) -> &[BootId] {
        &self.boots
    }

    /// Highest (least severe) level kept, if any.
    pub fn priority_ceiling(&self) -> Option<Priority> {
        self.priority_ceiling
    }

    /// System unit allow-list.
    pub fn system_units(&self) -> &[String] {
        &self.system_units
    }

    /// User unit allow-list.
    pub fn user_units(&self) -> &[String] {
        &self.user_units
    }

    /// Executable path allow-list.
    pub fn executables(&self) -> &[String] {
        &self.executables
    }

    /// Whether kernel messages are included.
    pub fn kernel_messages(&self) -> bool {
        self.kernel_messages
    }

    /// True when any unit or executable allow-list is non-empty.
    pub fn has_selectors(&self) -> bool {
        !self.system_units.is_empty() || !self.user_units.is_empty() || !self.executables.is_empty()
    }

    /// True when a boot or priority constraint applies.
    pub fn has_common_constraints(&self) -> bool {
        !self.boots.is_empty() || self.priority_ceiling.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_selects_nothing() {
        let spec = FilterSpec::new();
        assert!(!spec.has_selectors());
        assert!(!spec.has_common_constraints());
        assert!(!spec.kernel_messages());
    }

    #[test]
    fn specs_compare_by_value() {
        let a = FilterSpec::new().with_system_units(["a.service"]);
        let b = FilterSpec::new().with_system_units(vec!["a.service".to_string()]);
        assert_eq!(a, b);
        assert_ne!(a, b.with_kernel_messages(true));
    }

    #[test]
    fn priority_ceiling_is_a_common_constraint() {
        let spec = FilterSpec::new().with_priority_ceiling(Some(Priority::Error));
        assert!(spec.has_common_constraints());
        assert!(!spec.has_selectors());
    }
}

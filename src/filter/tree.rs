//! Filter selection tree.
//!
//! The selection UI shows a tree of categories (boots, priority, kernel,
//! units, executables) whose leaves can be checked. Nodes live in an arena
//! and refer to each other by [`NodeId`]; the parent link is an index, so
//! there are no reference cycles.
//!
//! Repopulating a category rebuilds the arena. Node ids from before a
//! [`FilterTree::set_values`] or [`FilterTree::populate`] call are invalid afterwards.

use crate::model::error::StoreError;
use crate::model::{BootId, FilterSpec, Priority};
use crate::source::{fields, Journal};
use std::collections::BTreeSet;
use tracing::debug;

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Top-level grouping of selectable values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Boot ids (`_BOOT_ID`).
    Boot,
    /// Priority ceiling; exclusive.
    Priority,
    /// Single kernel-messages toggle.
    Kernel,
    /// System units.
    SystemUnit,
    /// User units.
    UserUnit,
    /// Executable paths.
    Executable,
}

impl Category {
    /// Categories in display order.
    pub const ALL: [Category; 6] = [
        Category::Boot,
        Category::Priority,
        Category::Kernel,
        Category::SystemUnit,
        Category::UserUnit,
        Category::Executable,
    ];

    /// Store field the category's values are read from, if any.
    pub fn field(self) -> Option<&'static str> {
        match self {
            Category::Boot => Some(fields::BOOT_ID),
            Category::SystemUnit => Some(fields::SYSTEMD_UNIT),
            Category::UserUnit => Some(fields::SYSTEMD_USER_UNIT),
            Category::Executable => Some(fields::EXE),
            Category::Priority | Category::Kernel => None,
        }
    }

    /// At most one child may be checked.
    fn is_exclusive(self) -> bool {
        matches!(self, Category::Priority)
    }
}

/// What a node represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The single root; parent of every category.
    Root,
    /// A category header.
    Category(Category),
    /// A selectable value.
    Value {
        /// Category the value belongs to.
        category: Category,
        /// Field value, or the level digit for priorities.
        value: String,
    },
}

/// Aggregate check state of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// No child checked.
    Unchecked,
    /// Some children checked.
    Partial,
    /// Every child checked.
    Checked,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    checked: bool,
}

/// Arena-backed selection tree.
#[derive(Debug, Clone)]
pub struct FilterTree {
    nodes: Vec<Node>,
}

const KERNEL_VALUE: &str = "kernel";

impl Default for FilterTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterTree {
    /// Tree with fixed priority and kernel leaves and empty store-backed categories.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
        };
        tree.rebuild(|_| Vec::new(), &BTreeSet::new());
        tree
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Kind of `id`, or `None` for a foreign id.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    /// Parent of `id`; `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Children of `id` in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Whether `id` is checked.
    pub fn is_checked(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.checked)
    }

    /// Header node of `category`.
    pub fn category(&self, category: Category) -> NodeId {
        let index = Category::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or_default();
        self.children(self.root())[index]
    }

    /// Find the leaf holding `value` under `category`.
    pub fn find(&self, category: Category, value: &str) -> Option<NodeId> {
        self.children(self.category(category))
            .iter()
            .copied()
            .find(|id| matches!(self.kind(*id), Some(NodeKind::Value { value: v, .. }) if v == value))
    }

    /// Values currently offered under `category`.
    pub fn values(&self, category: Category) -> Vec<&str> {
        self.children(self.category(category))
            .iter()
            .filter_map(|id| match self.kind(*id) {
                Some(NodeKind::Value { value, .. }) => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Check or uncheck a node.
    ///
    /// Checking a category node applies to all of its leaves (except for
    /// exclusive categories, where it is ignored). Checking a leaf of an
    /// exclusive category unchecks its siblings. Returns whether anything changed.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> bool {
        let Some(kind) = self.kind(id).cloned() else {
            return false;
        };
        match kind {
            NodeKind::Root => false,
            NodeKind::Category(category) => {
                if category.is_exclusive() {
                    return false;
                }
                let children = self.children(id).to_vec();
                let mut changed = false;
                for child in children {
                    changed |= self.set_leaf(child, checked);
                }
                changed
            }
            NodeKind::Value { category, .. } => {
                let mut changed = false;
                if checked && category.is_exclusive() {
                    let siblings = self.children(self.category(category)).to_vec();
                    for sibling in siblings.into_iter().filter(|s| *s != id) {
                        changed |= self.set_leaf(sibling, false);
                    }
                }
                changed | self.set_leaf(id, checked)
            }
        }
    }

    fn set_leaf(&mut self, id: NodeId, checked: bool) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) if node.checked != checked => {
                node.checked = checked;
                true
            }
            _ => false,
        }
    }

    /// Aggregate state of the leaves under `category`.
    pub fn check_state(&self, category: Category) -> CheckState {
        let children = self.children(self.category(category));
        let checked = children.iter().filter(|id| self.is_checked(**id)).count();
        match checked {
            0 => CheckState::Unchecked,
            n if n == children.len() => CheckState::Checked,
            _ => CheckState::Partial,
        }
    }

    /// Replace the leaves of a store-backed category, keeping checks on values
    /// that are still present.
    pub fn set_values(&mut self, category: Category, values: Vec<String>) {
        if category.field().is_none() {
            return;
        }
        let checked = self.checked_values();
        let mut current: Vec<(Category, Vec<String>)> = Category::ALL
            .iter()
            .filter(|c| c.field().is_some())
            .map(|c| (*c, self.values(*c).into_iter().map(str::to_string).collect()))
            .collect();
        for (c, v) in current.iter_mut() {
            if *c == category {
                *v = values.clone();
            }
        }
        self.rebuild(
            |c| {
                current
                    .iter()
                    .find(|(cat, _)| *cat == c)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            },
            &checked,
        );
    }

    /// Read the distinct values of every store-backed category from `journal`.
    ///
    /// # Errors
    ///
    /// Returns the first `StoreError` from a unique-value query; the tree is left unchanged.
    pub fn populate(&mut self, journal: &mut dyn Journal) -> Result<(), StoreError> {
        let mut loaded = Vec::new();
        for category in Category::ALL {
            if let Some(field) = category.field() {
                loaded.push((category, journal.unique_values(field)?));
            }
        }
        for (category, values) in loaded {
            debug!(?category, count = values.len(), "Populating filter category");
            self.set_values(category, values);
        }
        Ok(())
    }

    /// Check the leaf for `boot`, if present.
    pub fn check_boot(&mut self, boot: &BootId) -> bool {
        match self.find(Category::Boot, boot.as_str()) {
            Some(id) => self.set_checked(id, true),
            None => false,
        }
    }

    /// Check the leaves named by `spec`. Values the tree does not offer are ignored.
    pub fn select(&mut self, spec: &FilterSpec) {
        let mut wanted: Vec<(Category, String)> = Vec::new();
        wanted.extend(spec.boots().iter().map(|b| (Category::Boot, b.as_str().to_string())));
        if let Some(ceiling) = spec.priority_ceiling() {
            wanted.push((Category::Priority, ceiling.level().to_string()));
        }
        if spec.kernel_messages() {
            wanted.push((Category::Kernel, KERNEL_VALUE.to_string()));
        }
        wanted.extend(spec.system_units().iter().map(|u| (Category::SystemUnit, u.clone())));
        wanted.extend(spec.user_units().iter().map(|u| (Category::UserUnit, u.clone())));
        wanted.extend(spec.executables().iter().map(|e| (Category::Executable, e.clone())));

        for (category, value) in wanted {
            if let Some(id) = self.find(category, &value) {
                self.set_checked(id, true);
            }
        }
    }

    /// Filter described by the checked leaves.
    pub fn filter_spec(&self) -> FilterSpec {
        let checked = |category| -> Vec<String> {
            self.children(self.category(category))
                .iter()
                .filter(|id| self.is_checked(**id))
                .filter_map(|id| match self.kind(*id) {
                    Some(NodeKind::Value { value, .. }) => Some(value.clone()),
                    _ => None,
                })
                .collect()
        };
        let boots = checked(Category::Boot)
            .into_iter()
            .filter_map(|b| BootId::new(b).ok());
        let ceiling = checked(Category::Priority)
            .first()
            .and_then(|p| Priority::parse_field(p));

        FilterSpec::new()
            .with_boots(boots)
            .with_priority_ceiling(ceiling)
            .with_kernel_messages(!checked(Category::Kernel).is_empty())
            .with_system_units(checked(Category::SystemUnit))
            .with_user_units(checked(Category::UserUnit))
            .with_executables(checked(Category::Executable))
    }

    fn checked_values(&self) -> BTreeSet<(Category, String)> {
        self.nodes
            .iter()
            .filter(|n| n.checked)
            .filter_map(|n| match &n.kind {
                NodeKind::Value { category, value } => Some((*category, value.clone())),
                _ => None,
            })
            .collect()
    }

    fn rebuild(
        &mut self,
        store_values: impl Fn(Category) -> Vec<String>,
        checked: &BTreeSet<(Category, String)>,
    ) {
        let mut nodes = vec![Node {
            kind: NodeKind::Root,
            parent: None,
            children: Vec::new(),
            checked: false,
        }];
        for category in Category::ALL {
            let category_id = NodeId(nodes.len());
            nodes.push(Node {
                kind: NodeKind::Category(category),
                parent: Some(NodeId(0)),
                children: Vec::new(),
                checked: false,
            });
            nodes[0].children.push(category_id);

            let values: Vec<String> = match category {
                Category::Priority => Priority::ALL.iter().map(|p| p.level().to_string()).collect(),
                Category::Kernel => vec![KERNEL_VALUE.to_string()],
                _ => store_values(category),
            };
            for value in values {
                let id = NodeId(nodes.len());
                let is_checked = checked.contains(&(category, value.clone()));
                nodes.push(Node {
                    kind: NodeKind::Value { category, value },
                    parent: Some(category_id),
                    children: Vec::new(),
                    checked: is_checked,
                });
                nodes[category_id.0].children.push(id);
            }
        }
        self.nodes = nodes;
    }
}

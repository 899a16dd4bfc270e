use crate::history::{DetailType, HistorySnapshot, HistoryStack};
use crate::tree::SectionTree;
use ratebook_protocol::{ResourceReference, SectionNode, WorkDetails};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Collapse when the node is already expanded. Programmatic navigation
    /// turns this off to guarantee an expanded node.
    pub toggle: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self { toggle: true }
    }
}

impl ExpandOptions {
    pub fn ensure_expanded() -> Self {
        Self { toggle: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    pub record_history: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            record_history: true,
        }
    }
}

impl SelectOptions {
    pub fn replay() -> Self {
        Self {
            record_history: false,
        }
    }
}

/// The single mutable session state, owned by the navigator.
#[derive(Debug, Default)]
pub(crate) struct NavigationState {
    pub current_database: Option<String>,
    pub tree: SectionTree,
    pub expanded: BTreeSet<String>,
    pub selected_work: Option<WorkDetails>,
    pub selected_resource: Option<ResourceReference>,
    pub breadcrumbs: Vec<String>,
    pub current_path: Vec<String>,
    pub loading: bool,
    pub detail_loading: bool,
    pub error: Option<String>,
    pub detail_error: Option<String>,
    pub detail_type: Option<DetailType>,
    pub tree_revision: u64,
    pub history: HistoryStack,
}

impl NavigationState {
    pub fn bump_revision(&mut self) {
        self.tree_revision += 1;
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            current_database: self.current_database.clone(),
            sections: self.tree.roots().clone(),
            expanded: self.expanded.clone(),
            selected_work: self.selected_work.clone(),
            selected_resource: self.selected_resource.clone(),
            breadcrumbs: self.breadcrumbs.clone(),
            current_path: self.current_path.clone(),
            loading: self.loading,
            detail_loading: self.detail_loading,
            error: self.error.clone(),
            detail_error: self.detail_error.clone(),
            detail_type: self.detail_type,
            tree_revision: self.tree_revision,
            history: self.history.snapshot(),
        }
    }
}

/// Immutable view of the navigation state handed to consumers.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationSnapshot {
    pub current_database: Option<String>,
    /// Shared with the navigator until its next merge
    pub sections: Arc<Vec<SectionNode>>,
    pub expanded: BTreeSet<String>,
    pub selected_work: Option<WorkDetails>,
    pub selected_resource: Option<ResourceReference>,
    pub breadcrumbs: Vec<String>,
    pub current_path: Vec<String>,
    pub loading: bool,
    pub detail_loading: bool,
    pub error: Option<String>,
    pub detail_error: Option<String>,
    pub detail_type: Option<DetailType>,
    pub tree_revision: u64,
    pub history: HistorySnapshot,
}

impl NavigationSnapshot {
    pub fn is_expanded(&self, code: &str) -> bool {
        self.expanded.contains(code)
    }
}

//! Shared records, collaborator contract and configuration for the catalog browser.
//!
//! Records mirror what the backing query engine produces once parsed into plain
//! data: a forest of sections holding works, works referencing resources, and
//! resources that may live in a secondary pricing database.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod source;

pub use config::{
    CatalogConfig, CatalogMapping, CategoryConfig, ConfigError, DatabaseInfo, SuggestConfig,
    SuggestionBehavior,
};
pub use source::{CatalogSource, SourceError, SourceResult};

/// A work as listed under its section.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkSummary {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub measure_unit: String,
    #[serde(default)]
    pub section_path: Vec<String>,
}

impl WorkSummary {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }
}

/// Node of the section hierarchy. `children` and `works` stay empty until the
/// node is expanded.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SectionNode {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub depth: usize,
    /// Ancestor codes, including this node.
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub children: Vec<SectionNode>,
    #[serde(default)]
    pub works: Vec<WorkSummary>,
    #[serde(default)]
    pub has_children: bool,
}

impl SectionNode {
    pub fn new(code: impl Into<String>, name: impl Into<String>, depth: usize) -> Self {
        let code = code.into();
        Self {
            path: vec![code.clone()],
            code,
            name: name.into(),
            depth,
            ..Self::default()
        }
    }

    /// Copy of the node without its nested children and works.
    pub fn shallow(&self) -> Self {
        Self {
            code: self.code.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
            depth: self.depth,
            path: self.path.clone(),
            children: Vec::new(),
            works: Vec::new(),
            has_children: self.has_children || !self.children.is_empty() || !self.works.is_empty(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub cost: Option<f64>,
    pub opt_cost: Option<f64>,
}

/// A resource consumed by a work, optionally linked to its catalog entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLine {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub measure_unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_database: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catalog_section_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catalog_section_names: Vec<String>,
}

impl ResourceLine {
    /// Attach catalog pricing and location, preferring the catalog's naming.
    #[must_use]
    pub fn with_catalog(mut self, reference: &ResourceReference) -> Self {
        if !reference.name.is_empty() {
            self.name = reference.name.clone();
        }
        if !reference.measure_unit.is_empty() {
            self.measure_unit = reference.measure_unit.clone();
        }
        self.price = reference.price;
        self.catalog_database = Some(reference.database.clone());
        self.catalog_section_path = reference.section_path.clone();
        self.catalog_section_names = reference.section_names.clone();
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct NormReference {
    pub nr: String,
    pub sp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkDetails {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub end_name: String,
    #[serde(default)]
    pub measure_unit: String,
    #[serde(default)]
    pub content: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ResourceLine>,
    #[serde(default)]
    pub references: Vec<NormReference>,
    #[serde(default)]
    pub section_path: Vec<String>,
    /// Display names parallel to `section_path`.
    #[serde(default)]
    pub section_names: Vec<String>,
}

impl WorkDetails {
    pub fn summary(&self) -> WorkSummary {
        WorkSummary {
            code: self.code.clone(),
            name: self.name.clone(),
            measure_unit: self.measure_unit.clone(),
            section_path: self.section_path.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct SectionRef {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Resource as resolved in the secondary database that owns its code prefix.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub measure_unit: String,
    pub database: String,
    #[serde(default)]
    pub sections: Vec<SectionRef>,
    #[serde(default)]
    pub section_path: Vec<String>,
    #[serde(default)]
    pub section_names: Vec<String>,
    #[serde(default)]
    pub price: Option<Price>,
}

/// Flat candidate record used by the suggestion engine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_unit: Option<String>,
    #[serde(default)]
    pub path_names: Vec<String>,
    #[serde(default)]
    pub path_codes: Vec<String>,
    #[serde(default)]
    pub depth: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HitResource {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub measure_unit: String,
}

/// One work matched by the literal full-text search.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub measure_unit: String,
    #[serde(default)]
    pub sections: Vec<SectionRef>,
    #[serde(default)]
    pub section_path: Vec<String>,
    #[serde(default)]
    pub section_names: Vec<String>,
    #[serde(default)]
    pub resources: Vec<HitResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    Section,
    Work,
    Resource,
}

impl SuggestionCategory {
    /// Categories in the order they consume the combined display budget.
    pub const PRIORITY: [SuggestionCategory; 3] = [Self::Section, Self::Work, Self::Resource];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Section => "section",
            Self::Work => "work",
            Self::Resource => "resource",
        }
    }
}

impl std::fmt::Display for SuggestionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination a suggestion or search hit resolves to.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationTarget {
    Section { database: String, path: Vec<String> },
    Work {
        database: String,
        code: String,
        section_path: Vec<String>,
    },
    Resource { code: String },
}

impl NavigationTarget {
    pub fn from_hit(database: &str, hit: &SearchHit) -> Self {
        Self::Work {
            database: database.to_string(),
            code: hit.code.clone(),
            section_path: hit.section_path.clone(),
        }
    }
}

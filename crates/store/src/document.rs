use ratebook_protocol::{NormReference, Price, ResourceLine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// On-disk catalog: every database as a nested section forest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseDocument {
    #[serde(default)]
    pub sections: Vec<SectionRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub children: Vec<SectionRecord>,
    #[serde(default)]
    pub works: Vec<WorkRecord>,
    /// Priced catalog entries (secondary databases only).
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecord {
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
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub end_name: String,
    #[serde(default)]
    pub measure_unit: String,
    #[serde(default)]
    pub price: Option<Price>,
}

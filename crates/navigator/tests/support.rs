#![allow(dead_code)]

use async_trait::async_trait;
use ratebook_protocol::{
    CatalogConfig, CatalogSource, IndexRecord, ResourceLine, ResourceReference, SearchHit,
    SectionNode, SourceError, SourceResult, WorkDetails, WorkSummary,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Two small databases: `gesn` (S1 > S1.1) and `gesnr` (R1).
#[derive(Default)]
pub struct StubCatalog {
    sections: HashMap<String, Vec<SectionNode>>,
    children: HashMap<(String, String), Vec<SectionNode>>,
    works: HashMap<(String, String), WorkDetails>,
    resources: HashMap<String, ResourceReference>,
    failing: Mutex<HashSet<&'static str>>,
    pub section_calls: AtomicUsize,
    pub children_calls: AtomicUsize,
    pub work_calls: AtomicUsize,
}

fn section(code: &str, name: &str, path: &[&str]) -> SectionNode {
    SectionNode {
        path: path.iter().map(|c| (*c).to_string()).collect(),
        ..SectionNode::new(code, name, path.len() - 1)
    }
}

fn summary(code: &str, name: &str, section_path: &[&str]) -> WorkSummary {
    WorkSummary {
        code: code.to_string(),
        name: name.to_string(),
        measure_unit: "m3".to_string(),
        section_path: section_path.iter().map(|c| (*c).to_string()).collect(),
    }
}

fn details(code: &str, path: &[&str], names: &[&str]) -> WorkDetails {
    WorkDetails {
        code: code.to_string(),
        name: format!("Work {code}"),
        section_path: path.iter().map(|c| (*c).to_string()).collect(),
        section_names: names.iter().map(|n| (*n).to_string()).collect(),
        ..WorkDetails::default()
    }
}

fn key(database: &str, code: &str) -> (String, String) {
    (database.to_string(), code.to_string())
}

impl StubCatalog {
    pub fn new() -> Self {
        let mut catalog = Self::default();

        let mut s1_child = section("S1.1", "Child", &["S1", "S1.1"]);
        s1_child.has_children = true;
        let mut s1 = section("S1", "Root", &["S1"]);
        s1.children = vec![s1_child.clone()];
        s1.works = vec![summary("W1", "Foo", &["S1"])];
        let mut s1_leaf = s1_child.clone();
        s1_leaf.works = vec![summary("W2", "Bar", &["S1", "S1.1"])];

        catalog
            .sections
            .insert("gesn".to_string(), vec![section("S1", "Root", &["S1"])]);
        catalog
            .children
            .insert(key("gesn", "S1"), vec![s1, s1_child]);
        catalog.children.insert(key("gesn", "S1.1"), vec![s1_leaf]);

        let mut r1 = section("R1", "Repair", &["R1"]);
        r1.works = vec![summary("WR", "Patch", &["R1"])];
        catalog
            .sections
            .insert("gesnr".to_string(), vec![section("R1", "Repair", &["R1"])]);
        catalog.children.insert(key("gesnr", "R1"), vec![r1]);

        catalog
            .works
            .insert(key("gesn", "W1"), details("W1", &["S1"], &["Root"]));
        let mut w2 = details("W2", &["S1", "S1.1"], &["Root", "Child"]);
        w2.resources = vec![ResourceLine {
            code: "01.1".to_string(),
            name: "local cement".to_string(),
            quantity: 2.0,
            ..ResourceLine::default()
        }];
        catalog.works.insert(key("gesn", "W2"), w2);
        catalog
            .works
            .insert(key("gesnr", "WR"), details("WR", &["R1"], &["Repair"]));

        catalog.resources.insert(
            "01.1".to_string(),
            ResourceReference {
                code: "01.1".to_string(),
                name: "Cement".to_string(),
                measure_unit: "t".to_string(),
                database: "fsbts_mat".to_string(),
                section_path: vec!["01".to_string()],
                section_names: vec!["Materials".to_string()],
                ..ResourceReference::default()
            },
        );
        catalog
    }

    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &'static str) -> SourceResult<()> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(SourceError::Backend(format!("{operation} unavailable")));
        }
        Ok(())
    }
}

pub fn config() -> CatalogConfig {
    CatalogConfig::default()
}

#[async_trait]
impl CatalogSource for StubCatalog {
    async fn sections(&self, database: &str) -> SourceResult<Vec<SectionNode>> {
        self.section_calls.fetch_add(1, Ordering::SeqCst);
        self.check("sections")?;
        Ok(self.sections.get(database).cloned().unwrap_or_default())
    }

    async fn children(&self, database: &str, code: &str) -> SourceResult<Vec<SectionNode>> {
        self.children_calls.fetch_add(1, Ordering::SeqCst);
        self.check("children")?;
        Ok(self
            .children
            .get(&key(database, code))
            .cloned()
            .unwrap_or_default())
    }

    async fn work_details(&self, database: &str, code: &str) -> SourceResult<Option<WorkDetails>> {
        self.work_calls.fetch_add(1, Ordering::SeqCst);
        self.check("work")?;
        Ok(self.works.get(&key(database, code)).cloned())
    }

    async fn resource_reference(&self, code: &str) -> SourceResult<Option<ResourceReference>> {
        self.check("resource")?;
        Ok(self.resources.get(code).cloned())
    }

    async fn section_index(&self, _database: &str) -> SourceResult<Vec<IndexRecord>> {
        Ok(Vec::new())
    }

    async fn work_suggestions(
        &self,
        _database: &str,
        _token: &str,
        _limit: usize,
    ) -> SourceResult<Vec<IndexRecord>> {
        Ok(Vec::new())
    }

    async fn resource_suggestions(
        &self,
        _database: &str,
        _token: &str,
        _limit: usize,
    ) -> SourceResult<Vec<IndexRecord>> {
        Ok(Vec::new())
    }

    async fn search(&self, _database: &str, _term: &str) -> SourceResult<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}

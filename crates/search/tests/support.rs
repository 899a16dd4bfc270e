#![allow(dead_code)]

use async_trait::async_trait;
use ratebook_protocol::{
    CatalogConfig, CatalogSource, IndexRecord, ResourceReference, SearchHit, SectionNode,
    SourceError, SourceResult, SuggestConfig, WorkDetails,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted catalog that counts every lookup it serves.
#[derive(Default)]
pub struct StubSource {
    pub sections: Vec<IndexRecord>,
    pub works: Vec<IndexRecord>,
    pub resources: Vec<IndexRecord>,
    pub hits: HashMap<String, Vec<SearchHit>>,
    /// Latency keyed by token or search term
    pub delays: HashMap<String, Duration>,
    pub index_delay: Duration,
    failing: Mutex<HashSet<String>>,
    pub index_calls: AtomicUsize,
    pub work_calls: AtomicUsize,
    pub resource_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl StubSource {
    pub fn catalog() -> Self {
        Self {
            sections: vec![
                record("01", "Земляные работы", &[], None),
                record("01-01", "Разработка грунта", &[("01", "Земляные работы")], None),
                record("06", "Бетонные и железобетонные конструкции", &[], None),
                record(
                    "06-01",
                    "Бетонная подготовка",
                    &[("06", "Бетонные и железобетонные конструкции")],
                    None,
                ),
            ],
            works: vec![
                work("06-01-001-01", "Устройство бетонной подготовки"),
                work("06-01-001-02", "Устройство бетонного основания"),
                work("06-01-002-01", "Укладка бетонной смеси"),
            ],
            resources: vec![
                record("01.7.03.01-0001", "Вода", &[("01", "Материалы")], Some("м3")),
                record(
                    "04.1.02.05-0003",
                    "Смеси бетонные тяжелого бетона",
                    &[("04", "Бетоны")],
                    Some("м3"),
                ),
                record("91.07.04-001", "Вибраторы глубинные", &[("91", "Машины")], Some("маш.-ч")),
            ],
            ..Self::default()
        }
    }

    pub fn fail(&self, operation: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(operation.to_string());
    }

    pub fn recover(&self, operation: &str) {
        self.failing.lock().unwrap().remove(operation);
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &str) -> SourceResult<()> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(SourceError::Backend(format!("{operation} unavailable")));
        }
        Ok(())
    }

    async fn pause(&self, key: &str) {
        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
    }
}

pub fn record(
    code: &str,
    name: &str,
    ancestors: &[(&str, &str)],
    measure_unit: Option<&str>,
) -> IndexRecord {
    IndexRecord {
        code: code.to_string(),
        name: name.to_string(),
        measure_unit: measure_unit.map(str::to_string),
        path_names: ancestors.iter().map(|(_, n)| (*n).to_string()).collect(),
        path_codes: ancestors.iter().map(|(c, _)| (*c).to_string()).collect(),
        depth: ancestors.len(),
    }
}

fn work(code: &str, name: &str) -> IndexRecord {
    record(
        code,
        name,
        &[
            ("06", "Бетонные и железобетонные конструкции"),
            ("06-01", "Бетонная подготовка"),
        ],
        Some("100 м3"),
    )
}

fn candidates(records: &[IndexRecord], token: &str, limit: usize) -> Vec<IndexRecord> {
    let needle = token.to_lowercase();
    records
        .iter()
        .filter(|r| {
            r.code.to_lowercase().contains(&needle) || r.name.to_lowercase().contains(&needle)
        })
        .take(limit)
        .cloned()
        .collect()
}

pub fn hit(code: &str, name: &str) -> SearchHit {
    SearchHit {
        code: code.to_string(),
        name: name.to_string(),
        ..SearchHit::default()
    }
}

pub fn config() -> CatalogConfig {
    CatalogConfig {
        suggest: SuggestConfig::immediate(),
        ..CatalogConfig::default()
    }
}

#[async_trait]
impl CatalogSource for StubSource {
    async fn sections(&self, _database: &str) -> SourceResult<Vec<SectionNode>> {
        Ok(Vec::new())
    }

    async fn children(&self, _database: &str, _code: &str) -> SourceResult<Vec<SectionNode>> {
        Ok(Vec::new())
    }

    async fn work_details(&self, _db: &str, _code: &str) -> SourceResult<Option<WorkDetails>> {
        Ok(None)
    }

    async fn resource_reference(&self, _code: &str) -> SourceResult<Option<ResourceReference>> {
        Ok(None)
    }

    async fn section_index(&self, _database: &str) -> SourceResult<Vec<IndexRecord>> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        if !self.index_delay.is_zero() {
            tokio::time::sleep(self.index_delay).await;
        }
        self.check("sections")?;
        Ok(self.sections.clone())
    }

    async fn work_suggestions(
        &self,
        _database: &str,
        token: &str,
        limit: usize,
    ) -> SourceResult<Vec<IndexRecord>> {
        self.work_calls.fetch_add(1, Ordering::SeqCst);
        self.pause(token).await;
        self.check("works")?;
        Ok(candidates(&self.works, token, limit))
    }

    async fn resource_suggestions(
        &self,
        _database: &str,
        token: &str,
        limit: usize,
    ) -> SourceResult<Vec<IndexRecord>> {
        self.resource_calls.fetch_add(1, Ordering::SeqCst);
        self.pause(token).await;
        self.check("resources")?;
        Ok(candidates(&self.resources, token, limit))
    }

    async fn search(&self, database: &str, term: &str) -> SourceResult<Vec<SearchHit>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.pause(term).await;
        self.check(&format!("search:{database}"))?;
        Ok(self.hits.get(database).cloned().unwrap_or_default())
    }
}

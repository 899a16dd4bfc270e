use crate::document::{CatalogDocument, DatabaseDocument, SectionRecord};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use ratebook_protocol::{
    CatalogConfig, CatalogSource, HitResource, IndexRecord, ResourceReference, SearchHit,
    SectionNode, SectionRef, SourceError, SourceResult, WorkDetails,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

struct StoredWork {
    details: WorkDetails,
    sections: Vec<SectionRef>,
}

/// Records of one database, flattened once at load time.
#[derive(Default)]
struct DatabaseRecords {
    forest: Vec<SectionNode>,
    /// Section code -> child-index path from the root forest.
    section_paths: HashMap<String, Vec<usize>>,
    section_index: Vec<IndexRecord>,
    works: Vec<StoredWork>,
    work_by_code: HashMap<String, usize>,
    catalog: HashMap<String, ResourceReference>,
    resource_records: Vec<IndexRecord>,
}

impl DatabaseRecords {
    fn build(database: &str, document: DatabaseDocument) -> Result<Self> {
        let mut records = Self::default();
        let mut line_records: Vec<IndexRecord> = Vec::new();
        let mut ancestors = Vec::new();
        let mut forest = Vec::with_capacity(document.sections.len());
        for (idx, section) in document.sections.into_iter().enumerate() {
            let node = records.visit(
                database,
                section,
                &mut ancestors,
                vec![idx],
                &mut line_records,
            )?;
            forest.push(node);
        }
        records.forest = forest;

        // Priced catalog entries win over bare resource lines with the same code.
        let mut seen = HashSet::new();
        for record in line_records {
            if !records.catalog.contains_key(&record.code) && seen.insert(record.code.clone()) {
                records.resource_records.push(record);
            }
        }
        Ok(records)
    }

    fn visit(
        &mut self,
        database: &str,
        record: SectionRecord,
        ancestors: &mut Vec<SectionRef>,
        position: Vec<usize>,
        line_records: &mut Vec<IndexRecord>,
    ) -> Result<SectionNode> {
        if record.code.trim().is_empty() {
            return Err(StoreError::InvalidCatalog(format!(
                "section without code in `{database}`"
            )));
        }
        if self.section_paths.contains_key(&record.code) {
            return Err(StoreError::InvalidCatalog(format!(
                "duplicate section `{}` in `{database}`",
                record.code
            )));
        }

        let parent_codes: Vec<String> = ancestors.iter().map(|s| s.code.clone()).collect();
        let parent_names: Vec<String> = ancestors.iter().map(|s| s.name.clone()).collect();
        let depth = ancestors.len();
        self.section_paths
            .insert(record.code.clone(), position.clone());
        self.section_index.push(IndexRecord {
            code: record.code.clone(),
            name: record.name.clone(),
            measure_unit: None,
            path_names: parent_names,
            path_codes: parent_codes,
            depth,
        });

        ancestors.push(SectionRef {
            code: record.code.clone(),
            name: record.name.clone(),
            kind: record.kind.clone(),
        });
        let section_path: Vec<String> = ancestors.iter().map(|s| s.code.clone()).collect();
        let section_names: Vec<String> = ancestors.iter().map(|s| s.name.clone()).collect();

        let mut works = Vec::with_capacity(record.works.len());
        for work in record.works {
            for line in &work.resources {
                if !line.code.is_empty() {
                    line_records.push(IndexRecord {
                        code: line.code.clone(),
                        name: line.name.clone(),
                        measure_unit: Some(line.measure_unit.clone()),
                        path_names: section_names.clone(),
                        path_codes: section_path.clone(),
                        depth: depth + 1,
                    });
                }
            }
            let details = WorkDetails {
                name: if work.name.is_empty() {
                    work.end_name.clone()
                } else {
                    work.name
                },
                code: work.code,
                end_name: work.end_name,
                measure_unit: work.measure_unit,
                content: work.content,
                resources: work.resources,
                references: work.references,
                section_path: section_path.clone(),
                section_names: section_names.clone(),
            };
            works.push(details.summary());
            self.work_by_code
                .entry(details.code.clone())
                .or_insert(self.works.len());
            self.works.push(StoredWork {
                details,
                sections: ancestors.clone(),
            });
        }

        for resource in record.resources {
            let reference = ResourceReference {
                name: if resource.name.is_empty() {
                    resource.end_name
                } else {
                    resource.name
                },
                code: resource.code,
                measure_unit: resource.measure_unit,
                database: database.to_string(),
                sections: ancestors.clone(),
                section_path: section_path.clone(),
                section_names: section_names.clone(),
                price: resource.price,
            };
            self.resource_records.push(IndexRecord {
                code: reference.code.clone(),
                name: reference.name.clone(),
                measure_unit: Some(reference.measure_unit.clone()),
                path_names: section_names.clone(),
                path_codes: section_path.clone(),
                depth: depth + 1,
            });
            self.catalog.insert(reference.code.clone(), reference);
        }

        let mut children = Vec::with_capacity(record.children.len());
        for (idx, child) in record.children.into_iter().enumerate() {
            let mut child_position = position.clone();
            child_position.push(idx);
            children.push(self.visit(database, child, ancestors, child_position, line_records)?);
        }
        ancestors.pop();

        Ok(SectionNode {
            has_children: !children.is_empty() || !works.is_empty(),
            code: record.code,
            name: record.name,
            kind: record.kind,
            depth,
            path: section_path,
            children,
            works,
        })
    }

    fn node(&self, code: &str) -> Option<&SectionNode> {
        let position = self.section_paths.get(code)?;
        let mut nodes = &self.forest;
        let mut found = None;
        for &idx in position {
            let node = nodes.get(idx)?;
            nodes = &node.children;
            found = Some(node);
        }
        found
    }

    fn work(&self, code: &str) -> Option<&StoredWork> {
        self.work_by_code.get(code).and_then(|&idx| self.works.get(idx))
    }
}

/// [`CatalogSource`] over records held in memory.
pub struct MemoryCatalog {
    config: CatalogConfig,
    databases: HashMap<String, DatabaseRecords>,
    references: Mutex<HashMap<String, Option<ResourceReference>>>,
}

impl MemoryCatalog {
    pub fn from_document(document: CatalogDocument, config: CatalogConfig) -> Result<Self> {
        let mut databases = HashMap::new();
        for (id, database) in document.databases {
            let records = DatabaseRecords::build(&id, database)?;
            log::debug!(
                "Loaded database {id}: {} sections, {} works, {} catalog resources",
                records.section_index.len(),
                records.works.len(),
                records.catalog.len()
            );
            databases.insert(id, records);
        }
        Ok(Self {
            config,
            databases,
            references: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_json_str(raw: &str, config: CatalogConfig) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(raw)?;
        Self::from_document(document, config)
    }

    pub fn from_path(path: &Path, config: CatalogConfig) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw, config)
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn database_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.databases.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn records(&self, database: &str) -> SourceResult<&DatabaseRecords> {
        let database = database.trim();
        if database.is_empty() {
            return Err(SourceError::MissingDatabase);
        }
        self.databases
            .get(database)
            .ok_or_else(|| SourceError::UnknownDatabase(database.to_string()))
    }

    fn references(&self) -> MutexGuard<'_, HashMap<String, Option<ResourceReference>>> {
        match self.references.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    async fn sections(&self, database: &str) -> SourceResult<Vec<SectionNode>> {
        let records = self.records(database)?;
        Ok(records.forest.iter().map(SectionNode::shallow).collect())
    }

    async fn children(&self, database: &str, section_code: &str) -> SourceResult<Vec<SectionNode>> {
        if section_code.trim().is_empty() {
            return Err(SourceError::MissingArgument("Section code"));
        }
        let records = self.records(database)?;
        let Some(node) = records.node(section_code) else {
            return Ok(Vec::new());
        };

        let children: Vec<SectionNode> = node.children.iter().map(SectionNode::shallow).collect();
        let mut head = node.shallow();
        head.children = children.clone();
        head.works = node.works.clone();

        let mut out = Vec::with_capacity(children.len() + 1);
        out.push(head);
        out.extend(children);
        Ok(out)
    }

    async fn work_details(
        &self,
        database: &str,
        work_code: &str,
    ) -> SourceResult<Option<WorkDetails>> {
        if work_code.trim().is_empty() {
            return Err(SourceError::MissingArgument("Work code"));
        }
        let records = self.records(database)?;
        Ok(records.work(work_code).map(|work| work.details.clone()))
    }

    async fn resource_reference(
        &self,
        resource_code: &str,
    ) -> SourceResult<Option<ResourceReference>> {
        let code = resource_code.trim();
        let Some(mapping) = self.config.catalog_for_resource(code) else {
            return Ok(None);
        };
        let key = format!("{}|{code}", mapping.database);
        if let Some(cached) = self.references().get(&key) {
            return Ok(cached.clone());
        }

        let records = self.records(&mapping.database)?;
        let reference = records.catalog.get(code).cloned();
        self.references().insert(key, reference.clone());
        Ok(reference)
    }

    async fn section_index(&self, database: &str) -> SourceResult<Vec<IndexRecord>> {
        Ok(self.records(database)?.section_index.clone())
    }

    async fn work_suggestions(
        &self,
        database: &str,
        token: &str,
        limit: usize,
    ) -> SourceResult<Vec<IndexRecord>> {
        let records = self.records(database)?;
        let needle = token.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(records
            .works
            .iter()
            .map(|work| &work.details)
            .filter(|work| {
                contains_folded(&work.code, &needle)
                    || contains_folded(&work.name, &needle)
                    || contains_folded(&work.end_name, &needle)
            })
            .take(limit)
            .map(|work| IndexRecord {
                code: work.code.clone(),
                name: work.name.clone(),
                measure_unit: Some(work.measure_unit.clone()),
                path_names: work.section_names.clone(),
                path_codes: work.section_path.clone(),
                depth: work.section_path.len(),
            })
            .collect())
    }

    async fn resource_suggestions(
        &self,
        database: &str,
        token: &str,
        limit: usize,
    ) -> SourceResult<Vec<IndexRecord>> {
        let records = self.records(database)?;
        let needle = token.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(records
            .resource_records
            .iter()
            .filter(|r| contains_folded(&r.code, &needle) || contains_folded(&r.name, &needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn search(&self, database: &str, term: &str) -> SourceResult<Vec<SearchHit>> {
        let records = self.records(database)?;
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let hits = records
            .works
            .iter()
            .filter(|work| {
                let details = &work.details;
                contains_folded(&details.code, &needle)
                    || contains_folded(&details.name, &needle)
                    || contains_folded(&details.end_name, &needle)
                    || details.resources.iter().any(|resource| {
                        contains_folded(&resource.code, &needle)
                            || contains_folded(&resource.name, &needle)
                    })
            })
            .take(self.config.page_size)
            .map(|work| SearchHit {
                code: work.details.code.clone(),
                name: work.details.name.clone(),
                measure_unit: work.details.measure_unit.clone(),
                sections: work.sections.clone(),
                section_path: work.details.section_path.clone(),
                section_names: work.details.section_names.clone(),
                resources: work
                    .details
                    .resources
                    .iter()
                    .map(|resource| HitResource {
                        code: resource.code.clone(),
                        name: resource.name.clone(),
                        measure_unit: resource.measure_unit.clone(),
                    })
                    .collect(),
            })
            .collect();
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog(raw: &str) -> MemoryCatalog {
        MemoryCatalog::from_json_str(raw, CatalogConfig::default()).unwrap()
    }

    #[test]
    fn duplicate_section_codes_are_rejected() {
        let raw = r#"{"databases":{"gesn":{"sections":[{"code":"1"},{"code":"1"}]}}}"#;
        let err = MemoryCatalog::from_json_str(raw, CatalogConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("duplicate section"));
    }

    #[test]
    fn sections_without_code_are_rejected() {
        let raw = r#"{"databases":{"gesn":{"sections":[{"name":"x","code":" "}]}}}"#;
        assert!(MemoryCatalog::from_json_str(raw, CatalogConfig::default()).is_err());
    }

    #[tokio::test]
    async fn roots_are_shallow_with_affordance() {
        let catalog = catalog(
            r#"{"databases":{"gesn":{"sections":[
                {"code":"01","name":"Earth","children":[{"code":"01-01","name":"Dig"}]},
                {"code":"02","name":"Empty"}
            ]}}}"#,
        );
        let roots = catalog.sections("gesn").await.unwrap();
        assert_eq!(roots.len(), 2);
        assert!(roots[0].children.is_empty());
        assert!(roots[0].has_children);
        assert!(!roots[1].has_children);
        assert_eq!(roots[0].path, vec!["01".to_string()]);
    }

    #[tokio::test]
    async fn unknown_database_is_an_error() {
        let catalog = catalog(r#"{"databases":{}}"#);
        assert_eq!(
            catalog.sections("nope").await.unwrap_err(),
            SourceError::UnknownDatabase("nope".to_string())
        );
        assert_eq!(
            catalog.sections("").await.unwrap_err(),
            SourceError::MissingDatabase
        );
    }
}

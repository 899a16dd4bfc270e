use crate::{IndexRecord, ResourceLine, ResourceReference, SearchHit, SectionNode, WorkDetails};
use async_trait::async_trait;
use thiserror::Error;

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Failure reported by a catalog collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Database identifier is required")]
    MissingDatabase,

    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    #[error("{0} is required")]
    MissingArgument(&'static str),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Calls the browser core makes against the backing catalog.
///
/// Implementations own transport, retries and record parsing; the core only
/// sees plain records and [`SourceError`]s.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Root forest of a database: depth-0 sections, children not populated.
    async fn sections(&self, database: &str) -> SourceResult<Vec<SectionNode>>;

    /// The requested section (first element) with its immediate children and
    /// works populated.
    async fn children(&self, database: &str, section_code: &str) -> SourceResult<Vec<SectionNode>>;

    async fn work_details(&self, database: &str, work_code: &str)
        -> SourceResult<Option<WorkDetails>>;

    /// Resolves the secondary database owning `resource_code` by prefix,
    /// independent of the active database.
    async fn resource_reference(&self, resource_code: &str)
        -> SourceResult<Option<ResourceReference>>;

    /// Best-effort catalog lookup per resource. A failed lookup keeps the
    /// original line.
    async fn enrich_resources(&self, resources: Vec<ResourceLine>) -> Vec<ResourceLine> {
        let lookups = resources.into_iter().map(|resource| async move {
            if resource.code.is_empty() {
                return resource;
            }
            match self.resource_reference(&resource.code).await {
                Ok(Some(reference)) => resource.with_catalog(&reference),
                Ok(None) => resource,
                Err(err) => {
                    log::warn!("Failed to enrich resource {}: {err}", resource.code);
                    resource
                }
            }
        });
        futures::future::join_all(lookups).await
    }

    /// Flattened section index used for section suggestions.
    async fn section_index(&self, database: &str) -> SourceResult<Vec<IndexRecord>>;

    async fn work_suggestions(
        &self,
        database: &str,
        token: &str,
        limit: usize,
    ) -> SourceResult<Vec<IndexRecord>>;

    async fn resource_suggestions(
        &self,
        database: &str,
        token: &str,
        limit: usize,
    ) -> SourceResult<Vec<IndexRecord>>;

    /// Literal case-insensitive substring search over one database.
    async fn search(&self, database: &str, term: &str) -> SourceResult<Vec<SearchHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Price;
    use pretty_assertions::assert_eq;

    struct PricedOnly;

    #[async_trait]
    impl CatalogSource for PricedOnly {
        async fn sections(&self, _database: &str) -> SourceResult<Vec<SectionNode>> {
            Ok(Vec::new())
        }

        async fn children(&self, _database: &str, _code: &str) -> SourceResult<Vec<SectionNode>> {
            Ok(Vec::new())
        }

        async fn work_details(&self, _db: &str, _code: &str) -> SourceResult<Option<WorkDetails>> {
            Ok(None)
        }

        async fn resource_reference(&self, code: &str) -> SourceResult<Option<ResourceReference>> {
            match code {
                "01.1" => Ok(Some(ResourceReference {
                    code: code.to_string(),
                    name: "Cement".to_string(),
                    database: "fsbts_mat".to_string(),
                    price: Some(Price {
                        cost: Some(5.0),
                        opt_cost: Some(4.5),
                    }),
                    ..ResourceReference::default()
                })),
                "91.1" => Err(SourceError::Backend("timeout".to_string())),
                _ => Ok(None),
            }
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

    fn line(code: &str) -> ResourceLine {
        ResourceLine {
            code: code.to_string(),
            name: format!("line {code}"),
            ..ResourceLine::default()
        }
    }

    #[tokio::test]
    async fn enrichment_degrades_per_item() {
        let enriched = PricedOnly
            .enrich_resources(vec![line("01.1"), line("91.1"), line("77.7"), line("")])
            .await;

        assert_eq!(enriched.len(), 4);
        assert_eq!(enriched[0].name, "Cement");
        assert_eq!(enriched[0].catalog_database.as_deref(), Some("fsbts_mat"));
        assert_eq!(enriched[1], line("91.1"));
        assert_eq!(enriched[2], line("77.7"));
        assert_eq!(enriched[3], line(""));
    }
}

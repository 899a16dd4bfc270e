use crate::SuggestionCategory;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub description: String,
}

impl DatabaseInfo {
    fn new(id: &str, name: &str, file: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            file: file.to_string(),
            description: description.to_string(),
        }
    }
}

/// Resource codes starting with `prefix` are priced in `database`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMapping {
    pub prefix: String,
    pub database: String,
}

/// What accepting a suggestion does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionBehavior {
    /// Replace the last typed token with the suggestion text.
    Fill,
    /// Jump straight to the suggested entity.
    Navigate,
}

/// Per-category suggestion tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Combined normalized query length required before this category fetches
    pub min_query_len: usize,

    /// Scored candidates below this are dropped
    pub min_score: f64,

    /// Display limit for the category group
    pub limit: usize,

    pub behavior: SuggestionBehavior,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            min_score: 0.3,
            limit: 6,
            behavior: SuggestionBehavior::Fill,
        }
    }
}

/// Configuration of the suggestion engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    /// Quiet period before a keystroke is dispatched (0 disables it)
    pub debounce_ms: u64,

    /// Multiplier applied to matches against the ancestor path
    pub path_weight: f64,

    /// Combined display budget across all groups
    pub total_limit: usize,

    /// Upper bound passed to work/resource suggestion lookups
    pub fetch_limit: usize,

    pub index_ttl_secs: u64,
    pub result_ttl_secs: u64,
    pub result_cache_capacity: usize,

    pub sections: CategoryConfig,
    pub works: CategoryConfig,
    pub resources: CategoryConfig,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            path_weight: 0.85,
            total_limit: 12,
            fetch_limit: 40,
            index_ttl_secs: 600,
            result_ttl_secs: 120,
            result_cache_capacity: 128,
            sections: CategoryConfig {
                min_query_len: 2,
                min_score: 0.35,
                limit: 6,
                behavior: SuggestionBehavior::Navigate,
            },
            works: CategoryConfig {
                min_query_len: 3,
                min_score: 0.3,
                limit: 6,
                behavior: SuggestionBehavior::Navigate,
            },
            resources: CategoryConfig {
                min_query_len: 3,
                min_score: 0.3,
                limit: 6,
                behavior: SuggestionBehavior::Fill,
            },
        }
    }
}

impl SuggestConfig {
    pub fn category(&self, category: SuggestionCategory) -> &CategoryConfig {
        match category {
            SuggestionCategory::Section => &self.sections,
            SuggestionCategory::Work => &self.works,
            SuggestionCategory::Resource => &self.resources,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_secs)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    /// Config suited to one-shot callers: no quiet period.
    pub fn immediate() -> Self {
        Self {
            debounce_ms: 0,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.path_weight) {
            return Err(ConfigError::Invalid(format!(
                "path_weight ({}) must be within 0..=1",
                self.path_weight
            )));
        }
        if self.total_limit == 0 {
            return Err(ConfigError::Invalid("total_limit must be > 0".to_string()));
        }
        for category in SuggestionCategory::PRIORITY {
            let cfg = self.category(category);
            if !(0.0..=1.0).contains(&cfg.min_score) {
                return Err(ConfigError::Invalid(format!(
                    "{category}.min_score ({}) must be within 0..=1",
                    cfg.min_score
                )));
            }
        }
        Ok(())
    }
}

/// Deployment configuration: known databases, resource catalog routing and
/// suggestion tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub default_database: Option<String>,
    pub databases: Vec<DatabaseInfo>,
    pub catalog_map: Vec<CatalogMapping>,

    /// Maximum hits returned by the literal search per database
    pub page_size: usize,

    pub suggest: SuggestConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_database: Some("gesn".to_string()),
            databases: vec![
                DatabaseInfo::new(
                    "gesn",
                    "ГЭСН - Строительные работы",
                    "ГЭСН.xml",
                    "Основные строительные работы",
                ),
                DatabaseInfo::new(
                    "gesnm",
                    "ГЭСНм - Монтаж оборудования",
                    "ГЭСНм.xml",
                    "Монтаж технологического и электротехнического оборудования",
                ),
                DatabaseInfo::new(
                    "gesnmr",
                    "ГЭСНмр - Монтаж/демонтаж",
                    "ГЭСНмр.xml",
                    "Работы по монтажу и демонтажу оборудования",
                ),
                DatabaseInfo::new(
                    "gesnp",
                    "ГЭСНп - Промышленное строительство",
                    "ГЭСНп.xml",
                    "Промышленные и инфраструктурные объекты",
                ),
                DatabaseInfo::new(
                    "gesnr",
                    "ГЭСНр - Ремонт",
                    "ГЭСНр.xml",
                    "Ремонтные работы и дефекты",
                ),
                DatabaseInfo::new(
                    "fsbts_mat",
                    "ФСБЦ - Материалы и оборудование",
                    "ФСБЦ_Мат&Оборуд.xml",
                    "Справочник по материалам и комплектующим",
                ),
                DatabaseInfo::new(
                    "fsbts_mash",
                    "ФСБЦ - Машины и механизмы",
                    "ФСБЦ_Маш.xml",
                    "Справочник по машинам и механизмам",
                ),
            ],
            catalog_map: vec![
                CatalogMapping {
                    prefix: "01".to_string(),
                    database: "fsbts_mat".to_string(),
                },
                CatalogMapping {
                    prefix: "91".to_string(),
                    database: "fsbts_mash".to_string(),
                },
            ],
            page_size: 100,
            suggest: SuggestConfig::default(),
        }
    }
}

impl CatalogConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(default) = self.default_database.as_deref() {
            if self.database(default).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "default_database `{default}` is not listed in databases"
                )));
            }
        }
        for mapping in &self.catalog_map {
            if mapping.prefix.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "catalog_map prefix must not be empty".to_string(),
                ));
            }
            if self.database(&mapping.database).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "catalog_map database `{}` is not listed in databases",
                    mapping.database
                )));
            }
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be > 0".to_string()));
        }
        self.suggest.validate()
    }

    pub fn database(&self, id: &str) -> Option<&DatabaseInfo> {
        self.databases.iter().find(|db| db.id == id)
    }

    /// First mapping whose prefix starts the trimmed resource code.
    pub fn catalog_for_resource(&self, resource_code: &str) -> Option<&CatalogMapping> {
        let code = resource_code.trim();
        if code.is_empty() {
            return None;
        }
        self.catalog_map
            .iter()
            .find(|mapping| code.starts_with(mapping.prefix.as_str()))
    }

    /// Explicit choice, else the configured default.
    pub fn resolve_database(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::trim)
            .filter(|db| !db.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_database.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = CatalogConfig::default();
        config.validate().unwrap();
        assert_eq!(config.databases.len(), 7);
        assert_eq!(config.suggest.category(SuggestionCategory::Work).min_query_len, 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CatalogConfig::from_toml_str(
            r#"
            page_size = 25

            [suggest]
            debounce_ms = 0

            [suggest.works]
            min_query_len = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.page_size, 25);
        assert_eq!(config.suggest.debounce(), Duration::ZERO);
        assert_eq!(config.suggest.works.min_query_len, 2);
        assert_eq!(config.suggest.works.limit, 6);
        assert_eq!(config.suggest.sections.min_score, 0.35);
        assert_eq!(config.default_database.as_deref(), Some("gesn"));
    }

    #[test]
    fn unknown_default_database_is_rejected() {
        let err = CatalogConfig::from_toml_str(r#"default_database = "nope""#).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_size = 7").unwrap();
        let config = CatalogConfig::load(file.path()).unwrap();
        assert_eq!(config.page_size, 7);
    }

    #[test]
    fn resource_prefix_routes_to_catalog() {
        let config = CatalogConfig::default();
        assert_eq!(
            config.catalog_for_resource(" 01.7.03").map(|m| m.database.as_str()),
            Some("fsbts_mat")
        );
        assert_eq!(
            config.catalog_for_resource("91.05.01").map(|m| m.database.as_str()),
            Some("fsbts_mash")
        );
        assert!(config.catalog_for_resource("02.1").is_none());
        assert!(config.catalog_for_resource("").is_none());
    }

    #[test]
    fn resolve_prefers_explicit_database() {
        let config = CatalogConfig::default();
        assert_eq!(config.resolve_database(Some("gesnr")).as_deref(), Some("gesnr"));
        assert_eq!(config.resolve_database(Some("  ")).as_deref(), Some("gesn"));

        let bare = CatalogConfig {
            default_database: None,
            ..CatalogConfig::default()
        };
        assert_eq!(bare.resolve_database(None), None);
    }
}

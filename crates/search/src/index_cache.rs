use crate::error::Result;
use crate::fuzzy::ScoringFields;
use ratebook_protocol::{CatalogSource, IndexRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;

/// Section index entry with its fields normalized once.
#[derive(Debug, Clone)]
pub struct IndexedSection {
    pub record: IndexRecord,
    pub fields: ScoringFields,
}

#[derive(Debug, Clone)]
pub struct SectionIndex {
    pub database: String,
    pub entries: Vec<IndexedSection>,
}

impl SectionIndex {
    pub fn build(database: &str, records: Vec<IndexRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|record| IndexedSection {
                fields: ScoringFields::from_record(&record),
                record,
            })
            .collect();
        Self {
            database: database.to_string(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
struct IndexSlot {
    cell: OnceCell<(Arc<SectionIndex>, Instant)>,
}

impl IndexSlot {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.cell
            .get()
            .is_some_and(|(_, loaded_at)| loaded_at.elapsed() > ttl)
    }
}

/// Per-database section index, fetched once and shared.
///
/// Concurrent callers for the same uncached database wait on one in-flight
/// fetch. Failed fetches are not remembered; the next caller retries.
pub struct SectionIndexCache {
    source: Arc<dyn CatalogSource>,
    ttl: Duration,
    slots: Mutex<HashMap<String, Arc<IndexSlot>>>,
}

impl SectionIndexCache {
    pub fn new(source: Arc<dyn CatalogSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, database: &str) -> Result<Arc<SectionIndex>> {
        let slot = self.slot(database);
        let (index, _) = slot
            .cell
            .get_or_try_init(|| async {
                log::debug!("Fetching section index for {database}");
                let records = self.source.section_index(database).await?;
                let index = SectionIndex::build(database, records);
                log::debug!("Section index for {database}: {} entries", index.len());
                Ok::<_, crate::SearchError>((Arc::new(index), Instant::now()))
            })
            .await?;
        Ok(index.clone())
    }

    pub fn is_cached(&self, database: &str) -> bool {
        self.lock()
            .get(database)
            .is_some_and(|slot| slot.cell.initialized() && !slot.is_expired(self.ttl))
    }

    pub fn invalidate(&self, database: &str) {
        self.lock().remove(database);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn slot(&self, database: &str) -> Arc<IndexSlot> {
        let mut slots = self.lock();
        if let Some(slot) = slots.get(database) {
            if !slot.is_expired(self.ttl) {
                return slot.clone();
            }
            log::debug!("Section index for {database} expired");
        }
        let slot = Arc::new(IndexSlot::default());
        slots.insert(database.to_string(), slot.clone());
        slot
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<IndexSlot>>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

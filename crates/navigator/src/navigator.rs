use crate::error::{NavigatorError, Result};
use crate::history::{DetailType, HistoryDirection, HistoryEntry};
use crate::state::{ExpandOptions, NavigationSnapshot, NavigationState, SelectOptions};
use crate::subscription::{Listeners, Subscription};
use crate::tree::SectionTree;
use ratebook_protocol::{
    CatalogConfig, CatalogSource, NavigationTarget, ResourceReference, SectionNode, WorkDetails,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

type DatabaseCode = (String, String);

/// Owner of the navigation state.
///
/// Every mutating operation takes `&mut self`, publishes a snapshot after
/// each state change and stores failures as text in the state instead of
/// returning them.
pub struct Navigator {
    source: Arc<dyn CatalogSource>,
    config: CatalogConfig,
    state: NavigationState,
    section_cache: HashMap<String, Arc<Vec<SectionNode>>>,
    children_cache: HashMap<DatabaseCode, SectionNode>,
    work_cache: HashMap<DatabaseCode, WorkDetails>,
    listeners: Listeners,
    snapshot_tx: watch::Sender<NavigationSnapshot>,
    bootstrapped: bool,
}

impl Navigator {
    pub fn new(source: Arc<dyn CatalogSource>, config: CatalogConfig) -> Self {
        let state = NavigationState::default();
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        Self {
            source,
            config,
            state,
            section_cache: HashMap::new(),
            children_cache: HashMap::new(),
            work_cache: HashMap::new(),
            listeners: Listeners::default(),
            snapshot_tx,
            bootstrapped: false,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn current_database(&self) -> Option<&str> {
        self.state.current_database.as_deref()
    }

    /// Load the default database once per session.
    pub async fn init(&mut self) {
        if self.bootstrapped {
            return;
        }
        self.bootstrapped = true;
        self.state.history.clear();
        let default = self.config.default_database.clone();
        self.load_sections(default.as_deref()).await;
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        self.state.snapshot()
    }

    /// Register `listener`; it receives the current snapshot right away and
    /// a fresh one after every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&NavigationSnapshot) + Send + Sync + 'static,
    {
        listener(&self.snapshot());
        self.listeners.add(Arc::new(listener))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn watch(&self) -> watch::Receiver<NavigationSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn emit(&self) {
        let snapshot = self.state.snapshot();
        self.snapshot_tx.send_replace(snapshot.clone());
        self.listeners.notify(&snapshot);
    }

    /// Switch to `database` (or the current/default one) and show its root
    /// sections. Selection, expansion and breadcrumbs are reset.
    pub async fn load_sections(&mut self, database: Option<&str>) -> Arc<Vec<SectionNode>> {
        let target = database
            .filter(|db| !db.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.state.current_database.clone())
            .or_else(|| self.config.default_database.clone());
        let Some(target) = target else {
            self.state.error = Some(NavigatorError::NoDatabase.to_string());
            self.state.bump_revision();
            self.emit();
            return self.state.tree.roots().clone();
        };

        let state = &mut self.state;
        state.loading = true;
        state.error = None;
        state.detail_error = None;
        state.detail_loading = false;
        state.selected_work = None;
        state.selected_resource = None;
        state.detail_type = None;
        state.breadcrumbs.clear();
        state.current_path.clear();
        state.expanded.clear();
        state.tree.clear();
        state.bump_revision();
        self.emit();

        match self.fetch_sections(&target).await {
            Ok(roots) => {
                self.state.tree = SectionTree::new(roots);
                self.state.current_database = Some(target);
            }
            Err(err) => {
                log::warn!("Failed to load sections of {target}: {err}");
                self.state.error = Some(err.to_string());
            }
        }
        self.state.bump_revision();
        self.state.loading = false;
        self.emit();
        self.state.tree.roots().clone()
    }

    async fn fetch_sections(&mut self, database: &str) -> Result<Arc<Vec<SectionNode>>> {
        if let Some(roots) = self.section_cache.get(database) {
            log::debug!("Section cache hit for {database}");
            return Ok(roots.clone());
        }
        let roots = Arc::new(self.source.sections(database).await?);
        self.section_cache.insert(database.to_string(), roots.clone());
        Ok(roots)
    }

    /// Expand `code`, or collapse it when already expanded and
    /// `options.toggle` is set.
    pub async fn expand_node(&mut self, code: &str, options: ExpandOptions) {
        if code.is_empty() {
            return;
        }

        if self.state.expanded.contains(code) {
            if options.toggle {
                self.state.expanded.remove(code);
                self.state.bump_revision();
            }
            self.emit();
            return;
        }

        let Some(database) = self.state.current_database.clone() else {
            self.state.error = Some(NavigatorError::NoDatabase.to_string());
            self.state.bump_revision();
            self.emit();
            return;
        };

        self.state.loading = true;
        self.state.error = None;
        self.emit();

        match self.fetch_children(&database, code).await {
            Ok(fragment) => {
                if !self.state.tree.merge(&fragment) {
                    log::debug!("Expanded section {code} is not part of the loaded tree");
                }
                self.state.expanded.insert(code.to_string());
                self.state.error = None;
            }
            Err(err) => {
                log::warn!("Failed to expand section {code}: {err}");
                self.state.error = Some(err.to_string());
            }
        }
        self.state.bump_revision();
        self.state.loading = false;
        self.emit();
    }

    async fn fetch_children(&mut self, database: &str, code: &str) -> Result<SectionNode> {
        let key = (database.to_string(), code.to_string());
        if let Some(fragment) = self.children_cache.get(&key) {
            log::debug!("Children cache hit for {database}/{code}");
            return Ok(fragment.clone());
        }
        let fragment = self
            .source
            .children(database, code)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| NavigatorError::SectionNotFound(code.to_string()))?;
        self.children_cache.insert(key, fragment.clone());
        Ok(fragment)
    }

    /// Show the details of work `code` in the current database.
    pub async fn select_work(&mut self, code: &str, options: SelectOptions) {
        if code.is_empty() {
            return;
        }
        let Some(database) = self.state.current_database.clone() else {
            self.state.detail_error = Some(NavigatorError::NoDatabase.to_string());
            self.emit();
            return;
        };

        self.state.detail_loading = true;
        self.state.detail_error = None;
        self.state.detail_type = Some(DetailType::Work);
        self.state.selected_resource = None;
        self.emit();

        match self.fetch_work(&database, code).await {
            Ok(details) => {
                let state = &mut self.state;
                state.breadcrumbs = details.section_names.clone();
                state.current_path = details.section_path.clone();
                if options.record_history {
                    state.history.record(
                        HistoryEntry::work(database, details.code.clone()).with_sections(
                            details.section_path.clone(),
                            details.section_names.clone(),
                        ),
                    );
                }
                state.selected_work = Some(details);
                state.detail_error = None;
            }
            Err(err) => {
                log::warn!("Failed to load work {code}: {err}");
                let state = &mut self.state;
                state.selected_work = None;
                state.breadcrumbs.clear();
                state.current_path.clear();
                state.detail_error = Some(err.to_string());
            }
        }
        self.state.detail_loading = false;
        self.emit();
    }

    async fn fetch_work(&mut self, database: &str, code: &str) -> Result<WorkDetails> {
        let key = (database.to_string(), code.to_string());
        let mut details = match self.work_cache.get(&key) {
            Some(cached) => {
                log::debug!("Work cache hit for {database}/{code}");
                cached.clone()
            }
            None => self
                .source
                .work_details(database, code)
                .await?
                .ok_or_else(|| NavigatorError::WorkNotFound(code.to_string()))?,
        };
        details.resources = self.source.enrich_resources(details.resources).await;
        self.work_cache.insert(key, details.clone());
        Ok(details)
    }

    /// Show resource `code` as priced in the database owning its prefix.
    pub async fn select_resource(&mut self, code: &str, options: SelectOptions) {
        if code.is_empty() {
            return;
        }
        self.state.detail_loading = true;
        self.state.detail_error = None;
        self.state.detail_type = Some(DetailType::Resource);
        self.emit();

        match self.fetch_resource(code).await {
            Ok(reference) => {
                let state = &mut self.state;
                state.selected_work = None;
                state.breadcrumbs = reference.section_names.clone();
                state.current_path = reference.section_path.clone();
                if options.record_history {
                    state.history.record(
                        HistoryEntry::resource(reference.database.clone(), reference.code.clone())
                            .with_sections(
                                reference.section_path.clone(),
                                reference.section_names.clone(),
                            ),
                    );
                }
                state.selected_resource = Some(reference);
                state.detail_error = None;
            }
            Err(err) => {
                log::warn!("Failed to load resource {code}: {err}");
                self.state.selected_resource = None;
                self.state.detail_error = Some(err.to_string());
            }
        }
        self.state.detail_loading = false;
        self.emit();
    }

    async fn fetch_resource(&self, code: &str) -> Result<ResourceReference> {
        self.source
            .resource_reference(code)
            .await?
            .ok_or_else(|| NavigatorError::ResourceNotFound(code.to_string()))
    }

    /// Jump to the ancestor at `index` of the current path.
    pub async fn focus_breadcrumb(&mut self, index: usize) {
        let Some(code) = self.state.current_path.get(index).cloned() else {
            return;
        };
        self.state.current_path.truncate(index + 1);
        self.state.breadcrumbs.truncate(index + 1);
        self.emit();
        self.expand_node(&code, ExpandOptions::ensure_expanded()).await;
    }

    /// Resolve a suggestion or search hit: switch database when needed,
    /// expand its ancestors and select it.
    pub async fn open_target(&mut self, target: &NavigationTarget) {
        match target {
            NavigationTarget::Section { database, path } => {
                self.reveal(database, path).await;
                let names = path
                    .iter()
                    .filter_map(|code| self.state.tree.find(code).map(|node| node.name.clone()))
                    .collect();
                self.state.current_path = path.clone();
                self.state.breadcrumbs = names;
                self.emit();
            }
            NavigationTarget::Work {
                database,
                code,
                section_path,
            } => {
                self.reveal(database, section_path).await;
                self.select_work(code, SelectOptions::default()).await;
            }
            NavigationTarget::Resource { code } => {
                self.select_resource(code, SelectOptions::default()).await;
            }
        }
    }

    async fn reveal(&mut self, database: &str, path: &[String]) {
        if self.state.current_database.as_deref() != Some(database) {
            self.load_sections(Some(database)).await;
        }
        for code in path.iter().filter(|code| !code.is_empty()) {
            self.expand_node(code, ExpandOptions::ensure_expanded()).await;
        }
    }

    /// Step through history and re-resolve the destination. Returns `false`
    /// when there was nowhere to go.
    pub async fn navigate_history(&mut self, direction: HistoryDirection) -> bool {
        let Some(entry) = self.state.history.step(direction) else {
            return false;
        };
        self.emit();
        match entry.kind {
            DetailType::Work => {
                self.reveal(&entry.database, &entry.section_path).await;
                self.select_work(&entry.code, SelectOptions::replay()).await;
            }
            DetailType::Resource => {
                self.select_resource(&entry.code, SelectOptions::replay()).await;
            }
        }
        true
    }

    pub async fn go_back(&mut self) -> bool {
        self.navigate_history(HistoryDirection::Back).await
    }

    pub async fn go_forward(&mut self) -> bool {
        self.navigate_history(HistoryDirection::Forward).await
    }
}

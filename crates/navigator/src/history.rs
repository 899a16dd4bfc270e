use serde::Serialize;

/// What a history entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailType {
    Work,
    Resource,
}

/// A visited destination. Entries compare equal on kind, database and code;
/// the breadcrumb data is carried along for replay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: DetailType,
    pub database: String,
    pub code: String,
    pub section_path: Vec<String>,
    pub section_names: Vec<String>,
}

impl PartialEq for HistoryEntry {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.database == other.database && self.code == other.code
    }
}

impl Eq for HistoryEntry {}

impl HistoryEntry {
    pub fn work(database: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(DetailType::Work, database, code)
    }

    pub fn resource(database: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(DetailType::Resource, database, code)
    }

    fn new(kind: DetailType, database: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            kind,
            database: database.into(),
            code: code.into(),
            section_path: Vec::new(),
            section_names: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_sections(mut self, path: Vec<String>, names: Vec<String>) -> Self {
        self.section_path = path;
        self.section_names = names;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    Back,
    Forward,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub current: Option<HistoryEntry>,
}

/// Linear back/forward history. Recording a new destination discards the
/// forward branch.
#[derive(Debug, Clone, Default)]
pub struct HistoryStack {
    past: Vec<HistoryEntry>,
    current: Option<HistoryEntry>,
    future: Vec<HistoryEntry>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        if self.current.as_ref() == Some(&entry) {
            self.current = Some(entry);
            return;
        }
        if let Some(previous) = self.current.replace(entry) {
            self.past.push(previous);
        }
        self.future.clear();
    }

    /// Move one step and return the new current entry, or `None` when there
    /// is nowhere to go.
    pub fn step(&mut self, direction: HistoryDirection) -> Option<HistoryEntry> {
        let current = self.current.take()?;
        let (source, destination) = match direction {
            HistoryDirection::Back => (&mut self.past, &mut self.future),
            HistoryDirection::Forward => (&mut self.future, &mut self.past),
        };
        let Some(next) = source.pop() else {
            self.current = Some(current);
            return None;
        };
        destination.push(current);
        self.current = Some(next.clone());
        Some(next)
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.current.as_ref()
    }

    pub fn past(&self) -> &[HistoryEntry] {
        &self.past
    }

    pub fn future(&self) -> &[HistoryEntry] {
        &self.future
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            can_go_back: !self.past.is_empty(),
            can_go_forward: !self.future.is_empty(),
            current: self.current.clone(),
        }
    }
}

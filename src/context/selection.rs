use super::{ContextSources, LOGS_LABEL};

pub const OPENED_CONTENT_ID: &str = "opened_content";
pub const OPENED_ALIAS: &str = "opened";
pub const LOGS_ID: &str = "logs";

fn is_opened_id(id: &str) -> bool {
    id == OPENED_CONTENT_ID || id == OPENED_ALIAS
}

/// Ids a file source may never use because the selection grammar claims them.
pub fn is_reserved_id(id: &str) -> bool {
    is_opened_id(id) || id == LOGS_ID
}

/// A selectable context source other than the opened item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceId {
    Logs,
    File(String),
}

impl SourceId {
    pub fn parse(id: &str) -> Self {
        match id.trim() {
            LOGS_ID => Self::Logs,
            other => Self::File(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContextSelection {
    /// Whatever single artifact is currently open.
    #[default]
    OpenedContent,
    /// Explicit sources, in selection order.
    Sources(Vec<SourceId>),
}

impl ContextSelection {
    /// Parse a comma separated list such as `logs,boot.log`. `opened` or
    /// `opened_content` anywhere selects the opened item.
    pub fn parse(list: &str) -> Self {
        let mut ids: Vec<SourceId> = Vec::new();
        for raw in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if is_opened_id(raw) {
                return Self::OpenedContent;
            }
            let id = SourceId::parse(raw);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Self::Sources(ids).normalized()
    }

    /// An empty explicit selection falls back to the opened item.
    pub fn normalized(self) -> Self {
        match self {
            Self::Sources(ids) if ids.is_empty() => Self::OpenedContent,
            other => other,
        }
    }

    /// Toggle one entry the way a multi-select checklist does: the opened
    /// item replaces everything, any other id drops the opened item and
    /// flips its own membership.
    pub fn toggle(&mut self, id: &str) {
        if is_opened_id(id.trim()) {
            *self = Self::OpenedContent;
            return;
        }

        let source = SourceId::parse(id);
        let mut ids = match std::mem::take(self) {
            Self::OpenedContent => Vec::new(),
            Self::Sources(ids) => ids,
        };
        if let Some(index) = ids.iter().position(|existing| *existing == source) {
            ids.remove(index);
        } else {
            ids.push(source);
        }
        *self = Self::Sources(ids).normalized();
    }

    pub fn contains(&self, id: &SourceId) -> bool {
        match self {
            Self::OpenedContent => false,
            Self::Sources(ids) => ids.contains(id),
        }
    }

    /// "Opened Content", or the selected names: files in source order, then
    /// the execution logs.
    pub fn display_text(&self, sources: &ContextSources) -> String {
        if *self == Self::OpenedContent {
            return "Opened Content".to_string();
        }

        let mut names: Vec<&str> = sources
            .files
            .iter()
            .filter(|file| self.contains(&SourceId::File(file.id.clone())))
            .map(|file| file.name.as_str())
            .collect();
        if self.contains(&SourceId::Logs) {
            names.push(LOGS_LABEL);
        }
        names.join(", ")
    }
}

//! Context assembly: turns the selected sources into the text blob sent with
//! a question, plus the labels shown next to it.

mod selection;

pub use selection::{
    is_reserved_id, ContextSelection, SourceId, LOGS_ID, OPENED_ALIAS, OPENED_CONTENT_ID,
};

use anyhow::{Context, Result};
use std::path::PathBuf;

pub const LOGS_LABEL: &str = "Execution Logs";

/// The artifact currently open in the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenArtifact {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone)]
enum FileBody {
    Memory(String),
    Disk(PathBuf),
}

/// A named file whose text is read on demand.
#[derive(Debug, Clone)]
pub struct FileBuffer {
    pub id: String,
    pub name: String,
    body: FileBody,
}

impl FileBuffer {
    pub fn in_memory(
        id: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            body: FileBody::Memory(text.into()),
        }
    }

    /// A file on disk, identified and labelled by its file name.
    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            id: name.clone(),
            name,
            body: FileBody::Disk(path),
        }
    }

    pub async fn read_text(&self) -> Result<String> {
        match &self.body {
            FileBody::Memory(text) => Ok(text.clone()),
            FileBody::Disk(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read context file '{}'", path.display())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextSources {
    pub opened: Option<OpenArtifact>,
    pub logs: String,
    pub files: Vec<FileBuffer>,
}

impl ContextSources {
    pub fn file(&self, id: &str) -> Option<&FileBuffer> {
        self.files.iter().find(|file| file.id == id)
    }

    /// Register `file` under an id no other source answers to. An id that is
    /// reserved or already taken gets a `#2`, `#3`, ... suffix. Returns the
    /// id the file can be selected by.
    pub fn add_file(&mut self, mut file: FileBuffer) -> String {
        let base = file.id.trim().replace(',', "_");
        let mut id = base.clone();
        let mut suffix = 2;
        while id.is_empty() || is_reserved_id(&id) || self.file(&id).is_some() {
            id = format!("{base}#{suffix}");
            suffix += 1;
        }
        file.id = id.clone();
        self.files.push(file);
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssembledContext {
    pub text: String,
    pub labels: Vec<String>,
}

pub async fn assemble(
    selection: &ContextSelection,
    sources: &ContextSources,
) -> Result<AssembledContext> {
    let ids = match selection.clone().normalized() {
        ContextSelection::OpenedContent => return Ok(assemble_opened(sources)),
        ContextSelection::Sources(ids) => ids,
    };

    let mut assembled = AssembledContext::default();
    for id in &ids {
        match id {
            SourceId::Logs => push_block(&mut assembled, LOGS_LABEL, LOGS_LABEL, &sources.logs),
            SourceId::File(file_id) => {
                let Some(file) = sources.file(file_id) else {
                    tracing::warn!(source = %file_id, "skipping unknown context source");
                    continue;
                };
                let text = file.read_text().await?;
                push_block(&mut assembled, &format!("File {}", file.name), &file.name, &text);
            }
        }
    }

    if assembled.labels.is_empty() {
        return Ok(assemble_opened(sources));
    }
    Ok(assembled)
}

fn assemble_opened(sources: &ContextSources) -> AssembledContext {
    let mut assembled = AssembledContext::default();
    match &sources.opened {
        Some(artifact) => push_block(
            &mut assembled,
            &format!("File {}", artifact.name),
            &artifact.name,
            &artifact.text,
        ),
        None => push_block(&mut assembled, LOGS_LABEL, LOGS_LABEL, &sources.logs),
    }
    assembled
}

fn push_block(assembled: &mut AssembledContext, heading: &str, label: &str, content: &str) {
    assembled.text.push_str(heading);
    assembled.text.push_str(":\n");
    assembled.text.push_str(content);
    assembled.text.push_str("\n\n");
    assembled.labels.push(label.to_string());
}

//! Hand-off of serialized triples to whatever loads them into a graph store.

use async_trait::async_trait;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::ImportResult;
use crate::rdf::TripleDocument;

/// Where an imported document ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReceipt {
    pub facility_uri: String,
    pub location: String,
    pub triple_count: usize,
    pub bytes: usize,
}

#[async_trait]
pub trait GraphImporter: Send + Sync {
    async fn import(&self, document: &TripleDocument) -> ImportResult<ImportReceipt>;
}

/// Stores each document as `{dir}/{name}.{ext}`, standing in for the object
/// store a bulk graph import reads from.
#[derive(Debug, Clone)]
pub struct DirectoryImporter {
    root: PathBuf,
}

impl DirectoryImporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, document: &TripleDocument) -> PathBuf {
        self.root.join(document.file_name())
    }
}

#[async_trait]
impl GraphImporter for DirectoryImporter {
    async fn import(&self, document: &TripleDocument) -> ImportResult<ImportReceipt> {
        fs::create_dir_all(&self.root).await?;
        let path = self.path_for(document);
        write_atomic(&path, document.content.as_bytes()).await?;

        tracing::info!(
            path = %path.display(),
            facility = %document.facility_uri,
            triples = document.triple_count,
            "triple document stored"
        );
        Ok(ImportReceipt {
            facility_uri: document.facility_uri.clone(),
            location: path.display().to_string(),
            triple_count: document.triple_count,
            bytes: document.content.len(),
        })
    }
}

/// Writes a uniquely named temp file next to `path` and renames it over
/// `path`, so readers never observe a partial file and concurrent writers
/// never share a temp file.
pub async fn write_atomic(path: &Path, content: &[u8]) -> ImportResult<()> {
    let path = path.to_path_buf();
    let content = content.to_vec();
    tokio::task::spawn_blocking(move || persist_atomic(&path, &content))
        .await
        .map_err(io::Error::other)??;
    Ok(())
}

fn persist_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".cobie-graph-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    // On failure the temp file is removed when the handle drops.
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

//! On-device gateway: one JSON document per data directory.
//!
//! Every write rewrites the whole document into a temp file in the same
//! directory and renames it over the old one, so a crash mid-write leaves
//! either the old or the new document, never a torn one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

use super::{GatewayResult, PersistenceGateway, apply_many};
use crate::core::{GatewayError, Manuscript, ManuscriptPatch, UserSettings};

pub const DOCUMENT_FILE: &str = "manutrack.json";
const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalDocument {
    version: u32,
    #[serde(default)]
    manuscripts: Vec<Manuscript>,
    #[serde(default)]
    settings: Option<UserSettings>,
}

impl Default for LocalDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            manuscripts: Vec::new(),
            settings: None,
        }
    }
}

pub struct LocalFileGateway {
    path: PathBuf,
    // Serializes read-modify-write cycles on the document.
    write_lock: Mutex<()>,
}

impl LocalFileGateway {
    /// Opens (creating if needed) the data directory. The document itself is
    /// created on first write; a missing document reads as empty.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> GatewayResult<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(DOCUMENT_FILE),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> GatewayResult<LocalDocument> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(LocalDocument::default()),
            Err(err) => return Err(err.into()),
        };

        let document: LocalDocument = serde_json::from_reader(BufReader::new(file))?;
        if document.version > DOCUMENT_VERSION {
            return Err(GatewayError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} has format version {}, this build reads up to {}",
                    self.path.display(),
                    document.version,
                    DOCUMENT_VERSION
                ),
            )));
        }
        Ok(document)
    }

    fn write_document(&self, document: &LocalDocument) -> GatewayResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|err| GatewayError::Io(err.error))?;
        debug!(path = %self.path.display(), manuscripts = document.manuscripts.len(), "local document written");
        Ok(())
    }

    /// Read-modify-write under the document lock. Nothing is written when
    /// `change` fails.
    async fn modify<T>(
        &self,
        change: impl FnOnce(&mut LocalDocument) -> GatewayResult<T>,
    ) -> GatewayResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document()?;
        let output = change(&mut document)?;
        document.version = DOCUMENT_VERSION;
        self.write_document(&document)?;
        Ok(output)
    }
}

#[async_trait]
impl PersistenceGateway for LocalFileGateway {
    async fn list(&self) -> GatewayResult<Vec<Manuscript>> {
        let _guard = self.write_lock.lock().await;
        Ok(self.read_document()?.manuscripts)
    }

    async fn create(&self, manuscript: Manuscript) -> GatewayResult<Manuscript> {
        self.modify(|document| {
            if document.manuscripts.iter().any(|m| m.id == manuscript.id) {
                return Err(GatewayError::AlreadyExists(manuscript.id));
            }
            let stored = manuscript.normalized();
            document.manuscripts.insert(0, stored.clone());
            Ok(stored)
        })
        .await
    }

    async fn update(&self, manuscript: Manuscript) -> GatewayResult<Manuscript> {
        self.modify(|document| {
            let Some(slot) = document.manuscripts.iter_mut().find(|m| m.id == manuscript.id) else {
                return Err(GatewayError::NotFound(manuscript.id));
            };
            *slot = manuscript.normalized();
            Ok(slot.clone())
        })
        .await
    }

    async fn update_many(&self, ids: &[String], changes: &ManuscriptPatch) -> GatewayResult<()> {
        self.modify(|document| {
            apply_many(&mut document.manuscripts, ids, changes);
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> GatewayResult<()> {
        self.modify(|document| {
            let before = document.manuscripts.len();
            document.manuscripts.retain(|m| m.id != id);
            if document.manuscripts.len() == before {
                return Err(GatewayError::NotFound(id.to_string()));
            }
            Ok(())
        })
        .await
    }

    async fn load_settings(&self) -> GatewayResult<Option<UserSettings>> {
        let _guard = self.write_lock.lock().await;
        Ok(self.read_document()?.settings)
    }

    async fn save_settings(&self, settings: UserSettings) -> GatewayResult<UserSettings> {
        self.modify(|document| {
            document.settings = Some(settings.clone());
            Ok(settings)
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

//! Filesystem-backed [`SaveSlotStore`].

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use narrator_core::error::EngineError;
use narrator_core::repository::SaveSlotStore;
use narrator_core::snapshot::GameSave;
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::format::SaveFormat;

/// Stores each slot as `<root>/<slot_id>.<ext>`.
#[derive(Debug, Clone)]
pub struct FileSlotStore {
    root: PathBuf,
    format: SaveFormat,
}

impl FileSlotStore {
    /// Creates a store rooted at `root`. The directory is created on the
    /// first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, format: SaveFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    /// Directory holding the slot files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Encoding used for new and existing slots.
    #[must_use]
    pub fn format(&self) -> SaveFormat {
        self.format
    }

    fn slot_path(&self, slot_id: &str) -> Result<PathBuf, EngineError> {
        let valid = !slot_id.is_empty()
            && slot_id != "."
            && slot_id != ".."
            && !slot_id.contains(['/', '\\'])
            && !slot_id.contains('\0');
        if !valid {
            return Err(EngineError::Validation(format!(
                "invalid save slot id `{slot_id}`"
            )));
        }
        Ok(self
            .root
            .join(format!("{slot_id}.{}", self.format.extension())))
    }
}

fn infrastructure(err: &io::Error) -> EngineError {
    EngineError::Infrastructure(err.to_string())
}

/// Writes to a sibling temp file, then swaps it into place.
async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut tmp_name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, bytes).await?;

    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }
    }
    if let Err(err) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(err);
    }
    Ok(())
}

#[async_trait]
impl SaveSlotStore for FileSlotStore {
    #[instrument(skip(self, save))]
    async fn save(&self, slot_id: &str, save: &GameSave) -> Result<(), EngineError> {
        let path = self.slot_path(slot_id)?;
        let bytes = self.format.encode(save)?;
        write_atomic(&path, &bytes)
            .await
            .map_err(|e| infrastructure(&e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "slot written");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load(&self, slot_id: &str) -> Result<GameSave, EngineError> {
        let path = self.slot_path(slot_id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(EngineError::SlotNotFound(slot_id.to_owned()));
            }
            Err(err) => return Err(infrastructure(&err)),
        };
        self.format.decode(&bytes)
    }

    async fn slot_exists(&self, slot_id: &str) -> Result<bool, EngineError> {
        let path = self.slot_path(slot_id)?;
        fs::try_exists(&path).await.map_err(|e| infrastructure(&e))
    }

    async fn list_slots(&self) -> Result<Vec<String>, EngineError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(infrastructure(&err)),
        };

        let mut slots = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| infrastructure(&e))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(self.format.extension()) {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) => slots.push(stem.to_owned()),
                None => warn!(path = %path.display(), "skipping slot file with non-UTF-8 name"),
            }
        }
        slots.sort();
        Ok(slots)
    }

    #[instrument(skip(self))]
    async fn delete(&self, slot_id: &str) -> Result<(), EngineError> {
        let path = self.slot_path(slot_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(infrastructure(&err)),
        }
    }
}

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::BuilderError;
use crate::store::{REQUIRED_TABLES, ReferenceStore, StoreSummary};
use crate::util::{ensure_directory, sha256_file};

const STORE_FILE_NAME: &str = "references.db";
const STAGING_FILE_NAME: &str = "references.db.partial";

/// Directory holding one uploaded reference store and the generated
/// configurations. Each workspace has at most one active store.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub message: String,
    pub db_path: String,
    pub bytes: u64,
    pub sha256: String,
    pub schema: Vec<String>,
    pub store: StoreSummary,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn store_path(&self) -> PathBuf {
        self.uploads_dir().join(STORE_FILE_NAME)
    }

    pub fn has_store(&self) -> bool {
        self.store_path().is_file()
    }

    pub fn load_store(&self) -> Result<Arc<ReferenceStore>, BuilderError> {
        if !self.has_store() {
            return Err(BuilderError::StoreUninitialized);
        }
        ReferenceStore::open(&self.store_path())
    }

    /// Copies `source` into the workspace, replacing any previous store.
    ///
    /// The copy is staged and only renamed into place once the schema check
    /// passes, so a rejected upload leaves the previous store untouched.
    pub fn install_store(&self, source: &Path) -> Result<UploadReport, BuilderError> {
        let is_db = source
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(".db"));
        if !is_db {
            return Err(BuilderError::InvalidValue {
                field: "file".to_string(),
                reason: "only .db files are allowed".to_string(),
            });
        }
        if !source.is_file() {
            return Err(BuilderError::InvalidValue {
                field: "file".to_string(),
                reason: format!("no file at {}", source.display()),
            });
        }

        let uploads_dir = self.uploads_dir();
        ensure_directory(&uploads_dir)?;
        let staging = uploads_dir.join(STAGING_FILE_NAME);

        let bytes = copy_with_progress(source, &staging)?;
        let store = match ReferenceStore::open(&staging) {
            Ok(store) => store,
            Err(err) => {
                discard(&staging);
                return Err(err);
            }
        };
        let mut summary = store.summary();
        drop(store);

        let destination = self.store_path();
        fs::rename(&staging, &destination)
            .map_err(|err| BuilderError::io("install reference store", &destination, err))?;
        summary.source = destination.display().to_string();

        let sha256 = sha256_file(&destination)?;
        info!(
            path = %destination.display(),
            bytes,
            sha256 = %sha256,
            "reference store installed"
        );

        Ok(UploadReport {
            message: "Reference DB uploaded successfully".to_string(),
            db_path: destination.display().to_string(),
            bytes,
            sha256,
            schema: REQUIRED_TABLES.into_iter().map(ToOwned::to_owned).collect(),
            store: summary,
        })
    }

    /// Deletes the installed store. Returns whether a file was removed.
    pub fn remove_store(&self) -> Result<bool, BuilderError> {
        discard(&self.uploads_dir().join(STAGING_FILE_NAME));

        let path = self.store_path();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .map_err(|err| BuilderError::io("delete reference store", &path, err))?;
        info!(path = %path.display(), "reference store deleted");
        Ok(true)
    }
}

/// Percentage of an upload copied so far; only ever moves forward.
#[derive(Debug, Clone)]
pub struct UploadProgress {
    total: u64,
    copied: u64,
    percent: Option<u8>,
}

impl UploadProgress {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            copied: 0,
            percent: None,
        }
    }

    /// Records `bytes` more copied; returns the percentage when it grew.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.copied = self.copied.saturating_add(bytes);
        let percent = if self.total == 0 {
            100
        } else {
            let scaled = (u128::from(self.copied) * 100 + u128::from(self.total) / 2)
                / u128::from(self.total);
            scaled.min(100) as u8
        };

        if self.percent.is_some_and(|previous| previous >= percent) {
            return None;
        }
        self.percent = Some(percent);
        Some(percent)
    }
}

fn copy_with_progress(source: &Path, destination: &Path) -> Result<u64, BuilderError> {
    let mut reader =
        File::open(source).map_err(|err| BuilderError::io("open upload", source, err))?;
    let total = reader
        .metadata()
        .map_err(|err| BuilderError::io("inspect upload", source, err))?
        .len();
    let mut writer = File::create(destination)
        .map_err(|err| BuilderError::io("create staged store", destination, err))?;

    let mut progress = UploadProgress::new(total);
    let mut buf = vec![0_u8; 64 * 1024];
    let mut copied = 0_u64;

    loop {
        let count = reader
            .read(&mut buf)
            .map_err(|err| BuilderError::io("read upload", source, err))?;
        if count == 0 {
            break;
        }
        writer
            .write_all(&buf[..count])
            .map_err(|err| BuilderError::io("write staged store", destination, err))?;
        copied += count as u64;

        if let Some(percent) = progress.advance(count as u64) {
            debug!(percent, copied, total, "upload progress");
        }
    }

    writer
        .flush()
        .map_err(|err| BuilderError::io("flush staged store", destination, err))?;
    Ok(copied)
}

fn discard(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %err, "failed to remove staged store");
    }
}

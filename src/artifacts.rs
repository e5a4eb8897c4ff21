use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::BuilderError;
use crate::util::utc_string;

const FILE_NAME_PATTERN: &str = r"^[A-Za-z0-9._-]+$";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationEntry {
    pub file_name: String,
    pub file_path: String,
    pub created_at: String,
    #[serde(skip)]
    modified: SystemTime,
}

/// Generated configurations, newest first. A missing directory is empty.
pub fn list_configurations(output_dir: &Path) -> Result<Vec<ConfigurationEntry>, BuilderError> {
    if !output_dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(output_dir)
        .map_err(|err| BuilderError::io("read output directory", output_dir, err))?;

    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| BuilderError::io("read output entry", output_dir, err))?;
        let path = entry.path();

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !file_name.ends_with(".json") {
            continue;
        }

        let metadata = entry
            .metadata()
            .map_err(|err| BuilderError::io("inspect configuration", &path, err))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata
            .modified()
            .map_err(|err| BuilderError::io("read modification time", &path, err))?;

        out.push(ConfigurationEntry {
            file_name: file_name.to_string(),
            file_path: path.display().to_string(),
            created_at: utc_string(DateTime::<Utc>::from(modified)),
            modified,
        });
    }

    out.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.file_name.cmp(&a.file_name))
    });
    Ok(out)
}

/// Path of an existing configuration, rejecting names that could escape
/// `output_dir`.
pub fn configuration_path(output_dir: &Path, file_name: &str) -> Result<PathBuf, BuilderError> {
    let pattern = Regex::new(FILE_NAME_PATTERN).map_err(|err| BuilderError::InvalidValue {
        field: "fileName".to_string(),
        reason: err.to_string(),
    })?;
    if !pattern.is_match(file_name) || file_name.starts_with('.') {
        return Err(BuilderError::InvalidValue {
            field: "fileName".to_string(),
            reason: format!("'{file_name}' is not a plain file name"),
        });
    }

    let path = output_dir.join(file_name);
    if !path.is_file() {
        return Err(BuilderError::NotFound {
            entity: "configuration",
            key: file_name.to_string(),
            table: "output directory",
        });
    }
    Ok(path)
}

pub fn read_configuration(output_dir: &Path, file_name: &str) -> Result<Vec<u8>, BuilderError> {
    let path = configuration_path(output_dir, file_name)?;
    fs::read(&path).map_err(|err| BuilderError::io("read configuration", &path, err))
}

pub fn delete_configuration(output_dir: &Path, file_name: &str) -> Result<PathBuf, BuilderError> {
    let path = configuration_path(output_dir, file_name)?;
    fs::remove_file(&path).map_err(|err| BuilderError::io("delete configuration", &path, err))?;
    info!(path = %path.display(), "configuration deleted");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn missing_output_directory_lists_nothing() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let listed = list_configurations(&dir.path().join("output")).expect("list");
        assert!(listed.is_empty());
    }

    #[test]
    fn lists_json_files_newest_first() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let older = dir.path().join("app-1.json");
        let newer = dir.path().join("app-2.json");
        fs::write(&older, b"{}").expect("write older");
        fs::write(&newer, b"{}").expect("write newer");
        fs::write(dir.path().join("notes.txt"), b"skip").expect("write notes");
        fs::create_dir(dir.path().join("nested.json")).expect("create dir");

        let past = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&older)
            .and_then(|file| file.set_modified(past))
            .expect("set mtime");

        let listed = list_configurations(dir.path()).expect("list");
        let names: Vec<&str> = listed.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["app-2.json", "app-1.json"]);
        assert!(listed[0].created_at.ends_with('Z'));
    }

    #[test]
    fn read_and_delete_existing_configuration() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::write(dir.path().join("app-5.json"), b"{\"studyId\":\"s\"}").expect("write");

        let bytes = read_configuration(dir.path(), "app-5.json").expect("read");
        assert_eq!(bytes, b"{\"studyId\":\"s\"}");

        delete_configuration(dir.path(), "app-5.json").expect("delete");
        let err = read_configuration(dir.path(), "app-5.json").expect_err("gone");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn traversal_names_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        for name in ["../secret.json", "a/b.json", "..", ""] {
            let err = configuration_path(dir.path(), name).expect_err("unsafe name");
            assert_eq!(err.status_code(), 400, "name {name:?}");
        }
    }
}

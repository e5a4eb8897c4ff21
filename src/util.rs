use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::BuilderError;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn now_unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn utc_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn ensure_directory(path: &Path) -> Result<(), BuilderError> {
    fs::create_dir_all(path).map_err(|err| BuilderError::io("create directory", path, err))
}

pub fn sha256_file(path: &Path) -> Result<String, BuilderError> {
    let mut file =
        File::open(path).map_err(|err| BuilderError::io("open file for hashing", path, err))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .map_err(|err| BuilderError::io("read file for hashing", path, err))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Writes pretty JSON to a file that must not exist yet.
pub fn write_json_pretty_new<T: Serialize>(path: &Path, value: &T) -> Result<(), BuilderError> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .map_err(|err| BuilderError::io("serialize json", path, io::Error::from(err)))?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| BuilderError::io("create json file", path, err))?;
    file.write_all(&data)
        .map_err(|err| BuilderError::io("write json file", path, err))?;
    file.write_all(b"\n")
        .map_err(|err| BuilderError::io("finalize json file", path, err))?;

    Ok(())
}

pub fn write_json_stdout<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, value)?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

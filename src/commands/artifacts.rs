use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::artifacts::{
    ConfigurationEntry, delete_configuration, list_configurations, read_configuration,
};
use crate::cli::{DownloadArgs, FileNameArgs, WorkspaceArgs};
use crate::util::write_json_stdout;
use crate::workspace::Workspace;

#[derive(Debug, Serialize)]
struct ListResponse {
    configurations: Vec<ConfigurationEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    message: String,
    file_path: String,
}

pub fn list(args: WorkspaceArgs) -> Result<()> {
    let output_dir = Workspace::new(&args.workspace).output_dir();
    let configurations = list_configurations(&output_dir)?;
    info!(
        output_dir = %output_dir.display(),
        count = configurations.len(),
        "listed configurations"
    );
    write_json_stdout(&ListResponse { configurations })
}

pub fn download(args: DownloadArgs) -> Result<()> {
    let output_dir = Workspace::new(&args.target.workspace.workspace).output_dir();
    let bytes = read_configuration(&output_dir, &args.target.file_name)?;

    match args.dest {
        Some(dest) => {
            fs::write(&dest, &bytes)
                .with_context(|| format!("failed to write {}", dest.display()))?;
            info!(
                file_name = %args.target.file_name,
                dest = %dest.display(),
                bytes = bytes.len(),
                "configuration downloaded"
            );
        }
        None => {
            let mut output = io::stdout().lock();
            output.write_all(&bytes)?;
            output.flush()?;
        }
    }
    Ok(())
}

pub fn delete(args: FileNameArgs) -> Result<()> {
    let output_dir = Workspace::new(&args.workspace.workspace).output_dir();
    let path = delete_configuration(&output_dir, &args.file_name)?;
    write_json_stdout(&DeleteResponse {
        message: "Configuration deleted successfully".to_string(),
        file_path: path.display().to_string(),
    })
}

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{SchemaArgs, UploadArgs, WorkspaceArgs};
use crate::store::inspect_schema;
use crate::util::write_json_stdout;
use crate::workspace::Workspace;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteReport {
    message: String,
    db_path: String,
    removed: bool,
}

pub fn upload(args: UploadArgs) -> Result<()> {
    let workspace = Workspace::new(&args.workspace.workspace);
    info!(
        workspace = %workspace.root().display(),
        file = %args.file.display(),
        "uploading reference database"
    );

    let report = workspace
        .install_store(&args.file)
        .with_context(|| format!("failed to upload {}", args.file.display()))?;
    write_json_stdout(&report)
}

pub fn delete(args: WorkspaceArgs) -> Result<()> {
    let workspace = Workspace::new(&args.workspace);
    let removed = workspace.remove_store()?;
    if !removed {
        warn!(path = %workspace.store_path().display(), "no reference database to delete");
    }

    write_json_stdout(&DeleteReport {
        message: "Uploaded database file deleted successfully".to_string(),
        db_path: workspace.store_path().display().to_string(),
        removed,
    })
}

pub fn schema(args: SchemaArgs) -> Result<()> {
    let report = inspect_schema(&args.db)
        .with_context(|| format!("failed to read schema of {}", args.db.display()))?;
    info!(
        path = %args.db.display(),
        valid = report.is_valid,
        missing = report.missing_tables.len(),
        "schema discovered"
    );
    write_json_stdout(&report)
}

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::WorkspaceArgs;
use crate::error::BuilderError;
use crate::store::StoreSummary;
use crate::util::{now_utc_string, write_json_stdout};
use crate::workspace::Workspace;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthReport {
    status: &'static str,
    timestamp: String,
    uploads_dir: bool,
    output_dir: bool,
    store: Option<StoreSummary>,
    store_error: Option<String>,
}

pub fn run(args: WorkspaceArgs) -> Result<()> {
    let workspace = Workspace::new(&args.workspace);
    info!(workspace = %workspace.root().display(), "health requested");

    let (store, store_error) = match workspace.load_store() {
        Ok(store) => (Some(store.summary()), None),
        Err(BuilderError::StoreUninitialized) => {
            warn!(path = %workspace.store_path().display(), "reference store missing");
            (None, None)
        }
        Err(err) => {
            warn!(
                path = %workspace.store_path().display(),
                error = %err,
                "reference store unreadable"
            );
            (None, Some(err.to_string()))
        }
    };

    write_json_stdout(&HealthReport {
        status: "OK",
        timestamp: now_utc_string(),
        uploads_dir: workspace.uploads_dir().is_dir(),
        output_dir: workspace.output_dir().is_dir(),
        store,
        store_error,
    })
}

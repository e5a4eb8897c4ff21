use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "appbuilder",
    version,
    about = "Build application configuration documents from a reference database"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install a reference database into the workspace
    Upload(UploadArgs),
    /// Remove the installed reference database
    DeleteStore(WorkspaceArgs),
    /// Report which required tables a database has
    Schema(SchemaArgs),
    /// List object classes of the installed reference database
    Classes(ClassesArgs),
    /// Resolve a child class name to its identifiers
    ResolveClass(ResolveClassArgs),
    /// List properties for a child/parent class pair
    Properties(PropertiesArgs),
    /// Assemble and write a configuration from a wizard input file
    Create(CreateArgs),
    /// List generated configurations, newest first
    List(WorkspaceArgs),
    /// Copy a generated configuration to a path or stdout
    Download(DownloadArgs),
    /// Delete a generated configuration
    DeleteConfig(FileNameArgs),
    /// Liveness and workspace summary
    Health(WorkspaceArgs),
    /// Print the selectable run-profile options
    Options,
}

#[derive(Args, Debug, Clone)]
pub struct WorkspaceArgs {
    #[arg(long, default_value = ".cache/appbuilder")]
    pub workspace: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[arg(long)]
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    #[arg(long)]
    pub db: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ClassesArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveClassArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[arg(long)]
    pub child_object_name: String,

    #[arg(long)]
    pub child_class_name: String,

    #[arg(long, default_value = "System")]
    pub parent_object_name: String,
}

#[derive(Args, Debug, Clone)]
pub struct PropertiesArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[arg(long)]
    pub child_class_id: i64,

    #[arg(long, default_value_t = 1)]
    pub parent_class_id: i64,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Wizard input JSON (study info, objects, run configuration)
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value_t = false)]
    pub allow_empty_objects: bool,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FileNameArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[arg(long)]
    pub file_name: String,
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub target: FileNameArgs,

    /// Destination path; stdout when omitted
    #[arg(long)]
    pub dest: Option<PathBuf>,
}

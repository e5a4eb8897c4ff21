use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::{ClassesArgs, PropertiesArgs, ResolveClassArgs};
use crate::model::{
    CORE_OPTIONS, ENGINE_VERSIONS, MEMORY_OPTIONS, OPERATING_SYSTEMS, ReferenceClass,
    ReferenceProperty, RunProfile,
};
use crate::resolver;
use crate::util::write_json_stdout;
use crate::workspace::Workspace;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassesResponse<'a> {
    object_classes: &'a [ReferenceClass],
    count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PropertiesResponse {
    properties: Vec<ReferenceProperty>,
    count: usize,
    collection_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    engine_versions: &'static [&'static str],
    operating_systems: &'static [&'static str],
    cores: &'static [u32],
    memory: &'static [&'static str],
    initial_run_profile: RunProfile,
}

pub fn classes(args: ClassesArgs) -> Result<()> {
    let store = Workspace::new(&args.workspace.workspace).load_store()?;
    let classes = resolver::list_classes(&store);
    info!(count = classes.len(), "listed object classes");

    if args.json {
        return write_json_stdout(&ClassesResponse {
            object_classes: classes,
            count: classes.len(),
        });
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Classes: {}", classes.len())?;
    for class in classes {
        writeln!(
            output,
            "{}\tlang_id={}\tclass_id={}",
            class.name, class.lang_id, class.class_id
        )?;
    }
    output.flush()?;
    Ok(())
}

pub fn resolve_class(args: ResolveClassArgs) -> Result<()> {
    let store = Workspace::new(&args.workspace.workspace).load_store()?;
    let resolved = resolver::resolve_class(
        &store,
        &args.child_object_name,
        &args.child_class_name,
        Some(&args.parent_object_name),
    )?;
    info!(
        class = %resolved.child_class_name,
        child_class_lang_id = resolved.child_class_lang_id,
        child_class_id = resolved.child_class_id,
        "class resolved"
    );
    write_json_stdout(&resolved)
}

pub fn properties(args: PropertiesArgs) -> Result<()> {
    let store = Workspace::new(&args.workspace.workspace).load_store()?;
    let collection_id =
        resolver::find_collection(&store, args.child_class_id, args.parent_class_id)?
            .collection_id;
    let properties =
        resolver::resolve_properties(&store, args.child_class_id, args.parent_class_id)?;

    if args.json {
        return write_json_stdout(&PropertiesResponse {
            count: properties.len(),
            properties,
            collection_id,
        });
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(
        output,
        "Collection {collection_id}: {} properties",
        properties.len()
    )?;
    for property in &properties {
        writeln!(
            output,
            "{}\tlang_id={}\t{}",
            property.name, property.lang_id, property.description
        )?;
    }
    output.flush()?;
    Ok(())
}

pub fn options() -> Result<()> {
    write_json_stdout(&OptionsResponse {
        engine_versions: &ENGINE_VERSIONS,
        operating_systems: &OPERATING_SYSTEMS,
        cores: &CORE_OPTIONS,
        memory: &MEMORY_OPTIONS,
        initial_run_profile: RunProfile::default(),
    })
}

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assembler::{
    AssembleOptions, AssembledConfiguration, assemble_form, write_configuration,
};
use crate::cli::CreateArgs;
use crate::error::BuilderError;
use crate::form::{FormModel, ObjectId, ResolutionWarning};
use crate::model::{ConfigurationDocument, PropertyType, RunProfile, StudyInfo};
use crate::store::ReferenceStore;
use crate::util::{now_unix_millis, write_json_stdout};
use crate::workspace::Workspace;

/// Answers collected by the wizard, replayed through the form model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WizardInput {
    #[serde(flatten)]
    pub study: StudyInfo,
    pub objects: Vec<WizardObject>,
    pub run_configuration: Option<RunProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WizardObject {
    pub child_object_name: String,
    pub child_class_name: String,
    pub parent_object_name: Option<String>,
    pub properties: Vec<WizardProperty>,
    /// Row added and later deleted in the wizard.
    pub removed: bool,
}

/// A property selection, by lang id or by name from the resolved menu.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WizardProperty {
    pub property_lang_id: Option<String>,
    pub property_name: Option<String>,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    message: String,
    file_name: String,
    file_path: Option<String>,
    warnings: Vec<ResolutionWarning>,
    configuration: ConfigurationDocument,
}

pub fn run(args: CreateArgs) -> Result<()> {
    let workspace = Workspace::new(&args.workspace.workspace);
    let input = read_input(&args.input)?;
    let options = AssembleOptions {
        allow_empty_objects: args.allow_empty_objects,
    };

    let store = workspace.load_store()?;
    let (form, warnings) = build_form(&input, Some(store));
    info!(objects = form.len(), warnings = warnings.len(), "wizard input applied");
    if form.is_empty() && args.allow_empty_objects {
        warn!("creating configuration without input objects");
    }

    if let Some(profile) = form.run_profile() {
        let off_menu = profile.off_menu_fields();
        if !off_menu.is_empty() {
            warn!(fields = ?off_menu, "run configuration uses values outside the offered options");
        }
    }

    let assembled = assemble_form(&form, options, now_unix_millis())
        .context("failed to create configuration")?;

    let file_path = if args.dry_run {
        info!(file_name = %assembled.file_name, "dry-run: configuration not written");
        None
    } else {
        Some(write_configuration(&workspace.output_dir(), &assembled)?)
    };

    let AssembledConfiguration {
        file_name,
        configuration,
    } = assembled;
    write_json_stdout(&CreateResponse {
        message: "JSON configuration created successfully".to_string(),
        file_name,
        file_path: file_path.map(|path| path.display().to_string()),
        warnings,
        configuration,
    })
}

fn read_input(path: &Path) -> Result<WizardInput> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let input = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(input)
}

/// Replays wizard answers through the form model's edit operations.
///
/// Lookup misses are collected as warnings; whether the result is complete
/// enough is decided at assembly.
pub fn build_form(
    input: &WizardInput,
    store: Option<Arc<ReferenceStore>>,
) -> (FormModel, Vec<ResolutionWarning>) {
    let mut form = FormModel::new();
    let mut warnings = form.rebind_store(store);

    form.set_study(input.study.clone());
    if let Some(profile) = &input.run_configuration {
        form.set_run_profile(profile.clone());
    }

    for object in &input.objects {
        let id = form.add_object();
        if let Err(err) = apply_object(&mut form, id, object, &mut warnings) {
            warn!(error = %err, "failed to apply wizard object");
            warnings.push(ResolutionWarning {
                object: id,
                message: err.to_string(),
            });
        }

        if object.removed {
            match form.delete_object(id) {
                Ok(spec) => debug!(object = %spec.child_object_name, "dropped removed object"),
                Err(err) => warn!(error = %err, "failed to drop removed object"),
            }
            warnings.retain(|warning| warning.object != id);
        }
    }

    (form, warnings)
}

fn apply_object(
    form: &mut FormModel,
    id: ObjectId,
    object: &WizardObject,
    warnings: &mut Vec<ResolutionWarning>,
) -> Result<(), BuilderError> {
    if let Some(parent) = object.parent_object_name.as_deref().filter(|name| !name.is_empty()) {
        form.set_parent_object_name(id, parent)?;
    }
    warnings.extend(form.set_child_object_name(id, object.child_object_name.as_str())?);
    warnings.extend(form.set_child_class_name(id, object.child_class_name.as_str())?);
    debug!(
        object = %object.child_object_name,
        child_class_lang_id = ?form.object(id)?.child_class_lang_id,
        "object names applied"
    );

    for property in &object.properties {
        let index = form.add_property(id)?;
        if property.removed {
            form.delete_property(id, index)?;
            continue;
        }
        form.set_property_type(id, index, property.property_type)?;

        let selected = match (&property.property_lang_id, &property.property_name) {
            (Some(lang_id), _) if !lang_id.is_empty() => {
                form.set_property_lang_id(id, index, lang_id.as_str())
            }
            (_, Some(name)) if !name.is_empty() => form.select_property_by_name(id, index, name),
            _ => Ok(()),
        };
        if let Err(err) = selected {
            warn!(object = %object.child_object_name, error = %err, "property selection failed");
            warnings.push(ResolutionWarning {
                object: id,
                message: err.to_string(),
            });
        }
    }

    Ok(())
}

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::BuilderError;
use crate::form::FormModel;
use crate::model::{
    ButtonConfig, ConfigurationDocument, DEFAULT_CORES, DEFAULT_ENGINE_VERSION, DEFAULT_MEMORY,
    DEFAULT_OPERATING_SYSTEM, DashboardRef, EngineConfig, HorizonConfig, InputProperty,
    OPERATING_SYSTEMS, ObjectSpec, RunConfig, RunProfile, StudyInfo, WorkerPoolConfig,
};
use crate::util::write_json_pretty_new;

#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions {
    pub allow_empty_objects: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledConfiguration {
    pub file_name: String,
    pub configuration: ConfigurationDocument,
}

pub fn configuration_file_name(unix_millis: i64) -> String {
    format!("app-{unix_millis}.json")
}

pub fn assemble_form(
    form: &FormModel,
    options: AssembleOptions,
    unix_millis: i64,
) -> Result<AssembledConfiguration, BuilderError> {
    assemble(
        form.study(),
        form.objects(),
        form.run_profile(),
        options,
        unix_millis,
    )
}

/// Builds the configuration document. Inputs are not modified and the only
/// time-dependent part of the result is the file name.
pub fn assemble<'a>(
    study: &StudyInfo,
    objects: impl IntoIterator<Item = &'a ObjectSpec>,
    run_profile: Option<&RunProfile>,
    options: AssembleOptions,
    unix_millis: i64,
) -> Result<AssembledConfiguration, BuilderError> {
    let objects: Vec<&ObjectSpec> = objects.into_iter().collect();

    let mut missing = missing_study_fields(study);
    if objects.is_empty() && !options.allow_empty_objects {
        missing.push("objects".to_string());
    }
    if run_profile.is_none() {
        missing.push("runConfiguration".to_string());
    }

    let mut input_properties = Vec::with_capacity(objects.len());
    for (index, object) in objects.iter().enumerate() {
        if object.child_object_name.is_empty() {
            missing.push(format!("objects[{index}].childObjectName"));
        }
        if object.child_class_lang_id.is_none() {
            missing.push(format!("objects[{index}].childClassLangId"));
        }

        if let Some(child_class_lang_id) = object.child_class_lang_id {
            input_properties.push(InputProperty {
                child_object_name: object.child_object_name.clone(),
                child_class_lang_id,
                parent_class_lang_id: object.parent_class_lang_id,
                parent_object_name: object.parent_object_name.clone(),
                properties: object.properties.clone(),
            });
        }
    }

    let Some(run_profile) = run_profile.filter(|_| missing.is_empty()) else {
        return Err(BuilderError::Validation { fields: missing });
    };

    let configuration = ConfigurationDocument {
        study_id: study.study_id.clone(),
        changeset_id: study.changeset_id.clone(),
        model_info: study.model_info.clone(),
        buttons_config: vec![
            ButtonConfig {
                name: "save".to_string(),
                display_name: "Save".to_string(),
            },
            ButtonConfig {
                name: "run".to_string(),
                display_name: "Run App".to_string(),
            },
        ],
        input_properties,
        dashboards: vec![DashboardRef {
            config_id: study.dashboard_id.clone(),
        }],
        horizon: HorizonConfig { enabled: true },
        run_config: run_config(run_profile)?,
    };

    Ok(AssembledConfiguration {
        file_name: configuration_file_name(unix_millis),
        configuration,
    })
}

/// Writes the document under `output_dir`. An existing file with the same
/// name is never overwritten.
pub fn write_configuration(
    output_dir: &Path,
    assembled: &AssembledConfiguration,
) -> Result<PathBuf, BuilderError> {
    let path = output_dir.join(&assembled.file_name);
    write_json_pretty_new(&path, &assembled.configuration)?;

    info!(
        path = %path.display(),
        objects = assembled.configuration.input_properties.len(),
        "wrote configuration"
    );
    Ok(path)
}

fn missing_study_fields(study: &StudyInfo) -> Vec<String> {
    [
        ("studyId", study.study_id.as_str()),
        ("changesetId", study.changeset_id.as_str()),
        ("modelInfo.name", study.model_info.name.as_str()),
        ("modelInfo.displayName", study.model_info.display_name.as_str()),
        ("dashboardId", study.dashboard_id.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(field, _)| field.to_string())
    .collect()
}

fn run_config(profile: &RunProfile) -> Result<RunConfig, BuilderError> {
    let operating_system = or_default(&profile.operating_system, DEFAULT_OPERATING_SYSTEM);
    if !OPERATING_SYSTEMS.contains(&operating_system.as_str()) {
        return Err(BuilderError::InvalidValue {
            field: "operatingSystem".to_string(),
            reason: format!(
                "'{operating_system}' is not one of {}",
                OPERATING_SYSTEMS.join(", ")
            ),
        });
    }

    Ok(RunConfig {
        engine: EngineConfig {
            display_name: or_default(&profile.engine_version, DEFAULT_ENGINE_VERSION),
            operating_system: operating_system.clone(),
        },
        worker_pool: WorkerPoolConfig {
            os: operating_system,
            cores: if profile.cores == 0 {
                DEFAULT_CORES
            } else {
                profile.cores
            },
            memory: or_default(&profile.memory, DEFAULT_MEMORY),
        },
    })
}

fn or_default(value: &str, default: &str) -> String {
    let chosen = if value.is_empty() { default } else { value };
    chosen.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelInfo, PropertySpec, PropertyType};

    fn study() -> StudyInfo {
        StudyInfo {
            study_id: "study-42".to_string(),
            changeset_id: "cs-7".to_string(),
            model_info: ModelInfo {
                name: "Base".to_string(),
                display_name: "Base Model".to_string(),
            },
            dashboard_id: "dash-1".to_string(),
        }
    }

    fn generator() -> ObjectSpec {
        ObjectSpec {
            child_object_name: "Gen1".to_string(),
            child_class_name: "Generator".to_string(),
            child_class_lang_id: Some(7),
            child_class_id: Some(3),
            properties: vec![PropertySpec {
                property_lang_id: "102".to_string(),
                property_type: PropertyType::FilePicker,
            }],
            ..ObjectSpec::default()
        }
    }

    fn unset_profile() -> RunProfile {
        RunProfile {
            engine_version: String::new(),
            operating_system: "Linux".to_string(),
            cores: 0,
            memory: String::new(),
        }
    }

    #[test]
    fn falsy_run_profile_fields_take_defaults() {
        let objects = [generator()];
        let assembled = assemble(
            &study(),
            &objects,
            Some(&unset_profile()),
            AssembleOptions::default(),
            1_700_000_000_000,
        )
        .expect("document should assemble");

        let run = &assembled.configuration.run_config;
        assert_eq!(run.engine.display_name, "10.0 R07");
        assert_eq!(run.engine.operating_system, "Linux");
        assert_eq!(run.worker_pool.os, "Linux");
        assert_eq!(run.worker_pool.cores, 2);
        assert_eq!(run.worker_pool.memory, "16GB");
        assert_eq!(assembled.file_name, "app-1700000000000.json");
    }

    #[test]
    fn set_run_profile_fields_pass_through() {
        let profile = RunProfile {
            engine_version: "11.0 R02".to_string(),
            operating_system: "Windows".to_string(),
            cores: 20,
            memory: "999GB".to_string(),
        };
        let objects = [generator()];
        let assembled = assemble(&study(), &objects, Some(&profile), AssembleOptions::default(), 1)
            .expect("document should assemble");

        let run = &assembled.configuration.run_config;
        assert_eq!(run.engine.display_name, "11.0 R02");
        assert_eq!(run.worker_pool.os, "Windows");
        assert_eq!(run.worker_pool.cores, 20);
        assert_eq!(run.worker_pool.memory, "999GB");
    }

    #[test]
    fn document_matches_expected_json_shape() {
        let objects = [generator()];
        let assembled = assemble(
            &study(),
            &objects,
            Some(&unset_profile()),
            AssembleOptions::default(),
            5,
        )
        .expect("document should assemble");

        let value = serde_json::to_value(&assembled.configuration).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "studyId": "study-42",
                "changesetId": "cs-7",
                "modelInfo": { "name": "Base", "displayName": "Base Model" },
                "buttonsConfig": [
                    { "name": "save", "displayName": "Save" },
                    { "name": "run", "displayName": "Run App" }
                ],
                "inputProperties": [{
                    "childObjectName": "Gen1",
                    "childClassLangId": 7,
                    "parentClassLangId": 1,
                    "parentObjectName": "System",
                    "properties": [{ "propertyLangId": "102", "type": "1" }]
                }],
                "dashboards": [{ "configId": "dash-1" }],
                "horizon": { "enabled": true },
                "runConfig": {
                    "engine": { "displayName": "10.0 R07", "operatingSystem": "Linux" },
                    "workerPool": { "os": "Linux", "cores": 2, "memory": "16GB" }
                }
            })
        );
    }

    #[test]
    fn assembly_differs_only_in_file_name_across_calls() {
        let objects = [generator()];
        let profile = unset_profile();
        let first = assemble(&study(), &objects, Some(&profile), AssembleOptions::default(), 10)
            .expect("first");
        let second = assemble(&study(), &objects, Some(&profile), AssembleOptions::default(), 11)
            .expect("second");

        assert_eq!(first.configuration, second.configuration);
        assert_ne!(first.file_name, second.file_name);
        assert_eq!(objects[0], generator());
    }

    #[test]
    fn missing_inputs_are_listed_together() {
        let mut study = study();
        study.study_id.clear();
        study.dashboard_id.clear();

        let err = assemble(
            &study,
            std::iter::empty(),
            Some(&unset_profile()),
            AssembleOptions::default(),
            1,
        )
        .expect_err("missing fields should fail");
        match err {
            BuilderError::Validation { fields } => {
                assert_eq!(fields, vec!["studyId", "dashboardId", "objects"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_object_list_allowed_when_requested() {
        let assembled = assemble(
            &study(),
            std::iter::empty(),
            Some(&unset_profile()),
            AssembleOptions {
                allow_empty_objects: true,
            },
            1,
        )
        .expect("empty object list should be accepted");
        assert!(assembled.configuration.input_properties.is_empty());
    }

    #[test]
    fn unresolved_objects_block_assembly() {
        let mut unresolved = generator();
        unresolved.child_class_lang_id = None;

        let objects = [generator(), unresolved];
        let profile = unset_profile();
        let err = assemble(&study(), &objects, Some(&profile), AssembleOptions::default(), 1)
            .expect_err("unresolved object should fail");
        match err {
            BuilderError::Validation { fields } => {
                assert_eq!(fields, vec!["objects[1].childClassLangId"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn unselected_property_is_emitted_with_empty_lang_id() {
        let mut object = generator();
        object.properties = vec![PropertySpec::default()];

        let objects = [object];
        let profile = unset_profile();
        let assembled = assemble(&study(), &objects, Some(&profile), AssembleOptions::default(), 1)
            .expect("unselected property should not block assembly");

        let value = serde_json::to_value(&assembled.configuration.input_properties[0].properties)
            .expect("serialize");
        assert_eq!(value, serde_json::json!([{ "propertyLangId": "", "type": "0" }]));
    }

    #[test]
    fn missing_run_profile_is_reported() {
        let objects = [generator()];
        let err = assemble(&study(), &objects, None, AssembleOptions::default(), 1)
            .expect_err("run profile is required");
        match err {
            BuilderError::Validation { fields } => {
                assert_eq!(fields, vec!["runConfiguration"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_operating_system_is_rejected() {
        let mut profile = unset_profile();
        profile.operating_system = "Solaris".to_string();
        let objects = [generator()];

        let err = assemble(&study(), &objects, Some(&profile), AssembleOptions::default(), 1)
            .expect_err("solaris is not offered");
        assert!(matches!(
            err,
            BuilderError::InvalidValue { ref field, .. } if field == "operatingSystem"
        ));
    }

    #[test]
    fn write_configuration_creates_named_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let objects = [generator()];
        let profile = unset_profile();
        let assembled = assemble(&study(), &objects, Some(&profile), AssembleOptions::default(), 77)
            .expect("document should assemble");

        let path = write_configuration(dir.path(), &assembled).expect("write should succeed");
        assert_eq!(path, dir.path().join("app-77.json"));

        let raw = std::fs::read(&path).expect("file should exist");
        let parsed: ConfigurationDocument = serde_json::from_slice(&raw).expect("valid json");
        assert_eq!(parsed, assembled.configuration);

        assert!(write_configuration(dir.path(), &assembled).is_err());
    }
}

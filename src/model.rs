use serde::{Deserialize, Serialize};

/// Lang id the System class is assumed to occupy in every reference store.
///
/// This is not looked up: a store whose System class sits elsewhere yields
/// wrong `parentClassLangId` values without any error.
pub const SYSTEM_CLASS_LANG_ID: i64 = 1;
pub const SYSTEM_OBJECT_NAME: &str = "System";

pub const ENGINE_VERSIONS: [&str; 6] = [
    "11.0 R02", "11.0 R01", "10.0 R08", "10.0 R07", "10.0 R06", "10.0 R05",
];
pub const OPERATING_SYSTEMS: [&str; 2] = ["Linux", "Windows"];
pub const CORE_OPTIONS: [u32; 8] = [2, 4, 8, 16, 20, 32, 48, 64];
pub const MEMORY_OPTIONS: [&str; 8] = [
    "16GB", "32GB", "64GB", "128GB", "160GB", "256GB", "384GB", "512GB",
];

pub const DEFAULT_ENGINE_VERSION: &str = "10.0 R07";
pub const DEFAULT_OPERATING_SYSTEM: &str = "Linux";
pub const DEFAULT_CORES: u32 = 2;
pub const DEFAULT_MEMORY: &str = "16GB";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceClass {
    pub lang_id: i64,
    pub class_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceCollection {
    pub collection_id: i64,
    pub child_class_id: i64,
    pub parent_class_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceProperty {
    pub lang_id: i64,
    pub name: String,
    pub description: String,
    pub collection_id: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    #[default]
    #[serde(rename = "0")]
    Text,
    #[serde(rename = "1")]
    FilePicker,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    pub property_lang_id: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSpec {
    pub child_object_name: String,
    pub child_class_name: String,
    pub child_class_lang_id: Option<i64>,
    pub child_class_id: Option<i64>,
    pub parent_class_lang_id: i64,
    pub parent_object_name: String,
    pub properties: Vec<PropertySpec>,
}

impl Default for ObjectSpec {
    fn default() -> Self {
        Self {
            child_object_name: String::new(),
            child_class_name: String::new(),
            child_class_lang_id: None,
            child_class_id: None,
            parent_class_lang_id: SYSTEM_CLASS_LANG_ID,
            parent_object_name: SYSTEM_OBJECT_NAME.to_string(),
            properties: Vec::new(),
        }
    }
}

impl ObjectSpec {
    pub fn names_complete(&self) -> bool {
        !self.child_object_name.is_empty() && !self.child_class_name.is_empty()
    }

    pub fn clear_derived(&mut self) {
        self.child_class_lang_id = None;
        self.child_class_id = None;
        self.parent_class_lang_id = SYSTEM_CLASS_LANG_ID;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelInfo {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyInfo {
    pub study_id: String,
    pub changeset_id: String,
    pub model_info: ModelInfo,
    pub dashboard_id: String,
}

/// Engine and worker resources. Empty strings and zero cores mean "unset",
/// which is also what an absent field deserializes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProfile {
    #[serde(default)]
    pub engine_version: String,
    #[serde(default)]
    pub operating_system: String,
    #[serde(default)]
    pub cores: u32,
    #[serde(default)]
    pub memory: String,
}

/// The profile the wizard starts from.
impl Default for RunProfile {
    fn default() -> Self {
        Self {
            engine_version: DEFAULT_ENGINE_VERSION.to_string(),
            operating_system: DEFAULT_OPERATING_SYSTEM.to_string(),
            cores: 16,
            memory: "128GB".to_string(),
        }
    }
}

impl RunProfile {
    /// Fields holding a value that is set but not among the offered options.
    pub fn off_menu_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !self.engine_version.is_empty()
            && !ENGINE_VERSIONS.contains(&self.engine_version.as_str())
        {
            fields.push("engineVersion");
        }
        if !self.operating_system.is_empty()
            && !OPERATING_SYSTEMS.contains(&self.operating_system.as_str())
        {
            fields.push("operatingSystem");
        }
        if self.cores != 0 && !CORE_OPTIONS.contains(&self.cores) {
            fields.push("cores");
        }
        if !self.memory.is_empty() && !MEMORY_OPTIONS.contains(&self.memory.as_str()) {
            fields.push("memory");
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonConfig {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputProperty {
    pub child_object_name: String,
    pub child_class_lang_id: i64,
    pub parent_class_lang_id: i64,
    pub parent_object_name: String,
    pub properties: Vec<PropertySpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRef {
    pub config_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub display_name: String,
    pub operating_system: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    pub os: String,
    pub cores: u32,
    pub memory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub engine: EngineConfig,
    pub worker_pool: WorkerPoolConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDocument {
    pub study_id: String,
    pub changeset_id: String,
    pub model_info: ModelInfo,
    pub buttons_config: Vec<ButtonConfig>,
    pub input_properties: Vec<InputProperty>,
    pub dashboards: Vec<DashboardRef>,
    pub horizon: HorizonConfig,
    pub run_config: RunConfig,
}

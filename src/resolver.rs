use serde::Serialize;
use tracing::debug;

use crate::error::BuilderError;
use crate::model::{
    ReferenceClass, ReferenceCollection, ReferenceProperty, SYSTEM_CLASS_LANG_ID,
    SYSTEM_OBJECT_NAME,
};
use crate::store::ReferenceStore;

/// Identifiers derived for one object from its class name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassResolution {
    pub child_object_name: String,
    pub parent_object_name: String,
    pub child_class_lang_id: i64,
    pub child_class_id: i64,
    pub parent_class_lang_id: i64,
    pub child_class_name: String,
}

/// Looks up `child_class_name` in `t_class` by exact match.
///
/// The parent is always the System class; object names are carried through
/// untouched and never checked against `t_object`.
pub fn resolve_class(
    store: &ReferenceStore,
    child_object_name: &str,
    child_class_name: &str,
    parent_object_name: Option<&str>,
) -> Result<ClassResolution, BuilderError> {
    let mut missing = Vec::new();
    if child_object_name.is_empty() {
        missing.push("childObjectName");
    }
    if child_class_name.is_empty() {
        missing.push("childClassName");
    }
    if !missing.is_empty() {
        return Err(BuilderError::missing(missing));
    }

    let class = find_class(store, child_class_name).ok_or_else(|| BuilderError::NotFound {
        entity: "child class",
        key: child_class_name.to_string(),
        table: "t_class",
    })?;

    debug!(
        class = %class.name,
        lang_id = class.lang_id,
        class_id = class.class_id,
        "resolved child class"
    );

    Ok(ClassResolution {
        child_object_name: child_object_name.to_string(),
        parent_object_name: parent_object_name
            .filter(|name| !name.is_empty())
            .unwrap_or(SYSTEM_OBJECT_NAME)
            .to_string(),
        child_class_lang_id: class.lang_id,
        child_class_id: class.class_id,
        parent_class_lang_id: SYSTEM_CLASS_LANG_ID,
        child_class_name: class.name.clone(),
    })
}

/// Properties of the collection linking `child_class_id` to
/// `parent_class_id`, ordered by name.
pub fn resolve_properties(
    store: &ReferenceStore,
    child_class_id: i64,
    parent_class_id: i64,
) -> Result<Vec<ReferenceProperty>, BuilderError> {
    let collection = find_collection(store, child_class_id, parent_class_id)?;
    let properties = properties_for_collection(store, collection.collection_id);

    debug!(
        collection_id = collection.collection_id,
        count = properties.len(),
        "resolved properties"
    );
    Ok(properties)
}

/// First collection (lowest id) for the pair. Duplicate pairs are not
/// expected in a well-formed store.
pub fn find_collection(
    store: &ReferenceStore,
    child_class_id: i64,
    parent_class_id: i64,
) -> Result<&ReferenceCollection, BuilderError> {
    store
        .collections()
        .iter()
        .find(|c| c.child_class_id == child_class_id && c.parent_class_id == parent_class_id)
        .ok_or_else(|| BuilderError::NotFound {
            entity: "collection",
            key: format!("child_class_id={child_class_id}, parent_class_id={parent_class_id}"),
            table: "t_collection",
        })
}

pub fn properties_for_collection(
    store: &ReferenceStore,
    collection_id: i64,
) -> Vec<ReferenceProperty> {
    let mut properties: Vec<ReferenceProperty> = store
        .properties()
        .iter()
        .filter(|p| p.collection_id == collection_id)
        .cloned()
        .collect();
    properties.sort_by(|a, b| a.name.cmp(&b.name));
    properties
}

pub fn list_classes(store: &ReferenceStore) -> &[ReferenceClass] {
    store.classes()
}

fn find_class<'a>(store: &'a ReferenceStore, name: &str) -> Option<&'a ReferenceClass> {
    store.classes().iter().find(|class| class.name == name)
}

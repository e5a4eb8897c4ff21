use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::BuilderError;
use crate::model::{
    ObjectSpec, PropertySpec, PropertyType, ReferenceProperty, RunProfile, StudyInfo,
};
use crate::resolver;
use crate::store::{ReferenceStore, StoreId};

/// Stable identity of an object in the form, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(u64);

/// A lookup that failed while editing. Editing continues regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionWarning {
    pub object: ObjectId,
    pub message: String,
}

#[derive(Debug, Clone)]
struct ObjectEntry {
    id: ObjectId,
    spec: ObjectSpec,
    resolved_against: Option<StoreId>,
}

/// Wizard state for one session, bound to at most one reference store.
#[derive(Debug, Clone, Default)]
pub struct FormModel {
    store: Option<Arc<ReferenceStore>>,
    study: StudyInfo,
    objects: Vec<ObjectEntry>,
    menus: HashMap<ObjectId, Vec<ReferenceProperty>>,
    run_profile: Option<RunProfile>,
    next_id: u64,
}

impl FormModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn study(&self) -> &StudyInfo {
        &self.study
    }

    pub fn set_study(&mut self, study: StudyInfo) {
        self.study = study;
    }

    /// `None` until a run profile has been chosen.
    pub fn run_profile(&self) -> Option<&RunProfile> {
        self.run_profile.as_ref()
    }

    pub fn set_run_profile(&mut self, run_profile: RunProfile) {
        self.run_profile = Some(run_profile);
    }

    pub fn add_object(&mut self) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        self.objects.push(ObjectEntry {
            id,
            spec: ObjectSpec::default(),
            resolved_against: None,
        });
        id
    }

    /// Removes the object together with its candidate property menu.
    pub fn delete_object(&mut self, id: ObjectId) -> Result<ObjectSpec, BuilderError> {
        let position = self.position(id)?;
        let entry = self.objects.remove(position);
        self.menus.remove(&id);
        Ok(entry.spec)
    }

    #[cfg(test)]
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|entry| entry.id).collect()
    }

    pub fn object(&self, id: ObjectId) -> Result<&ObjectSpec, BuilderError> {
        let position = self.position(id)?;
        Ok(&self.objects[position].spec)
    }

    /// Object specs in display order.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectSpec> {
        self.objects.iter().map(|entry| &entry.spec)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Properties offered for selection on `id`; empty until resolved.
    pub fn candidate_menu(&self, id: ObjectId) -> &[ReferenceProperty] {
        self.menus.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn set_child_object_name(
        &mut self,
        id: ObjectId,
        name: impl Into<String>,
    ) -> Result<Vec<ResolutionWarning>, BuilderError> {
        let position = self.position(id)?;
        self.objects[position].spec.child_object_name = name.into();
        Ok(self.resolve_if_complete(position))
    }

    pub fn set_child_class_name(
        &mut self,
        id: ObjectId,
        name: impl Into<String>,
    ) -> Result<Vec<ResolutionWarning>, BuilderError> {
        let position = self.position(id)?;
        self.objects[position].spec.child_class_name = name.into();
        Ok(self.resolve_if_complete(position))
    }

    pub fn set_parent_object_name(
        &mut self,
        id: ObjectId,
        name: impl Into<String>,
    ) -> Result<(), BuilderError> {
        let position = self.position(id)?;
        self.objects[position].spec.parent_object_name = name.into();
        Ok(())
    }

    /// Appends an unselected text property and returns its index.
    pub fn add_property(&mut self, id: ObjectId) -> Result<usize, BuilderError> {
        let position = self.position(id)?;
        let properties = &mut self.objects[position].spec.properties;
        properties.push(PropertySpec::default());
        Ok(properties.len() - 1)
    }

    pub fn delete_property(
        &mut self,
        id: ObjectId,
        index: usize,
    ) -> Result<PropertySpec, BuilderError> {
        self.property_mut(id, index)?;
        let position = self.position(id)?;
        Ok(self.objects[position].spec.properties.remove(index))
    }

    pub fn set_property_lang_id(
        &mut self,
        id: ObjectId,
        index: usize,
        lang_id: impl Into<String>,
    ) -> Result<(), BuilderError> {
        self.property_mut(id, index)?.property_lang_id = lang_id.into();
        Ok(())
    }

    pub fn set_property_type(
        &mut self,
        id: ObjectId,
        index: usize,
        property_type: PropertyType,
    ) -> Result<(), BuilderError> {
        self.property_mut(id, index)?.property_type = property_type;
        Ok(())
    }

    /// Selects a property from the object's candidate menu by its name.
    pub fn select_property_by_name(
        &mut self,
        id: ObjectId,
        index: usize,
        name: &str,
    ) -> Result<(), BuilderError> {
        let lang_id = self
            .candidate_menu(id)
            .iter()
            .find(|property| property.name == name)
            .map(|property| property.lang_id)
            .ok_or_else(|| BuilderError::NotFound {
                entity: "property",
                key: name.to_string(),
                table: "t_property",
            })?;
        self.set_property_lang_id(id, index, lang_id.to_string())
    }

    /// Binds the form to a different store (or none).
    ///
    /// Identifiers and menus resolved against another store are dropped, and
    /// every object not yet resolved against the new store is resolved again.
    pub fn rebind_store(&mut self, store: Option<Arc<ReferenceStore>>) -> Vec<ResolutionWarning> {
        let current = store.as_ref().map(|store| store.id());
        self.store = store;
        let mut warnings = Vec::new();

        for position in 0..self.objects.len() {
            let entry = &mut self.objects[position];
            if current.is_some() && entry.resolved_against == current {
                continue;
            }

            if entry.resolved_against.is_some() {
                entry.spec.clear_derived();
                entry.resolved_against = None;
                let id = entry.id;
                self.menus.remove(&id);
                debug!(object = id.0, "cleared stale identifiers");
            } else if current.is_none() {
                continue;
            }

            warnings.extend(self.resolve_if_complete(position));
        }

        warnings
    }

    fn resolve_if_complete(&mut self, position: usize) -> Vec<ResolutionWarning> {
        let entry = &self.objects[position];
        if !entry.spec.names_complete() {
            return Vec::new();
        }
        let id = entry.id;

        let Some(store) = self.store.clone() else {
            return vec![soft_warning(id, &BuilderError::StoreUninitialized)];
        };

        let spec = &entry.spec;
        let resolved = match resolver::resolve_class(
            &store,
            &spec.child_object_name,
            &spec.child_class_name,
            Some(&spec.parent_object_name),
        ) {
            Ok(resolved) => resolved,
            Err(err) => return vec![soft_warning(id, &err)],
        };

        let entry = &mut self.objects[position];
        entry.spec.child_class_lang_id = Some(resolved.child_class_lang_id);
        entry.spec.child_class_id = Some(resolved.child_class_id);
        entry.spec.parent_class_lang_id = resolved.parent_class_lang_id;
        entry.resolved_against = Some(store.id());

        match resolver::resolve_properties(
            &store,
            resolved.child_class_id,
            resolved.parent_class_lang_id,
        ) {
            Ok(properties) => {
                self.menus.insert(id, properties);
                Vec::new()
            }
            Err(err) => {
                self.menus.insert(id, Vec::new());
                vec![soft_warning(id, &err)]
            }
        }
    }

    fn position(&self, id: ObjectId) -> Result<usize, BuilderError> {
        self.objects
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| BuilderError::NotFound {
                entity: "object",
                key: id.0.to_string(),
                table: "form",
            })
    }

    fn property_mut(
        &mut self,
        id: ObjectId,
        index: usize,
    ) -> Result<&mut PropertySpec, BuilderError> {
        let position = self.position(id)?;
        self.objects[position]
            .spec
            .properties
            .get_mut(index)
            .ok_or_else(|| BuilderError::InvalidValue {
                field: "propertyIndex".to_string(),
                reason: format!("object {} has no property at index {index}", id.0),
            })
    }
}

fn soft_warning(object: ObjectId, err: &BuilderError) -> ResolutionWarning {
    warn!(object = object.0, error = %err, "identifier resolution failed");
    ResolutionWarning {
        object,
        message: err.to_string(),
    }
}

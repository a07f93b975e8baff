//! Editor seam
//!
//! [`EntityEditor`] is everything the importer asks of a level editor.
//! [`InMemoryEditor`] keeps a level in memory; it backs the import plan of
//! the CLI and the tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use o3dexport_core::{Quat, Vec3};
use serde::Serialize;

use crate::error::{ImportError, ImportResult};

/// Editor entity handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// Components the importer adds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ComponentKind {
    Mesh,
    Material,
}

impl ComponentKind {
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Mesh => "Mesh",
            ComponentKind::Material => "Material",
        }
    }
}

/// Local transform with uniform scale; non-uniform scale is a separate facet
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocalTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub uniform_scale: f32,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, uniform_scale: 1.0 }
    }
}

pub trait EntityEditor {
    /// Every entity named `name`, anywhere in the level
    fn find_entities(&self, name: &str) -> Vec<EntityId>;

    fn create_entity(&mut self, name: &str, parent: Option<EntityId>) -> ImportResult<EntityId>;

    fn set_local_transform(&mut self, entity: EntityId, transform: LocalTransform) -> ImportResult<()>;

    fn set_non_uniform_scale(&mut self, entity: EntityId, scale: Vec3) -> ImportResult<()>;

    fn has_component(&self, entity: EntityId, kind: ComponentKind) -> bool;

    fn add_component(&mut self, entity: EntityId, kind: ComponentKind) -> ImportResult<()>;

    /// True when the asset catalog knows `product_path`
    fn asset_exists(&self, product_path: &str) -> bool;

    fn mesh_asset(&self, entity: EntityId) -> Option<String>;

    fn set_mesh_asset(&mut self, entity: EntityId, product_path: &str) -> ImportResult<()>;

    /// Index of the material slot labelled `label` on the entity's model
    fn find_material_slot(&mut self, entity: EntityId, label: &str) -> Option<usize>;

    fn material_asset(&self, entity: EntityId, slot: usize) -> Option<String>;

    fn set_material_asset(&mut self, entity: EntityId, slot: usize, product_path: &str) -> ImportResult<()>;

    /// Persists the level; called between import phases
    fn save(&mut self) -> ImportResult<()> {
        Ok(())
    }
}

/// One entity of an [`InMemoryEditor`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub name: String,
    pub parent: Option<EntityId>,
    pub transform: LocalTransform,
    pub non_uniform_scale: Option<Vec3>,
    pub components: BTreeSet<ComponentKind>,
    pub mesh_asset: Option<String>,
    /// Slot label and assigned material
    pub material_slots: Vec<(String, Option<String>)>,
}

/// Level kept in memory.
///
/// Without a catalog every asset path resolves and a model gets a material
/// slot for any label it is asked about. With [`with_catalog`](Self::with_catalog)
/// only listed assets resolve and slots come from
/// [`with_model_slots`](Self::with_model_slots).
#[derive(Debug, Clone, Default)]
pub struct InMemoryEditor {
    entities: Vec<EntityRecord>,
    catalog: Option<HashSet<String>>,
    model_slots: HashMap<String, Vec<String>>,
    saves: usize,
}

impl InMemoryEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog = Some(assets.into_iter().map(Into::into).collect());
        self
    }

    /// Material slot labels of the model at `model_path`
    pub fn with_model_slots<I, S>(mut self, model_path: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model_slots.insert(model_path.into(), labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(id.0 as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&EntityRecord> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn children(&self, parent: EntityId) -> impl Iterator<Item = &EntityRecord> {
        self.entities.iter().filter(move |e| e.parent == Some(parent))
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    fn record_mut(&mut self, id: EntityId) -> ImportResult<&mut EntityRecord> {
        self.entities
            .get_mut(id.0 as usize)
            .ok_or_else(|| ImportError::Editor(format!("unknown entity {}", id)))
    }

    fn record(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(id.0 as usize)
    }
}

impl EntityEditor for InMemoryEditor {
    fn find_entities(&self, name: &str) -> Vec<EntityId> {
        self.entities.iter().filter(|e| e.name == name).map(|e| e.id).collect()
    }

    fn create_entity(&mut self, name: &str, parent: Option<EntityId>) -> ImportResult<EntityId> {
        if let Some(parent) = parent {
            self.record_mut(parent)?;
        }
        let id = EntityId(self.entities.len() as u64);
        self.entities.push(EntityRecord {
            id,
            name: name.to_string(),
            parent,
            transform: LocalTransform::default(),
            non_uniform_scale: None,
            components: BTreeSet::new(),
            mesh_asset: None,
            material_slots: Vec::new(),
        });
        Ok(id)
    }

    fn set_local_transform(&mut self, entity: EntityId, transform: LocalTransform) -> ImportResult<()> {
        self.record_mut(entity)?.transform = transform;
        Ok(())
    }

    fn set_non_uniform_scale(&mut self, entity: EntityId, scale: Vec3) -> ImportResult<()> {
        self.record_mut(entity)?.non_uniform_scale = Some(scale);
        Ok(())
    }

    fn has_component(&self, entity: EntityId, kind: ComponentKind) -> bool {
        self.record(entity).is_some_and(|e| e.components.contains(&kind))
    }

    fn add_component(&mut self, entity: EntityId, kind: ComponentKind) -> ImportResult<()> {
        self.record_mut(entity)?.components.insert(kind);
        Ok(())
    }

    fn asset_exists(&self, product_path: &str) -> bool {
        match &self.catalog {
            Some(catalog) => catalog.contains(product_path),
            None => true,
        }
    }

    fn mesh_asset(&self, entity: EntityId) -> Option<String> {
        self.record(entity).and_then(|e| e.mesh_asset.clone())
    }

    fn set_mesh_asset(&mut self, entity: EntityId, product_path: &str) -> ImportResult<()> {
        let slots = self.model_slots.get(product_path).cloned().unwrap_or_default();
        let record = self.record_mut(entity)?;
        if !record.components.contains(&ComponentKind::Mesh) {
            return Err(ImportError::Editor(format!("entity '{}' has no Mesh component", record.name)));
        }
        record.mesh_asset = Some(product_path.to_string());
        record.material_slots = slots.into_iter().map(|label| (label, None)).collect();
        Ok(())
    }

    fn find_material_slot(&mut self, entity: EntityId, label: &str) -> Option<usize> {
        let permissive = self.catalog.is_none();
        let record = self.entities.get_mut(entity.0 as usize)?;
        if let Some(index) = record.material_slots.iter().position(|(l, _)| l == label) {
            return Some(index);
        }
        if permissive && record.mesh_asset.is_some() {
            record.material_slots.push((label.to_string(), None));
            return Some(record.material_slots.len() - 1);
        }
        None
    }

    fn material_asset(&self, entity: EntityId, slot: usize) -> Option<String> {
        self.record(entity)
            .and_then(|e| e.material_slots.get(slot))
            .and_then(|(_, asset)| asset.clone())
    }

    fn set_material_asset(&mut self, entity: EntityId, slot: usize, product_path: &str) -> ImportResult<()> {
        let record = self.record_mut(entity)?;
        if !record.components.contains(&ComponentKind::Material) {
            return Err(ImportError::Editor(format!("entity '{}' has no Material component", record.name)));
        }
        let name = record.name.clone();
        let (_, asset) = record
            .material_slots
            .get_mut(slot)
            .ok_or_else(|| ImportError::Editor(format!("entity '{}' has no material slot {}", name, slot)))?;
        *asset = Some(product_path.to_string());
        Ok(())
    }

    fn save(&mut self) -> ImportResult<()> {
        self.saves += 1;
        Ok(())
    }
}

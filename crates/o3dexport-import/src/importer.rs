//! Scene import
//!
//! Rebuilds an exported scene graph in a level, in five phases that each
//! finish with a save:
//!
//! 1. find or create one entity per node, by unique name, under its parent
//! 2. set local transforms, adding a non-uniform scale where needed
//! 3. add Mesh and Material components
//! 4. point Mesh components at the built model
//! 5. point material slots, found by label, at the built materials

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::time::{Duration, Instant};

use o3dexport_core::document::{SceneGraphDocument, SceneNodeDoc, TransformDoc};
use o3dexport_core::{Quat, Vec3};
use serde::Serialize;

use crate::editor::{ComponentKind, EntityEditor, EntityId, LocalTransform};
use crate::error::{ImportError, ImportResult};
use crate::paths::AssetPaths;

/// Scale components within this of each other count as uniform
pub const UNIFORM_SCALE_TOLERANCE: f32 = 0.01;

/// Reads the scene graph of `paths`
pub fn load_scene_graph(paths: &AssetPaths) -> ImportResult<SceneGraphDocument> {
    let path = paths.scene_graph_path();
    if !path.exists() {
        return Err(ImportError::SceneGraphNotFound(path));
    }
    let reader = BufReader::new(File::open(&path)?);
    serde_json::from_reader(reader).map_err(|source| ImportError::Parse { path, source })
}

/// Local transform of a scene node, plus the scale left to a non-uniform
/// scale facet
pub fn local_transform(transform: &TransformDoc) -> (LocalTransform, Option<Vec3>) {
    let scale = Vec3::from(transform.scale);
    let rotation = Quat::from_euler_xyz(Vec3::from(transform.rotate).to_radians());
    let uniform = scale.is_uniform(UNIFORM_SCALE_TOLERANCE);
    let local = LocalTransform {
        translation: Vec3::from(transform.translate),
        rotation,
        uniform_scale: if uniform { scale.x } else { 1.0 },
    };
    (local, (!uniform).then_some(scale))
}

/// Time spent in one phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTiming {
    pub phase: &'static str,
    pub duration: Duration,
}

/// What an import did
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub created: Vec<String>,
    pub found: Vec<String>,
    pub components_added: usize,
    pub meshes_set: usize,
    pub materials_set: usize,
    pub warnings: Vec<String>,
    pub phases: Vec<PhaseTiming>,
}

impl ImportReport {
    pub fn entity_count(&self) -> usize {
        self.created.len() + self.found.len()
    }

    pub fn total_duration(&self) -> Duration {
        self.phases.iter().map(|p| p.duration).sum()
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

struct EntityData<'d> {
    name: String,
    entity: EntityId,
    node: &'d SceneNodeDoc,
    has_mesh_component: bool,
    has_material_component: bool,
}

/// Imports scene graphs through an [`EntityEditor`]
pub struct SceneImporter<'e, E: EntityEditor + ?Sized> {
    editor: &'e mut E,
    paths: AssetPaths,
    save_rate: usize,
}

impl<'e, E: EntityEditor + ?Sized> SceneImporter<'e, E> {
    pub fn new(editor: &'e mut E, paths: AssetPaths) -> Self {
        Self { editor, paths, save_rate: 0 }
    }

    /// Saves after every `rate` new entities as well; 0 saves per phase only
    pub fn with_save_rate(mut self, rate: usize) -> Self {
        self.save_rate = rate;
        self
    }

    /// Loads the scene graph from the project and imports it
    pub fn import_from_project(&mut self) -> ImportResult<ImportReport> {
        let document = load_scene_graph(&self.paths)?;
        self.import(&document)
    }

    pub fn import(&mut self, document: &SceneGraphDocument) -> ImportResult<ImportReport> {
        let mut report = ImportReport::default();
        if document.children.is_empty() {
            report.warn(format!("scene graph '{}' is empty, nothing to do", document.name));
            return Ok(report);
        }

        let mut entities: Vec<EntityData<'_>> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        let started = Instant::now();
        self.add_entities(None, &document.children, &mut entities, &mut by_name, &mut report)?;
        self.end_phase("add entities", started, &mut report)?;
        tracing::info!(
            created = report.created.len(),
            total = entities.len(),
            "phase 1: entities"
        );

        let started = Instant::now();
        for data in &entities {
            self.update_transform(data, &mut report)?;
        }
        self.end_phase("set transforms", started, &mut report)?;

        let started = Instant::now();
        for data in &mut entities {
            self.add_components(data, &mut report)?;
        }
        self.end_phase("add components", started, &mut report)?;

        let started = Instant::now();
        for data in &entities {
            self.set_mesh_asset(data, &mut report)?;
        }
        self.end_phase("set mesh assets", started, &mut report)?;

        let started = Instant::now();
        for data in &entities {
            self.set_material_assets(data, &mut report)?;
        }
        self.end_phase("set material assets", started, &mut report)?;

        tracing::info!(
            entities = report.entity_count(),
            warnings = report.warnings.len(),
            duration_ms = report.total_duration().as_millis() as u64,
            "import finished"
        );
        Ok(report)
    }

    fn end_phase(&mut self, phase: &'static str, started: Instant, report: &mut ImportReport) -> ImportResult<()> {
        self.editor.save()?;
        let duration = started.elapsed();
        tracing::debug!(phase, duration_ms = duration.as_millis() as u64, "phase done");
        report.phases.push(PhaseTiming { phase, duration });
        Ok(())
    }

    fn add_entities<'d>(
        &mut self,
        parent: Option<EntityId>,
        nodes: &'d [SceneNodeDoc],
        entities: &mut Vec<EntityData<'d>>,
        by_name: &mut HashMap<String, usize>,
        report: &mut ImportReport,
    ) -> ImportResult<()> {
        for node in nodes {
            let entity = self.get_or_create(&node.name, parent, report)?;
            let data = EntityData {
                name: node.name.clone(),
                entity,
                node,
                has_mesh_component: false,
                has_material_component: false,
            };
            match by_name.get(&node.name) {
                Some(&index) => {
                    report.warn(format!("node name '{}' appears more than once, the last one wins", node.name));
                    entities[index] = data;
                }
                None => {
                    by_name.insert(node.name.clone(), entities.len());
                    entities.push(data);
                }
            }
            self.add_entities(Some(entity), node.children(), entities, by_name, report)?;
        }
        Ok(())
    }

    fn get_or_create(&mut self, name: &str, parent: Option<EntityId>, report: &mut ImportReport) -> ImportResult<EntityId> {
        let found = self.editor.find_entities(name);
        match found.as_slice() {
            [] => {
                let id = self.editor.create_entity(name, parent)?;
                tracing::debug!(name, entity = %id, "created entity");
                report.created.push(name.to_string());
                if self.save_rate > 0 && report.created.len() % self.save_rate == 0 {
                    self.editor.save()?;
                }
                Ok(id)
            }
            [id] => {
                report.found.push(name.to_string());
                Ok(*id)
            }
            many => Err(ImportError::AmbiguousEntity { name: name.to_string(), count: many.len() }),
        }
    }

    fn update_transform(&mut self, data: &EntityData<'_>, report: &mut ImportReport) -> ImportResult<()> {
        let (local, non_uniform) = local_transform(&data.node.transform);
        if let Some(scale) = non_uniform {
            self.editor.set_non_uniform_scale(data.entity, scale)?;
            let children = data.node.children().len();
            if children > 0 {
                report.warn(format!(
                    "entity '{}' has a non-uniform scale and {} children, which the engine does not handle well",
                    data.name, children
                ));
            }
        }
        self.editor.set_local_transform(data.entity, local)
    }

    fn add_components(&mut self, data: &mut EntityData<'_>, report: &mut ImportReport) -> ImportResult<()> {
        if data.node.mesh.is_none() {
            return Ok(());
        }
        self.ensure_component(data.entity, ComponentKind::Mesh, report)?;
        data.has_mesh_component = true;

        if data.node.materials.is_none() {
            report.warn(format!("entity '{}' has a mesh but no materials", data.name));
            return Ok(());
        }
        self.ensure_component(data.entity, ComponentKind::Material, report)?;
        data.has_material_component = true;
        Ok(())
    }

    fn ensure_component(&mut self, entity: EntityId, kind: ComponentKind, report: &mut ImportReport) -> ImportResult<()> {
        if !self.editor.has_component(entity, kind) {
            self.editor.add_component(entity, kind)?;
            report.components_added += 1;
        }
        Ok(())
    }

    fn set_mesh_asset(&mut self, data: &EntityData<'_>, report: &mut ImportReport) -> ImportResult<()> {
        let (true, Some(mesh)) = (data.has_mesh_component, data.node.mesh.as_deref()) else {
            return Ok(());
        };
        let product = self.paths.mesh_product_path(mesh);
        if !self.editor.asset_exists(&product) {
            report.warn(format!("skipping mesh of '{}', asset {} is not in the catalog", data.name, product));
            return Ok(());
        }
        if self.editor.mesh_asset(data.entity).as_deref() == Some(product.as_str()) {
            return Ok(());
        }
        self.editor.set_mesh_asset(data.entity, &product)?;
        report.meshes_set += 1;
        Ok(())
    }

    fn set_material_assets(&mut self, data: &EntityData<'_>, report: &mut ImportReport) -> ImportResult<()> {
        if !data.has_material_component {
            return Ok(());
        }
        for material in data.node.materials() {
            let Some(slot) = self.editor.find_material_slot(data.entity, material) else {
                report.warn(format!("entity '{}' has no material slot labelled '{}'", data.name, material));
                continue;
            };
            let product = self.paths.material_product_path(material);
            if !self.editor.asset_exists(&product) {
                report.warn(format!("skipping material of '{}', asset {} is not in the catalog", data.name, product));
                continue;
            }
            if self.editor.material_asset(data.entity, slot).as_deref() == Some(product.as_str()) {
                continue;
            }
            self.editor.set_material_asset(data.entity, slot, &product)?;
            report.materials_set += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_transform_rotation_order() {
        let doc = TransformDoc { translate: [1.0, 2.0, 3.0], rotate: [0.0, 0.0, 90.0], scale: [2.0, 2.0, 2.0] };
        let (local, non_uniform) = local_transform(&doc);
        assert!(non_uniform.is_none());
        assert_eq!(local.uniform_scale, 2.0);
        assert!(local.rotation.is_close(&Quat::from_rotation_z(90f32.to_radians()), 1e-6));

        let doc = TransformDoc { rotate: [30.0, 45.0, 60.0], ..TransformDoc::default() };
        let (local, _) = local_transform(&doc);
        let back = local.rotation.to_euler_xyz().to_degrees();
        assert!(back.is_close(&Vec3::new(30.0, 45.0, 60.0), 1e-3));
    }

    #[test]
    fn test_non_uniform_scale() {
        let doc = TransformDoc { scale: [1.0, 1.005, 0.995], ..TransformDoc::default() };
        assert!(local_transform(&doc).1.is_none());

        let doc = TransformDoc { scale: [1.0, 2.0, 1.0], ..TransformDoc::default() };
        let (local, non_uniform) = local_transform(&doc);
        assert_eq!(local.uniform_scale, 1.0);
        assert_eq!(non_uniform, Some(Vec3::new(1.0, 2.0, 1.0)));
    }
}

//! Mesh export
//!
//! Geometry is written by a [`MeshExporter`]. The exporter always sees the
//! owner object at the origin: [`TransformReset`] unparents it and resets its
//! local transform for the duration of the export, then puts both back.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::process::Command;

use o3dexport_core::{Axis, Error, Result, Vec3};
use o3dexport_scene::{ObjectId, Rotation, Scene};

/// Writes the geometry of one object to a file
pub trait MeshExporter {
    fn export_mesh(&mut self, scene: &Scene, object: ObjectId, axes: (Axis, Axis), target: &Path) -> Result<()>;
}

/// Saved placement of an object
#[derive(Debug, Clone, Copy)]
struct SavedTransform {
    location: Vec3,
    rotation: Rotation,
    scale: Vec3,
    parent: Option<(ObjectId, usize)>,
}

/// Guard that keeps an object at the origin, unparented, while it lives.
///
/// On drop the object is parented back at its old position among its
/// siblings, without compensating for the parent's transform, and its local
/// transform is restored.
pub struct TransformReset<'a> {
    scene: &'a mut Scene,
    object: ObjectId,
    saved: SavedTransform,
}

impl<'a> TransformReset<'a> {
    pub fn new(scene: &'a mut Scene, object: ObjectId) -> Result<Self> {
        let current = scene
            .object(object)
            .ok_or_else(|| Error::internal(format!("object id {} out of range", object.0)))?;
        let mut saved = SavedTransform {
            location: current.location,
            rotation: current.rotation,
            scale: current.scale,
            parent: None,
        };
        saved.parent = scene.detach(object);

        if let Some(target) = scene.object_mut(object) {
            target.location = Vec3::ZERO;
            target.rotation = saved.rotation.identity_like();
            target.scale = Vec3::ONE;
        }
        Ok(Self { scene, object, saved })
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }
}

impl Deref for TransformReset<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl Drop for TransformReset<'_> {
    fn drop(&mut self) {
        if let Some((parent, position)) = self.saved.parent {
            if let Err(err) = self.scene.attach_without_inverse(self.object, parent, position) {
                tracing::error!(error = %err, "failed to reparent object after mesh export");
            }
        }
        if let Some(target) = self.scene.object_mut(self.object) {
            target.location = self.saved.location;
            target.rotation = self.saved.rotation;
            target.scale = self.saved.scale;
        }
    }
}

/// Exports `object` through `exporter` with its transform reset
pub fn export_reset_mesh(
    exporter: &mut dyn MeshExporter,
    scene: &mut Scene,
    object: ObjectId,
    axes: (Axis, Axis),
    target: &Path,
) -> Result<()> {
    let reset = TransformReset::new(scene, object)?;
    exporter.export_mesh(&reset, object, axes, target)
}

/// Runs an external mesh tool once per mesh.
///
/// The tool is called as
/// `<program> [args...] --object <name> --mesh <mesh> --forward <axis> --up <axis> --output <path>`.
#[derive(Debug, Clone)]
pub struct CommandMeshExporter {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandMeshExporter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl MeshExporter for CommandMeshExporter {
    fn export_mesh(&mut self, scene: &Scene, object: ObjectId, axes: (Axis, Axis), target: &Path) -> Result<()> {
        let obj = &scene[object];
        let mesh = obj
            .kind
            .mesh_name()
            .ok_or_else(|| Error::export_failed(format!("object '{}' has no mesh", obj.name)))?;

        tracing::debug!(program = %self.program.display(), object = %obj.name, "running mesh tool");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg("--object")
            .arg(&obj.name)
            .arg("--mesh")
            .arg(mesh)
            .arg("--forward")
            .arg(axes.0.code())
            .arg("--up")
            .arg(axes.1.code())
            .arg("--output")
            .arg(target)
            .status()?;

        if !status.success() {
            return Err(Error::export_failed(format!(
                "mesh tool {} exited with {} for object '{}'",
                self.program.display(),
                status,
                obj.name
            )));
        }
        if !target.exists() {
            return Err(Error::export_failed(format!(
                "mesh tool did not write {}",
                target.display()
            )));
        }
        Ok(())
    }
}

/// Copies meshes a scene dump script already wrote as `<dir>/<mesh>.fbx`
#[derive(Debug, Clone)]
pub struct CopyMeshExporter {
    source_dir: PathBuf,
}

impl CopyMeshExporter {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self { source_dir: source_dir.into() }
    }
}

impl MeshExporter for CopyMeshExporter {
    fn export_mesh(&mut self, scene: &Scene, object: ObjectId, _axes: (Axis, Axis), target: &Path) -> Result<()> {
        let obj = &scene[object];
        let file_name = target
            .file_name()
            .ok_or_else(|| Error::internal(format!("mesh target {} has no file name", target.display())))?;
        let source = self.source_dir.join(file_name);
        if !source.exists() {
            return Err(Error::FileNotFound(source));
        }
        tracing::debug!(object = %obj.name, source = %source.display(), "copying mesh");
        std::fs::copy(&source, target)?;
        Ok(())
    }
}

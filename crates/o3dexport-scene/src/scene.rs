//! The scene: an object arena plus material and image datablocks

use std::collections::HashMap;
use std::ops::Index;

use o3dexport_core::{Error, Result};

use crate::graph::Material;
use crate::image::Image;
use crate::object::SceneObject;

/// Index of an object inside its [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// Authoring-tool scene
///
/// Objects live in an arena and refer to each other through [`ObjectId`]s.
/// Materials and images are keyed by their datablock name.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub name: String,
    objects: Vec<SceneObject>,
    by_name: HashMap<String, ObjectId>,
    materials: HashMap<String, Material>,
    images: HashMap<String, Image>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Adds an object under `parent` (or at the root) and returns its id.
    ///
    /// Object names are unique within a scene.
    pub fn add_object(&mut self, mut object: SceneObject, parent: Option<ObjectId>) -> Result<ObjectId> {
        if self.by_name.contains_key(&object.name) {
            return Err(Error::invalid_scene(format!("duplicate object name '{}'", object.name)));
        }
        if let Some(parent) = parent {
            if parent.0 >= self.objects.len() {
                return Err(Error::internal(format!("parent id {} out of range", parent.0)));
            }
        }

        let id = ObjectId(self.objects.len());
        object.parent = parent;
        object.children.clear();
        self.by_name.insert(object.name.clone(), id);
        self.objects.push(object);
        if let Some(parent) = parent {
            self.objects[parent.0].children.push(id);
        }
        Ok(id)
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn add_image(&mut self, image: Image) {
        self.images.insert(image.name.clone(), image);
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.by_name.get(name).copied()
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// Materials in no particular order
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    pub fn image(&self, name: &str) -> Option<&Image> {
        self.images.get(name)
    }

    pub fn images(&self) -> impl Iterator<Item = &Image> {
        self.images.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All object ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        (0..self.objects.len()).map(ObjectId)
    }

    /// Objects without a parent, in insertion order
    pub fn roots(&self) -> Vec<ObjectId> {
        self.ids().filter(|id| self[*id].parent.is_none()).collect()
    }

    /// Selected objects, in insertion order
    pub fn selected(&self) -> Vec<ObjectId> {
        self.ids().filter(|id| self[*id].selected).collect()
    }

    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.objects.get(id.0).map(|o| o.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects.get(id.0).and_then(|o| o.parent)
    }

    /// Every in-use image has its pixels loaded
    pub fn images_ready(&self) -> bool {
        self.images.values().all(Image::is_ready)
    }

    /// Unparents `id`, returning the old parent and the position it had among
    /// the parent's children.
    ///
    /// The local transform is left as is, so the object moves in world space.
    pub fn detach(&mut self, id: ObjectId) -> Option<(ObjectId, usize)> {
        let parent = self.objects.get(id.0)?.parent?;
        let siblings = &mut self.objects[parent.0].children;
        let position = siblings.iter().position(|c| *c == id)?;
        siblings.remove(position);
        self.objects[id.0].parent = None;
        Some((parent, position))
    }

    /// Parents `id` under `parent` at `position` without compensating the
    /// local transform for the parent's world transform.
    pub fn attach_without_inverse(&mut self, id: ObjectId, parent: ObjectId, position: usize) -> Result<()> {
        if id.0 >= self.objects.len() || parent.0 >= self.objects.len() {
            return Err(Error::internal("attach with object id out of range"));
        }
        if self.is_ancestor(id, parent) {
            return Err(Error::invalid_scene(format!(
                "cannot parent '{}' under its own descendant '{}'",
                self[id].name, self[parent].name
            )));
        }
        if let Some((old_parent, _)) = self.detach(id) {
            tracing::debug!(object = %self[id].name, old_parent = %self[old_parent].name, "reparenting");
        }
        let siblings = &mut self.objects[parent.0].children;
        let position = position.min(siblings.len());
        siblings.insert(position, id);
        self.objects[id.0].parent = Some(parent);
        Ok(())
    }

    /// True when `ancestor` is `id` or one of its parents
    fn is_ancestor(&self, ancestor: ObjectId, mut id: ObjectId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }
}

impl Index<ObjectId> for Scene {
    type Output = SceneObject;

    fn index(&self, id: ObjectId) -> &Self::Output {
        &self.objects[id.0]
    }
}

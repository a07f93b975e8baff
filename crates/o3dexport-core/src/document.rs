//! On-disk document schemas
//!
//! The scene-graph document (`<scene>.sgr`) and the material document
//! (`<material>.material`) are plain JSON. They are written by the exporter and
//! read back by the re-import consumer, so both sides share these types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Material type every exported material is instanced from
pub const STANDARD_PBR_MATERIAL_TYPE: &str =
    "@gemroot:Atom_Feature_Common@/Assets/Materials/Types/StandardPBR.materialtype";

/// Version of [`STANDARD_PBR_MATERIAL_TYPE`] the property names target
pub const STANDARD_PBR_MATERIAL_TYPE_VERSION: u32 = 5;

/// Root of the scene-graph document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneGraphDocument {
    pub name: String,
    #[serde(default)]
    pub children: Vec<SceneNodeDoc>,
}

impl SceneGraphDocument {
    /// Total number of nodes below the root
    pub fn node_count(&self) -> usize {
        self.children.iter().map(SceneNodeDoc::subtree_len).sum()
    }
}

/// One exported object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNodeDoc {
    pub name: String,
    #[serde(default)]
    pub transform: TransformDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SceneNodeDoc>>,
}

impl SceneNodeDoc {
    /// This node plus all of its descendants
    pub fn subtree_len(&self) -> usize {
        1 + self.children().iter().map(SceneNodeDoc::subtree_len).sum::<usize>()
    }

    pub fn children(&self) -> &[SceneNodeDoc] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn materials(&self) -> &[String] {
        self.materials.as_deref().unwrap_or(&[])
    }
}

/// Local transform; rotation is XYZ euler angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformDoc {
    pub translate: [f32; 3],
    pub rotate: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for TransformDoc {
    fn default() -> Self {
        Self {
            translate: [0.0; 3],
            rotate: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

/// A flat-property material description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDocument {
    pub material_type: String,
    pub material_type_version: u32,
    pub property_values: BTreeMap<String, PropertyValue>,
}

impl MaterialDocument {
    /// Empty StandardPBR material
    pub fn standard_pbr() -> Self {
        Self {
            material_type: STANDARD_PBR_MATERIAL_TYPE.to_string(),
            material_type_version: STANDARD_PBR_MATERIAL_TYPE_VERSION,
            property_values: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.property_values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.property_values.insert(key.into(), value.into());
    }
}

/// Value stored under a dotted `<group>.<field>` property key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Float(f32),
    Color([f32; 3]),
    Text(String),
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<[f32; 3]> for PropertyValue {
    fn from(v: [f32; 3]) -> Self {
        PropertyValue::Color(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_node_fields_are_omitted() {
        let node = SceneNodeDoc {
            name: "Empty".into(),
            transform: TransformDoc::default(),
            mesh: None,
            materials: None,
            children: None,
        };
        let json = serde_json::to_value(&node).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("mesh"));
        assert!(!object.contains_key("materials"));
        assert!(!object.contains_key("children"));
        assert_eq!(json["transform"]["scale"], serde_json::json!([1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_material_document_keys() {
        let mut material = MaterialDocument::standard_pbr();
        material.set("metallic.factor", 0.25f32);
        material.set("opacity.mode", "Opaque");
        let json = serde_json::to_value(&material).unwrap();
        assert_eq!(json["materialTypeVersion"], 5);
        assert_eq!(json["propertyValues"]["metallic.factor"], 0.25);
        assert_eq!(json["propertyValues"]["opacity.mode"], "Opaque");
    }

    #[test]
    fn test_node_count() {
        let leaf = SceneNodeDoc {
            name: "Leaf".into(),
            transform: TransformDoc::default(),
            mesh: Some("Leaf_mesh".into()),
            materials: None,
            children: None,
        };
        let parent = SceneNodeDoc {
            name: "Parent".into(),
            transform: TransformDoc::default(),
            mesh: None,
            materials: None,
            children: Some(vec![leaf.clone(), leaf]),
        };
        let doc = SceneGraphDocument { name: "Scene".into(), children: vec![parent] };
        assert_eq!(doc.node_count(), 3);
    }
}

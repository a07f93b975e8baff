//! Scene objects and their local transforms

use o3dexport_core::{Error, Quat, Result, Vec3};

use crate::scene::ObjectId;

/// What an object carries
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// Mesh object; `mesh` is the name of the (possibly shared) mesh data
    Mesh { mesh: String },
    /// Transform-only object
    Empty,
    /// Lights, cameras, curves... exported as plain transforms
    Other(String),
}

impl ObjectKind {
    pub fn mesh_name(&self) -> Option<&str> {
        match self {
            ObjectKind::Mesh { mesh } => Some(mesh),
            _ => None,
        }
    }
}

/// Euler rotation orders offered by the authoring tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EulerOrder {
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl EulerOrder {
    pub fn mode_name(&self) -> &'static str {
        match self {
            EulerOrder::Xyz => "XYZ",
            EulerOrder::Xzy => "XZY",
            EulerOrder::Yxz => "YXZ",
            EulerOrder::Yzx => "YZX",
            EulerOrder::Zxy => "ZXY",
            EulerOrder::Zyx => "ZYX",
        }
    }

    pub fn from_mode_name(mode: &str) -> Option<Self> {
        match mode {
            "XYZ" => Some(EulerOrder::Xyz),
            "XZY" => Some(EulerOrder::Xzy),
            "YXZ" => Some(EulerOrder::Yxz),
            "YZX" => Some(EulerOrder::Yzx),
            "ZXY" => Some(EulerOrder::Zxy),
            "ZYX" => Some(EulerOrder::Zyx),
            _ => None,
        }
    }
}

/// Rotation in whichever representation the object was authored with
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// Euler angles in radians
    Euler { order: EulerOrder, angles: Vec3 },
    Quaternion(Quat),
    /// Rotation of `angle` radians around `axis`
    AxisAngle { axis: Vec3, angle: f32 },
}

impl Rotation {
    /// Name of the rotation mode, as the authoring tool spells it
    pub fn mode_name(&self) -> &'static str {
        match self {
            Rotation::Euler { order, .. } => order.mode_name(),
            Rotation::Quaternion(_) => "QUATERNION",
            Rotation::AxisAngle { .. } => "AXIS_ANGLE",
        }
    }

    /// Identity rotation in the same mode
    pub fn identity_like(&self) -> Self {
        match self {
            Rotation::Euler { order, .. } => Rotation::Euler { order: *order, angles: Vec3::ZERO },
            Rotation::Quaternion(_) => Rotation::Quaternion(Quat::IDENTITY),
            Rotation::AxisAngle { .. } => Rotation::AxisAngle { axis: Vec3::UNIT_Z, angle: 0.0 },
        }
    }

    /// XYZ euler angles in degrees.
    ///
    /// Quaternion and axis-angle rotations go through a quaternion to XYZ
    /// euler conversion. Euler orders other than XYZ are rejected.
    pub fn to_euler_xyz_degrees(&self, object_name: &str) -> Result<Vec3> {
        match self {
            Rotation::Euler { order: EulerOrder::Xyz, angles } => Ok(angles.to_degrees()),
            Rotation::Euler { order, .. } => Err(Error::UnsupportedRotationMode {
                object: object_name.to_string(),
                mode: order.mode_name().to_string(),
            }),
            Rotation::Quaternion(quat) => Ok(quat.to_euler_xyz().to_degrees()),
            Rotation::AxisAngle { axis, angle } => {
                Ok(Quat::from_axis_angle(*axis, *angle).to_euler_xyz().to_degrees())
            }
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::Euler { order: EulerOrder::Xyz, angles: Vec3::ZERO }
    }
}

/// A material slot on a mesh object. Empty slots have no material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSlot {
    pub index: usize,
    pub material: Option<String>,
}

/// An object in the scene hierarchy
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub location: Vec3,
    pub rotation: Rotation,
    pub scale: Vec3,
    pub material_slots: Vec<MaterialSlot>,
    pub selected: bool,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: Vec<ObjectId>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            location: Vec3::ZERO,
            rotation: Rotation::default(),
            scale: Vec3::ONE,
            material_slots: Vec::new(),
            selected: false,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Mesh object using mesh data `mesh`
    pub fn mesh(name: impl Into<String>, mesh: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Mesh { mesh: mesh.into() })
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Empty)
    }

    pub fn with_location(mut self, location: Vec3) -> Self {
        self.location = location;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Appends slots in order; `None` entries are empty slots
    pub fn with_materials<I, S>(mut self, materials: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        for material in materials {
            let index = self.material_slots.len();
            self.material_slots.push(MaterialSlot { index, material: material.map(Into::into) });
        }
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, ObjectKind::Mesh { .. })
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// True when location, rotation and scale are all identity
    pub fn has_identity_transform(&self) -> bool {
        let rotation_is_identity = match self.rotation {
            Rotation::Euler { angles, .. } => angles.is_close(&Vec3::ZERO, o3dexport_core::EPSILON),
            Rotation::Quaternion(q) => q.is_close(&Quat::IDENTITY, o3dexport_core::EPSILON),
            Rotation::AxisAngle { angle, .. } => angle.abs() <= o3dexport_core::EPSILON,
        };
        self.location.is_close(&Vec3::ZERO, o3dexport_core::EPSILON)
            && self.scale.is_close(&Vec3::ONE, o3dexport_core::EPSILON)
            && rotation_is_identity
    }
}

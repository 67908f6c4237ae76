use std::sync::Arc;

use crate::model::{Material, Mesh};

/// A drawable scene object: a mesh plus the material whose textures are
/// bound for it. Several entities may share one mesh or material.
pub struct Entity {
    pub name: String,
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
}

impl Entity {
    pub fn new(name: impl Into<String>, mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self {
            name: name.into(),
            mesh,
            material,
        }
    }
}

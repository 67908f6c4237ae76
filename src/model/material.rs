use anyhow::Result;
use log::debug;

use crate::gpu::GpuContext;

use super::Texture;

/// The closed set of texture slots an entity's surface can carry. Each slot
/// is either present or absent; absence is not an error. Present textures
/// are owned exclusively by the material.
#[derive(Default)]
pub struct Material {
    pub name: String,
    pub diffuse: Option<Texture>,
    pub bump: Option<Texture>,
    pub normal: Option<Texture>,
    pub height: Option<Texture>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_diffuse(mut self, texture: Texture) -> Self {
        self.diffuse = Some(texture);
        self
    }

    /// Release every present texture exactly once; absent slots are
    /// skipped. A failure in one slot does not stop the others.
    pub fn destroy(&mut self, gpu: &dyn GpuContext) -> Result<()> {
        debug!("Destroying material '{}'", self.name);
        let mut result = Ok(());
        for slot in [
            &mut self.diffuse,
            &mut self.bump,
            &mut self.normal,
            &mut self.height,
        ] {
            if let Some(mut texture) = slot.take() {
                if let Err(e) = texture.destroy(gpu) {
                    result = Err(e);
                }
            }
        }
        result
    }
}

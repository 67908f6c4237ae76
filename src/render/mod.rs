mod entity;
mod subrender;

pub use entity::Entity;
pub use subrender::{SubrenderTarget, Subrenderer, RESOURCE_ARRAY_LENGTH};

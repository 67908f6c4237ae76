mod material;
mod mesh;
mod texture;
mod vertex;

pub use material::Material;
pub use mesh::Mesh;
pub use texture::Texture;
pub use vertex::{Face, MeshVertex, SourceVertex};

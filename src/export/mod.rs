//! Export backends: glTF and Wavefront OBJ, both driven off a [`crate::scene::Scene`].

pub mod gltf;
pub mod obj;

pub use gltf::export_gltf;
pub use obj::export_obj;

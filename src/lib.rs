//! Terrastream - LOD heightfield meshing and chunk streaming for unbounded terrain

pub mod core;
pub mod math;
pub mod mesh;
pub mod streaming;

pub mod bvh;
pub mod camera;
pub mod canvas;
pub mod integrators;
pub mod macros;
pub mod materials;
pub mod math;
pub mod renderer;
pub mod scene;
pub mod shapes;
pub mod textures;

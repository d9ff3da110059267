//! gles-tiles
//!
//! Draws textured 256x256 tiles through an OpenGL ES 2.0 style API. A fixed
//! shader pair is compiled with the tile opacity baked in, bitmaps are
//! uploaded as textures, and each tile is one four-vertex triangle strip.
//! All GPU work goes through [`backend::GraphicsBackend`], so the same code
//! drives a real context via `glow` or records its calls in tests.
//!
//! High-level modules
//! - `backend`: the graphics API seam, GPU handle types and two backends
//! - `shader`: compiling, linking and using the tile shader program
//! - `texture`: bitmap decoding and texture upload
//! - `tile`: quad geometry and the per-frame draw
//! - `camera`: the pixel-exact, Y-down view-projection matrix
//! - `renderer`: surface lifecycle and layered drawing for host loops
//!
//! GPU failures follow GL's own convention: an object that cannot be
//! created, compiled or linked is represented by the invalid handle `0`
//! and reported through `log`, never by a panic.

pub mod backend;
pub mod camera;
pub mod renderer;
pub mod shader;
pub mod texture;
pub mod tile;

// Re-exports commonly used types for convenience in downstream code.
pub use backend::{GraphicsBackend, ProgramId, ShaderId, TextureId};
pub use renderer::{Layer, RendererConfig, TileRenderer, init_logger};
pub use shader::ShaderProgram;
pub use texture::{Bitmap, Texture};
pub use tile::{TILE_SIZE, Tile};
pub use cgmath;
pub use glow;

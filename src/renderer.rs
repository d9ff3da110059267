//! A ready-made render loop for stacked tile layers.
//!
//! [`TileRenderer`] follows the lifecycle of a GL surface as hosts such as
//! Android's `GLSurfaceView` drive it:
//!
//! 1. `on_surface_created` runs once the context exists (and again after it
//!    was lost): global state, shader programs and textures are created.
//! 2. `on_surface_changed` runs with the surface size: viewport, camera and
//!    tiles are (re)built.
//! 3. `on_draw_frame` runs for every frame and draws the layers in order,
//!    so later layers are blended over earlier ones.
//!
//! All three must be called on the thread that owns the context.

use crate::{
    backend::GraphicsBackend,
    camera,
    shader::ShaderProgram,
    texture::{Bitmap, Texture},
    tile::Tile,
};

/// Installs `env_logger` as the `log` sink, honouring `RUST_LOG`.
///
/// Hosts call this once at start-up; calling it again only prints a
/// warning.
pub fn init_logger() {
    if let Err(e) = env_logger::try_init() {
        eprintln!("Warning: Could not initialize logger: {e}");
    }
}

/// One tile drawn with its own opacity.
#[derive(Clone, Debug)]
pub struct Layer {
    pub alpha: f32,
    pub left: i32,
    pub top: i32,
    /// Pixels to upload. `None` keeps the layer invisible, the same as a
    /// failed upload.
    pub bitmap: Option<Bitmap>,
    pub mipmaps: bool,
}

impl Layer {
    pub fn new(bitmap: Option<Bitmap>, alpha: f32) -> Self {
        Self {
            alpha,
            left: 0,
            top: 0,
            bitmap,
            mipmaps: false,
        }
    }

    pub fn at(mut self, left: i32, top: i32) -> Self {
        self.left = left;
        self.top = top;
        self
    }

    pub fn with_mipmaps(mut self) -> Self {
        self.mipmaps = true;
        self
    }
}

/// What a [`TileRenderer`] draws and how the frame is cleared.
#[derive(Clone, Debug, Default)]
pub struct RendererConfig {
    pub clear_colour: [f32; 4],
    pub layers: Vec<Layer>,
}

impl RendererConfig {
    /// Overlay opacity of the two-layer setup.
    pub const OVERLAY_ALPHA: f32 = 0.6;

    /// An opaque base tile with a translucent overlay on top of it.
    pub fn base_with_overlay(base: Option<Bitmap>, overlay: Option<Bitmap>) -> Self {
        Self::default()
            .with_layer(Layer::new(base, 1.0))
            .with_layer(Layer::new(overlay, Self::OVERLAY_ALPHA))
    }

    pub fn with_clear_colour(mut self, clear_colour: [f32; 4]) -> Self {
        self.clear_colour = clear_colour;
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }
}

/// GPU objects of one layer, alive while the surface is.
#[derive(Debug)]
struct LayerState {
    program: ShaderProgram,
    texture: Texture,
    tile: Option<Tile>,
}

#[derive(Debug)]
pub struct TileRenderer {
    clear_colour: [f32; 4],
    layers: Vec<Layer>,
    states: Vec<LayerState>,
    size: Option<(u32, u32)>,
}

impl TileRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            clear_colour: config.clear_colour,
            layers: config.layers,
            states: Vec::new(),
            size: None,
        }
    }

    /// Surface size of the last `on_surface_changed`, if any.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    pub fn programs(&self) -> impl Iterator<Item = &ShaderProgram> {
        self.states.iter().map(|state| &state.program)
    }

    pub fn textures(&self) -> impl Iterator<Item = &Texture> {
        self.states.iter().map(|state| &state.texture)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.states.iter().filter_map(|state| state.tile.as_ref())
    }

    /// Sets global GL state and creates one program and texture per layer.
    ///
    /// Layers keep their decoded bitmap and upload a copy, so a recreated
    /// context gets its textures back. GL objects of the previous context
    /// died with it and are not deleted here.
    pub fn on_surface_created(&mut self, gl: &impl GraphicsBackend) {
        log::info!("Surface created, building {} layer(s)", self.layers.len());
        gl.clear_color(self.clear_colour);
        gl.enable_alpha_blending();

        self.size = None;
        self.states = self
            .layers
            .iter()
            .enumerate()
            .map(|(index, layer)| {
                let program = ShaderProgram::new(gl, layer.alpha);
                let texture = match &layer.bitmap {
                    Some(bitmap) if layer.mipmaps => Texture::with_mipmaps(gl, bitmap.clone()),
                    Some(bitmap) => Texture::new(gl, bitmap.clone()),
                    None => {
                        log::warn!("Layer {index} has no bitmap, it will not be drawn.");
                        Texture::invalid()
                    }
                };
                LayerState {
                    program,
                    texture,
                    tile: None,
                }
            })
            .collect();
    }

    /// Fits viewport and camera to the surface and places the tiles.
    pub fn on_surface_changed(&mut self, gl: &impl GraphicsBackend, width: u32, height: u32) {
        log::info!("Surface changed to {width}x{height}");
        gl.viewport(width as i32, height as i32);

        let vp_matrix = camera::to_array(&camera::view_projection(width, height));
        for (layer, state) in self.layers.iter().zip(self.states.iter_mut()) {
            // The MVP uniform belongs to the current program.
            state.program.use_program(gl);
            state.program.set_mvp_matrix(gl, &vp_matrix);
            state.tile = Some(Tile::new(
                &state.program,
                layer.left,
                layer.top,
                state.texture.id(),
            ));
        }
        self.size = Some((width, height));
    }

    /// Clears the frame and draws every placed layer in order.
    pub fn on_draw_frame(&self, gl: &impl GraphicsBackend) {
        gl.clear();
        for state in &self.states {
            let Some(tile) = &state.tile else {
                continue;
            };
            state.program.use_program(gl);
            tile.draw(gl);
        }
    }

    /// Deletes all layer textures and programs.
    pub fn release(&mut self, gl: &impl GraphicsBackend) {
        log::info!("Releasing {} layer(s)", self.states.len());
        for state in self.states.drain(..) {
            state.texture.delete(gl);
            if state.program.is_valid() {
                state.program.delete(gl);
            }
        }
        self.size = None;
    }
}

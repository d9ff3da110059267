//! Fixed-size textured quads.
//!
//! Model and texture coordinates both use the UV convention: origin in the
//! top-left corner and the Y axis pointing down. The camera in
//! [`crate::camera`] flips the view to match, so a tile placed at
//! `(left, top)` covers the pixels `left..left + 256` and `top..top + 256`.

use std::mem;

use crate::backend::{DrawMode, GraphicsBackend, TextureId};
use crate::shader::{ShaderLocations, ShaderProgram};

/// Edge length of every tile, in model units.
pub const TILE_SIZE: f32 = 256.0;

const POSITION_COMPONENT_COUNT: i32 = 2;
const TEXTURE_COORDINATES_COMPONENT_COUNT: i32 = 2;
/// Bytes from one interleaved vertex to the next.
pub const STRIDE: i32 = mem::size_of::<TileVertex>() as i32;

/// One corner of a tile: position (z is always 0) and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TileVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

/// The four corners of the square at `(left, top)`, in triangle-strip
/// order: top-left, bottom-left, top-right, bottom-right.
pub fn build_square(left: i32, top: i32) -> [TileVertex; 4] {
    let (left, top) = (left as f32, top as f32);
    let (right, bottom) = (left + TILE_SIZE, top + TILE_SIZE);
    [
        TileVertex {
            position: [left, top],
            tex_coords: [0.0, 0.0],
        },
        TileVertex {
            position: [left, bottom],
            tex_coords: [0.0, 1.0],
        },
        TileVertex {
            position: [right, top],
            tex_coords: [1.0, 0.0],
        },
        TileVertex {
            position: [right, bottom],
            tex_coords: [1.0, 1.0],
        },
    ]
}

/// A 256x256 quad showing one texture through one shader program.
///
/// The tile only borrows the texture by name; whoever created the
/// [`Texture`](crate::texture::Texture) stays responsible for deleting it.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    locations: ShaderLocations,
    vertices: [TileVertex; 4],
    texture: TextureId,
}

impl Tile {
    pub fn new(program: &ShaderProgram, left: i32, top: i32, texture: TextureId) -> Self {
        Self {
            locations: program.locations(),
            vertices: build_square(left, top),
            texture,
        }
    }

    pub fn vertices(&self) -> &[TileVertex; 4] {
        &self.vertices
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Draws the tile with the current program.
    ///
    /// Does nothing at all if the tile's texture is invalid. The caller
    /// must have made the tile's program current beforehand.
    pub fn draw(&self, gl: &impl GraphicsBackend) {
        if !self.texture.is_valid() {
            return;
        }
        self.bind_texture(gl);
        self.bind_vertex_data(gl);
        gl.draw_arrays(DrawMode::TriangleStrip, 0, self.vertices.len() as i32);
    }

    fn bind_texture(&self, gl: &impl GraphicsBackend) {
        gl.active_texture(0);
        gl.bind_texture(self.texture);
        // The sampler reads from unit 0.
        gl.uniform_1i(self.locations.texture_unit, 0);
    }

    fn bind_vertex_data(&self, gl: &impl GraphicsBackend) {
        let data: &[f32] = bytemuck::cast_slice(&self.vertices);

        if let Some(position) = self.locations.position {
            gl.vertex_attrib_pointer(position, POSITION_COMPONENT_COUNT, STRIDE, data);
            gl.enable_vertex_attrib_array(position);
        }

        if let Some(tex_coords) = self.locations.texture_coordinates {
            // Texture coordinates start right after x, y.
            let data = &data[POSITION_COMPONENT_COUNT as usize..];
            gl.vertex_attrib_pointer(
                tex_coords,
                TEXTURE_COORDINATES_COMPONENT_COUNT,
                STRIDE,
                data,
            );
            gl.enable_vertex_attrib_array(tex_coords);
        }
    }
}

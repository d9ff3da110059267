//! View-projection for pixel-exact tiles.
//!
//! The frustum is chosen so that the plane z = 0 is shown at a scale of
//! one model unit per pixel. The far plane sits on z = 0, the near plane
//! halfway to the eye, and the near rectangle is half the surface size.
//! Turning the camera upside down (up = -Y) makes the Y axis point down
//! and Z point into the screen, which lines model space up with the UV
//! convention used by [`crate::tile`].

use cgmath::{Matrix4, Point3, Vector3};

/// Projection times view for a surface of `width` x `height` pixels.
pub fn view_projection(width: u32, height: u32) -> Matrix4<f32> {
    projection(width, height) * view(width, height)
}

pub fn projection(width: u32, height: u32) -> Matrix4<f32> {
    let (w, h) = surface(width, height);
    // near and far are distances from the eye, not z positions
    cgmath::frustum(-w / 4.0, w / 4.0, -h / 4.0, h / 4.0, w / 4.0, w / 2.0)
}

/// Looks straight down +Z at the surface centre from `width / 2` away.
pub fn view(width: u32, height: u32) -> Matrix4<f32> {
    let (w, h) = surface(width, height);
    Matrix4::look_at_rh(
        Point3::new(w / 2.0, h / 2.0, -w / 2.0),
        Point3::new(w / 2.0, h / 2.0, 1.0),
        Vector3::new(0.0, -1.0, 0.0),
    )
}

/// A minimised window reports 0x0, which would collapse the frustum.
fn surface(width: u32, height: u32) -> (f32, f32) {
    (width.max(1) as f32, height.max(1) as f32)
}

/// Column-major copy of `matrix`, the layout GL uniforms expect.
pub fn to_array(matrix: &Matrix4<f32>) -> [f32; 16] {
    *AsRef::<[f32; 16]>::as_ref(matrix)
}

use crate::camera::Camera;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

pub fn pixels_per_tile(camera: &Camera, tile_size: i32) -> f32 {
    tile_size.max(1) as f32 * camera.effective_zoom()
}

/// Maps a point in tile units to screen pixels. The camera sits at the viewport center and
/// north (`+y`) points up.
pub fn tile_to_screen(
    x: f32,
    y: f32,
    camera: &Camera,
    viewport: Viewport,
    pixels_per_tile: f32,
) -> (i32, i32) {
    let sx = (x - camera.position.x) * pixels_per_tile + viewport.width as f32 * 0.5;
    let sy = viewport.height as f32 * 0.5 - (y - camera.position.y) * pixels_per_tile;
    (sx.round() as i32, sy.round() as i32)
}

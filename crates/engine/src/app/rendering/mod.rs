mod renderer;
mod transform;

pub use renderer::Renderer;
pub use transform::{pixels_per_tile, tile_to_screen, Viewport};

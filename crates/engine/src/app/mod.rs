mod input;
mod loop_runner;
mod metrics;
mod rendering;

pub use input::{CityCommand, FrameInput};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{pixels_per_tile, tile_to_screen, Renderer, Viewport};

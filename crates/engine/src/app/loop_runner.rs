use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::city::{City, SimulationState, TickReport};
use crate::console::Console;
use crate::log::LogRecord;
use crate::{resolve_app_paths, StartupError};

use super::input::{CityCommand, FrameInput, InputCollector};
use super::metrics::MetricsAccumulator;
use super::Renderer;

/// Long stalls would otherwise fling the view across the grid.
const MAX_PAN_FRAME_DELTA: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub metrics_log_interval: Duration,
    /// Frame cap. The city ticks once per frame, so this also bounds statements per second.
    pub max_render_fps: Option<u32>,
    pub pan_tiles_per_second: f32,
    /// Sprite root. Resolved from the project root when unset.
    pub asset_root: Option<PathBuf>,
    pub autostart: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Robot City".to_string(),
            window_width: 960,
            window_height: 720,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: Some(60),
            pan_tiles_per_second: 12.0,
            asset_root: None,
            autostart: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens a window and drives `city` from the frame clock until the window closes.
///
/// Enter/Space starts or resumes, `P` pauses, `R` resets, arrows or `IJKL` pan, `+`/`-` and the
/// mouse wheel zoom, Escape quits.
pub fn run_app<C: Console>(config: LoopConfig, mut city: City<C>) -> Result<(), AppError> {
    let asset_root = match config.asset_root.clone() {
        Some(path) => path,
        None => resolve_app_paths()?.assets_dir,
    };
    info!(asset_root = %asset_root.display(), "startup");

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window), asset_root, city.config().tile_size)
        .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(render_cap);
    let mut input = InputCollector::default();
    info!(
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        render_fps_cap = %format_render_cap(render_cap),
        "loop_config"
    );

    if config.autostart {
        city.start();
    }

    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics = MetricsAccumulator::new(metrics_log_interval, Instant::now());
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input.handle_keyboard_input(&event);
                    if input.quit_requested() {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => input.handle_mouse_wheel(delta),
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let frame_input = input.take_frame_input();
                    let report = drive_frame(
                        &mut city,
                        &frame_input,
                        config.pan_tiles_per_second,
                        raw_frame_dt,
                    );
                    metrics.record_tick(report.actors_updated);

                    let elapsed_since_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep = compute_cap_sleep(elapsed_since_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    renderer.begin_frame();
                    city.draw(&mut renderer);
                    if let Err(error) = renderer.present() {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let title = format_title(
                        &config.window_title,
                        city.state(),
                        city.ticks(),
                        city.console().latest(),
                    );
                    if last_applied_title.as_deref() != Some(title.as_str()) {
                        window.set_title(&title);
                        last_applied_title = Some(title);
                    }

                    metrics.record_frame(raw_frame_dt);
                    if let Some(snapshot) = metrics.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            steps_per_second = snapshot.steps_per_second,
                            frame_time_ms = snapshot.frame_time_ms,
                            state = city.state().as_str(),
                            active = city.map().active_instances(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => {
                info!(
                    state = city.state().as_str(),
                    ticks = city.ticks(),
                    "shutdown"
                );
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn apply_command<C: Console>(city: &mut City<C>, command: CityCommand) {
    debug!(?command, state = city.state().as_str(), "city_command");
    match command {
        CityCommand::Start => {
            city.start();
        }
        CityCommand::Pause => {
            city.pause();
        }
        CityCommand::Reset => city.reset(),
        CityCommand::Quit => {}
    }
}

fn format_title(
    base: &str,
    state: SimulationState,
    ticks: u64,
    latest: Option<&LogRecord>,
) -> String {
    match latest {
        Some(record) => format!("{base} [{}] tick {ticks} | {record}", state.as_str()),
        None => format!("{base} [{}] tick {ticks}", state.as_str()),
    }
}

/// One redraw: queued commands, then camera input, then exactly one scheduler tick.
///
/// Camera input is dropped while idle since idle ticks never apply it.
fn drive_frame<C: Console>(
    city: &mut City<C>,
    frame_input: &FrameInput,
    pan_tiles_per_second: f32,
    frame_dt: Duration,
) -> TickReport {
    for command in &frame_input.commands {
        apply_command(city, *command);
    }
    if city.state() != SimulationState::Idle {
        let step = pan_tiles_per_second * frame_dt.min(MAX_PAN_FRAME_DELTA).as_secs_f32();
        let camera = city.camera_mut();
        camera.queue_pan(frame_input.pan.0 * step, frame_input.pan.1 * step);
        camera.queue_zoom_steps(frame_input.zoom_steps);
    }
    city.tick()
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

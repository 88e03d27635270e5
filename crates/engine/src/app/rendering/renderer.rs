use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::actor::{Actor, Heading};
use crate::camera::Camera;
use crate::city::CityPainter;
use crate::map::{CityBounds, Item, ItemKind};
use crate::program::{Area, TILE_SIZE};
use crate::sprite_keys::{validate_sprite_key, FLOWER_SPRITE_KEY, PAPER_SPRITE_KEY};

use super::{pixels_per_tile, tile_to_screen, Viewport};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const GROUND_COLOR: [u8; 4] = [58, 62, 70, 255];
const GRID_MINOR_COLOR: [u8; 4] = [70, 75, 85, 255];
const GRID_MAJOR_COLOR: [u8; 4] = [96, 102, 116, 255];
const AREA_COLOR: [u8; 4] = [255, 210, 70, 255];
const FLOWER_FALLBACK_COLOR: [u8; 4] = [236, 96, 160, 255];
const PAPER_FALLBACK_COLOR: [u8; 4] = [235, 235, 225, 255];
const ROBOT_FALLBACK_COLOR: [u8; 4] = [80, 220, 255, 255];
const ROBOT_IDLE_COLOR: [u8; 4] = [110, 120, 130, 255];
const HEADING_MARK_COLOR: [u8; 4] = [20, 22, 28, 255];
const GRID_MAJOR_EVERY: i32 = 10;
/// Below this tile size only major grid lines are drawn.
const MINOR_GRID_MIN_PX: f32 = 6.0;
/// Robot sheets hold one frame per heading, laid out north, east, south, west.
const ROBOT_SHEET_FRAMES: u32 = 4;

struct LoadedSprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl LoadedSprite {
    fn frame_count(&self) -> u32 {
        if self.height > 0 && self.width == self.height * ROBOT_SHEET_FRAMES {
            ROBOT_SHEET_FRAMES
        } else {
            1
        }
    }
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    asset_root: PathBuf,
    tile_size: i32,
    sprite_cache: HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, asset_root: PathBuf, tile_size: i32) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            asset_root,
            tile_size: tile_size.max(1),
            sprite_cache: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn begin_frame(&mut self) {
        for pixel in self.pixels.frame_mut().chunks_exact_mut(4) {
            pixel.copy_from_slice(&CLEAR_COLOR);
        }
    }

    pub fn present(&self) -> Result<(), Error> {
        self.pixels.render()
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    fn tile_center(&self, camera: &Camera, x: i32, y: i32) -> (i32, i32, f32) {
        let ppt = pixels_per_tile(camera, self.tile_size);
        let (sx, sy) = tile_to_screen(
            x as f32 + 0.5,
            y as f32 + 0.5,
            camera,
            self.viewport,
            ppt,
        );
        (sx, sy, ppt)
    }
}

impl CityPainter for Renderer {
    fn draw_map(&mut self, camera: &Camera, bounds: CityBounds, areas: &[Area]) {
        let Viewport { width, height } = self.viewport;
        let ppt = pixels_per_tile(camera, self.tile_size);
        let (left, top) = tile_to_screen(0.0, bounds.height as f32, camera, self.viewport, ppt);
        let (right, bottom) = tile_to_screen(bounds.width as f32, 0.0, camera, self.viewport, ppt);
        let frame = self.pixels.frame_mut();

        fill_rect_clipped(frame, width, height, left, top, right, bottom, GROUND_COLOR);

        let draw_minor = ppt >= MINOR_GRID_MIN_PX;
        for ix in 0..=bounds.width {
            let major = ix % GRID_MAJOR_EVERY == 0;
            if !major && !draw_minor {
                continue;
            }
            let (x, _) = tile_to_screen(ix as f32, 0.0, camera, self.viewport, ppt);
            let color = if major { GRID_MAJOR_COLOR } else { GRID_MINOR_COLOR };
            fill_rect_clipped(frame, width, height, x, top, x + 1, bottom, color);
        }
        for iy in 0..=bounds.height {
            let major = iy % GRID_MAJOR_EVERY == 0;
            if !major && !draw_minor {
                continue;
            }
            let (_, y) = tile_to_screen(0.0, iy as f32, camera, self.viewport, ppt);
            let color = if major { GRID_MAJOR_COLOR } else { GRID_MINOR_COLOR };
            fill_rect_clipped(frame, width, height, left, y, right, y + 1, color);
        }

        for area in areas {
            let (min_x, max_x, min_y, max_y) = area_tile_span(area);
            let (l, t) = tile_to_screen(min_x as f32, (max_y + 1) as f32, camera, self.viewport, ppt);
            let (r, b) = tile_to_screen((max_x + 1) as f32, min_y as f32, camera, self.viewport, ppt);
            draw_rect_outline(frame, width, height, l, t, r - 1, b - 1, AREA_COLOR);
        }
    }

    fn draw_item(&mut self, camera: &Camera, item: &Item) {
        if item.quantity == 0 {
            return;
        }
        let (cx, cy, ppt) = self.tile_center(camera, item.x, item.y);
        let (key, fallback) = match item.kind {
            ItemKind::Flower => (FLOWER_SPRITE_KEY, FLOWER_FALLBACK_COLOR),
            ItemKind::Paper => (PAPER_SPRITE_KEY, PAPER_FALLBACK_COLOR),
        };
        let Viewport { width, height } = self.viewport;
        let sprite = resolve_cached_sprite(
            &mut self.sprite_cache,
            &mut self.warned_missing_sprite_keys,
            &self.asset_root,
            key,
        );
        let frame = self.pixels.frame_mut();
        match sprite {
            Some(sprite) => {
                let scale = ppt * 0.5 / sprite.height.max(1) as f32;
                // Flowers sit in the lower half of the tile, papers in the upper half.
                let offset = (ppt * 0.25).round() as i32;
                let cy = if item.kind == ItemKind::Flower { cy + offset } else { cy - offset };
                draw_sprite_frame_scaled(frame, width, height, cx, cy, sprite, 0, scale);
            }
            None => {
                let half = ((ppt * 0.2).round() as i32).max(1);
                let offset = (ppt * 0.2).round() as i32;
                let cx = if item.kind == ItemKind::Flower { cx - offset } else { cx + offset };
                draw_square(frame, width, height, cx, cy, half, fallback);
            }
        }
    }

    fn draw_robot(&mut self, camera: &Camera, robot: &Actor) {
        let (x, y) = robot.position();
        let (cx, cy, ppt) = self.tile_center(camera, x, y);
        let Viewport { width, height } = self.viewport;
        let sprite = resolve_cached_sprite(
            &mut self.sprite_cache,
            &mut self.warned_missing_sprite_keys,
            &self.asset_root,
            robot.sprite_key(),
        );
        let frame = self.pixels.frame_mut();
        match sprite {
            Some(sprite) => {
                let frame_index = heading_frame(robot.heading()).min(sprite.frame_count() - 1);
                let scale = ppt * 0.8 / sprite.height.max(1) as f32;
                draw_sprite_frame_scaled(frame, width, height, cx, cy, sprite, frame_index, scale);
            }
            None => {
                let half = ((ppt * 0.35).round() as i32).max(1);
                let color = if robot.is_active() {
                    ROBOT_FALLBACK_COLOR
                } else {
                    ROBOT_IDLE_COLOR
                };
                draw_square(frame, width, height, cx, cy, half, color);
                let (dx, dy) = robot.heading().delta();
                let mark = (half / 2).max(1);
                draw_square(
                    frame,
                    width,
                    height,
                    cx + dx * (half - mark),
                    cy - dy * (half - mark),
                    mark / 2,
                    HEADING_MARK_COLOR,
                );
            }
        }
    }
}

fn heading_frame(heading: Heading) -> u32 {
    match heading {
        Heading::North => 0,
        Heading::East => 1,
        Heading::South => 2,
        Heading::West => 3,
    }
}

/// Inclusive tile span covered by an area stored in scaled units.
fn area_tile_span(area: &Area) -> (i32, i32, i32, i32) {
    let min_x = area.a.x.min(area.b.x).div_euclid(TILE_SIZE);
    let max_x = area.a.x.max(area.b.x).div_euclid(TILE_SIZE);
    let min_y = area.a.y.min(area.b.y).div_euclid(TILE_SIZE);
    let max_y = area.a.y.max(area.b.y).div_euclid(TILE_SIZE);
    (min_x, max_x, min_y, max_y)
}

fn resolve_cached_sprite<'a>(
    cache: &'a mut HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: &mut HashSet<String>,
    asset_root: &Path,
    key: &str,
) -> Option<&'a LoadedSprite> {
    if !cache.contains_key(key) {
        let sprite = match resolve_sprite_image_path(asset_root, key) {
            Ok(path) => match load_sprite_rgba(&path) {
                Ok(sprite) => Some(sprite),
                Err(reason) => {
                    warn_sprite_load_once(warned_missing_sprite_keys, key, Some(&path), &reason);
                    None
                }
            },
            Err(reason) => {
                warn_sprite_load_once(warned_missing_sprite_keys, key, None, &reason);
                None
            }
        };
        cache.insert(key.to_string(), sprite);
    }
    cache.get(key).and_then(Option::as_ref)
}

fn resolve_sprite_image_path(asset_root: &Path, key: &str) -> Result<PathBuf, String> {
    validate_sprite_key(key).map_err(|error| format!("invalid_key:{error}"))?;
    Ok(asset_root.join(format!("{key}.png")))
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_sprite_load_once(
    warned_keys: &mut HashSet<String>,
    key: &str,
    resolved_path: Option<&Path>,
    reason: &str,
) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    let path_display = resolved_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    warn!(
        sprite_key = key,
        path = %path_display,
        reason = reason,
        "renderer_sprite_load_failed_using_placeholder"
    );
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let Some(offset) = (y as usize)
        .checked_mul(width)
        .and_then(|row| row.checked_add(x as usize))
        .and_then(|pixel| pixel.checked_mul(4))
    else {
        return;
    };
    if let Some(dst) = frame.get_mut(offset..offset + 4) {
        dst.copy_from_slice(&color);
    }
}

/// Fills `[left, right) x [top, bottom)`, clipped to the frame.
#[allow(clippy::too_many_arguments)]
fn fill_rect_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: [u8; 4],
) {
    let left = left.max(0);
    let top = top.max(0);
    let right = right.min(width as i32);
    let bottom = bottom.min(height as i32);
    for y in top..bottom {
        for x in left..right {
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_rect_outline(
    frame: &mut [u8],
    width: u32,
    height: u32,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: [u8; 4],
) {
    fill_rect_clipped(frame, width, height, left, top, right + 1, top + 1, color);
    fill_rect_clipped(frame, width, height, left, bottom, right + 1, bottom + 1, color);
    fill_rect_clipped(frame, width, height, left, top, left + 1, bottom + 1, color);
    fill_rect_clipped(frame, width, height, right, top, right + 1, bottom + 1, color);
}

fn draw_square(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    fill_rect_clipped(
        frame,
        width,
        height,
        cx - half_size,
        cy - half_size,
        cx + half_size + 1,
        cy + half_size + 1,
        color,
    );
}

fn normalized_sprite_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Draws frame `frame_index` of a horizontal strip centered on `(center_x, center_y)`.
#[allow(clippy::too_many_arguments)]
fn draw_sprite_frame_scaled(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center_x: i32,
    center_y: i32,
    sprite: &LoadedSprite,
    frame_index: u32,
    scale: f32,
) {
    let frame_count = sprite.frame_count();
    let frame_width = sprite.width / frame_count;
    if frame_width == 0 || sprite.height == 0 || width == 0 || height == 0 {
        return;
    }
    if sprite.rgba.len() < sprite.width as usize * sprite.height as usize * 4 {
        return;
    }

    let scale = normalized_sprite_scale(scale);
    let inv_scale = scale.recip();
    let scaled_w = (frame_width as f32 * scale).round().max(1.0) as i32;
    let scaled_h = (sprite.height as f32 * scale).round().max(1.0) as i32;
    let left = center_x - scaled_w / 2;
    let top = center_y - scaled_h / 2;

    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = (left + scaled_w).min(width as i32);
    let draw_bottom = (top + scaled_h).min(height as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let source_x0 = frame_index.min(frame_count - 1) * frame_width;
    let sprite_stride = sprite.width as usize * 4;
    let frame_stride = width as usize * 4;
    for out_y in draw_top..draw_bottom {
        let src_y = (((out_y - top) as f32 * inv_scale).floor() as u32).min(sprite.height - 1);
        let src_row = src_y as usize * sprite_stride;
        let dst_row = out_y as usize * frame_stride;
        for out_x in draw_left..draw_right {
            let src_x = (((out_x - left) as f32 * inv_scale).floor() as u32).min(frame_width - 1);
            let src = src_row + (source_x0 + src_x) as usize * 4;
            let alpha = sprite.rgba[src + 3];
            if alpha == 0 {
                continue;
            }
            let dst = dst_row + out_x as usize * 4;
            frame[dst..dst + 4].copy_from_slice(&sprite.rgba[src..src + 4]);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

pub const CAMERA_ZOOM_DEFAULT: f32 = 1.0;
pub const CAMERA_ZOOM_MIN: f32 = 0.25;
pub const CAMERA_ZOOM_MAX: f32 = 4.0;
pub const CAMERA_ZOOM_STEP: f32 = 0.25;

/// View state handed to the painter every frame. Position is in tile units.
///
/// Pan and zoom requests are queued by input handling and applied by [`Camera::update`], which
/// the scheduler calls on every non-idle tick, including while actors are frozen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec2,
    pub zoom: f32,
    pending_pan: Vec2,
    pending_zoom_steps: i32,
    update_count: u64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            zoom: CAMERA_ZOOM_DEFAULT,
            pending_pan: Vec2::default(),
            pending_zoom_steps: 0,
            update_count: 0,
        }
    }
}

impl Camera {
    pub fn centered_on(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn effective_zoom(&self) -> f32 {
        clamp_camera_zoom(self.zoom)
    }

    pub fn set_zoom_clamped(&mut self, zoom: f32) {
        self.zoom = clamp_camera_zoom(zoom);
    }

    pub fn queue_pan(&mut self, dx: f32, dy: f32) {
        self.pending_pan.x += dx;
        self.pending_pan.y += dy;
    }

    pub fn queue_zoom_steps(&mut self, steps: i32) {
        self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(steps);
    }

    /// Applies queued pan/zoom. Returns whether the view moved.
    pub fn update(&mut self) -> bool {
        self.update_count = self.update_count.saturating_add(1);
        let before = (self.position, self.zoom);

        if self.pending_pan.x.is_finite() && self.pending_pan.y.is_finite() {
            self.position.x += self.pending_pan.x;
            self.position.y += self.pending_pan.y;
        }
        self.pending_pan = Vec2::default();

        if self.pending_zoom_steps != 0 {
            let target_zoom = self.zoom + self.pending_zoom_steps as f32 * CAMERA_ZOOM_STEP;
            self.set_zoom_clamped(target_zoom);
            self.pending_zoom_steps = 0;
        }

        before != (self.position, self.zoom)
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}

fn clamp_camera_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return CAMERA_ZOOM_DEFAULT;
    }
    zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_pan_applies_once_on_update() {
        let mut camera = Camera::default();
        camera.queue_pan(1.5, -2.0);
        camera.queue_pan(0.5, 0.0);

        assert!(camera.update());
        assert_eq!(camera.position, Vec2 { x: 2.0, y: -2.0 });
        assert!(!camera.update());
        assert_eq!(camera.update_count(), 2);
    }

    #[test]
    fn zoom_steps_clamp_at_bounds() {
        let mut camera = Camera::default();
        camera.queue_zoom_steps(100);
        camera.update();
        assert_eq!(camera.zoom, CAMERA_ZOOM_MAX);

        camera.queue_zoom_steps(-100);
        camera.update();
        assert_eq!(camera.zoom, CAMERA_ZOOM_MIN);
    }

    #[test]
    fn non_finite_zoom_falls_back_to_default() {
        let mut camera = Camera::default();
        camera.set_zoom_clamped(f32::NAN);
        assert_eq!(camera.effective_zoom(), CAMERA_ZOOM_DEFAULT);
    }
}

use std::sync::Arc;

use crate::config::ShowcaseConfig;
use crate::controls::OrbitControls;
use crate::data_model::SceneHandle;
use crate::input::{InputState, KeyCode, DEBUG_TOGGLE};
use crate::render::CameraParams;
use crate::scene::SceneSummary;
use crate::tween::Timeline;

/// Output surface size in CSS/logical pixels plus the clamped device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    max_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32, max_pixel_ratio: f32) -> Self {
        let mut viewport = Self {
            width: 1,
            height: 1,
            pixel_ratio: 1.0,
            max_pixel_ratio: max_pixel_ratio.max(0.1),
        };
        viewport.resize(width, height, device_pixel_ratio);
        viewport
    }

    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.pixel_ratio = device_pixel_ratio.clamp(0.1, self.max_pixel_ratio);
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Drawing buffer size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.pixel_ratio).round().max(1.0) as u32,
            (self.height as f32 * self.pixel_ratio).round().max(1.0) as u32,
        )
    }
}

/// Turns monotonic timestamps (seconds) into frame deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    start: Option<f64>,
    last: Option<f64>,
}

impl FrameClock {
    /// Longest step handed to the animations, so a backgrounded tab does not skip ahead.
    pub const MAX_DELTA: f32 = 0.1;

    pub fn tick(&mut self, now: f64) -> f32 {
        self.start.get_or_insert(now);
        let dt = self
            .last
            .replace(now)
            .map_or(0.0, |last| (now - last).max(0.0) as f32);
        dt.min(Self::MAX_DELTA)
    }

    pub fn elapsed(&self) -> f64 {
        match (self.start, self.last) {
            (Some(start), Some(last)) => last - start,
            _ => 0.0,
        }
    }
}

/// Debug overlay. Starts hidden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugPanel {
    visible: bool,
}

impl DebugPanel {
    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Per-frame state shared by the native window loop and the browser loop.
pub struct ShowcaseApp {
    handle: SceneHandle,
    input: Arc<InputState>,
    controls: OrbitControls,
    clock: FrameClock,
    viewport: Viewport,
    debug: DebugPanel,
}

impl ShowcaseApp {
    pub fn new(handle: SceneHandle, config: &ShowcaseConfig, viewport: Viewport) -> Self {
        handle.update(|scene| scene.camera.aspect = viewport.aspect());
        Self {
            handle,
            input: Arc::new(InputState::new()),
            controls: OrbitControls::new(config.controls),
            clock: FrameClock::default(),
            viewport,
            debug: DebugPanel::default(),
        }
    }

    pub fn handle(&self) -> &SceneHandle {
        &self.handle
    }

    pub fn input(&self) -> &Arc<InputState> {
        &self.input
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn debug_panel(&self) -> &DebugPanel {
        &self.debug
    }

    /// Updates the viewport and the camera aspect. Returns the new drawing buffer size.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f32) -> (u32, u32) {
        self.viewport.resize(width, height, device_pixel_ratio);
        let aspect = self.viewport.aspect();
        self.handle.update(|scene| scene.camera.aspect = aspect);
        self.viewport.physical_size()
    }

    /// Routes a key press. Returns `true` if it toggled the debug panel.
    pub fn key_pressed(&mut self, key: KeyCode) -> bool {
        if !self.input.set_key_down(key) || key != DEBUG_TOGGLE {
            return false;
        }
        let visible = self.debug.toggle();
        log::info!("debug panel {}", if visible { "shown" } else { "hidden" });
        true
    }

    pub fn key_released(&mut self, key: KeyCode) {
        self.input.set_key_up(key);
    }

    /// Advances tweens, applies orbit input and returns the camera for this frame.
    pub fn frame(&mut self, now: f64) -> CameraParams {
        let dt = self.clock.tick(now);
        self.handle.advance(dt);

        let input = self.input.take_orbit_input();
        let (_, physical_height) = self.viewport.physical_size();
        self.controls.handle_input(input, physical_height as f32);
        let controls = &mut self.controls;
        self.handle.update(|scene| {
            controls.update(&mut scene.camera);
            CameraParams::from_camera(&scene.camera)
        })
    }

    /// Lines shown by the debug panel while it is visible.
    pub fn debug_lines(&self) -> Vec<String> {
        if !self.debug.is_visible() {
            return Vec::new();
        }
        let (position, opacity) = self.handle.read(|scene| {
            let opacity = scene
                .meshes()
                .first()
                .and_then(|mesh| scene.material(mesh.material))
                .map(|material| material.opacity);
            (scene.camera.position, opacity)
        });
        let summary = self.handle.summary();
        let animating = !self.handle.timeline(Timeline::is_idle);
        vec![
            format!(
                "camera {:.2} {:.2} {:.2}",
                position.x, position.y, position.z
            ),
            format!(
                "opacity {}",
                opacity.map_or_else(|| "-".to_string(), |value| format!("{value:.2}"))
            ),
            format!("meshes {}", summary.meshes),
            format!("tweens {}", if animating { "running" } else { "idle" }),
            format!("pixel ratio {:.2}", self.viewport.pixel_ratio),
            format!("elapsed {:.1}s", self.clock.elapsed()),
        ]
    }
}

pub fn summary_lines(summary: &SceneSummary) -> Vec<String> {
    let environment = match summary.environment {
        Some((width, height, mapping)) => format!("{width}x{height} ({})", mapping.label()),
        None => "none".to_string(),
    };
    vec![
        format!("Loaded scene with {} meshes", summary.meshes),
        format!("Environment: {environment}"),
        format!(" - text: {}", summary.text),
        format!(" - torus: {}", summary.torus),
        format!(" - torus knot: {}", summary.torus_knots),
        format!(" - materials: {}", summary.materials),
    ]
}

pub fn print_summary(summary: &SceneSummary) {
    for line in summary_lines(summary) {
        println!("{line}");
    }
}

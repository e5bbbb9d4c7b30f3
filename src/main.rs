use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec2;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::{Window, WindowId};

use scene_showcase::app::{print_summary, ShowcaseApp, Viewport};
use scene_showcase::assets::FsAssetSource;
use scene_showcase::config::ShowcaseConfig;
use scene_showcase::data_model::SceneHandle;
use scene_showcase::input::{KeyCode, MouseButton};
use scene_showcase::loading::LoadingManager;
use scene_showcase::placement::scene_rng;
use scene_showcase::progress::{ProgressSink, ProgressTracker};
use scene_showcase::render::Renderer;
use scene_showcase::scene::{PerspectiveCamera, Scene};
use scene_showcase::sequencer::SceneSequencer;

const WINDOW_TITLE: &str = "Scene Showcase";

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    if !options.asset_dir.is_dir() {
        bail!(
            "asset directory {} does not exist",
            options.asset_dir.display()
        );
    }
    let mut config = match &options.config {
        Some(path) => ShowcaseConfig::load(path)?,
        None => ShowcaseConfig::default(),
    };
    if options.seed.is_some() {
        config.seed = options.seed;
    }

    let handle = SceneHandle::new(Scene::new(PerspectiveCamera::from_config(
        &config.camera,
        16.0 / 9.0,
    )));
    let manager = LoadingManager::new(ProgressTracker::new(TerminalProgress::new()));
    let mut sequencer = SceneSequencer::new(
        FsAssetSource::new(&options.asset_dir),
        manager,
        config.clone(),
    );
    let mut rng = scene_rng(config.seed);
    if let Err(err) = block_on(sequencer.run(&handle, &mut rng)) {
        eprintln!("Scene incomplete: {err} ({})", err.source);
    }
    print_summary(&handle.summary());

    if options.summary_only {
        return Ok(());
    }
    match run_interactive(handle, &config) {
        Ok(()) => Ok(()),
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!(
                "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
            );
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn run_interactive(handle: SceneHandle, config: &ShowcaseConfig) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut state = WindowState {
        handle,
        config: config.clone(),
        started: Instant::now(),
        active: None,
        last_error: None,
    };
    event_loop
        .run_app(&mut state)
        .context("event loop terminated abnormally")?;

    match state.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Terminal stand-in for the page's progress bar.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}%") {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl ProgressSink for TerminalProgress {
    fn set_percent(&self, percent: f32) {
        if self.bar.is_finished() {
            return;
        }
        self.bar.set_position(percent.round() as u64);
    }

    fn set_visible(&self, visible: bool) {
        if !visible {
            self.bar.finish_and_clear();
        }
    }
}

struct WindowState {
    handle: SceneHandle,
    config: ShowcaseConfig,
    started: Instant,
    active: Option<ActiveWindow>,
    last_error: Option<anyhow::Error>,
}

struct ActiveWindow {
    renderer: Renderer,
    app: ShowcaseApp,
}

impl WindowState {
    fn open(&self, event_loop: &ActiveEventLoop) -> Result<ActiveWindow> {
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title(WINDOW_TITLE)
                        .with_inner_size(LogicalSize::new(1280.0, 720.0)),
                )
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        let renderer = block_on(Renderer::new(Arc::clone(&window)))?;
        let scale = window.scale_factor();
        let logical = window.inner_size().to_logical::<f64>(scale);
        let viewport = Viewport::new(
            logical.width as u32,
            logical.height as u32,
            scale as f32,
            self.config.max_pixel_ratio,
        );
        let app = ShowcaseApp::new(self.handle.clone(), &self.config, viewport);
        info!("window opened at {}x{}", logical.width, logical.height);
        Ok(ActiveWindow { renderer, app })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.last_error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.active.is_some() {
            return;
        }
        match self.open(event_loop) {
            Ok(active) => self.active = Some(active),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let now = self.started.elapsed().as_secs_f64();
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if window_id != active.renderer.window_id() {
            return;
        }
        if let Err(err) = active.process_event(event_loop, event, now) {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(active) = &self.active {
            active.renderer.window().request_redraw();
        }
    }
}

impl ActiveWindow {
    fn process_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
        now: f64,
    ) -> Result<()> {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let scale = self.renderer.window().scale_factor();
                let logical = size.to_logical::<f64>(scale);
                self.app
                    .resize(logical.width as u32, logical.height as u32, scale as f32);
                self.renderer.resize(size);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let Some(key) = map_key(&event.logical_key) else {
                    return Ok(());
                };
                match event.state {
                    ElementState::Pressed if !event.repeat => {
                        if self.app.key_pressed(key) && !self.app.debug_panel().is_visible() {
                            self.renderer.window().set_title(WINDOW_TITLE);
                        }
                    }
                    ElementState::Pressed => {}
                    ElementState::Released => self.app.key_released(key),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = map_mouse_button(button);
                match state {
                    ElementState::Pressed => self.app.input().set_mouse_button_down(button),
                    ElementState::Released => self.app.input().set_mouse_button_up(button),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.app
                    .input()
                    .set_mouse_position(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y,
                    MouseScrollDelta::PixelDelta(position) => -(position.y as f32) / 100.0,
                };
                self.app.input().add_wheel(steps);
            }
            WindowEvent::RedrawRequested => self.redraw(now)?,
            _ => {}
        }
        Ok(())
    }

    fn redraw(&mut self, now: f64) -> Result<()> {
        let camera = self.app.frame(now);
        self.renderer.update_globals(&camera);
        if self.app.debug_panel().is_visible() {
            let title = format!("{WINDOW_TITLE} | {}", self.app.debug_lines().join(" | "));
            self.renderer.window().set_title(&title);
        }
        let renderer = &mut self.renderer;
        let result = self.app.handle().read(|scene| renderer.render(scene));
        match result {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.renderer.window().inner_size();
                self.renderer.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(anyhow!("GPU is out of memory")),
            Err(wgpu::SurfaceError::Timeout) => info!("Surface timeout; retrying next frame"),
            Err(wgpu::SurfaceError::Other) => {
                warn!("Surface reported an unknown error; retrying next frame")
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

fn map_key(key: &Key) -> Option<KeyCode> {
    match key {
        Key::Character(text) => KeyCode::from_name(text.as_str()),
        _ => None,
    }
}

/// Numbers buttons the way DOM `MouseEvent.button` does.
fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    let index = match button {
        WinitMouseButton::Left => 0,
        WinitMouseButton::Middle => 1,
        WinitMouseButton::Right => 2,
        WinitMouseButton::Back => 3,
        WinitMouseButton::Forward => 4,
        WinitMouseButton::Other(value) => value.min(u8::MAX as u16) as u8,
    };
    MouseButton::new(index)
}

struct CliOptions {
    asset_dir: PathBuf,
    config: Option<PathBuf>,
    seed: Option<u64>,
    summary_only: bool,
}

impl CliOptions {
    const USAGE: &'static str =
        "Usage: scene-showcase <asset-dir> [--config <file>] [--seed <n>] [--summary-only]";

    fn parse() -> Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let Some(asset_dir) = args.next().filter(|arg| !arg.starts_with("--")) else {
            return Err(anyhow!(Self::USAGE));
        };
        let mut options = Self {
            asset_dir: PathBuf::from(asset_dir),
            config: None,
            seed: None,
            summary_only: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => options.summary_only = true,
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("--config expects a file path"))?;
                    options.config = Some(PathBuf::from(path));
                }
                "--seed" => {
                    let seed = args
                        .next()
                        .ok_or_else(|| anyhow!("--seed expects a number"))?;
                    options.seed = Some(
                        seed.parse()
                            .with_context(|| format!("invalid seed {seed}"))?,
                    );
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --config, --seed or --summary-only"
                    ));
                }
            }
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse_from(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_all_flags() {
        let options = parse(&["assets", "--seed", "42", "--config", "c.json", "--summary-only"])
            .unwrap();
        assert_eq!(options.asset_dir, PathBuf::from("assets"));
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.config, Some(PathBuf::from("c.json")));
        assert!(options.summary_only);
    }

    #[test]
    fn rejects_bad_seed_and_missing_dir() {
        assert!(parse(&["assets", "--seed", "many"]).is_err());
        assert!(parse(&["assets", "--seed"]).is_err());
        assert!(parse(&["--summary-only"]).is_err());
    }
}

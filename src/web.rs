#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use glam::Vec2;
use log::{error, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    window, Document, HtmlCanvasElement, HtmlElement, HtmlProgressElement, KeyboardEvent,
    MouseEvent, Response, WheelEvent, Window,
};

use crate::app::{summary_lines, ShowcaseApp, Viewport};
use crate::assets::AssetSource;
use crate::config::ShowcaseConfig;
use crate::data_model::SceneHandle;
use crate::error::LoadError;
use crate::input::wasm::{map_key, wheel_steps, EventListener};
use crate::input::MouseButton;
use crate::loading::LoadingManager;
use crate::placement::scene_rng;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::render::Renderer;
use crate::scene::{PerspectiveCamera, Scene};
use crate::sequencer::SceneSequencer;

#[wasm_bindgen(start)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&JsValue::from_str("logger already initialized"));
    }
}

/// Writes load progress into `#progress-bar` and hides `.progress-bar-container` when done.
struct DomProgressSink {
    bar: Option<HtmlProgressElement>,
    container: Option<HtmlElement>,
}

impl DomProgressSink {
    fn from_document(document: &Document) -> Self {
        let bar = document
            .get_element_by_id("progress-bar")
            .and_then(|element| element.dyn_into::<HtmlProgressElement>().ok());
        let container = document
            .query_selector(".progress-bar-container")
            .ok()
            .flatten()
            .and_then(|element| element.dyn_into::<HtmlElement>().ok());
        if bar.is_none() {
            warn!("#progress-bar not found; load progress is only logged");
        }
        Self { bar, container }
    }
}

impl ProgressSink for DomProgressSink {
    fn set_percent(&self, percent: f32) {
        if let Some(bar) = &self.bar {
            bar.set_value(percent as f64);
        }
    }

    fn set_visible(&self, visible: bool) {
        let Some(container) = &self.container else {
            return;
        };
        let display = if visible { "" } else { "none" };
        if let Err(err) = container.style().set_property("display", display) {
            warn!("unable to update progress container: {err:?}");
        }
    }
}

/// Fetches assets over HTTP relative to `base`, reporting progress from `Content-Length`.
struct FetchAssetSource {
    base: String,
}

impl FetchAssetSource {
    fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl AssetSource for FetchAssetSource {
    async fn fetch(
        &self,
        path: &str,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<Vec<u8>, LoadError> {
        let failed = |reason: String| LoadError::Fetch {
            url: path.to_string(),
            reason,
        };
        let window = window().ok_or_else(|| failed("window not available".into()))?;
        let url = format!("{}{}", self.base, path);
        let response: Response = JsFuture::from(window.fetch_with_str(&url))
            .await
            .map_err(|err| failed(format!("{err:?}")))?
            .dyn_into()
            .map_err(|_| failed("fetch did not return a Response".into()))?;
        if response.status() == 404 {
            return Err(LoadError::NotFound {
                url: path.to_string(),
            });
        }
        if !response.ok() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let total = response
            .headers()
            .get("content-length")
            .ok()
            .flatten()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0);
        if total > 0 {
            progress(0, total);
        }
        let promise = response
            .array_buffer()
            .map_err(|err| failed(format!("{err:?}")))?;
        let buffer = JsFuture::from(promise)
            .await
            .map_err(|err| failed(format!("{err:?}")))?;
        let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
        let len = bytes.len() as u64;
        progress(len, total.max(len));
        Ok(bytes)
    }
}

#[wasm_bindgen]
pub struct WasmApp {
    inner: Rc<RefCell<AppState>>,
}

#[wasm_bindgen]
impl WasmApp {
    /// `config_json` optionally overrides [`ShowcaseConfig`] fields.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: String, config_json: Option<String>) -> Result<WasmApp, JsValue> {
        let config = match config_json {
            Some(json) => ShowcaseConfig::from_json_str(&json).map_err(to_js)?,
            None => ShowcaseConfig::default(),
        };
        let window = window().ok_or_else(|| JsValue::from_str("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document not available"))?;
        let canvas = document
            .get_element_by_id(&canvas_id)
            .ok_or_else(|| JsValue::from_str("canvas element not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("element is not a canvas"))?;

        let (width, height, ratio) = window_metrics(&window);
        let viewport = Viewport::new(width, height, ratio, config.max_pixel_ratio);
        let handle = SceneHandle::new(Scene::new(PerspectiveCamera::from_config(
            &config.camera,
            viewport.aspect(),
        )));
        let app = ShowcaseApp::new(handle, &config, viewport);
        let renderer = Renderer::new(canvas.clone()).map_err(to_js)?;

        let mut state = AppState {
            app,
            renderer,
            canvas,
            config,
            _listeners: Vec::new(),
        };
        state.apply_size();
        Ok(Self {
            inner: Rc::new(RefCell::new(state)),
        })
    }

    /// Starts the asset pipeline, wires DOM input and begins the frame loop.
    pub fn start(&self) -> Result<(), JsValue> {
        spawn_scene_load(&self.inner.borrow()).map_err(to_js)?;
        attach_listeners(&self.inner).map_err(to_js)?;
        schedule_animation_loop(Rc::clone(&self.inner)).map_err(to_js)
    }
}

struct AppState {
    app: ShowcaseApp,
    renderer: Renderer,
    canvas: HtmlCanvasElement,
    config: ShowcaseConfig,
    _listeners: Vec<EventListener>,
}

impl AppState {
    fn apply_size(&mut self) {
        let viewport = *self.app.viewport();
        self.renderer.resize(viewport.physical_size());
        let style = self.canvas.style();
        for (property, pixels) in [("width", viewport.width), ("height", viewport.height)] {
            if let Err(err) = style.set_property(property, &format!("{pixels}px")) {
                warn!("unable to set canvas {property}: {err:?}");
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32, ratio: f32) {
        self.app.resize(width, height, ratio);
        self.apply_size();
    }

    fn render_frame(&mut self, now: f64) -> Result<()> {
        let camera = self.app.frame(now);
        self.renderer.update_globals(&camera);
        let overlay = self.app.debug_lines();
        let renderer = &mut self.renderer;
        self.app
            .handle()
            .read(|scene| renderer.render(scene, &overlay))
            .map_err(|err| {
                let message = err
                    .as_string()
                    .unwrap_or_else(|| "unknown canvas error".to_string());
                anyhow!("render failed: {message}")
            })
    }
}

fn spawn_scene_load(state: &AppState) -> Result<()> {
    let document = window()
        .and_then(|window| window.document())
        .ok_or_else(|| anyhow!("document not available"))?;
    let manager = LoadingManager::new(ProgressTracker::new(DomProgressSink::from_document(
        &document,
    )));
    let handle = state.app.handle().clone();
    let config = state.config.clone();
    spawn_local(async move {
        let mut rng = scene_rng(config.seed);
        let mut sequencer = SceneSequencer::new(FetchAssetSource::new(""), manager, config);
        match sequencer.run(&handle, &mut rng).await {
            Ok(report) => info!("scene ready with {} instances", report.instances.len()),
            Err(err) => error!("scene incomplete: {err} ({})", err.source),
        }
        for line in summary_lines(&handle.summary()) {
            info!("{line}");
        }
    });
    Ok(())
}

fn attach_listeners(inner: &Rc<RefCell<AppState>>) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow!("document not available"))?;
    let canvas = inner.borrow().canvas.clone();
    let mut listeners = Vec::new();

    {
        let state = Rc::clone(inner);
        listeners.push(EventListener::new(&document, "keydown", move |event| {
            let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            if event.repeat() {
                return;
            }
            if let Some(key) = map_key(event) {
                state.borrow_mut().app.key_pressed(key);
            }
        })?);
    }

    {
        let state = Rc::clone(inner);
        listeners.push(EventListener::new(&document, "keyup", move |event| {
            let Some(key) = event.dyn_ref::<KeyboardEvent>().and_then(map_key) else {
                return;
            };
            state.borrow_mut().app.key_released(key);
        })?);
    }

    {
        let state = Rc::clone(inner);
        listeners.push(EventListener::new(&canvas, "mousedown", move |event| {
            if let Some(event) = event.dyn_ref::<MouseEvent>() {
                let button = MouseButton::new(event.button() as u8);
                state.borrow().app.input().set_mouse_button_down(button);
            }
        })?);
    }

    {
        let state = Rc::clone(inner);
        listeners.push(EventListener::new(&window, "mouseup", move |event| {
            if let Some(event) = event.dyn_ref::<MouseEvent>() {
                let button = MouseButton::new(event.button() as u8);
                state.borrow().app.input().set_mouse_button_up(button);
            }
        })?);
    }

    {
        let state = Rc::clone(inner);
        listeners.push(EventListener::new(&window, "mousemove", move |event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let state = state.borrow();
            // Drag is measured in drawing-buffer pixels, like the viewport height.
            let ratio = state.app.viewport().pixel_ratio;
            let position = Vec2::new(event.client_x() as f32, event.client_y() as f32) * ratio;
            state.app.input().set_mouse_position(position);
        })?);
    }

    {
        let state = Rc::clone(inner);
        listeners.push(EventListener::new(&canvas, "wheel", move |event| {
            if let Some(event) = event.dyn_ref::<WheelEvent>() {
                state.borrow().app.input().add_wheel(wheel_steps(event));
            }
        })?);
    }

    {
        let state = Rc::clone(inner);
        let resize_window = window.clone();
        listeners.push(EventListener::new(&window, "resize", move |_| {
            let (width, height, ratio) = window_metrics(&resize_window);
            state.borrow_mut().resize(width, height, ratio);
        })?);
    }

    inner.borrow_mut()._listeners = listeners;
    Ok(())
}

fn schedule_animation_loop(app: Rc<RefCell<AppState>>) -> Result<()> {
    let callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let next = Rc::clone(&callback);
    *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
        if let Err(err) = app.borrow_mut().render_frame(timestamp / 1000.0) {
            error!("{err}");
        }
        if let Some(closure) = next.borrow().as_ref() {
            if let Err(err) = request_frame(closure) {
                error!("{err}");
            }
        }
    }) as Box<dyn FnMut(f64)>));

    let first = callback.borrow();
    let closure = first
        .as_ref()
        .ok_or_else(|| anyhow!("animation callback missing"))?;
    request_frame(closure)
}

fn request_frame(closure: &Closure<dyn FnMut(f64)>) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
    Ok(())
}

fn window_metrics(window: &Window) -> (u32, u32, f32) {
    let dimension = |value: Result<JsValue, JsValue>, fallback: f64| {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(fallback) as u32
    };
    (
        dimension(window.inner_width(), 1280.0),
        dimension(window.inner_height(), 720.0),
        window.device_pixel_ratio() as f32,
    )
}

fn to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

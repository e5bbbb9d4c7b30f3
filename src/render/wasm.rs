use std::f64::consts::TAU;

use anyhow::{anyhow, Result};
use glam::{Vec3, Vec4Swizzles};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::scene::{Geometry, Scene};

use super::common::{clear_color, draw_list, normal_color, CameraParams};

/// Renderer backed by a 2D canvas for WebAssembly builds.
///
/// Each mesh is drawn as a billboard at its projected origin: text as filled
/// glyphs, tori as rings and knots as discs, shaded like the normal material.
pub struct Renderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    size: (u32, u32),
    camera: Option<CameraParams>,
}

impl Renderer {
    /// Creates a renderer that draws into the provided HTML canvas element.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|err| anyhow!("failed to query canvas context: {err:?}"))?
            .ok_or_else(|| anyhow!("canvas does not support 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("failed to cast canvas context"))?;

        let size = (canvas.width(), canvas.height());
        Ok(Self {
            canvas,
            context,
            size,
            camera: None,
        })
    }

    /// Resizes the drawing buffer, in physical pixels.
    pub fn resize(&mut self, new_size: (u32, u32)) {
        if new_size.0 == 0 || new_size.1 == 0 {
            return;
        }
        self.size = new_size;
        self.canvas.set_width(new_size.0);
        self.canvas.set_height(new_size.1);
    }

    pub fn update_globals(&mut self, camera: &CameraParams) {
        self.camera = Some(*camera);
    }

    pub fn render(&mut self, scene: &Scene, overlay: &[String]) -> Result<(), JsValue> {
        let (width, height) = (self.size.0 as f64, self.size.1 as f64);
        let clear = clear_color(scene);
        self.context.set_global_alpha(1.0);
        self.context.set_fill_style_str(&css_color(clear));
        self.context.fill_rect(0.0, 0.0, width, height);

        if let Some(camera) = self.camera {
            let mut items: Vec<_> = draw_list(scene)
                .into_iter()
                .filter_map(|item| {
                    let origin = item.model.w_axis.xyz();
                    let clip = camera.view_proj * origin.extend(1.0);
                    if clip.w <= 0.0 {
                        return None;
                    }
                    let ndc = clip.xyz() / clip.w;
                    if ndc.z > 1.0 || ndc.x.abs() > 1.2 || ndc.y.abs() > 1.2 {
                        return None;
                    }
                    Some((item, ndc, clip.w))
                })
                .collect();
            items.sort_by(|a, b| b.2.total_cmp(&a.2));

            let focal = height / 2.0 * camera.projection_scale as f64;
            for (item, ndc, depth) in items {
                let x = (ndc.x as f64 * 0.5 + 0.5) * width;
                let y = (0.5 - ndc.y as f64 * 0.5) * height;
                let scale = item.model.x_axis.xyz().length() as f64;
                let pixels = focal * scale / depth as f64;
                let facing = camera.view.transform_vector3(item.normal * Vec3::Z);
                let color = css_color(normal_color(facing));

                self.context.set_global_alpha(item.opacity as f64);
                self.context.set_fill_style_str(&color);
                self.context.set_stroke_style_str(&color);
                match scene.geometry(item.geometry) {
                    Some(Geometry::Text(shape)) => {
                        let font_px = (pixels * shape.params().size as f64 * 1.4).max(1.0);
                        self.context.set_font(&format!("bold {font_px:.0}px sans-serif"));
                        self.context.set_text_align("center");
                        self.context.fill_text(shape.text(), x, y)?;
                    }
                    Some(Geometry::Torus(params)) => {
                        self.context.set_line_width((pixels * params.tube as f64 * 2.0).max(1.0));
                        self.context.begin_path();
                        self.context
                            .arc(x, y, (pixels * params.radius as f64).max(0.5), 0.0, TAU)?;
                        self.context.stroke();
                    }
                    Some(Geometry::TorusKnot(params)) => {
                        self.context.begin_path();
                        self.context
                            .arc(x, y, (pixels * params.radius as f64 * 1.5).max(0.5), 0.0, TAU)?;
                        self.context.fill();
                    }
                    None => {}
                }
            }
        }

        if !overlay.is_empty() {
            self.context.set_global_alpha(0.85);
            self.context.set_fill_style_str("#1f1f1f");
            self.context
                .fill_rect(width - 260.0, 0.0, 260.0, 18.0 * overlay.len() as f64 + 12.0);
            self.context.set_global_alpha(1.0);
            self.context.set_fill_style_str("#ebebeb");
            self.context.set_font("12px monospace");
            self.context.set_text_align("left");
            for (index, line) in overlay.iter().enumerate() {
                self.context
                    .fill_text(line, width - 250.0, 20.0 + 18.0 * index as f64)?;
            }
        }
        Ok(())
    }
}

fn css_color(color: Vec3) -> String {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgb({}, {}, {})",
        channel(color.x),
        channel(color.y),
        channel(color.z)
    )
}

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlCanvasElement};

use crate::render::{FrameOutcome, Renderer, WebGlContext};
use crate::shaders::{ShaderSourceBundle, SHADER_FILES};
use crate::{RenderSettings, ShapeKind};

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
}

/// Browser handle around one canvas.
///
/// Created uninitialized; `init` or `initBuiltin` compiles the shaders and
/// makes it ready. Every other call fails until then.
#[wasm_bindgen]
pub struct NeonApp {
    inner: Rc<RefCell<AppState>>,
}

#[wasm_bindgen]
impl NeonApp {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<NeonApp, JsValue> {
        let window = window().ok_or_else(|| JsValue::from_str("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document not available"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str("canvas element not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("element is not a canvas"))?;

        let state = AppState {
            canvas,
            settings: RenderSettings::default(),
            phase: Phase::Uninitialized,
            animating: false,
        };
        Ok(Self {
            inner: Rc::new(RefCell::new(state)),
        })
    }

    /// Compiles the renderer from a JS object holding the six named sources
    /// (`vertex`, `fragment`, `bloomVertex`, `bloomFragment`, `blur`,
    /// `composite`).
    pub fn init(&self, sources: &JsValue) -> Result<(), JsValue> {
        let mut named = Vec::with_capacity(SHADER_FILES.len());
        for (name, _) in SHADER_FILES {
            let value = js_sys::Reflect::get(sources, &JsValue::from_str(name))?;
            if let Some(source) = value.as_string() {
                named.push((name, source));
            }
        }
        let bundle = ShaderSourceBundle::from_named(named).map_err(to_js)?;
        self.inner.borrow_mut().initialize(&bundle).map_err(to_js)
    }

    #[wasm_bindgen(js_name = initBuiltin)]
    pub fn init_builtin(&self) -> Result<(), JsValue> {
        self.inner
            .borrow_mut()
            .initialize(&ShaderSourceBundle::builtin())
            .map_err(to_js)
    }

    /// Settings XML applied by the next `init`.
    #[wasm_bindgen(js_name = loadSettings)]
    pub fn load_settings(&self, xml: &str) -> Result<(), JsValue> {
        let settings = RenderSettings::from_xml(xml).map_err(to_js)?;
        self.inner.borrow_mut().settings = settings;
        Ok(())
    }

    #[wasm_bindgen(js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.borrow().phase, Phase::Ready(_))
    }

    /// Draws one frame and returns how it reached the canvas.
    pub fn render(&self) -> Result<String, JsValue> {
        let outcome = self.inner.borrow_mut().render_frame().map_err(to_js)?;
        Ok(format!("{outcome:?}"))
    }

    #[wasm_bindgen(js_name = setShape)]
    pub fn set_shape(&self, name: &str) -> Result<(), JsValue> {
        let shape: ShapeKind = name.parse().map_err(to_js)?;
        self.inner.borrow().renderer()?.set_shape(shape);
        Ok(())
    }

    /// Unknown names select red.
    #[wasm_bindgen(js_name = setColor)]
    pub fn set_color(&self, name: &str) -> Result<(), JsValue> {
        self.inner.borrow().renderer()?.set_color_name(name);
        Ok(())
    }

    #[wasm_bindgen(js_name = adjustZoom)]
    pub fn adjust_zoom(&self, delta: f32) -> Result<(), JsValue> {
        self.inner.borrow().renderer()?.adjust_zoom(delta);
        Ok(())
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<(), JsValue> {
        self.inner.borrow().renderer()?.on_viewport_resized(width, height);
        Ok(())
    }

    /// Renders every animation frame from now on.
    pub fn start(&self) -> Result<(), JsValue> {
        {
            let mut state = self.inner.borrow_mut();
            state.renderer()?;
            if state.animating {
                return Ok(());
            }
            state.animating = true;
        }
        schedule_animation_loop(Rc::clone(&self.inner)).map_err(to_js)
    }
}

enum Phase {
    Uninitialized,
    Ready(Box<Renderer<WebGlContext>>),
}

struct AppState {
    canvas: HtmlCanvasElement,
    settings: RenderSettings,
    phase: Phase,
    animating: bool,
}

impl AppState {
    fn initialize(&mut self, sources: &ShaderSourceBundle) -> Result<()> {
        if let Phase::Ready(_) = self.phase {
            log::warn!("renderer already initialized, rebuilding");
        }
        self.phase = Phase::Uninitialized;

        let gpu = WebGlContext::from_canvas(self.canvas.clone())
            .map_err(|err| anyhow!("failed to acquire WebGL context: {err:?}"))?;
        let renderer = Renderer::new(
            gpu,
            sources,
            self.settings.clone(),
            self.canvas.width(),
            self.canvas.height(),
        )?;
        self.phase = Phase::Ready(Box::new(renderer));
        Ok(())
    }

    fn renderer(&self) -> Result<&Renderer<WebGlContext>, JsValue> {
        match &self.phase {
            Phase::Ready(renderer) => Ok(renderer.as_ref()),
            Phase::Uninitialized => Err(JsValue::from_str("renderer is not initialized")),
        }
    }

    fn render_frame(&mut self) -> Result<FrameOutcome> {
        match &mut self.phase {
            Phase::Ready(renderer) => Ok(renderer.render()?),
            Phase::Uninitialized => Err(anyhow!("render called before init")),
        }
    }
}

fn schedule_animation_loop(app: Rc<RefCell<AppState>>) -> Result<()> {
    let frame: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next = Rc::clone(&frame);

    *frame.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        let rendered = app.borrow_mut().render_frame();
        if let Err(err) = rendered {
            log::error!("frame failed, stopping animation: {err:#}");
            app.borrow_mut().animating = false;
            return;
        }
        if let Some(closure) = next.borrow().as_ref() {
            if let Err(err) = request_frame(closure) {
                log::error!("{err:#}");
            }
        }
    }) as Box<dyn FnMut()>));

    let scheduled = frame.borrow();
    let closure = scheduled
        .as_ref()
        .ok_or_else(|| anyhow!("animation callback missing"))?;
    request_frame(closure)
}

fn request_frame(closure: &Closure<dyn FnMut()>) -> Result<()> {
    window()
        .ok_or_else(|| anyhow!("window not available"))?
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
    Ok(())
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

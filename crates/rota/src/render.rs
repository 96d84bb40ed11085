use crate::config::ChartConfig;
use crate::error::ChartError;
use crate::events::ChartEvent;
use crate::geometry::Point;
use crate::raster::Raster;
use crate::slice::PieSlice;
use crate::state::ChartState;
use cairo::{Antialias, Context, Format, ImageSurface, Operator};
use palette::{Srgb, Srgba, WithAlpha};
use parking_lot::{Condvar, Mutex};
use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const THREAD_NAME: &str = "rota-render";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    /// Disc drawn behind the slices, visible as a ring around them.
    pub background: Srgba<f64>,
    /// Radial lines separating neighbouring slices.
    pub divider: Srgba<f64>,
    pub chart_stroke: f64,
}

impl RenderStyle {
    pub fn from_config(config: &ChartConfig) -> Self {
        Self {
            background: config.background.0.into_format::<f64>().with_alpha(1.0),
            divider: config.divider.0.into_format::<f64>().with_alpha(1.0),
            chart_stroke: config.chart_stroke,
        }
    }
}

struct SliceRenderer<'a> {
    slice: &'a PieSlice,
}

impl<'a> SliceRenderer<'a> {
    fn new(slice: &'a PieSlice) -> Self {
        Self { slice }
    }

    fn draw(&self, cr: &Context, divider: Srgba<f64>) -> Result<(), cairo::Error> {
        self.draw_wedge(cr)?;
        self.draw_edges(cr, divider)
    }

    fn draw_wedge(&self, cr: &Context) -> Result<(), cairo::Error> {
        let center = self.slice.inner_bounds().center();
        let start = self.slice.offset();
        let end = start + self.slice.degrees();

        let (r, g, b) = self.slice.color().into_format::<f64>().into_components();
        cr.set_source_rgb(r, g, b);
        cr.move_to(center.x, center.y);
        cr.arc(
            center.x,
            center.y,
            self.slice.radius(),
            start.to_radians(),
            end.to_radians(),
        );
        cr.close_path();
        cr.fill()
    }

    fn draw_edges(&self, cr: &Context, divider: Srgba<f64>) -> Result<(), cairo::Error> {
        let (r, g, b, a) = divider.into_components();
        cr.set_source_rgba(r, g, b, a);
        cr.set_line_width(self.slice.stroke_width());
        for edge in [self.slice.start_edge(), self.slice.end_edge()] {
            cr.move_to(edge.from.x, edge.from.y);
            cr.line_to(edge.to.x, edge.to.y);
        }
        cr.stroke()
    }
}

fn clear(cr: &Context) -> Result<(), cairo::Error> {
    cr.save()?;
    cr.set_operator(Operator::Clear);
    cr.paint()?;
    cr.restore()
}

/// Scales and rotates the user space about `center`.
fn transform_about(cr: &Context, center: Point, scale: f64, rotation: f64) {
    cr.translate(center.x, center.y);
    cr.scale(scale, scale);
    cr.rotate(rotation.to_radians());
    cr.translate(-center.x, -center.y);
}

/// Paints the visible chart: background disc, then every slice with its
/// dividers, under the current scale and rotation.
pub fn draw_chart(cr: &Context, state: &ChartState) -> Result<(), cairo::Error> {
    clear(cr)?;

    let scale = state.scale();
    if scale <= 0.0 || state.adapter().is_none() {
        return Ok(());
    }

    let style = state.style();
    let geometry = state.geometry();

    cr.save()?;
    transform_about(cr, geometry.center, scale, state.rotation());

    let (r, g, b, a) = style.background.into_components();
    cr.set_source_rgba(r, g, b, a);
    cr.arc(
        geometry.center.x,
        geometry.center.y,
        geometry.radius() + style.chart_stroke,
        0.0,
        2.0 * PI,
    );
    cr.fill()?;

    for slice in state.slices() {
        SliceRenderer::new(slice).draw(cr, style.divider)?;
    }

    cr.restore()
}

/// Paints every wedge in its own color with antialiasing off, so each
/// covered pixel carries exactly one slice key.
pub fn draw_hit_keys(cr: &Context, state: &ChartState) -> Result<(), cairo::Error> {
    clear(cr)?;

    let scale = state.scale();
    if scale <= 0.0 || !state.is_loaded() {
        return Ok(());
    }

    cr.save()?;
    cr.set_antialias(Antialias::None);
    transform_about(cr, state.geometry().center, scale, state.rotation());
    for slice in state.slices() {
        SliceRenderer::new(slice).draw_wedge(cr)?;
    }
    cr.restore()
}

fn render_with(
    state: &ChartState,
    draw: fn(&Context, &ChartState) -> Result<(), cairo::Error>,
) -> Result<Option<Raster>, ChartError> {
    let (width, height) = state.geometry().surface_size();
    if width <= 0 || height <= 0 {
        return Ok(None);
    }

    let surface = ImageSurface::create(Format::ARgb32, width, height)?;
    {
        let cr = Context::new(&surface)?;
        draw(&cr, state)?;
    }
    Ok(Some(Raster::from_surface(&surface)?))
}

/// Renders the visible frame. `None` until the view has a size.
pub fn render_frame(state: &ChartState) -> Result<Option<Raster>, ChartError> {
    render_with(state, draw_chart)
}

/// Renders the color-keyed hit raster. `None` until slices are loaded.
pub fn render_hit_raster(state: &ChartState) -> Result<Option<Raster>, ChartError> {
    if !state.is_loaded() {
        return Ok(None);
    }
    render_with(state, draw_hit_keys)
}

/// Slice key carried by a hit raster pixel. Only fully covered pixels
/// carry one.
pub fn key_of(pixel: Srgba<u8>) -> Option<Srgb<u8>> {
    (pixel.alpha == u8::MAX).then_some(pixel.color)
}

/// Blocks the render thread while paused.
#[derive(Debug)]
pub struct PauseGate {
    paused: Mutex<bool>,
    cond: Condvar,
}

impl PauseGate {
    pub fn new(paused: bool) -> Self {
        Self {
            paused: Mutex::new(paused),
            cond: Condvar::new(),
        }
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Returns `false` if already paused.
    pub fn pause(&self) -> bool {
        let mut paused = self.paused.lock();
        !std::mem::replace(&mut *paused, true)
    }

    /// Returns `false` if not paused.
    pub fn resume(&self) -> bool {
        let mut paused = self.paused.lock();
        if !*paused {
            return false;
        }
        *paused = false;
        self.cond.notify_all();
        true
    }

    pub fn wake(&self) {
        let _guard = self.paused.lock();
        self.cond.notify_all();
    }

    /// Waits until resumed or until `running` clears. `on_pause` runs once,
    /// with the gate held, before the first wait.
    fn wait_while_paused(&self, running: &AtomicBool, on_pause: impl FnOnce()) {
        let mut paused = self.paused.lock();
        if !*paused {
            return;
        }
        on_pause();
        while *paused && running.load(Ordering::Acquire) {
            self.cond.wait(&mut paused);
        }
    }
}

/// State shared between the input side and the render thread.
pub(crate) struct Shared {
    pub(crate) state: Mutex<ChartState>,
    pub(crate) gate: PauseGate,
    front: Mutex<Option<Raster>>,
    frames: AtomicU64,
    running: AtomicBool,
    frame_interval: Duration,
}

impl Shared {
    pub(crate) fn new(state: ChartState, frame_interval: Duration) -> Self {
        Self {
            state: Mutex::new(state),
            gate: PauseGate::new(true),
            front: Mutex::new(None),
            frames: AtomicU64::new(0),
            running: AtomicBool::new(false),
            frame_interval,
        }
    }

    pub(crate) fn front(&self) -> Option<Raster> {
        self.front.lock().clone()
    }

    pub(crate) fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// One loop iteration without the pause check or throttle.
    pub(crate) fn render_tick(&self, now: Instant) {
        let frame = {
            let mut state = self.state.lock();

            if state.needs_load() {
                state.load_slices();
                if let Err(e) = state.rebuild_raster() {
                    log::warn!("Failed to build hit raster: {}", e);
                }
                state.settle_after_load(now);
            }

            state.step_animations(now);

            if state.hit_raster().is_none()
                && let Err(e) = state.rebuild_raster()
            {
                log::warn!("Failed to build hit raster: {}", e);
            }

            render_frame(&state)
        };

        match frame {
            Ok(Some(raster)) => self.present(raster),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping frame: {}", e),
        }
    }

    fn present(&self, raster: Raster) {
        *self.front.lock() = Some(raster);
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    fn present_blank(&self) {
        let (width, height) = self.state.lock().geometry().surface_size();
        if width <= 0 || height <= 0 {
            return;
        }
        match Raster::transparent(width, height) {
            Ok(raster) => self.present(raster),
            Err(e) => log::warn!("Failed to clear frame: {}", e),
        }
    }

    fn run(&self) {
        log::debug!("Render loop started");
        self.state.lock().emit(ChartEvent::Ready);

        while self.running.load(Ordering::Acquire) {
            self.gate
                .wait_while_paused(&self.running, || self.present_blank());
            if !self.running.load(Ordering::Acquire) {
                break;
            }

            let started = Instant::now();
            self.render_tick(started);

            if let Some(rest) = self.frame_interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }

        log::debug!("Render loop stopped");
    }
}

/// Owns the render thread. Stopping (or dropping) joins it.
pub struct RenderLoop {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl RenderLoop {
    pub(crate) fn start(shared: Arc<Shared>) -> Result<Self, ChartError> {
        shared.running.store(true, Ordering::Release);

        let worker = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => Ok(Self {
                shared,
                handle: Some(handle),
            }),
            Err(e) => {
                shared.running.store(false, Ordering::Release);
                Err(ChartError::Spawn(e))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.shared.running.load(Ordering::Acquire)
    }

    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.gate.wake();

        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Render thread panicked");
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

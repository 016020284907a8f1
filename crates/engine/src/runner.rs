use std::time::Instant;

use crossbeam_channel::Sender;
use winit::event::WindowEvent;

use crate::compile::{inject_params_preamble, preamble_lines};
use crate::error::EngineError;
use crate::gpu::{encode_draw, FrameScheduler, GraphicsContext, Pipeline, PipelineCompiler};
use crate::probe::acquire_device;
use crate::types::{CanvasMetrics, FrameStatus, Liveness, RenderTarget, ShaderPayload, SubmitOutcome};

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Backends the probe may pick an adapter from. Honors `WGPU_BACKEND`.
    pub backends: wgpu::Backends,
    pub start_playing: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::from_env().unwrap_or(wgpu::Backends::all()),
            start_playing: true,
        }
    }
}

/// RGBA8 pixels read back from an offscreen target.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Snapshot {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(self.rgba.get(offset..offset + 4)?);
        Some(pixel)
    }
}

/// Entry point for hosts: owns one graphics context, the current pipeline,
/// and the frame loop, and reports compile failures as plain text on the
/// error channel.
pub struct ShaderRunner {
    context: GraphicsContext,
    compiler: PipelineCompiler,
    scheduler: FrameScheduler,
    current: Option<Pipeline>,
    next_generation: u64,
    metrics: CanvasMetrics,
    pointer: [f32; 2],
    pointer_attached: bool,
    errors: Sender<String>,
    liveness: Liveness,
    destroyed: bool,
}

impl ShaderRunner {
    /// Acquires a device and configures `target`.
    ///
    /// If `liveness` is torn down while the device request is in flight, the
    /// device is released and [`EngineError::Detached`] is returned.
    pub async fn create(
        target: RenderTarget,
        metrics: CanvasMetrics,
        options: RunnerOptions,
        errors: Sender<String>,
        liveness: Liveness,
    ) -> Result<Self, EngineError> {
        let acquired = acquire_device(&target, options.backends).await?;
        if !liveness.is_alive() {
            acquired.device.destroy();
            tracing::debug!("engine torn down during device acquisition; device discarded");
            return Err(EngineError::Detached);
        }

        let context = GraphicsContext::configure(acquired, metrics.backing_size())?;
        let compiler = PipelineCompiler::new(
            context.device(),
            context.bind_group_layout(),
            context.surface_format(),
        );

        Ok(Self {
            context,
            compiler,
            scheduler: FrameScheduler::new(Instant::now(), options.start_playing),
            current: None,
            next_generation: 0,
            metrics,
            pointer: [0.0, 0.0],
            pointer_attached: true,
            errors,
            liveness,
            destroyed: false,
        })
    }

    /// Compiles the payload and, on success, makes it the current pipeline.
    ///
    /// The `Params` declaration is prepended when the fragment lacks one.
    /// A failed compile leaves the previous pipeline rendering and sends the
    /// joined diagnostics to the error channel.
    pub async fn submit(&mut self, payload: &ShaderPayload) -> SubmitOutcome {
        if !self.is_live() {
            return SubmitOutcome::Detached;
        }
        if payload.compute.is_some() {
            tracing::debug!("compute stage accepted but not dispatched");
        }

        let source = inject_params_preamble(&payload.fragment);
        self.next_generation += 1;
        let generation = self.next_generation;
        let result = self
            .compiler
            .compile(self.context.device(), &source, generation)
            .await;

        if !self.is_live() {
            return SubmitOutcome::Detached;
        }

        match result {
            Ok(pipeline) => {
                self.current = Some(pipeline);
                if self.scheduler.arm() {
                    tracing::debug!("frame loop started");
                }
                tracing::info!(generation, description = %payload.description, "pipeline swapped");
                SubmitOutcome::Applied { generation }
            }
            Err(diagnostics) => {
                let diagnostics = diagnostics.rebased(preamble_lines(&payload.fragment));
                let message = diagnostics.to_string();
                tracing::warn!(generation, errors = diagnostics.len(), "shader failed to compile");
                if self.errors.send(message.clone()).is_err() {
                    tracing::debug!("error observer disconnected");
                }
                SubmitOutcome::Rejected { message }
            }
        }
    }

    /// Runs one invocation of the frame callback.
    pub fn render_frame(&mut self, now: Instant) -> FrameStatus {
        if !self.is_live() {
            return FrameStatus::Halted;
        }
        if self.context.is_lost() {
            self.scheduler.cancel();
            return FrameStatus::Halted;
        }

        let size = self.context.backing_size();
        let resolution = [size.width as f32, size.height as f32];
        let has_pipeline = self.current.is_some();
        let Some(params) = self
            .scheduler
            .tick(now, has_pipeline, resolution, self.pointer)
        else {
            return FrameStatus::Skipped;
        };
        let Some(pipeline) = self.current.as_ref() else {
            return FrameStatus::Skipped;
        };

        let frame = match self.context.acquire_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return FrameStatus::Halted,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.context.reconfigure();
                return FrameStatus::Reconfigured;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("timed out acquiring surface texture");
                return FrameStatus::Skipped;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to acquire surface texture");
                self.scheduler.cancel();
                return FrameStatus::Halted;
            }
        };

        self.context.write_uniforms(&params);
        let commands = encode_draw(
            self.context.device(),
            &frame,
            &pipeline.pipeline,
            self.context.bind_group(),
        );
        self.context.queue().submit(Some(commands));
        frame.present();
        FrameStatus::Drawn
    }

    /// Routes pointer and resize events. Returns `true` when the event was used.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f64>(self.metrics.device_pixel_ratio);
                self.set_pointer_position(logical.x, logical.y);
                self.pointer_attached
            }
            WindowEvent::Resized(size) => {
                self.observe_resize(CanvasMetrics::from_physical(
                    *size,
                    self.metrics.device_pixel_ratio,
                ));
                true
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.observe_resize(CanvasMetrics::new(
                    self.metrics.css_width,
                    self.metrics.css_height,
                    *scale_factor,
                ));
                true
            }
            _ => false,
        }
    }

    /// Pointer position in CSS units relative to the canvas origin.
    pub fn set_pointer_position(&mut self, client_x: f64, client_y: f64) {
        if !self.pointer_attached {
            return;
        }
        self.pointer = self.metrics.pointer_to_backing(client_x, client_y);
    }

    pub fn pointer(&self) -> [f32; 2] {
        self.pointer
    }

    /// Records the new canvas box; the next frame renders at the new size.
    pub fn observe_resize(&mut self, metrics: CanvasMetrics) {
        if self.destroyed {
            return;
        }
        self.metrics = metrics;
        self.context.observe_resize(metrics);
    }

    /// Backing pixel size the next frame renders at.
    pub fn backing_size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.context.backing_size()
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.scheduler.set_playing(playing, Instant::now());
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    /// Whether the host should keep scheduling frame callbacks.
    pub fn frame_loop_armed(&self) -> bool {
        !self.destroyed && self.scheduler.is_armed()
    }

    /// When to wake for the next callback if frames are currently skipped.
    pub fn idle_wakeup(&self, now: Instant) -> Option<Instant> {
        self.scheduler.idle_wakeup(now, self.current.is_some())
    }

    pub fn current_generation(&self) -> Option<u64> {
        self.current.as_ref().map(|pipeline| pipeline.generation)
    }

    /// Reads back the most recent frame of an offscreen runner.
    pub fn capture(&self) -> Result<Snapshot, EngineError> {
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }
        let (size, rgba) = self.context.read_back()?;
        Ok(Snapshot {
            width: size.width,
            height: size.height,
            rgba,
        })
    }

    /// Stops the frame loop, detaches the pointer, and releases GPU resources.
    /// Idempotent.
    pub fn destroy(&mut self) {
        if std::mem::replace(&mut self.destroyed, true) {
            return;
        }
        self.liveness.tear_down();
        self.scheduler.cancel();
        self.pointer_attached = false;
        self.current = None;
        self.context.release();
        tracing::info!(frames = self.scheduler.frames_drawn(), "shader runner destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn is_live(&self) -> bool {
        !self.destroyed && !self.context.is_released() && self.liveness.is_alive()
    }
}

impl Drop for ShaderRunner {
    fn drop(&mut self) {
        self.destroy();
    }
}

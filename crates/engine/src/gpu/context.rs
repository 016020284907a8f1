use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use winit::dpi::PhysicalSize;

use crate::error::{EngineError, UnsupportedError};
use crate::probe::AcquiredDevice;
use crate::types::CanvasMetrics;

use super::uniforms::{UniformParams, UNIFORM_SIZE};

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeviceLoss {
    Intentional,
    Unexpected,
}

/// A loss after our own `release()` or `destroy()` is expected teardown.
pub(crate) fn classify_device_loss(reason: wgpu::DeviceLostReason, released: bool) -> DeviceLoss {
    if released || matches!(reason, wgpu::DeviceLostReason::Destroyed) {
        DeviceLoss::Intentional
    } else {
        DeviceLoss::Unexpected
    }
}

enum FrameTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

/// A texture view to draw into, plus the surface texture to present if any.
pub(crate) struct AcquiredFrame {
    pub view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl AcquiredFrame {
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

pub(crate) struct GraphicsContext {
    _instance: wgpu::Instance,
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: Option<FrameTarget>,
    surface_format: wgpu::TextureFormat,
    size: PhysicalSize<u32>,
    pending_size: Option<PhysicalSize<u32>>,
    max_dimension: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    released: Arc<AtomicBool>,
    lost: Arc<AtomicBool>,
}

impl GraphicsContext {
    /// Binds the target to the device and allocates the parameter buffer.
    pub(crate) fn configure(
        acquired: AcquiredDevice,
        initial_size: PhysicalSize<u32>,
    ) -> Result<Self, EngineError> {
        let AcquiredDevice {
            instance,
            adapter,
            device,
            queue,
            surface,
        } = acquired;

        let max_dimension = device.limits().max_texture_dimension_2d;
        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        if size.width > max_dimension || size.height > max_dimension {
            device.destroy();
            return Err(EngineError::CanvasTooLarge {
                width: size.width,
                height: size.height,
                max: max_dimension,
            });
        }

        let released = Arc::new(AtomicBool::new(false));
        let lost = Arc::new(AtomicBool::new(false));
        {
            let released = released.clone();
            let lost = lost.clone();
            device.set_device_lost_callback(move |reason, message| {
                match classify_device_loss(reason, released.load(Ordering::Acquire)) {
                    DeviceLoss::Intentional => {
                        tracing::debug!(?reason, "GPU device released");
                    }
                    DeviceLoss::Unexpected => {
                        lost.store(true, Ordering::Release);
                        tracing::error!(?reason, %message, "GPU device lost; rendering stopped");
                    }
                }
            });
        }
        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(error = %err, "uncaptured GPU error");
        }));

        let (target, surface_format) = match surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&adapter);
                let Some(&preferred) = caps.formats.first() else {
                    device.destroy();
                    return Err(UnsupportedError::because("surface reports no usable formats").into());
                };
                let format = caps
                    .formats
                    .iter()
                    .copied()
                    .find(|format| !format.is_srgb())
                    .unwrap_or(preferred);
                let alpha_mode = caps
                    .alpha_modes
                    .iter()
                    .copied()
                    .find(|mode| *mode == wgpu::CompositeAlphaMode::PreMultiplied)
                    .unwrap_or(wgpu::CompositeAlphaMode::Auto);
                let config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width: size.width,
                    height: size.height,
                    present_mode: wgpu::PresentMode::Fifo,
                    alpha_mode,
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                };
                surface.configure(&device, &config);
                tracing::info!(
                    ?format,
                    ?alpha_mode,
                    width = size.width,
                    height = size.height,
                    "surface configured"
                );
                (FrameTarget::Surface { surface, config }, format)
            }
            None => {
                let texture = create_offscreen_texture(&device, size);
                (FrameTarget::Offscreen { texture }, OFFSCREEN_FORMAT)
            }
        };

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("params buffer"),
            size: UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("params layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("params bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            _instance: instance,
            device,
            queue,
            target: Some(target),
            surface_format,
            size,
            pending_size: None,
            max_dimension,
            uniform_buffer,
            bind_group_layout,
            bind_group,
            released,
            lost,
        })
    }

    pub(crate) fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub(crate) fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub(crate) fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub(crate) fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Size the next frame will render at.
    pub(crate) fn backing_size(&self) -> PhysicalSize<u32> {
        self.pending_size.unwrap_or(self.size)
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Records a new canvas size. The target is reconfigured lazily by the
    /// next frame, so this never draws.
    pub(crate) fn observe_resize(&mut self, metrics: CanvasMetrics) {
        let requested = metrics.backing_size();
        let clamped = PhysicalSize::new(
            requested.width.min(self.max_dimension),
            requested.height.min(self.max_dimension),
        );
        if clamped != requested {
            tracing::warn!(
                width = requested.width,
                height = requested.height,
                max = self.max_dimension,
                "canvas exceeds GPU texture limit; clamping"
            );
        }
        if clamped == self.size {
            self.pending_size = None;
        } else {
            self.pending_size = Some(clamped);
        }
    }

    pub(crate) fn write_uniforms(&self, params: &UniformParams) {
        params.write(&self.queue, &self.uniform_buffer);
    }

    /// Applies any pending resize and returns a view for this frame.
    ///
    /// `Ok(None)` once the context has been released.
    pub(crate) fn acquire_frame(&mut self) -> Result<Option<AcquiredFrame>, wgpu::SurfaceError> {
        if self.is_released() {
            return Ok(None);
        }
        if let Some(size) = self.pending_size.take() {
            self.apply_size(size);
        }
        match &self.target {
            None => Ok(None),
            Some(FrameTarget::Surface { surface, .. }) => {
                let texture = surface.get_current_texture()?;
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Some(AcquiredFrame {
                    view,
                    surface_texture: Some(texture),
                }))
            }
            Some(FrameTarget::Offscreen { texture }) => Ok(Some(AcquiredFrame {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: None,
            })),
        }
    }

    /// Reconfigures the target at its current size after a lost or outdated surface.
    pub(crate) fn reconfigure(&mut self) {
        self.apply_size(self.size);
    }

    fn apply_size(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        match &mut self.target {
            Some(FrameTarget::Surface { surface, config }) => {
                config.width = size.width;
                config.height = size.height;
                surface.configure(&self.device, config);
                tracing::debug!(width = size.width, height = size.height, "surface resized");
            }
            Some(FrameTarget::Offscreen { texture }) => {
                if texture.width() != size.width || texture.height() != size.height {
                    texture.destroy();
                    *texture = create_offscreen_texture(&self.device, size);
                }
            }
            None => {}
        }
    }

    /// Copies the offscreen target into tightly packed RGBA8 rows.
    pub(crate) fn read_back(&self) -> Result<(PhysicalSize<u32>, Vec<u8>), EngineError> {
        if self.is_released() {
            return Err(EngineError::Destroyed);
        }
        let Some(FrameTarget::Offscreen { texture }) = &self.target else {
            return Err(EngineError::Capture(
                "only offscreen targets can be read back".to_string(),
            ));
        };

        let width = texture.width();
        let height = texture.height();
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback buffer"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| EngineError::Capture(err.to_string()))?;
        rx.recv()
            .map_err(|err| EngineError::Capture(err.to_string()))?
            .map_err(|err| EngineError::Capture(err.to_string()))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();
        buffer.destroy();
        Ok((PhysicalSize::new(width, height), pixels))
    }

    /// Destroys the parameter buffer, drops the surface and destroys the device.
    /// Safe to call repeatedly.
    pub(crate) fn release(&mut self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.uniform_buffer.destroy();
        match self.target.take() {
            Some(FrameTarget::Offscreen { texture }) => texture.destroy(),
            Some(FrameTarget::Surface { surface, .. }) => drop(surface),
            None => {}
        }
        self.device.destroy();
        tracing::info!("graphics context released");
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        self.release();
    }
}

fn create_offscreen_texture(device: &wgpu::Device, size: PhysicalSize<u32>) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen target"),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

use crate::error::UnsupportedError;
use crate::types::RenderTarget;

/// Everything the capability probe hands to the graphics context.
pub(crate) struct AcquiredDevice {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: Option<wgpu::Surface<'static>>,
}

/// Finds a high-performance adapter and opens a device on it.
///
/// Every failure is reported as [`UnsupportedError`]; there is no retry.
pub(crate) async fn acquire_device(
    target: &RenderTarget,
    backends: wgpu::Backends,
) -> Result<AcquiredDevice, UnsupportedError> {
    if backends.is_empty() {
        return Err(UnsupportedError::because("no graphics backends enabled"));
    }

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends,
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    });

    let surface = match target {
        RenderTarget::Window(window) => Some(
            instance
                .create_surface(window.clone())
                .map_err(|err| UnsupportedError::because(format!("failed to create surface: {err}")))?,
        ),
        RenderTarget::Offscreen => None,
    };

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface.as_ref(),
            force_fallback_adapter: false,
        })
        .await
        .map_err(|err| UnsupportedError::because(format!("no suitable GPU adapter: {err}")))?;

    let info = adapter.get_info();
    tracing::info!(
        name = %info.name,
        backend = ?info.backend,
        device_type = ?info.device_type,
        "selected GPU adapter"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("promptgpu device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        })
        .await
        .map_err(|err| UnsupportedError::because(format!("failed to create GPU device: {err}")))?;

    Ok(AcquiredDevice {
        instance,
        adapter,
        device,
        queue,
        surface,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_backend_set_is_unsupported() {
        let result = pollster::block_on(acquire_device(
            &RenderTarget::Offscreen,
            wgpu::Backends::empty(),
        ));
        let err = result.err().expect("acquisition should fail");
        assert_eq!(err.reason(), Some("no graphics backends enabled"));
    }
}

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use engine::{
    CanvasMetrics, FrameStatus, Liveness, RenderTarget, RunnerOptions, ShaderPayload,
    ShaderRunner, SubmitOutcome,
};
use image::RgbaImage;
use tracing::info;

use crate::bootstrap::Settings;

/// Renders the starting shader once, offscreen, and writes it as a PNG.
pub fn export(settings: &Settings, output: &Path) -> Result<()> {
    let (error_tx, _error_rx) = crossbeam_channel::unbounded();
    let options = RunnerOptions {
        start_playing: true,
        ..RunnerOptions::default()
    };
    let metrics = CanvasMetrics::new(f64::from(settings.width), f64::from(settings.height), 1.0);
    let mut runner = pollster::block_on(ShaderRunner::create(
        RenderTarget::Offscreen,
        metrics,
        options,
        error_tx,
        Liveness::new(),
    ))
    .context("failed to start the shader engine")?;

    let payload = ShaderPayload::new(settings.initial_fragment.as_str())
        .with_description(settings.initial_description.clone());
    match pollster::block_on(runner.submit(&payload)) {
        SubmitOutcome::Applied { .. } => {}
        SubmitOutcome::Rejected { message } => bail!("shader failed to compile:\n{message}"),
        SubmitOutcome::Detached => bail!("shader engine detached before the first frame"),
    }

    match runner.render_frame(Instant::now()) {
        FrameStatus::Drawn => {}
        status => bail!("offscreen frame was not drawn ({status:?})"),
    }
    let snapshot = runner.capture().context("failed to read back frame")?;
    runner.destroy();

    let (width, height) = (snapshot.width, snapshot.height);
    let image = RgbaImage::from_raw(width, height, snapshot.rgba)
        .ok_or_else(|| anyhow!("frame buffer does not match {width}x{height}"))?;
    image
        .save(output)
        .with_context(|| format!("failed to write snapshot {}", output.display()))?;
    info!(path = %output.display(), width, height, "snapshot written");
    Ok(())
}

use std::time::{Duration, Instant};

use super::context::AcquiredFrame;
use super::uniforms::UniformParams;

/// Cadence used to re-arm the loop while nothing is being drawn.
pub(crate) const IDLE_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Timing state of the continuous frame callback.
///
/// The loop never disarms itself; pausing only skips the update and draw.
pub(crate) struct FrameScheduler {
    armed: bool,
    playing: bool,
    start_time: Instant,
    last_frame_time: Instant,
    frames_drawn: u64,
}

impl FrameScheduler {
    pub fn new(now: Instant, playing: bool) -> Self {
        Self {
            armed: false,
            playing,
            start_time: now,
            last_frame_time: now,
            frames_drawn: 0,
        }
    }

    /// Returns `true` when the loop was not yet running.
    pub fn arm(&mut self) -> bool {
        !std::mem::replace(&mut self.armed, true)
    }

    pub fn cancel(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Resuming restarts the delta clock so a long pause does not show up as
    /// one enormous `delta_time`.
    pub fn set_playing(&mut self, playing: bool, now: Instant) {
        if playing && !self.playing {
            self.last_frame_time = now;
        }
        self.playing = playing;
    }

    /// Advances time for one frame and returns the parameters to upload, or
    /// `None` when this invocation must not draw.
    pub fn tick(
        &mut self,
        now: Instant,
        has_pipeline: bool,
        resolution: [f32; 2],
        pointer: [f32; 2],
    ) -> Option<UniformParams> {
        if !self.armed || !self.playing || !has_pipeline {
            return None;
        }
        if self.frames_drawn == 0 {
            self.last_frame_time = now;
        }
        let elapsed = now.saturating_duration_since(self.start_time);
        let delta = now.saturating_duration_since(self.last_frame_time);
        self.last_frame_time = now;
        self.frames_drawn += 1;
        Some(UniformParams::new(
            elapsed.as_secs_f32(),
            delta.as_secs_f32(),
            resolution,
            pointer,
        ))
    }

    /// When the host should wake the loop next if it is not drawing.
    pub fn idle_wakeup(&self, now: Instant, has_pipeline: bool) -> Option<Instant> {
        if self.armed && (!self.playing || !has_pipeline) {
            Some(now + IDLE_FRAME_INTERVAL)
        } else {
            None
        }
    }
}

/// Records one render pass: clear, bind, draw the six-vertex quad.
pub(crate) fn encode_draw(
    device: &wgpu::Device,
    frame: &AcquiredFrame,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) -> wgpu::CommandBuffer {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("frame encoder"),
    });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("frame pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.draw(0..6, 0..1);
    }
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn armed(now: Instant) -> FrameScheduler {
        let mut scheduler = FrameScheduler::new(now, true);
        scheduler.arm();
        scheduler
    }

    #[test]
    fn unarmed_loop_does_not_draw() {
        let t0 = Instant::now();
        let mut scheduler = FrameScheduler::new(t0, true);
        assert!(scheduler.tick(t0 + ms(16), true, [1.0, 1.0], [0.0, 0.0]).is_none());
    }

    #[test]
    fn arming_twice_reports_already_running() {
        let mut scheduler = FrameScheduler::new(Instant::now(), true);
        assert!(scheduler.arm());
        assert!(!scheduler.arm());
    }

    #[test]
    fn no_pipeline_means_no_update() {
        let t0 = Instant::now();
        let mut scheduler = armed(t0);
        assert!(scheduler.tick(t0 + ms(16), false, [1.0, 1.0], [0.0, 0.0]).is_none());
        assert_eq!(scheduler.frames_drawn(), 0);
    }

    #[test]
    fn playing_tick_reports_elapsed_and_delta() {
        let t0 = Instant::now();
        let mut scheduler = armed(t0);
        let first = scheduler
            .tick(t0 + ms(100), true, [640.0, 480.0], [3.0, 4.0])
            .expect("first frame draws");
        assert_eq!(first.delta_time, 0.0);
        assert!((first.time - 0.1).abs() < 1e-4);
        assert_eq!(first.resolution, [640.0, 480.0]);
        assert_eq!(first.pointer, [3.0, 4.0]);

        let second = scheduler
            .tick(t0 + ms(116), true, [640.0, 480.0], [3.0, 4.0])
            .expect("second frame draws");
        assert!((second.delta_time - 0.016).abs() < 1e-4);
    }

    #[test]
    fn pausing_halts_updates() {
        let t0 = Instant::now();
        let mut scheduler = armed(t0);
        assert!(scheduler.tick(t0 + ms(16), true, [1.0, 1.0], [0.0, 0.0]).is_some());
        scheduler.set_playing(false, t0 + ms(20));
        assert!(scheduler.tick(t0 + ms(32), true, [1.0, 1.0], [0.0, 0.0]).is_none());
        assert!(scheduler.is_armed());
        assert_eq!(scheduler.frames_drawn(), 1);
    }

    #[test]
    fn resuming_after_long_pause_bounds_delta() {
        let t0 = Instant::now();
        let mut scheduler = armed(t0);
        scheduler.tick(t0 + ms(16), true, [1.0, 1.0], [0.0, 0.0]);
        scheduler.set_playing(false, t0 + ms(20));
        scheduler.set_playing(true, t0 + ms(60_000));
        let resumed = scheduler
            .tick(t0 + ms(60_016), true, [1.0, 1.0], [0.0, 0.0])
            .expect("resumed frame draws");
        assert!(resumed.delta_time < 0.05, "delta {}", resumed.delta_time);
    }

    #[test]
    fn idle_wakeup_only_when_not_drawing() {
        let t0 = Instant::now();
        let mut scheduler = armed(t0);
        assert_eq!(scheduler.idle_wakeup(t0, true), None);
        assert_eq!(scheduler.idle_wakeup(t0, false), Some(t0 + IDLE_FRAME_INTERVAL));
        scheduler.set_playing(false, t0);
        assert_eq!(scheduler.idle_wakeup(t0, true), Some(t0 + IDLE_FRAME_INTERVAL));
        scheduler.cancel();
        assert_eq!(scheduler.idle_wakeup(t0, true), None);
    }
}

//! Sampling Scheduler: the camera worker loop
//!
//! Every captured frame goes to the preview mailbox. Every Nth frame also
//! goes through the stress pipeline, followed by a short idle sleep.
//! The loop checks its stop signal once per iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::core::camera::{acquire_camera, CameraBackend, FrameSource};
use crate::core::mailbox::PreviewMailbox;
use crate::core::pipeline::StressPipeline;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub captured: u64,
    pub sampled: u64,
    pub transient_errors: u64,
}

pub struct SamplingScheduler {
    pipeline: StressPipeline,
    mailbox: Arc<PreviewMailbox>,
    sample_every: u64,
    idle_sleep: Duration,
    retry_sleep: Duration,
    camera_indices: u32,
}

impl SamplingScheduler {
    pub fn new(pipeline: StressPipeline, mailbox: Arc<PreviewMailbox>, config: &PipelineConfig) -> Self {
        Self {
            pipeline,
            mailbox,
            sample_every: config.sample_every.max(1),
            idle_sleep: config.idle_sleep(),
            retry_sleep: config.retry_sleep(),
            camera_indices: config.camera_indices,
        }
    }

    pub fn pipeline(&self) -> &StressPipeline {
        &self.pipeline
    }

    /// Drive `source` until it ends or `stop` is raised
    pub fn run(&mut self, source: &mut dyn FrameSource, stop: &StopSignal) -> LoopStats {
        let mut stats = LoopStats::default();

        while !stop.is_stopped() {
            let frame = match source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!(captured = stats.captured, "Frame source ended");
                    break;
                }
                Err(e) => {
                    stats.transient_errors += 1;
                    debug!(error = %e, "Transient frame defect, retrying");
                    thread::sleep(self.retry_sleep);
                    continue;
                }
            };

            stats.captured += 1;
            let sampled = stats.captured % self.sample_every == 0;

            if !sampled {
                self.mailbox.publish(frame);
                continue;
            }

            // preview before analysis
            self.mailbox.publish(frame.clone());
            stats.sampled += 1;
            self.pipeline.process(&frame);

            if !self.idle_sleep.is_zero() {
                thread::sleep(self.idle_sleep);
            }
        }

        stats
    }

    /// Start the camera worker on its own thread
    ///
    /// Camera acquisition failure ends this worker only; it is logged and the
    /// handle returns `None`.
    pub fn spawn(
        mut self,
        backend: Box<dyn CameraBackend>,
        stop: StopSignal,
    ) -> std::io::Result<JoinHandle<Option<LoopStats>>> {
        thread::Builder::new()
            .name("live-stress-model".to_string())
            .spawn(move || {
                let (index, mut source) = match acquire_camera(backend.as_ref(), self.camera_indices) {
                    Ok(found) => found,
                    Err(e) => {
                        error!(error = %e, "Camera worker not started");
                        return None;
                    }
                };
                info!(index, sample_every = self.sample_every, "Live stress loop started");
                let stats = self.run(source.as_mut(), &stop);
                if stats.transient_errors > 0 {
                    warn!(errors = stats.transient_errors, "Frame defects during capture");
                }
                info!(
                    captured = stats.captured,
                    sampled = stats.sampled,
                    "Live stress loop stopped"
                );
                Some(stats)
            })
    }
}

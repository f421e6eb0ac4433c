// THEORY:
// The `motion` module is the heart of the crate: a stateful scorer that
// compares the freshly captured frame against a stored reference frame and
// reduces the comparison to a single 0-100 percentage.
//
// Key architectural principles:
// 1.  **Spatial Pooling**: Both frames are reduced to single-channel luma and
//     downscaled to a small comparison thumbnail. This moves the comparison
//     from hundreds of thousands of pixels to a few thousand, and the
//     downscale itself averages away single-pixel sensor artifacts.
// 2.  **Noise Floor, Then Count**: Instead of averaging pixel differences
//     (which mixes motion signal with sensor noise), the scorer counts what
//     percentage of pixel pairs changed by more than a fixed noise floor.
//     Distributed low-amplitude noise scores 0; a localised object crossing
//     the frame scores in proportion to its footprint.
// 3.  **Explicit Reference State**: The time of the last reference update is
//     a field on the `MotionDetector`, not process-wide state. Repeated
//     invocations within one process are deterministic and testable.
//
// Reference image update policy (applied after scoring):
// - updated when motion IS detected (score > motion threshold)
// - updated when the reference is older than the max age (lighting drift)
// - updated when no update time has been recorded yet in this process
// - NOT updated on a quiet, fresh frame. A quiet frame that refreshed the
//   reference anyway would let slow noise accumulate under the threshold.

use std::fs;
use std::path::Path;
use std::time::Instant;

use image::GrayImage;
use image::imageops::{self, FilterType};

use crate::config::MotionConfig;
use crate::error::Result;

/// Stateful motion scorer for a pair of image files on disk.
pub struct MotionDetector {
    config: MotionConfig,
    /// When the reference image was last rewritten, if known to this process.
    last_ref_update: Option<Instant>,
}

impl MotionDetector {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            last_ref_update: None,
        }
    }

    /// Compares the current frame against the reference and returns a motion
    /// score in `[0, 100]`: the percentage of comparison pixels whose
    /// absolute luma difference exceeds the per-pixel noise threshold.
    ///
    /// If no reference exists yet, the current frame becomes the reference
    /// and the score is 0. A reference that exists but cannot be decoded is
    /// a fatal error, as is an undecodable current frame.
    pub fn score(&mut self, current: &Path, reference: &Path) -> Result<f64> {
        if !reference.exists() {
            tracing::info!("no reference image found, initialising from current frame");
            self.update_reference(current, reference)?;
            return Ok(0.0);
        }

        let thumb_new = self.comparison_thumbnail(current)?;
        let thumb_ref = self.comparison_thumbnail(reference)?;

        let total = thumb_new.as_raw().len();
        let changed = thumb_new
            .as_raw()
            .iter()
            .zip(thumb_ref.as_raw().iter())
            .filter(|(new, old)| new.abs_diff(**old) > self.config.pixel_threshold)
            .count();
        let score = changed as f64 / total as f64 * 100.0;

        let motion_detected = score > self.config.motion_threshold;
        let ref_expired = self
            .last_ref_update
            .is_some_and(|at| at.elapsed() > self.config.ref_max_age);

        if motion_detected || ref_expired || self.last_ref_update.is_none() {
            if ref_expired && !motion_detected {
                tracing::info!("reference image refreshed after exceeding max age");
            }
            self.update_reference(current, reference)?;
        }

        tracing::info!(
            score,
            changed,
            total,
            motion_detected,
            "motion score computed"
        );
        Ok(score)
    }

    /// Whether a score counts as detected motion under the configured
    /// threshold.
    pub fn motion_detected(&self, score: f64) -> bool {
        score > self.config.motion_threshold
    }

    fn update_reference(&mut self, current: &Path, reference: &Path) -> Result<()> {
        fs::copy(current, reference)?;
        self.last_ref_update = Some(Instant::now());
        Ok(())
    }

    /// Decodes an image to luma, downscales it to the comparison resolution
    /// and optionally blurs it.
    fn comparison_thumbnail(&self, path: &Path) -> Result<GrayImage> {
        let luma = image::open(path)?.to_luma8();
        let mut thumb = imageops::resize(
            &luma,
            self.config.compare_width,
            self.config.compare_height,
            FilterType::Triangle,
        );
        if self.config.blur_sigma > 0.0 {
            thumb = imageops::blur(&thumb, self.config.blur_sigma);
        }
        Ok(thumb)
    }
}

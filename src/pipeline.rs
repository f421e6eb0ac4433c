// THEORY:
// The `pipeline` module is the top-level API for the crate. It encapsulates
// one full capture-compare-upload cycle behind a single call, wiring the
// camera capability, the motion scorer, the uploader and the activity log
// together. The process model is deliberately run-to-completion: an external
// scheduler (cron, a systemd timer) invokes one cycle, the cycle either
// finishes or aborts with an error, and the process exits either way.

use std::path::PathBuf;

use crate::activity::ActivityLog;
use crate::camera::Camera;
use crate::config::AppConfig;
use crate::error::Result;
use crate::motion::MotionDetector;
use crate::upload::WebdavUploader;

/// The outcome of a single cycle, for logging by the caller.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Capture timestamp, `%Y%m%d-%H%M%S`.
    pub timestamp: String,
    /// Motion score in `[0, 100]`.
    pub score: f64,
    /// 1 when motion was detected, 0 otherwise.
    pub mode: u8,
    /// HTTP status of the upload, when one happened.
    pub upload_status: Option<u16>,
}

/// Runs capture → score → upload → log as one unit.
pub struct CyclePipeline<C: Camera> {
    camera: C,
    detector: MotionDetector,
    uploader: WebdavUploader,
    log: ActivityLog,
    current_image: PathBuf,
    reference_image: PathBuf,
}

impl<C: Camera> CyclePipeline<C> {
    pub fn new(config: AppConfig, camera: C) -> Self {
        let current_image = config.current_image_path();
        let reference_image = config.reference_image_path();
        let log = ActivityLog::new(config.log_path());
        Self {
            camera,
            detector: MotionDetector::new(config.motion),
            uploader: WebdavUploader::new(config.upload),
            log,
            current_image,
            reference_image,
        }
    }

    /// Executes one full cycle and returns its report. Any failure aborts
    /// the cycle; there is no partial-success recovery.
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        tracing::info!("capturing image");
        let timestamp = self.camera.capture(&self.current_image)?;

        tracing::info!("detecting motion");
        let score = self
            .detector
            .score(&self.current_image, &self.reference_image)?;
        let mode = self.detector.motion_detected(score) as u8;
        tracing::info!(%timestamp, score, mode, "cycle scored");

        let receipt = self.uploader.upload(&self.current_image, mode)?;
        let response_text = receipt.as_ref().map(|r| r.body.as_str()).unwrap_or("");
        self.log.append(&timestamp, score, mode, response_text)?;

        Ok(CycleReport {
            timestamp,
            score,
            mode,
            upload_status: receipt.map(|r| r.status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FakeCamera;
    use crate::config::{CameraConfig, MotionConfig, UploadConfig};
    use image::{GrayImage, Luma};
    use std::fs;
    use std::io::Cursor;
    use std::time::Duration;
    use tempfile::TempDir;

    /// JPEG bytes of a small solid-grey frame, matching the `.jpg` paths the
    /// pipeline works with.
    fn solid_jpeg(value: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        GrayImage::from_pixel(8, 6, Luma([value]))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    fn test_config(dir: &TempDir) -> AppConfig {
        AppConfig {
            camera: CameraConfig {
                width: 640,
                height: 480,
                exposure_time_us: 200_000,
                analogue_gain: 8.0,
                brightness: 0.3,
                contrast: 1.4,
                saturation: 0.2,
                sharpness: 1.3,
                ir_led_gpio: 21,
            },
            motion: MotionConfig {
                compare_width: 64,
                compare_height: 48,
                pixel_threshold: 15,
                blur_sigma: 1.0,
                motion_threshold: 3.0,
                ref_max_age: Duration::from_secs(600),
            },
            upload: UploadConfig {
                // Unroutable: any upload attempt in these tests would fail loudly.
                webdav_base: "http://127.0.0.1:1/webdav".to_string(),
                share_token: String::new(),
            },
            work_dir: dir.path().to_path_buf(),
        }
    }

    #[test]
    fn first_cycle_initialises_reference_and_logs_quiet_line() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let camera = FakeCamera::new(solid_jpeg(100), "20260221-120000");
        let mut pipeline = CyclePipeline::new(config, camera);

        let report = pipeline.run_cycle().unwrap();

        assert_eq!(report.score, 0.0);
        assert_eq!(report.mode, 0);
        assert!(report.upload_status.is_none());
        assert!(dir.path().join("reference.jpg").exists());

        let log = fs::read_to_string(dir.path().join("meisencam.log")).unwrap();
        assert_eq!(log, "20260221-120000;0.00;0;\n");
    }

    #[test]
    fn quiet_cycle_logs_without_uploading() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        // Pre-seed an identical reference frame.
        fs::write(dir.path().join("reference.jpg"), solid_jpeg(100)).unwrap();
        let camera = FakeCamera::new(solid_jpeg(100), "20260221-120000");
        let mut pipeline = CyclePipeline::new(config, camera);

        let report = pipeline.run_cycle().unwrap();

        assert_eq!(report.score, 0.0);
        assert_eq!(report.mode, 0);
        assert!(report.upload_status.is_none());
    }

    #[test]
    fn motion_cycle_attempts_upload() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        fs::write(dir.path().join("reference.jpg"), solid_jpeg(50)).unwrap();
        let camera = FakeCamera::new(solid_jpeg(200), "20260221-120000");
        let mut pipeline = CyclePipeline::new(config, camera);

        // The unroutable upload target proves an HTTP attempt was made.
        let result = pipeline.run_cycle();

        assert!(result.is_err());
    }
}

// THEORY:
// The camera is an external hardware collaborator, so it sits behind a small
// capability trait. The production implementation drives the Raspberry Pi
// `rpicam-still` binary and the IR illuminator GPIO; the fake implementation
// just writes prepared bytes. Everything above this module (the pipeline,
// the CLI) only ever sees the trait, which is what makes the rest of the
// crate testable off-device where no sensor exists.

use std::path::Path;
use std::process::Command;

use chrono::Local;

use crate::config::CameraConfig;
use crate::error::{Error, Result};

/// Timestamp format stamped on each capture, e.g. `20260221-120000`.
const CAPTURE_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Sensor stabilisation delay before the still is taken, in milliseconds.
const STABILISATION_TIMEOUT_MS: u32 = 5000;

/// Capability to produce a still image file.
pub trait Camera {
    /// Captures a still image to `output` and returns the capture timestamp.
    fn capture(&mut self, output: &Path) -> Result<String>;
}

/// Production camera: shells out to `rpicam-still` with fixed exposure and
/// gain, toggling the IR illuminator around the capture.
pub struct RpicamStill {
    config: CameraConfig,
}

impl RpicamStill {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    /// Drives the IR LED pin high or low via `pinctrl`. Best effort: a
    /// missing tool or pin leaves us with a darker picture, not a failed
    /// cycle.
    fn set_ir_led(&self, on: bool) {
        let state = if on { "dh" } else { "dl" };
        let result = Command::new("pinctrl")
            .args(["set", &self.config.ir_led_gpio.to_string(), "op", state])
            .status();
        match result {
            Ok(status) if status.success() => {
                tracing::info!("IR LED {}", if on { "on" } else { "off" });
            }
            Ok(status) => tracing::warn!(%status, "pinctrl exited unsuccessfully"),
            Err(e) => tracing::warn!(error = %e, "could not toggle IR LED"),
        }
    }
}

impl Camera for RpicamStill {
    fn capture(&mut self, output: &Path) -> Result<String> {
        self.set_ir_led(true);

        let timestamp = Local::now().format(CAPTURE_TIMESTAMP_FORMAT).to_string();
        let result = Command::new("rpicam-still")
            .arg("--nopreview")
            .args(["--timeout", &STABILISATION_TIMEOUT_MS.to_string()])
            .args(["--width", &self.config.width.to_string()])
            .args(["--height", &self.config.height.to_string()])
            .args(["--shutter", &self.config.exposure_time_us.to_string()])
            .args(["--gain", &self.config.analogue_gain.to_string()])
            .args(["--brightness", &self.config.brightness.to_string()])
            .args(["--contrast", &self.config.contrast.to_string()])
            .args(["--saturation", &self.config.saturation.to_string()])
            .args(["--sharpness", &self.config.sharpness.to_string()])
            .arg("--output")
            .arg(output)
            .output();

        self.set_ir_led(false);

        let output_result =
            result.map_err(|e| Error::Camera(format!("failed to run rpicam-still: {e}")))?;
        if !output_result.status.success() {
            return Err(Error::Camera(format!(
                "rpicam-still exited with {}: {}",
                output_result.status,
                String::from_utf8_lossy(&output_result.stderr).trim()
            )));
        }

        tracing::info!(path = %output.display(), %timestamp, "captured image");
        Ok(timestamp)
    }
}

/// Camera stand-in for tests and off-device development: writes prepared
/// bytes to the output path and returns a fixed timestamp.
pub struct FakeCamera {
    image_bytes: Vec<u8>,
    timestamp: String,
}

impl FakeCamera {
    pub fn new(image_bytes: Vec<u8>, timestamp: impl Into<String>) -> Self {
        Self {
            image_bytes,
            timestamp: timestamp.into(),
        }
    }
}

impl Camera for FakeCamera {
    fn capture(&mut self, output: &Path) -> Result<String> {
        std::fs::write(output, &self.image_bytes)?;
        Ok(self.timestamp.clone())
    }
}

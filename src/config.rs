// THEORY:
// Configuration is a plain value object, constructed exactly once at process
// start and passed down to each component. Nothing in this module is a
// process-wide singleton: `AppConfig` reads from an `EnvSource`, which
// layers an optional dotenv-style file underneath the process environment.
// Process environment variables always win over file entries, matching the
// usual dotenv precedence. This keeps every component testable with fixed
// values — tests build an `EnvSource` from a literal map and never touch
// the real environment.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default dotenv-style file consulted when no `--env-file` is given.
pub const DEFAULT_ENV_FILE: &str = "/mnt/ramdisk/.env";

const DEFAULT_WORK_DIR: &str = "/mnt/ramdisk";
const DEFAULT_WEBDAV_BASE: &str =
    "https://nc-6283277816195226543.nextcloud-ionos.com/public.php/webdav";

/// Layered source of configuration values: process env over an optional
/// key=value file.
pub struct EnvSource {
    file_vars: HashMap<String, String>,
}

impl EnvSource {
    /// Source backed only by the process environment.
    pub fn from_process() -> Self {
        Self {
            file_vars: HashMap::new(),
        }
    }

    /// Source backed by the process environment with `path` as fallback.
    ///
    /// The file format is one `KEY=VALUE` per line; blank lines and lines
    /// starting with `#` are skipped.
    pub fn with_env_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::from_env_file_contents(&contents))
    }

    fn from_env_file_contents(contents: &str) -> Self {
        let mut file_vars = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let (key, value) = (key.trim(), value.trim());
                if !key.is_empty() && !value.is_empty() {
                    file_vars.insert(key.to_string(), value.to_string());
                }
            }
        }
        Self { file_vars }
    }

    /// For tests: a source with fixed values and no process-env layer at all.
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self { file_vars: vars }
    }

    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().or_else(|| self.file_vars.get(key).cloned())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("{key}={raw}: {e}"))),
        }
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}

/// Sensor parameters handed to the camera driver.
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Capture width in pixels.
    pub width: u32,
    /// Capture height in pixels.
    pub height: u32,
    /// Fixed exposure time in microseconds (auto-exposure is disabled).
    pub exposure_time_us: u32,
    /// Analogue sensor gain (8.0 is roughly ISO 800).
    pub analogue_gain: f64,
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub sharpness: f64,
    /// BCM pin number of the IR illuminator LED.
    pub ir_led_gpio: u32,
}

/// Tunables for the motion scorer.
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Width of the downscaled comparison thumbnail.
    pub compare_width: u32,
    /// Height of the downscaled comparison thumbnail.
    pub compare_height: u32,
    /// Per-pixel noise floor: a pixel pair only counts as "changed" when its
    /// absolute luma difference exceeds this value.
    pub pixel_threshold: u8,
    /// Gaussian blur sigma applied to both thumbnails before comparison.
    /// Zero disables the blur.
    pub blur_sigma: f32,
    /// Percentage of changed pixels above which the frame counts as motion.
    pub motion_threshold: f64,
    /// Maximum age of the reference image before it is refreshed even on a
    /// quiet frame. Handles gradual lighting drift.
    pub ref_max_age: Duration,
}

/// WebDAV upload target.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Base URL of the WebDAV endpoint, without trailing slash.
    pub webdav_base: String,
    /// Nextcloud public share token, used as the basic-auth username with an
    /// empty password.
    pub share_token: String,
}

/// The full configuration for one process, assembled from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub motion: MotionConfig,
    pub upload: UploadConfig,
    /// Directory holding the current image, the reference image and the
    /// activity log. A RAM-backed filesystem on the device.
    pub work_dir: PathBuf,
}

impl AppConfig {
    /// Builds the configuration from the process environment only.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&EnvSource::from_process())
    }

    /// Builds the configuration from a layered source. An unparseable value
    /// is an error, never silently replaced by the default.
    pub fn from_source(source: &EnvSource) -> Result<Self> {
        let camera = CameraConfig {
            width: source.parse("MEISENCAM_WIDTH", 640)?,
            height: source.parse("MEISENCAM_HEIGHT", 480)?,
            exposure_time_us: source.parse("MEISENCAM_EXPOSURE_TIME", 200_000)?,
            analogue_gain: source.parse("MEISENCAM_ANALOGUE_GAIN", 8.0)?,
            brightness: source.parse("MEISENCAM_BRIGHTNESS", 0.3)?,
            contrast: source.parse("MEISENCAM_CONTRAST", 1.4)?,
            saturation: source.parse("MEISENCAM_SATURATION", 0.2)?,
            sharpness: source.parse("MEISENCAM_SHARPNESS", 1.3)?,
            ir_led_gpio: source.parse("MEISENCAM_IR_LED_GPIO", 21)?,
        };
        let motion = MotionConfig {
            compare_width: source.parse("MEISENCAM_COMPARE_WIDTH", 64)?,
            compare_height: source.parse("MEISENCAM_COMPARE_HEIGHT", 48)?,
            pixel_threshold: source.parse("MEISENCAM_PIXEL_THRESHOLD", 15)?,
            blur_sigma: source.parse("MEISENCAM_BLUR_SIGMA", 1.0)?,
            motion_threshold: source.parse("MEISENCAM_MOTION_THRESHOLD", 3.0)?,
            ref_max_age: Duration::from_secs(source.parse("MEISENCAM_REF_MAX_AGE", 600u64)?),
        };
        let upload = UploadConfig {
            webdav_base: source.string("MEISENCAM_WEBDAV_BASE", DEFAULT_WEBDAV_BASE),
            share_token: source.string("MEISENCAM_SHARE_TOKEN", ""),
        };
        let work_dir = PathBuf::from(source.string("MEISENCAM_WORK_DIR", DEFAULT_WORK_DIR));

        Ok(Self {
            camera,
            motion,
            upload,
            work_dir,
        })
    }

    /// Path of the freshly captured frame, overwritten each cycle.
    pub fn current_image_path(&self) -> PathBuf {
        self.work_dir.join("current.jpg")
    }

    /// Path of the stored comparison baseline.
    pub fn reference_image_path(&self) -> PathBuf {
        self.work_dir.join("reference.jpg")
    }

    /// Path of the append-only activity log.
    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join("meisencam.log")
    }
}

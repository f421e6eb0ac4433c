// THEORY:
// The uploader is thin HTTP glue: one blocking PUT against a Nextcloud
// public WebDAV share per detected-motion cycle. It deliberately has two
// no-op exits — quiet frame, missing file — because a cycle that produced
// nothing worth uploading must still finish and log. Only a real network
// or protocol failure propagates as an error.

use std::fs;
use std::path::Path;

use chrono::Local;

use crate::config::UploadConfig;
use crate::error::Result;

/// Timestamp format embedded in the uploaded filename,
/// e.g. `2026-02-21-12-00-00`. Differs from the capture timestamp format;
/// the share folder sorts more readably this way.
const UPLOAD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// What the remote side said about an upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub status: u16,
    pub body: String,
}

/// Uploads captured images to a WebDAV endpoint with the share token as the
/// basic-auth username and an empty password.
pub struct WebdavUploader {
    client: reqwest::blocking::Client,
    config: UploadConfig,
}

/// Builds the target URL `{base}/{timestamp}-m{mode}.jpg`. The mode flag in
/// the filename lets the share be skimmed for motion frames by name alone.
fn upload_url(webdav_base: &str, timestamp: &str, mode: u8) -> String {
    format!(
        "{}/{timestamp}-m{mode}.jpg",
        webdav_base.trim_end_matches('/')
    )
}

impl WebdavUploader {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            config,
        }
    }

    /// Uploads the image if motion was detected.
    ///
    /// Returns `Ok(None)` without any HTTP traffic when `mode` is 0 or the
    /// image file is missing; the cycle still completes and logs an empty
    /// response. A network failure propagates.
    pub fn upload(&self, image: &Path, mode: u8) -> Result<Option<UploadReceipt>> {
        if mode < 1 {
            tracing::info!(mode, "no motion, skipping upload");
            return Ok(None);
        }
        if !image.exists() {
            tracing::error!(path = %image.display(), "image file not found, skipping upload");
            return Ok(None);
        }

        let timestamp = Local::now().format(UPLOAD_TIMESTAMP_FORMAT).to_string();
        let url = upload_url(&self.config.webdav_base, &timestamp, mode);
        tracing::info!(path = %image.display(), %url, "uploading image");

        let bytes = fs::read(image)?;
        let response = self
            .client
            .put(&url)
            .basic_auth(&self.config.share_token, Some(""))
            .body(bytes)
            .send()?;

        let status = response.status().as_u16();
        let body = response.text()?;
        tracing::info!(status, "upload response");
        Ok(Some(UploadReceipt { status, body }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use tempfile::TempDir;

    fn uploader(webdav_base: &str) -> WebdavUploader {
        WebdavUploader::new(UploadConfig {
            webdav_base: webdav_base.to_string(),
            share_token: "tok".to_string(),
        })
    }

    #[test]
    fn url_contains_timestamp_and_mode() {
        let url = upload_url("https://example.com/webdav", "2026-02-21-12-00-00", 1);
        assert_eq!(url, "https://example.com/webdav/2026-02-21-12-00-00-m1.jpg");
    }

    #[test]
    fn url_tolerates_trailing_slash_on_base() {
        let url = upload_url("https://example.com/webdav/", "2026-02-21-12-00-00", 2);
        assert_eq!(url, "https://example.com/webdav/2026-02-21-12-00-00-m2.jpg");
    }

    #[test]
    fn skips_upload_when_no_motion() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("test.jpg");
        fs::write(&image, b"fake-jpeg").unwrap();
        // Unroutable base: any HTTP attempt would error, proving none is made.
        let uploader = uploader("http://127.0.0.1:1/webdav");

        let receipt = uploader.upload(&image, 0).unwrap();

        assert!(receipt.is_none());
    }

    #[test]
    fn skips_upload_when_file_is_missing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nonexistent.jpg");
        let uploader = uploader("http://127.0.0.1:1/webdav");

        let receipt = uploader.upload(&missing, 1).unwrap();

        assert!(receipt.is_none());
    }

    /// Accepts one connection, returns the raw request head through the
    /// channel and answers 201.
    fn one_shot_server() -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/webdav", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            let head_end = loop {
                let n = stream.read(&mut buf).unwrap();
                raw.extend_from_slice(&buf[..n]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
            let content_length: usize = head
                .lines()
                .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(str::trim).map(String::from))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let mut body_read = raw.len() - head_end;
            while body_read < content_length {
                let n = stream.read(&mut buf).unwrap();
                body_read += n;
            }
            stream
                .write_all(b"HTTP/1.1 201 Created\r\ncontent-length: 7\r\nconnection: close\r\n\r\nCreated")
                .unwrap();
            tx.send(head).unwrap();
        });

        (base, rx)
    }

    #[test]
    fn uploads_once_when_motion_detected() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("test.jpg");
        fs::write(&image, b"fake-jpeg").unwrap();
        let (base, rx) = one_shot_server();
        let uploader = uploader(&base);

        let receipt = uploader.upload(&image, 1).unwrap().unwrap();

        assert_eq!(receipt.status, 201);
        assert_eq!(receipt.body, "Created");

        let head = rx.recv().unwrap();
        let request_line = head.lines().next().unwrap();
        assert!(request_line.starts_with("PUT /webdav/"), "{request_line}");
        assert!(request_line.contains("-m1.jpg"), "{request_line}");
        // base64("tok:")
        assert!(head.contains("Basic dG9rOg=="), "{head}");
    }
}

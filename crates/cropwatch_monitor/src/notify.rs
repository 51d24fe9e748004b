//! Snapshot notification transport (Telegram Bot API) and JPEG encoding.
//!
//! Fire-and-forget: transport errors are logged by the dispatcher and never
//! surfaced to the monitor loop.

use crate::dispatch::SnapshotSink;
use cropwatch_protocol::config::NotifyConfig;
use cropwatch_protocol::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use reqwest::blocking::multipart::{Form, Part};
use std::time::Duration;
use thiserror::Error;

const SEND_TIMEOUT: Duration = Duration::from_secs(12);
const JPEG_QUALITY: u8 = 85;

/// Notification errors. All transient; the dispatcher logs them and moves on.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notification API rejected the snapshot: HTTP {status}")]
    Rejected { status: u16 },

    #[error("Snapshot encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Telegram `sendPhoto` sink.
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: format!("https://api.telegram.org/bot{bot_token}/sendPhoto"),
            chat_id: chat_id.to_string(),
        })
    }

    /// Build a notifier from the config, or None when credentials are absent.
    pub fn from_config(notify: &NotifyConfig) -> Result<Option<Self>, NotifyError> {
        if !notify.enabled() {
            return Ok(None);
        }
        // enabled() guarantees both are present and non-empty.
        let token = notify.bot_token.as_deref().unwrap_or_default();
        let chat_id = notify.chat_id.as_deref().unwrap_or_default();
        Ok(Some(Self::new(token, chat_id)?))
    }
}

impl SnapshotSink for TelegramNotifier {
    fn send(&mut self, payload: &[u8], caption: &str) -> Result<(), NotifyError> {
        let photo = Part::bytes(payload.to_vec())
            .file_name("snapshot.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("photo", photo);

        let response = self.client.post(&self.url).multipart(form).send()?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// Encode an RGB frame as JPEG for the snapshot payload.
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, NotifyError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder.encode(
        &frame.pixels,
        frame.width,
        frame.height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

//! Patient artifacts sent to the model: drawings and free-text answers.

use std::path::Path;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::model::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Artifact {
    /// `data:image/<subtype>;base64,<payload>`
    Image { data_url: String },
    Text { text: String },
}

impl Artifact {
    pub fn image(data_url: impl Into<String>) -> Self {
        Artifact::Image {
            data_url: data_url.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Artifact::Text { text: text.into() }
    }

    /// Reject malformed images. Text is always acceptable; a blank answer is
    /// a valid (failing) response.
    pub fn validate(&self) -> Result<(), EvalError> {
        match self {
            Artifact::Image { data_url } => validate_image_data_url(data_url).map(|_| ()),
            Artifact::Text { .. } => Ok(()),
        }
    }
}

/// Build a data URL from raw image bytes.
pub fn image_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Read an image file into an image artifact. The MIME type comes from the
/// file extension.
pub fn load_image(path: &Path) -> anyhow::Result<Artifact> {
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => anyhow::bail!("unsupported image type: {}", path.display()),
    };
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read image: {}", path.display()))?;
    if bytes.is_empty() {
        anyhow::bail!("image file is empty: {}", path.display());
    }
    Ok(Artifact::image(image_data_url(mime, &bytes)))
}

/// Check the data URL header and decode the payload. Returns the payload size.
pub fn validate_image_data_url(data_url: &str) -> Result<usize, EvalError> {
    let rest = data_url
        .trim()
        .strip_prefix("data:image/")
        .ok_or_else(|| EvalError::Validation("image must be a data:image/ URL".into()))?;
    let (_, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| EvalError::Validation("image data URL must be base64 encoded".into()))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| EvalError::Validation(format!("image payload is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(EvalError::Validation("image payload is empty".into()));
    }
    Ok(bytes.len())
}

/// Optional client metadata sent with a drawing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingMetadata {
    /// Client timestamp, milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub device_type: Option<String>,
}

/// A drawing waiting to be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDrawing {
    pub session_id: String,
    pub task_id: TaskId,
    pub artifact: Artifact,
    pub metadata: DrawingMetadata,
    pub submitted_at: DateTime<Utc>,
}

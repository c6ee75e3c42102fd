//! Device model autodetection from the device tree.
//!
//! `/proc/device-tree/model` holds a NUL-terminated board name such as
//! `Raspberry Pi 4 Model B Rev 1.4`. Queried at most once, at startup, when
//! model autodetection is enabled.

use super::error::{ProviderError, ProviderResult};

const MODEL_FILE: &str = "/proc/device-tree/model";

/// Board model string from the device tree.
pub async fn device_model() -> ProviderResult<String> {
    let content = tokio::fs::read_to_string(MODEL_FILE)
        .await
        .map_err(|source| ProviderError::FileRead {
            path: MODEL_FILE.to_string(),
            source,
        })?;

    parse_model(&content)
}

/// Strips the trailing NUL and surrounding whitespace.
pub(crate) fn parse_model(content: &str) -> ProviderResult<String> {
    let model = content.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if model.is_empty() {
        return Err(ProviderError::InvalidFormat {
            location: MODEL_FILE.to_string(),
            reason: "empty model string".to_string(),
        });
    }

    Ok(model.to_string())
}

//! URL utilities for extracting video IDs from watch URLs

use crate::error::PlayersigError;
use url::Url;

/// Extract the video ID from the platform's URL formats
pub fn extract_video_id(url: &str) -> crate::Result<String> {
    let parsed = Url::parse(url)?;

    match parsed.host_str() {
        Some("youtu.be") => {
            let path = parsed.path().trim_start_matches('/');
            if path.is_empty() {
                return Err(PlayersigError::InvalidUrl("missing video ID".to_string()));
            }
            Ok(path.to_string())
        }
        Some("youtube.com") | Some("www.youtube.com") => {
            if parsed.path().starts_with("/watch") {
                parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.to_string())
                    .ok_or_else(|| PlayersigError::InvalidUrl("missing v parameter".to_string()))
            } else if let Some(video_id) = parsed.path().strip_prefix("/shorts/") {
                if video_id.is_empty() {
                    return Err(PlayersigError::InvalidUrl(
                        "missing video ID in shorts path".to_string(),
                    ));
                }
                Ok(video_id.to_string())
            } else {
                Err(PlayersigError::InvalidUrl(
                    "unsupported video URL format".to_string(),
                ))
            }
        }
        _ => Err(PlayersigError::InvalidUrl(
            "not a supported video platform URL".to_string(),
        )),
    }
}

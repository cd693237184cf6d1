//! Player-script URL extraction from a fetched watch page
//!
//! The watch page references the externally hosted player script in one of
//! two places: the embedded player config (`"jsUrl":"..."`) or a `<script>`
//! tag named `player_ias/base`. Both are tried; paths are resolved against
//! the platform origin.

use crate::error::PlayersigError;
use regex::Regex;

pub(crate) const PLATFORM_ORIGIN: &str = "https://www.youtube.com";

/// Extract the absolute URL of the player script from a watch-page body
pub fn player_js_url(page_body: &str) -> crate::Result<String> {
    let embedded = Regex::new(r#""jsUrl":"([^"]+)""#)?;
    if let Some(captures) = embedded.captures(page_body) {
        return Ok(absolute(&captures[1]));
    }

    let script_tag =
        Regex::new(r#"src="([^"]+)"\s+type="text/javascript"\s+name="player_ias/base""#)?;
    if let Some(captures) = script_tag.captures(page_body) {
        return Ok(absolute(&captures[1]));
    }

    Err(PlayersigError::ProcedureUnavailable(
        "player script reference not found in page".to_string(),
    ))
}

fn absolute(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("//") {
        format!("https://{rest}")
    } else if path.starts_with('/') {
        format!("{PLATFORM_ORIGIN}{path}")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_embedded_config_form() {
        let page = r#"<html>{"jsUrl":"/s/player/01234abcd/player_ias.vflset/en_US/base.js"}</html>"#;
        assert_eq!(
            player_js_url(page).unwrap(),
            "https://www.youtube.com/s/player/01234abcd/player_ias.vflset/en_US/base.js"
        );
    }

    #[test]
    fn extracts_script_tag_form() {
        let page = r#"<script src="/s/player/xyz/base.js" type="text/javascript" name="player_ias/base"></script>"#;
        assert_eq!(
            player_js_url(page).unwrap(),
            "https://www.youtube.com/s/player/xyz/base.js"
        );
    }

    #[test]
    fn resolves_protocol_relative_urls() {
        let page = r#""jsUrl":"//cdn.example/player/base.js""#;
        assert_eq!(
            player_js_url(page).unwrap(),
            "https://cdn.example/player/base.js"
        );
    }

    #[test]
    fn keeps_absolute_urls_as_is() {
        let page = r#""jsUrl":"https://cdn.example/player/base.js""#;
        assert_eq!(
            player_js_url(page).unwrap(),
            "https://cdn.example/player/base.js"
        );
    }

    #[test]
    fn missing_reference_is_procedure_unavailable() {
        let err = player_js_url("<html>no player here</html>").unwrap_err();
        assert!(matches!(err, PlayersigError::ProcedureUnavailable(_)));
    }
}

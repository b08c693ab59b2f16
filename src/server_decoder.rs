//! Server descriptor decoder.
//!
//! Watch pages carry each candidate source as `base64(name):base64(url)`. The
//! url half is sometimes a whole `<iframe>` tag rather than a bare URL. Decoding
//! is best-effort: any malformed token yields `None` and is dropped from the
//! server list.

use crate::models::{ServerCategory, ServerDescriptor};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

/// Standard alphabet, padding optional: some tokens arrive with their `=`
/// stripped.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static IFRAME_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<iframe\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("static regex")
});

/// Decode one `name:url` token.
pub fn decode(token: &str) -> Option<ServerDescriptor> {
    let (name_part, url_part) = token.trim().split_once(':')?;

    let name = decode_part(name_part)?;
    let raw_url = decode_part(url_part)?;

    let (url, is_embed) = if raw_url.to_lowercase().contains("<iframe") {
        let src = IFRAME_SRC_RE.captures(&raw_url)?.get(1)?.as_str().trim().to_string();
        (src, true)
    } else {
        (raw_url, false)
    };

    if url.trim().is_empty() {
        return None;
    }

    Some(ServerDescriptor {
        name,
        url,
        is_embed,
        category: ServerCategory::Unknown,
    })
}

/// Decode a token and tag it with the category of the list it came from.
pub fn decode_in(token: &str, category: ServerCategory) -> Option<ServerDescriptor> {
    let mut descriptor = decode(token)?;
    descriptor.category = match category {
        ServerCategory::Unknown => ServerCategory::from_marker(&descriptor.name),
        known => known,
    };
    Some(descriptor)
}

fn decode_part(part: &str) -> Option<String> {
    let bytes = TOKEN_ENGINE.decode(part.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

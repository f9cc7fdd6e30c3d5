//! Content type resolution from file suffixes.
//!
//! An ordered rule table; the first suffix that matches wins and anything
//! unmatched is served as `text/plain`.

use std::path::Path;

/// Content type of HTML documents, which get `{rev}` substitution.
pub const TEXT_HTML: &str = "text/html";
pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JAVASCRIPT: &str = "application/javascript";
pub const AUDIO_WAV: &str = "audio/wav";

const RULES: &[(&str, &str)] = &[
    (".html", TEXT_HTML),
    (".js", APPLICATION_JAVASCRIPT),
    (".css", "text/css"),
    (".txt", TEXT_PLAIN),
    (".jpg", "image/jpeg"),
    (".png", "image/png"),
    (".gif", "image/gif"),
    (".ogg", "application/ogg"),
    (".ogv", "video/ogg"),
    (".oga", "audio/ogg"),
    (".mp3", "audio/mp3"),
    (".wav", AUDIO_WAV),
    (".jar", "application/java-archive"),
];

/// Resolve the content type for `path`.
pub fn resolve(path: &Path) -> &'static str {
    let name = path.to_string_lossy();
    RULES
        .iter()
        .find(|(suffix, _)| ends_with_ignore_case(&name, suffix))
        .map(|(_, mime)| *mime)
        .unwrap_or(TEXT_PLAIN)
}

fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

/// The media type without parameters, e.g. `text/html` for `text/html; charset=utf-8`.
pub fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

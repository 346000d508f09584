//! Local file names for fetched media

use reqwest::Url;

/// Extensions kept as-is; anything else gets [`DEFAULT_EXTENSION`] appended
const MEDIA_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "webm", "mkv"];
const DEFAULT_EXTENSION: &str = "mp4";
const FALLBACK_STEM: &str = "download";

/// Derive the archive entry name from the last path segment of `url`.
///
/// Two URLs with the same last segment map to the same name; the later
/// write wins.
pub fn local_file_name(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or_default()
            .to_string(),
    };

    let stem = if segment.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        segment
    };

    if has_media_extension(&stem) {
        stem
    } else {
        format!("{stem}.{DEFAULT_EXTENSION}")
    }
}

fn has_media_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            MEDIA_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_media_extension() {
        assert_eq!(local_file_name("https://cdn.example.com/a/clip.mp4"), "clip.mp4");
        assert_eq!(local_file_name("https://cdn.example.com/CLIP.MP4"), "CLIP.MP4");
        assert_eq!(local_file_name("https://cdn.example.com/v/trailer.webm"), "trailer.webm");
    }

    #[test]
    fn test_appends_default_extension() {
        assert_eq!(local_file_name("https://cdn.example.com/videos/12345"), "12345.mp4");
        assert_eq!(local_file_name("https://cdn.example.com/poster.jpg"), "poster.jpg.mp4");
    }

    #[test]
    fn test_ignores_query_string() {
        assert_eq!(
            local_file_name("https://cdn.example.com/clip.mp4?token=abc&exp=1"),
            "clip.mp4"
        );
    }

    #[test]
    fn test_empty_last_segment() {
        assert_eq!(local_file_name("https://cdn.example.com/"), "download.mp4");
        assert_eq!(local_file_name("https://cdn.example.com"), "download.mp4");
    }

    #[test]
    fn test_unparseable_url_falls_back_to_split() {
        assert_eq!(local_file_name("not a url/clip?x=1"), "clip.mp4");
    }
}

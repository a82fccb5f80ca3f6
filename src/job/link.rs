use once_cell::sync::Lazy;
use regex::Regex;

/// Length of a YouTube video id.
pub const VIDEO_ID_LEN: usize = 11;

// Matches the path/query forms a YouTube link can carry its id in:
// youtu.be/<id>, /v/<id>, /u/<x>/<id>, /embed/<id>, watch?v=<id>, &v=<id>
static VIDEO_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .expect("video link pattern is valid")
});

/// Extract the video id from a submitted link.
/// Returns None unless the link matches a known form with an 11-char id.
pub fn extract_video_id(url: &str) -> Option<String> {
    let captures = VIDEO_LINK.captures(url.trim())?;
    let id = captures.get(2)?.as_str();
    (id.chars().count() == VIDEO_ID_LEN).then(|| id.to_string())
}

/// Default thumbnail location for a video id, used before metadata resolves.
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video_id)
}

//! Turns raw feed items into [`VideoRecord`]s.
//!
//! Every function here is total: missing or malformed input degrades to a
//! documented default instead of an error.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::types::{RawItem, VideoRecord};

pub const UNTITLED: &str = "Untitled";
pub const PLACEHOLDER_THUMBNAIL: &str =
    "https://via.placeholder.com/320x180/cccccc/666666?text=No+Thumbnail";

const THUMBNAIL_HOST: &str = "https://img.youtube.com/vi";
// Best first.
const THUMBNAIL_QUALITIES: [&str; 4] = ["maxresdefault", "hqdefault", "mqdefault", "sddefault"];

// Tried in order; first capture wins.
static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[?&]v=([^&]+)",
        r"/shorts/([^/?&]+)",
        r"/embed/([^/?&]+)",
        r"/watch\?v=([^&]+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Convert one raw item into a fully resolved record.
pub fn normalize(item: &RawItem, source_label: &str) -> VideoRecord {
    let title = non_blank(item.title.as_deref()).unwrap_or_else(|| {
        debug!(source = source_label, "item has no title, using default");
        UNTITLED.to_string()
    });
    let link = non_blank(item.link.as_deref()).unwrap_or_default();
    let description = non_blank(item.content_snippet.as_deref())
        .or_else(|| non_blank(item.content.as_deref()))
        .unwrap_or_default();

    VideoRecord {
        thumbnail: resolve_thumbnail(item),
        publish_date: parse_date(item.pub_date.as_deref()),
        channel: source_label.to_string(),
        title,
        link,
        description,
    }
}

/// Best-guess thumbnail URL; never empty.
pub fn resolve_thumbnail(item: &RawItem) -> String {
    if let Some(url) = item.media_group_thumbnails.first().and_then(|u| non_blank(Some(u.as_str()))) {
        return url;
    }
    if let Some(url) = non_blank(item.media_thumbnail.as_deref()) {
        return url;
    }
    if let Some(url) = item
        .link
        .as_deref()
        .and_then(extract_video_id)
        .and_then(|id| thumbnail_candidates(&id).into_iter().next())
    {
        return url;
    }
    debug!(
        title = item.title.as_deref().unwrap_or_default(),
        link = item.link.as_deref().unwrap_or_default(),
        has_content = item.content.is_some(),
        has_snippet = item.content_snippet.is_some(),
        "no thumbnail found, using placeholder"
    );
    PLACEHOLDER_THUMBNAIL.to_string()
}

/// Pull a video id out of a YouTube link (`v=`, `/shorts/`, `/embed/`, `/watch?v=`).
pub fn extract_video_id(link: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(link).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
}

/// Thumbnail URLs for a video id, highest quality first. Reachability is not checked.
pub fn thumbnail_candidates(video_id: &str) -> Vec<String> {
    THUMBNAIL_QUALITIES
        .iter()
        .map(|q| format!("{THUMBNAIL_HOST}/{video_id}/{q}.jpg"))
        .collect()
}

/// Parse a publish date, falling back to the current time.
pub fn parse_date(raw: Option<&str>) -> DateTime<Utc> {
    parse_date_or(raw, Utc::now())
}

/// Same as [`parse_date`] with an explicit fallback instant.
pub fn parse_date_or(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        debug!("no date string provided, using current time");
        return now;
    };
    if let Some(dt) = parse_timestamp(raw) {
        return dt;
    }
    if let Some(dt) = strip_gmt(raw).and_then(parse_timestamp) {
        debug!(raw, "parsed date after GMT removal");
        return dt;
    }
    debug!(raw, "failed to parse date string, using current time");
    now
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn strip_gmt(s: &str) -> Option<&str> {
    let rest = s.strip_suffix("GMT")?;
    if !rest.ends_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim_end())
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

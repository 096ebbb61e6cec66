//! Utility functions for iServe clients

use chrono::{DateTime, Local, Utc};

/// Format bytes to human readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Extract the filename from a `Content-Disposition` header value
///
/// Handles the quoted (`filename="report.pdf"`) and bare
/// (`filename=report.pdf`) forms. Returns `None` when the header carries no
/// filename parameter.
pub fn parse_content_disposition(header: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();
    let start = lower.find("filename")?;
    let rest = &header[start..];
    let eq = rest.find('=')?;
    let value = rest[eq + 1..].trim();

    let value = match value.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().unwrap_or(""),
        None => value.split(';').next().unwrap_or("").trim(),
    };

    let value = value.trim_matches('\'').trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Extension of a file name, without the dot
pub fn file_extension(name: &str) -> Option<&str> {
    let idx = name.rfind('.')?;
    let ext = &name[idx + 1..];
    if ext.is_empty() || idx == 0 {
        None
    } else {
        Some(ext)
    }
}

/// Coarse display category of a file, derived from name and MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Image,
    Pdf,
    Office,
    Video,
    Audio,
    Archive,
    Text,
    Other,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Pdf => "pdf",
            FileCategory::Office => "office",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Archive => "archive",
            FileCategory::Text => "text",
            FileCategory::Other => "other",
        }
    }
}

const OFFICE_EXTENSIONS: &[&str] = &["doc", "docx", "xls", "xlsx", "ppt", "pptx"];

/// Classify a file for display purposes
pub fn file_category(name: &str, mime: &str) -> FileCategory {
    let name_lower = name.to_ascii_lowercase();
    let ext = file_extension(&name_lower).unwrap_or("");

    if mime.starts_with("image/") {
        FileCategory::Image
    } else if mime == "application/pdf" || ext == "pdf" {
        FileCategory::Pdf
    } else if OFFICE_EXTENSIONS.contains(&ext) {
        FileCategory::Office
    } else if mime.starts_with("video/") {
        FileCategory::Video
    } else if mime.starts_with("audio/") {
        FileCategory::Audio
    } else if matches!(ext, "zip" | "rar" | "7z") {
        FileCategory::Archive
    } else if ext == "txt" || mime.starts_with("text/") {
        FileCategory::Text
    } else {
        FileCategory::Other
    }
}

/// Parse an ISO 8601 timestamp, tolerating over-precise fractional seconds
/// and a missing timezone (treated as UTC)
pub fn parse_iso_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Backend timestamps sometimes omit the offset entirely
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp for terminal display in the local timezone
pub fn format_local_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Relative description of how long ago a timestamp was
pub fn relative_time(time: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(*time);

    if delta.num_minutes() < 1 {
        "just now".to_string()
    } else if delta.num_minutes() < 60 {
        format!("{} minutes ago", delta.num_minutes())
    } else if delta.num_hours() < 24 {
        format!("{} hours ago", delta.num_hours())
    } else if delta.num_days() < 30 {
        format!("{} days ago", delta.num_days())
    } else {
        time.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(50 * 1024 * 1024), "50.0 MB");
    }

    #[test]
    fn content_disposition_quoted() {
        assert_eq!(
            parse_content_disposition("attachment; filename=\"report.pdf\""),
            Some("report.pdf".to_string())
        );
    }

    #[test]
    fn content_disposition_bare() {
        assert_eq!(
            parse_content_disposition("attachment; filename=photo.png; size=12"),
            Some("photo.png".to_string())
        );
    }

    #[test]
    fn content_disposition_missing() {
        assert_eq!(parse_content_disposition("attachment"), None);
        assert_eq!(parse_content_disposition("attachment; filename="), None);
    }

    #[test]
    fn file_category_buckets() {
        assert_eq!(file_category("a.png", "image/png"), FileCategory::Image);
        assert_eq!(file_category("a.pdf", ""), FileCategory::Pdf);
        assert_eq!(file_category("sheet.xlsx", ""), FileCategory::Office);
        assert_eq!(file_category("clip.mp4", "video/mp4"), FileCategory::Video);
        assert_eq!(file_category("x.zip", ""), FileCategory::Archive);
        assert_eq!(file_category("notes.txt", ""), FileCategory::Text);
        assert_eq!(file_category("data.bin", ""), FileCategory::Other);
    }

    #[test]
    fn parse_iso_time_handles_microseconds_and_naive() {
        let with_offset = parse_iso_time("2024-01-15T10:30:00.123456+00:00").unwrap();
        assert_eq!(with_offset.timestamp_subsec_millis(), 123);

        let naive = parse_iso_time("2024-01-15T10:30:00").unwrap();
        assert_eq!(
            naive,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );

        assert!(parse_iso_time("not a time").is_none());
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let t = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap();

        assert_eq!(relative_time(&t(11, 59), now), "1 minutes ago");
        assert_eq!(relative_time(&t(9, 0), now), "3 hours ago");
        assert_eq!(
            relative_time(&Utc.with_ymd_and_hms(2024, 1, 13, 12, 0, 0).unwrap(), now),
            "2 days ago"
        );
        assert_eq!(
            relative_time(&Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(), now),
            "2023-01-01"
        );
    }
}

//! Naming rules for uploaded files.

use chrono::{DateTime, Local};
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));
static UNSAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("filename regex is valid"));

const FALLBACK_NAME: &str = "document.pdf";

/// Whether `filename` carries a `.pdf` extension, in any case.
pub fn is_pdf(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("pdf"))
}

/// Reduce a client-supplied filename to a safe basename.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let spaced = WHITESPACE.replace_all(base.trim(), "_");
    let cleaned = UNSAFE.replace_all(&spaced, "");
    let trimmed = cleaned.trim_matches(|ch| ch == '.' || ch == '_');
    if trimmed.is_empty() || !is_pdf(trimmed) {
        return FALLBACK_NAME.to_string();
    }
    trimmed.to_string()
}

/// Name an upload is stored under: `YYYYmmdd_HHMMSS_<short-id>_<sanitized>`.
pub fn stored_filename(filename: &str) -> String {
    stored_filename_at(filename, Local::now(), Uuid::new_v4())
}

fn stored_filename_at(filename: &str, now: DateTime<Local>, id: Uuid) -> String {
    let short_id: String = id.simple().to_string().chars().take(8).collect();
    format!(
        "{}_{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        short_id,
        sanitize_filename(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::{is_pdf, sanitize_filename, stored_filename, stored_filename_at};
    use chrono::{Local, TimeZone};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(is_pdf("report.pdf"));
        assert!(is_pdf("REPORT.PDF"));
        assert!(!is_pdf("report.pdf.exe"));
        assert!(!is_pdf("notes.txt"));
        assert!(!is_pdf(".pdf"));
        assert!(!is_pdf("pdf"));
    }

    #[test]
    fn sanitizing_strips_paths_and_unsafe_characters() {
        assert_eq!(sanitize_filename("../../etc/Q3 report (final).pdf"), "Q3_report_final.pdf");
        assert_eq!(sanitize_filename(r"C:\Users\me\plan.pdf"), "plan.pdf");
        assert_eq!(sanitize_filename("résumé.pdf"), "rsum.pdf");
        assert_eq!(sanitize_filename("...pdf"), "document.pdf");
    }

    #[test]
    fn stored_name_is_prefixed_with_timestamp_and_short_id() {
        let now = Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("local time");
        let id = Uuid::parse_str("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0").expect("uuid");
        assert_eq!(
            stored_filename_at("My Plan.pdf", now, id),
            "20240309_140507_0f1e2d3c_My_Plan.pdf"
        );
    }

    #[test]
    fn repeated_uploads_get_distinct_names() {
        assert_ne!(stored_filename("plan.pdf"), stored_filename("plan.pdf"));
    }
}

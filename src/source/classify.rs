//! Best-effort scheme and format detection.
//!
//! Detection never fails. It returns `None` when nothing can be inferred, and
//! the stream decides whether the result is usable.

use std::sync::LazyLock;

use regex::Regex;

use super::Source;

static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)([a-z]{2,})://").expect("scheme pattern is valid")
});

static FORMAT_QUERY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|&)format=([A-Za-z0-9_]+)").expect("format query pattern is valid")
});

/// The scheme and format a source resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub scheme: Option<String>,
    pub format: Option<String>,
}

/// Classify a source. Explicit hints always win over detection.
pub fn classify(
    source: &Source,
    explicit_scheme: Option<&str>,
    explicit_format: Option<&str>,
) -> Classification {
    let scheme = explicit_scheme
        .map(|s| s.to_ascii_lowercase())
        .or_else(|| detect_scheme(source));
    let format = explicit_format
        .map(|s| s.to_ascii_lowercase())
        .or_else(|| detect_format(source));

    tracing::debug!(
        source = %source.id(),
        scheme = ?scheme,
        format = ?format,
        "classified source"
    );

    Classification { scheme, format }
}

/// Detect the transport scheme of a source.
pub fn detect_scheme(source: &Source) -> Option<String> {
    if source.is_stream() {
        return Some("stream".into());
    }
    match source {
        Source::Path(s) => SCHEME_RE
            .captures(s)
            .map(|caps| caps[1].to_ascii_lowercase()),
        Source::Native(_) => Some("native".into()),
        _ => None,
    }
}

/// Detect the encoded format of a source.
///
/// Byte streams carry no name, so their format must come from a hint.
pub fn detect_format(source: &Source) -> Option<String> {
    match source {
        Source::Path(s) => detect_format_from_location(s),
        Source::Native(_) => Some("native".into()),
        _ => None,
    }
}

fn detect_format_from_location(location: &str) -> Option<String> {
    let (rest, has_scheme) = match SCHEME_RE.find(location) {
        Some(m) => (&location[m.end()..], true),
        None => (location, false),
    };

    let rest = rest.split('#').next().unwrap_or(rest);
    let (rest, query) = match rest.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (rest, None),
    };

    let (host, path) = if has_scheme {
        match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        }
    } else {
        ("", rest)
    };

    if host.eq_ignore_ascii_case("docs.google.com") && path.contains("/spreadsheets/") {
        let exported = query
            .and_then(|q| FORMAT_QUERY_RE.captures(q))
            .map(|caps| caps[1].to_ascii_lowercase());
        return Some(exported.unwrap_or_else(|| "gsheet".into()));
    }

    if let Some(caps) = query.and_then(|q| FORMAT_QUERY_RE.captures(q)) {
        return Some(caps[1].to_ascii_lowercase());
    }

    let name_source = if path.trim_matches('/').is_empty() {
        host
    } else {
        path
    };
    extension_of(name_source)
}

fn extension_of(path: &str) -> Option<String> {
    let name = path
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

static GSHEET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"docs\.google\.com/spreadsheets/d/([A-Za-z0-9_-]+)").expect("gsheet pattern is valid")
});

static GID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&#]gid=([0-9]+)").expect("gid pattern is valid"));

/// Rewrite a Google Sheets link to its CSV export URL, keeping the sheet id
/// (`gid`) when the link names one. Links already pointing at an export are
/// returned unchanged.
pub fn gsheet_export_url(url: &str) -> Option<String> {
    let id = GSHEET_RE.captures(url)?.get(1)?.as_str();
    if url.contains("/export") {
        return Some(url.to_string());
    }
    let mut export =
        format!("https://docs.google.com/spreadsheets/d/{id}/export?format=csv&id={id}");
    if let Some(gid) = GID_RE.captures(url).and_then(|caps| caps.get(1)) {
        export.push_str("&gid=");
        export.push_str(gid.as_str());
    }
    Some(export)
}

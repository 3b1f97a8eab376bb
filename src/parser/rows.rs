use std::sync::LazyLock;

use regex::Regex;

use super::tags::{find_anchor, find_region, Case};
use crate::error::DecodeError;
use crate::model::{normalize_size, EntryKind, FileEntry};
use crate::text::{float_or_zero, int_or_zero};

static VIEW_FIT_INNER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)view=fit&").unwrap());
static VIEW_FIT_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[#&?]view=fit\b").unwrap());
static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").unwrap());
static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)([0-9.]+)\s*MB").unwrap());
static PAGES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)([0-9]+)\s*pp").unwrap());

/// Decode one collected row of an instance table.
///
/// `<li>` rows hold an anchor plus an optional `<small>` annotation, `<b>`
/// rows are text lines. Anything else is not a row and yields `None`.
pub fn decode_row(tag: &str, inner: &str) -> Result<Option<FileEntry>, DecodeError> {
    match tag {
        "li" => decode_item(inner).map(Some),
        "b" => Ok(Some(FileEntry::text(inner))),
        _ => Ok(None),
    }
}

fn decode_item(inner: &str) -> Result<FileEntry, DecodeError> {
    let anchor = find_anchor(inner).ok_or_else(|| DecodeError::MissingAnchor {
        row: inner.to_string(),
    })?;
    if anchor.href.is_empty() {
        return Err(DecodeError::MissingHref {
            anchor: inner.to_string(),
        });
    }

    if is_external(anchor.href) {
        return Ok(FileEntry::link(anchor.label, anchor.href));
    }

    let mut entry = FileEntry::file(anchor.label, strip_viewer_fragments(anchor.href), 0.0);
    if anchor.rest.trim().is_empty() {
        return Ok(entry);
    }

    let (small, _) = find_region(anchor.rest, "small", Case::Insensitive);
    let small = small.ok_or(DecodeError::MissingRegion { region: "small" })?;
    let (size, pages) = parse_annotation(small);
    if let EntryKind::File { size_mb, .. } = &mut entry.kind {
        *size_mb = size;
    }
    entry.pages = pages;
    Ok(entry)
}

/// Does the href leave the instance's own directory?
///
/// Scheme-qualified (`http:`, `mailto:`), protocol-relative, site-absolute
/// and parent-relative hrefs are links; `sub/dir/file.pdf` is a local file.
pub fn is_external(href: &str) -> bool {
    SCHEME_RE.is_match(href) || href.starts_with('/') || href.starts_with("../")
}

/// Remove `view=Fit` viewer hints, however many there are.
pub fn strip_viewer_fragments(href: &str) -> String {
    let mut out = href.to_string();
    loop {
        let next = VIEW_FIT_INNER_RE.replace_all(&out, "");
        let next = VIEW_FIT_TAIL_RE.replace_all(&next, "").into_owned();
        if next == out {
            return out;
        }
        out = next;
    }
}

/// Pull `<n> MB` and `<n> pp` out of a `<small>` annotation.
///
/// Sizes come back normalized to megabytes; a missing pattern leaves the
/// size at zero and the page count absent.
pub fn parse_annotation(small: &str) -> (f64, Option<u32>) {
    let text = small
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace('\u{a0}', " ");

    let size = SIZE_RE
        .captures(&text)
        .map(|c| normalize_size(float_or_zero(&c[1])))
        .unwrap_or(0.0);
    let pages = PAGES_RE
        .captures(&text)
        .map(|c| u32::try_from(int_or_zero(&c[1])).unwrap_or(0));

    (size, pages)
}

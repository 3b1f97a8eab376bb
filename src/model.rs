//! Entities decoded from the three page levels: root index, series page,
//! and convention-instance page.

use serde::Serialize;

/// Sizes above this are taken to be raw byte counts rather than megabytes.
///
/// Historical data mixes the two units; the threshold is a heuristic, not a
/// unit law.
pub const RAW_BYTES_THRESHOLD: f64 = 500.0;
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Normalize a size to megabytes.
pub fn normalize_size(size: f64) -> f64 {
    if size > RAW_BYTES_THRESHOLD {
        size / BYTES_PER_MB
    } else {
        size
    }
}

/// One row listed on a convention-instance page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub title: String,
    pub notes: String,
    pub pages: Option<u32>,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    /// A line of annotation text; no file behind it.
    Text,
    /// An external reference; `url` plays the role of the site filename.
    Link { url: String },
    File {
        site_filename: String,
        local_filename: Option<String>,
        /// Always in megabytes, see [`normalize_size`].
        size_mb: f64,
    },
}

impl FileEntry {
    pub fn text(text: impl Into<String>) -> Self {
        FileEntry {
            title: text.into(),
            notes: String::new(),
            pages: None,
            kind: EntryKind::Text,
        }
    }

    pub fn link(title: impl Into<String>, url: impl Into<String>) -> Self {
        FileEntry {
            title: title.into(),
            notes: String::new(),
            pages: None,
            kind: EntryKind::Link { url: url.into() },
        }
    }

    pub fn file(title: impl Into<String>, site_filename: impl Into<String>, size_mb: f64) -> Self {
        FileEntry {
            title: title.into(),
            notes: String::new(),
            pages: None,
            kind: EntryKind::File {
                site_filename: site_filename.into(),
                local_filename: None,
                size_mb: normalize_size(size_mb),
            },
        }
    }

    pub fn site_filename(&self) -> &str {
        match &self.kind {
            EntryKind::Text => "",
            EntryKind::Link { url } => url,
            EntryKind::File { site_filename, .. } => site_filename,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, EntryKind::Text)
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, EntryKind::Link { .. })
    }

    /// A pure annotation row: notes, but no title, file or pages.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.site_filename().is_empty()
            && self.pages.unwrap_or(0) == 0
            && !self.notes.is_empty()
    }

    pub fn size_mb(&self) -> f64 {
        match self.kind {
            EntryKind::File { size_mb, .. } => size_mb,
            _ => 0.0,
        }
    }
}

/// A convention instance listed on a series page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRef {
    pub name: String,
    /// Empty when the instance is listed but has no page yet.
    pub url: String,
}

/// A convention series listed on the root index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesRef {
    pub name: String,
    pub url: String,
}

impl InstanceRef {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        InstanceRef {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn is_published(&self) -> bool {
        !self.url.is_empty()
    }
}

impl SeriesRef {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        SeriesRef {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn is_published(&self) -> bool {
        !self.url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_in_bytes_is_converted() {
        assert_eq!(normalize_size(2.5), 2.5);
        assert_eq!(normalize_size(500.0), 500.0);
        assert_eq!(normalize_size(2_621_440.0), 2.5);
    }

    #[test]
    fn empty_row_detection() {
        let mut e = FileEntry::file("", "", 0.0);
        assert!(!e.is_empty());
        e.notes = "see also the program book".into();
        assert!(e.is_empty());
        e.pages = Some(3);
        assert!(!e.is_empty());
    }

    #[test]
    fn link_site_filename_is_url() {
        let e = FileEntry::link("Fancyclopedia", "https://fancyclopedia.org/Boskone");
        assert_eq!(e.site_filename(), "https://fancyclopedia.org/Boskone");
        assert!(e.is_link());
        assert!(!e.is_text());
    }

    #[test]
    fn unpublished_refs() {
        assert!(InstanceRef::new("Con1", "/path").is_published());
        assert!(!InstanceRef::new("Con2", "").is_published());
        assert!(!SeriesRef::new("Natcon", "").is_published());
    }

    mod size_props {
        use crate::model::{normalize_size, BYTES_PER_MB, RAW_BYTES_THRESHOLD};
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn small_sizes_are_megabytes(x in 0.0f64..=RAW_BYTES_THRESHOLD) {
                prop_assert_eq!(normalize_size(x), x);
            }

            #[test]
            fn large_sizes_are_bytes(x in 500.001f64..(RAW_BYTES_THRESHOLD * BYTES_PER_MB)) {
                prop_assert_eq!(normalize_size(x), x / BYTES_PER_MB);
            }

            #[test]
            fn normalizing_twice_changes_nothing(x in 0.0f64..(RAW_BYTES_THRESHOLD * BYTES_PER_MB)) {
                let once = normalize_size(x);
                prop_assert_eq!(normalize_size(once), once);
            }
        }
    }
}

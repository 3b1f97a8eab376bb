pub mod legacy;
pub mod markup;
pub mod rows;
pub mod tags;
pub mod version;

use tracing::debug;

use crate::error::DecodeError;
use crate::model::{FileEntry, InstanceRef, SeriesRef};
use version::{classify, DocumentKind, Format};

/// Page text → file entries: classify, then legacy JSON or markup table.
pub fn decode_instance(text: &str) -> Result<Vec<FileEntry>, DecodeError> {
    match classify(text, DocumentKind::Instance) {
        Format::Legacy { data, version } => {
            debug!(version, "decoding legacy instance page");
            legacy::decode_instance_data(data)
        }
        Format::Markup { version } => {
            debug!(version, "decoding instance page markup");
            markup::decode_instance_markup(text)
        }
    }
}

pub fn decode_series(text: &str) -> Result<Vec<InstanceRef>, DecodeError> {
    match classify(text, DocumentKind::Series) {
        Format::Legacy { data, version } => {
            debug!(version, "decoding legacy series page");
            legacy::decode_series_data(data)
        }
        Format::Markup { version } => {
            debug!(version, "decoding series page markup");
            markup::decode_series_markup(text)
        }
    }
}

/// The root index has only ever been published as markup.
pub fn decode_root(text: &str) -> Result<Vec<SeriesRef>, DecodeError> {
    markup::decode_root_markup(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn legacy_instance_page() {
        let entries = decode_instance(&fixture("legacy_instance")).unwrap();
        assert_eq!(entries.len(), 4);
        assert!(entries[0].is_text());
        assert_eq!(entries[1].site_filename(), "Natcon 1 PB.pdf");
        assert_eq!(entries[1].pages, Some(24));
        // ver 3 record: later keys present but ignored
        assert_eq!(entries[2].site_filename(), "Natcon 1 flyer.jpg");
        assert_eq!(entries[2].pages, None);
        assert!(!entries[2].is_link());
        assert!(entries[3].is_link());
    }

    #[test]
    fn markup_instance_page_with_stale_json() {
        // version marker says 2.0, so the leftover block is ignored
        let html = format!(
            "<!-- fanac-version 2.0 --><fanac-json>{}</fanac-json>{}",
            r#"{"_datasource": {"ver": 1, "_conFileList": []}}"#,
            fixture("instance")
        );
        assert_eq!(decode_instance(&html).unwrap().len(), 6);
    }

    #[test]
    fn legacy_series_page() {
        let refs = decode_series(&fixture("legacy_series")).unwrap();
        assert_eq!(
            refs,
            vec![
                InstanceRef::new("Natcon 1", "Natcon 1/index.html"),
                InstanceRef::new("Natcon 2", ""),
            ]
        );
    }

    #[test]
    fn malformed_legacy_block() {
        let html = "<!-- fanac-version 1.0 --><fanac-json>{ this is not json at all }</fanac-json>";
        assert!(matches!(decode_series(html), Err(DecodeError::MalformedData(_))));
    }

    #[test]
    fn markup_series_page() {
        assert_eq!(decode_series(&fixture("series")).unwrap().len(), 3);
    }

    #[test]
    fn root_page() {
        assert_eq!(decode_root(&fixture("root")).unwrap().len(), 2);
    }
}

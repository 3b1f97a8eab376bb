//! Decoders for the pure-HTML (2.0 and later) page generation.
//!
//! Pages are hand-edited and regularly carry unbalanced `<ul>` wrappers, so
//! instance tables are walked as a flat stream of regions. A `<ul>` is not
//! structure: the walk steps into it and skips its closing marker, and every
//! other region is collected as a row.

use tracing::{debug, trace};

use super::rows::decode_row;
use super::tags::{find_anchor, find_region, Case, Regions};
use crate::error::DecodeError;
use crate::model::{FileEntry, InstanceRef, SeriesRef};

pub const TABLE_TAG: &str = "fanac-table";
/// Series-table column holding the convention name and link.
pub const CONVENTION_COLUMN: &str = "Convention";
/// Root-index rows made of dashes only separate groups of series.
const DIVIDER: &str = "----";

/// A region collected from an instance table, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub tag: String,
    pub inner: String,
}

pub fn decode_instance_markup(text: &str) -> Result<Vec<FileEntry>, DecodeError> {
    let body = required(find_region(text, "body", Case::Insensitive).0, "body")?;
    let table = required(find_region(body, TABLE_TAG, Case::Insensitive).0, TABLE_TAG)?;

    let mut entries = Vec::new();
    for row in collect_rows(table) {
        match decode_row(&row.tag, &row.inner)? {
            Some(entry) => entries.push(entry),
            None => debug!(tag = %row.tag, "skipping non-row region"),
        }
    }
    Ok(entries)
}

/// Flatten `<ul>` wrappers and collect the remaining regions.
pub fn collect_rows(table: &str) -> Vec<RawRow> {
    Regions::new(table)
        .step_into("ul")
        .map(|region| {
            trace!(tag = %region.tag, inner = region.inner, "row");
            RawRow {
                tag: region.tag,
                inner: region.inner.to_string(),
            }
        })
        .collect()
}

pub fn decode_series_markup(text: &str) -> Result<Vec<InstanceRef>, DecodeError> {
    let (_, rest) = find_region(text, "head", Case::Insensitive);
    let table = required(find_region(rest, TABLE_TAG, Case::Insensitive).0, TABLE_TAG)?;

    let (header, mut rest) = find_region(table, "thead", Case::Insensitive);
    let headers = read_table_row(required(header, "thead")?, "th");
    let column = headers
        .iter()
        .position(|h| h.trim() == CONVENTION_COLUMN)
        .ok_or(DecodeError::MissingColumn {
            column: CONVENTION_COLUMN,
        })?;

    let mut instances = Vec::new();
    while let (Some(row), next) = find_region(rest, "tr", Case::Insensitive) {
        rest = next;
        let cells = read_table_row(row, "td");
        let (instance, extra) = unpack_convention_cell(cells.get(column).copied().unwrap_or(""));
        if !extra.is_empty() {
            trace!(name = %instance.name, extra, "convention cell has trailing text");
        }
        instances.push(instance);
    }
    Ok(instances)
}

pub fn decode_root_markup(text: &str) -> Result<Vec<SeriesRef>, DecodeError> {
    let table = required(find_region(text, TABLE_TAG, Case::Insensitive).0, TABLE_TAG)?;
    let (tbody, _) = find_region(table, "tbody", Case::Insensitive);
    let mut rest = required(tbody, "tbody")?;

    let mut series = Vec::new();
    while let (Some(row), next) = find_region(rest, "tr", Case::Insensitive) {
        rest = next;
        let cell = find_region(row, "td", Case::Insensitive).0.unwrap_or("");
        if cell.contains(DIVIDER) {
            continue;
        }
        match find_anchor(cell) {
            Some(a) => series.push(SeriesRef::new(a.label, a.href)),
            None => debug!(cell, "root row without a link"),
        }
    }
    Ok(series)
}

/// Cells delimited by `<delim>...</delim>`.
///
/// Also splits the `<td>a<td>b</td>` mistake, which browsers render as two
/// cells, into two cells.
pub fn read_table_row<'a>(row: &'a str, delim: &str) -> Vec<&'a str> {
    let stray = format!("<{delim}>");
    let mut cells = Vec::new();
    let mut rest = row;
    while let (Some(item), next) = find_region(rest, delim, Case::Insensitive) {
        rest = next;
        if item.contains(&stray) {
            cells.extend(item.split(stray.as_str()));
        } else {
            cells.push(item);
        }
    }
    cells
}

/// Split `<a href=URL>NAME</a>EXTRA` into an instance reference and the
/// uninterpreted trailing text. A cell without a link is a name only.
pub fn unpack_convention_cell(cell: &str) -> (InstanceRef, &str) {
    match find_anchor(cell) {
        Some(a) => (InstanceRef::new(a.label, a.href), a.rest.trim()),
        None => (InstanceRef::new(cell.trim(), ""), ""),
    }
}

fn required<'a>(region: Option<&'a str>, name: &'static str) -> Result<&'a str, DecodeError> {
    region.ok_or(DecodeError::MissingRegion { region: name })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn ul_wrappers_are_unwrapped() {
        let table = "<ul id=\"conpagetable\"><li>a</li><ul><li>b</li></ul><b>t</b></ul><li>c</li>";
        let tags: Vec<_> = collect_rows(table)
            .into_iter()
            .map(|r| (r.tag, r.inner))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("li".to_string(), "a".to_string()),
                ("li".to_string(), "b".to_string()),
                ("b".to_string(), "t".to_string()),
                ("li".to_string(), "c".to_string()),
            ]
        );
    }

    #[test]
    fn unmatched_ul_does_not_break_walk() {
        let table = "<ul><li>a</li></ul></ul><ul><li>b</li>";
        let inner: Vec<_> = collect_rows(table).into_iter().map(|r| r.inner).collect();
        assert_eq!(inner, vec!["a", "b"]);
    }

    #[test]
    fn instance_page() {
        let entries = decode_instance_markup(&fixture("instance")).unwrap();
        assert_eq!(entries.len(), 6);
        assert!(entries[0].is_text());
        assert_eq!(entries[1].site_filename(), "Boskone 1 Program.pdf");
        assert_eq!(entries[1].pages, Some(12));
        assert_eq!(entries[1].size_mb(), 2.5);
        assert_eq!(entries[2].site_filename(), "flyer.jpg");
        assert!(entries[4].is_link());
        assert_eq!(entries[5].site_filename(), "Report.pdf");
    }

    #[test]
    fn large_page_scans_in_one_pass() {
        let mut page = String::from("<html><body><fanac-table><ul>");
        for n in 0..20_000 {
            page.push_str(&format!(
                "<br><ul><li><a href=\"file{n}.pdf\">File {n}</a> <small>1.0 MB 2 pp</small></li></ul>\n"
            ));
        }
        page.push_str("</fanac-table></body></html>");

        let entries = decode_instance_markup(&page).unwrap();
        assert_eq!(entries.len(), 20_000);
        assert_eq!(entries[19_999].site_filename(), "file19999.pdf");
        assert_eq!(entries[19_999].pages, Some(2));
    }

    #[test]
    fn instance_page_without_body() {
        let err = decode_instance_markup("<fanac-table><li><a href=x.pdf>x</a></li></fanac-table>")
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingRegion { region: "body" }));
    }

    #[test]
    fn instance_page_without_table() {
        let err = decode_instance_markup("<body><ul></ul></body>").unwrap_err();
        assert!(matches!(err, DecodeError::MissingRegion { region: TABLE_TAG }));
    }

    #[test]
    fn instance_page_with_bad_row() {
        let html = "<body><fanac-table><li>no link</li></fanac-table></body>";
        assert!(matches!(
            decode_instance_markup(html),
            Err(DecodeError::MissingAnchor { .. })
        ));
    }

    #[test]
    fn series_page() {
        let refs = decode_series_markup(&fixture("series")).unwrap();
        assert_eq!(
            refs,
            vec![
                InstanceRef::new("Boskone 1", "Boskone 1/index.html"),
                InstanceRef::new("Boskone 2", "Boskone 2/index.html"),
                InstanceRef::new("Boskone 3", ""),
            ]
        );
    }

    #[test]
    fn series_page_without_thead() {
        let html = "<html><body><fanac-table><tr><td>x</td></tr></fanac-table></body></html>";
        assert!(matches!(
            decode_series_markup(html),
            Err(DecodeError::MissingRegion { region: "thead" })
        ));
    }

    #[test]
    fn series_page_without_convention_column() {
        let html = "<fanac-table><thead><tr><th>Dates</th></tr></thead></fanac-table>";
        assert!(matches!(
            decode_series_markup(html),
            Err(DecodeError::MissingColumn { .. })
        ));
    }

    #[test]
    fn root_page() {
        let refs = decode_root_markup(&fixture("root")).unwrap();
        assert_eq!(
            refs,
            vec![
                SeriesRef::new("Boskone", "Boskone/index.html"),
                SeriesRef::new("Natcon", "Natcon/index.html"),
            ]
        );
    }

    #[test]
    fn table_row_split_fix() {
        assert_eq!(read_table_row("<td>a<td>b</td><td>c</td>", "td"), vec!["a", "b", "c"]);
        assert_eq!(read_table_row("<TH>Convention</TH><th>Dates</th>", "th"), vec!["Convention", "Dates"]);
    }

    #[test]
    fn convention_cell() {
        let (r, extra) = unpack_convention_cell(r#"<a href="Boskone1/index.html">Boskone 1</a> (cancelled)"#);
        assert_eq!(r, InstanceRef::new("Boskone 1", "Boskone1/index.html"));
        assert_eq!(extra, "(cancelled)");
        let (r, extra) = unpack_convention_cell(" Boskone 9 ");
        assert_eq!(r, InstanceRef::new("Boskone 9", ""));
        assert_eq!(extra, "");
    }
}

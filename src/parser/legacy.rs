//! Decoder for the JSON embedded in pre-2.0 pages.
//!
//! The editor that wrote these pages nested JSON inside JSON: the
//! `_datasource` of a page and every entry of its file list may be either an
//! object or a string holding an encoded object. Both shapes are accepted.
//!
//! Each file record carries its own `ver`. Fields added in later editor
//! versions are read only when the record's `ver` reaches the minimum listed
//! in [`FIELD_GATES`]; stale keys in older records are ignored.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DecodeError;
use crate::model::{normalize_size, EntryKind, FileEntry, InstanceRef};
use crate::text::{json_f64, json_i64, strip_accents};

/// Instance pages list files only from this page version on.
pub const INSTANCE_PAGE_MIN_VER: i64 = 1;
/// Series pages carry their instance list only from this version on.
pub const SERIES_PAGE_MIN_VER: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SiteFilename,
    IsText,
    Pages,
    IsLink,
    Url,
}

/// (field, minimum record version) pairs.
pub const FIELD_GATES: &[(Field, i64)] = &[
    (Field::SiteFilename, 5),
    (Field::IsText, 6),
    (Field::Pages, 7),
    (Field::IsLink, 8),
    (Field::Url, 9),
];

/// Fields a record of version `ver` is allowed to populate.
pub fn gated_fields(ver: i64) -> impl Iterator<Item = Field> {
    FIELD_GATES
        .iter()
        .filter(move |(_, min)| ver >= *min)
        .map(|(field, _)| *field)
}

pub fn decode_instance_data(data: &str) -> Result<Vec<FileEntry>, DecodeError> {
    let doc: Value = serde_json::from_str(data)?;
    let doc = object(&doc, "instance page")?;
    match doc.get("ConInstanceName").and_then(Value::as_str) {
        Some(name) => debug!(name, "legacy instance page"),
        None => debug!("legacy instance page without 'ConInstanceName'"),
    }

    let page = nested(field(doc, "_datasource")?)?;
    let page = object(&page, "_datasource")?;
    if page.get("ver").map(json_i64).unwrap_or(0) < INSTANCE_PAGE_MIN_VER {
        return Ok(Vec::new());
    }

    field(page, "_conFileList")?
        .as_array()
        .ok_or_else(|| DecodeError::MalformedRecord("'_conFileList' is not a list".into()))?
        .iter()
        .map(|line| decode_file_record(&nested(line)?))
        .collect()
}

pub fn decode_series_data(data: &str) -> Result<Vec<InstanceRef>, DecodeError> {
    let doc: Value = serde_json::from_str(data)?;
    let doc = object(&doc, "series page")?;
    if doc.get("ver").map(json_i64).unwrap_or(0) < SERIES_PAGE_MIN_VER {
        return Ok(Vec::new());
    }
    if let Some(name) = doc.get("_textConSeries").and_then(Value::as_str) {
        debug!(series = %strip_accents(name), "legacy series page");
    }

    let source = nested(field(doc, "_datasource")?)?;
    let source = object(&source, "_datasource")?;

    // Instances live under "0", "1", ... until the first gap.
    let mut instances = Vec::new();
    for i in 0.. {
        let Some(raw) = source.get(&i.to_string()) else {
            break;
        };
        let con = nested(raw)?;
        let con = object(&con, "convention record")?;
        instances.push(InstanceRef::new(
            strip_accents(str_field(con, "_name")),
            str_field(con, "_URL"),
        ));
    }
    Ok(instances)
}

/// Decode one file record, honouring its version gates.
pub fn decode_file_record(v: &Value) -> Result<FileEntry, DecodeError> {
    let rec = object(v, "file record")?;
    let ver = rec
        .get("ver")
        .map(json_i64)
        .ok_or_else(|| DecodeError::MalformedRecord("file record without 'ver'".into()))?;

    let title = str_field(rec, "_displayTitle").to_string();
    let notes = str_field(rec, "_notes").to_string();
    let size_mb = normalize_size(rec.get("_size").map(json_f64).unwrap_or(0.0));
    let local_filename = Some(str_field(rec, "_localfilename"))
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut site_filename = String::new();
    let mut is_text = false;
    let mut pages = None;
    let mut is_link = false;
    let mut url = String::new();

    for gated in gated_fields(ver) {
        match gated {
            Field::SiteFilename => site_filename = str_field(rec, "_sitefilename").to_string(),
            Field::IsText => is_text = bool_field(rec, "_isText"),
            Field::Pages => {
                pages = rec
                    .get("_pages")
                    .filter(|p| !p.is_null())
                    .map(|p| u32::try_from(json_i64(p)).unwrap_or(0))
            }
            Field::IsLink => is_link = bool_field(rec, "_isLink"),
            Field::Url => url = str_field(rec, "_URL").to_string(),
        }
    }

    if site_filename.trim().is_empty() {
        site_filename = title.clone();
    }

    let kind = if is_text {
        EntryKind::Text
    } else if is_link {
        EntryKind::Link {
            url: if url.is_empty() { site_filename } else { url },
        }
    } else {
        EntryKind::File {
            site_filename,
            local_filename,
            size_mb,
        }
    };

    Ok(FileEntry {
        title,
        notes,
        pages,
        kind,
    })
}

fn nested(v: &Value) -> Result<Value, DecodeError> {
    match v {
        Value::String(s) => Ok(serde_json::from_str(s)?),
        other => Ok(other.clone()),
    }
}

fn object<'a>(v: &'a Value, what: &str) -> Result<&'a Map<String, Value>, DecodeError> {
    v.as_object()
        .ok_or_else(|| DecodeError::MalformedRecord(format!("{what} is not an object")))
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a Value, DecodeError> {
    obj.get(key)
        .ok_or_else(|| DecodeError::MalformedRecord(format!("missing '{key}'")))
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or("")
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(v) if v.is_number() => json_i64(v) != 0,
        _ => false,
    }
}

use super::tags::{find_region, Case};
use crate::text::{float_or_zero, hidden_version};

/// Region holding the embedded JSON of pre-2.0 pages.
pub const LEGACY_BLOCK_TAG: &str = "fanac-json";
/// Anything shorter is a leftover stub, not real data.
pub const MIN_LEGACY_BLOCK_LEN: usize = 20;
/// Assumed when the data block exists but no version marker does.
pub const FALLBACK_VERSION: f64 = 0.0;
/// Assumed when there is no usable data block.
pub const MARKUP_ERA_VERSION: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Root,
    Series,
    Instance,
}

impl DocumentKind {
    /// Versions below this ceiling are decoded from the legacy block.
    /// The root index never had one.
    pub fn legacy_ceiling(self) -> Option<f64> {
        match self {
            DocumentKind::Root => None,
            DocumentKind::Series | DocumentKind::Instance => Some(1.99),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format<'a> {
    Legacy { data: &'a str, version: f64 },
    Markup { version: f64 },
}

/// Work out which decoder a fetched page needs.
pub fn classify(text: &str, kind: DocumentKind) -> Format<'_> {
    let data = match find_region(text, LEGACY_BLOCK_TAG, Case::Insensitive) {
        (Some(data), _) if data.chars().count() >= MIN_LEGACY_BLOCK_LEN => data,
        _ => {
            return Format::Markup {
                version: MARKUP_ERA_VERSION,
            }
        }
    };

    let version = hidden_version(text)
        .map(float_or_zero)
        .unwrap_or(FALLBACK_VERSION);

    match kind.legacy_ceiling() {
        Some(ceiling) if version < ceiling => Format::Legacy { data, version },
        _ => Format::Markup { version },
    }
}

use std::sync::LazyLock;

use regex::Regex;

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|[\s"'])href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Sensitive,
    Insensitive,
}

/// The next tagged region found by [`next_region`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagged<'a> {
    /// Verbatim text before the opening marker.
    pub lead: &'a str,
    /// Tag name, lowercased.
    pub tag: String,
    pub inner: &'a str,
    /// Everything after the closing marker.
    pub rest: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor<'a> {
    pub lead: &'a str,
    /// Empty when the `<a>` carries no href attribute.
    pub href: &'a str,
    pub label: &'a str,
    pub rest: &'a str,
}

/// Find the first `<tag ...>...</tag>` region.
///
/// Returns the inner content (or `None` when there is no complete region)
/// and the text following the closing marker. When nothing is found the
/// remainder is the whole input. Matching is by tag name, not by
/// balancing: the first `</tag>` after the opening marker ends the region.
pub fn find_region<'a>(text: &'a str, tag: &str, case: Case) -> (Option<&'a str>, &'a str) {
    match locate(text, tag, case) {
        Some(span) => (Some(&text[span.inner_start..span.inner_end]), &text[span.end..]),
        None => (None, text),
    }
}

/// Find the next complete region of any tag name.
///
/// Comments, stray closing markers, self-closing tags and opening markers
/// that never get closed are stepped over and end up in `lead`.
pub fn next_region(text: &str) -> Option<Tagged<'_>> {
    Regions::new(text).next()
}

/// Successive [`next_region`] results over one buffer.
///
/// Each region's `lead` starts where the previous region ended. Tag names
/// found unclosed are remembered so later openers of the same name are
/// skipped without another search to the end of the buffer.
pub struct Regions<'a> {
    text: &'a str,
    pos: usize,
    unclosed: Vec<String>,
    transparent: Vec<String>,
}

impl<'a> Regions<'a> {
    pub fn new(text: &'a str) -> Self {
        Regions {
            text,
            pos: 0,
            unclosed: Vec::new(),
            transparent: Vec::new(),
        }
    }

    /// Treat `tag` as a wrapper rather than a region: scanning continues
    /// inside it and its closing marker is stepped over like any stray one.
    pub fn step_into(mut self, tag: &str) -> Self {
        self.transparent.push(tag.to_ascii_lowercase());
        self
    }

    fn skips(&self, name: &str) -> bool {
        self.transparent
            .iter()
            .chain(&self.unclosed)
            .any(|t| t.eq_ignore_ascii_case(name))
    }
}

impl<'a> Iterator for Regions<'a> {
    type Item = Tagged<'a>;

    fn next(&mut self) -> Option<Tagged<'a>> {
        let text = self.text;
        let bytes = text.as_bytes();
        let from = self.pos;
        let mut i = from;

        while let Some(off) = text[i..].find('<') {
            let start = i + off;
            let after = &text[start + 1..];

            if after.starts_with("!--") {
                match after.find("-->") {
                    Some(end) => i = start + 1 + end + 3,
                    None => break,
                }
                continue;
            }

            let name_len = after
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-')
                .count();
            if name_len == 0 || !bytes[start + 1].is_ascii_alphabetic() {
                // "</x>", "<!DOCTYPE>", or a bare '<' in text
                i = start + 1;
                continue;
            }

            let name = &after[..name_len];
            let Some(gt) = text[start..].find('>') else {
                break;
            };
            let open_end = start + gt + 1;
            if text[start..open_end].ends_with("/>") || self.skips(name) {
                i = open_end;
                continue;
            }

            match find_close(text, name, open_end, Case::Insensitive) {
                Some((close_start, close_end)) => {
                    self.pos = close_end;
                    return Some(Tagged {
                        lead: &text[from..start],
                        tag: name.to_ascii_lowercase(),
                        inner: &text[open_end..close_start],
                        rest: &text[close_end..],
                    });
                }
                None => {
                    self.unclosed.push(name.to_ascii_lowercase());
                    i = open_end;
                }
            }
        }

        self.pos = text.len();
        None
    }
}

/// Find the first `<a ...>label</a>` and pull out its href.
pub fn find_anchor(text: &str) -> Option<Anchor<'_>> {
    let span = locate(text, "a", Case::Insensitive)?;
    let open_tag = &text[span.start..span.inner_start];
    let href = HREF_RE
        .captures(open_tag)
        .and_then(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().trim())
        .unwrap_or("");

    Some(Anchor {
        lead: &text[..span.start],
        href,
        label: text[span.inner_start..span.inner_end].trim(),
        rest: &text[span.end..],
    })
}

struct Span {
    start: usize,
    inner_start: usize,
    inner_end: usize,
    end: usize,
}

fn locate(text: &str, tag: &str, case: Case) -> Option<Span> {
    let needle = format!("<{tag}");
    let mut from = 0;
    loop {
        let start = from + find_from(&text[from..], &needle, case)?;
        let marker_end = start + 1 + tag.len();
        match text.as_bytes().get(marker_end) {
            Some(b) if *b == b'>' || *b == b'/' || b.is_ascii_whitespace() => {}
            // "<abbr" is not "<a"
            _ => {
                from = marker_end;
                continue;
            }
        }
        let inner_start = start + text[start..].find('>')? + 1;
        let (inner_end, end) = find_close(text, tag, inner_start, case)?;
        return Some(Span {
            start,
            inner_start,
            inner_end,
            end,
        });
    }
}

/// Locate `</tag>` (whitespace allowed before the '>') at or after `from`.
fn find_close(text: &str, tag: &str, from: usize, case: Case) -> Option<(usize, usize)> {
    let needle = format!("</{tag}");
    let mut at = from;
    loop {
        let start = at + find_from(&text[at..], &needle, case)?;
        let tail = &text[start + needle.len()..];
        let pad = tail.len() - tail.trim_start().len();
        if tail[pad..].starts_with('>') {
            return Some((start, start + needle.len() + pad + 1));
        }
        at = start + needle.len();
    }
}

fn find_from(hay: &str, needle: &str, case: Case) -> Option<usize> {
    match case {
        Case::Sensitive => hay.find(needle),
        // Tag needles are ASCII, so a match always starts on a char boundary
        Case::Insensitive => {
            let needle = needle.as_bytes();
            if needle.is_empty() {
                return Some(0);
            }
            hay.as_bytes()
                .windows(needle.len())
                .position(|w| w.eq_ignore_ascii_case(needle))
        }
    }
}

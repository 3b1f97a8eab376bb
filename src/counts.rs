use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::Serialize;

/// Additive tallies for one node of the series tree.
///
/// Addition is field-wise over the tallies. `title` is a label for
/// reporting only: the left operand keeps its own and the right operand's
/// is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub pdfs: u64,
    pub pages: u64,
    pub images: u64,
    pub links: u64,
    pub cons: u64,
    pub series: u64,
}

impl Counts {
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// True when every tally is zero.
    pub fn is_zero(&self) -> bool {
        self.pdfs == 0
            && self.pages == 0
            && self.images == 0
            && self.links == 0
            && self.cons == 0
            && self.series == 0
    }

    /// One-line form, e.g. `** Boskone:   #pages=19  #PDFs=3  ...`.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            s.push_str(&format!("** {}: ", title));
        }
        s.push_str(&format!(
            "  #pages={}  #PDFs={}  #images={}  #links={}",
            self.pages, self.pdfs, self.images, self.links
        ));
        if self.cons > 0 {
            s.push_str(&format!("  #cons={}", self.cons));
        }
        if self.series > 0 {
            s.push_str(&format!("  #series={}", self.series));
        }
        s
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(mut self, rhs: Counts) -> Counts {
        self += rhs;
        self
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Counts) {
        self.pdfs += rhs.pdfs;
        self.pages += rhs.pages;
        self.images += rhs.images;
        self.links += rhs.links;
        self.cons += rhs.cons;
        self.series += rhs.series;
    }
}

impl Sum for Counts {
    fn sum<I: Iterator<Item = Counts>>(iter: I) -> Counts {
        iter.fold(Counts::default(), Add::add)
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            writeln!(f, "** {} **", title)?;
        }
        writeln!(f, "#pages={}", self.pages)?;
        writeln!(f, "#PDFs={}", self.pdfs)?;
        writeln!(f, "#images={}", self.images)?;
        writeln!(f, "#links={}", self.links)?;
        if self.cons > 0 {
            writeln!(f, "#cons={}", self.cons)?;
        }
        if self.series > 0 {
            writeln!(f, "#series={}", self.series)?;
        }
        Ok(())
    }
}

//! Bottom-up counting over root index → series → instances → files.
//!
//! Every node is fetched and decoded on its own and folded into its parent
//! with [`Counts`] addition. A node that fails to fetch or decode
//! contributes nothing; the failure is carried alongside the partial total
//! and its siblings are still counted.

use std::iter::Sum;
use std::ops::Add;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::counts::Counts;
use crate::error::{DecodeError, NodeError};
use crate::fetch::Fetch;
use crate::model::{FileEntry, InstanceRef, SeriesRef};
use crate::parser;

pub const DEFAULT_INDEX_NAME: &str = "index.html";
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "gif", "png"];

/// A (possibly partial) total plus the nodes that could not be counted.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub counts: Counts,
    pub failures: Vec<NodeError>,
}

impl Aggregate {
    fn failed(error: NodeError) -> Self {
        Aggregate {
            counts: Counts::default(),
            failures: vec![error],
        }
    }

    fn titled(mut self, title: &str) -> Self {
        self.counts.title = Some(title.to_string());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Add for Aggregate {
    type Output = Aggregate;

    fn add(mut self, rhs: Aggregate) -> Aggregate {
        self.counts += rhs.counts;
        self.failures.extend(rhs.failures);
        self
    }
}

impl Sum for Aggregate {
    fn sum<I: Iterator<Item = Aggregate>>(iter: I) -> Aggregate {
        iter.fold(Aggregate::default(), Add::add)
    }
}

/// Per-series totals for a whole run, in listing order.
#[derive(Debug, Default)]
pub struct Report {
    pub series: Vec<Counts>,
    pub total: Aggregate,
}

/// What one file entry adds to its instance's total.
///
/// Text rows and pure-annotation rows add nothing.
pub fn entry_counts(entry: &FileEntry) -> Counts {
    let mut counts = Counts::default();
    if entry.is_text() || entry.is_empty() {
        return counts;
    }

    match extension(entry.site_filename()).as_deref() {
        Some("pdf") => counts.pdfs = 1,
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => counts.images = 1,
        _ => {}
    }
    if entry.is_link() {
        counts.links = 1;
    }
    if let Some(pages) = entry.pages {
        counts.pages = u64::from(pages);
    }
    counts
}

/// Lowercased extension, ignoring any query string or fragment.
fn extension(site_filename: &str) -> Option<String> {
    let bare = site_filename.split(['?', '#']).next().unwrap_or("");
    Path::new(bare)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

pub fn series_path(series: &str) -> String {
    format!("/{}", series)
}

pub fn instance_path(series: &str, instance: &str) -> String {
    format!("/{}/{}", series, instance)
}

pub struct Aggregator<F> {
    fetcher: F,
    index_name: String,
    parallel: bool,
}

impl<F: Fetch> Aggregator<F> {
    pub fn new(fetcher: F) -> Self {
        Aggregator {
            fetcher,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            parallel: true,
        }
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    /// Visit siblings one at a time instead of on the rayon pool.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    // ── Raw entity lists ──

    pub fn root_entries(&self) -> Result<Vec<SeriesRef>, NodeError> {
        self.load("", parser::decode_root)
    }

    pub fn series_entries(&self, series: &str) -> Result<Vec<InstanceRef>, NodeError> {
        self.load(&series_path(series), parser::decode_series)
    }

    pub fn instance_entries(&self, series: &str, instance: &str) -> Result<Vec<FileEntry>, NodeError> {
        self.load(&instance_path(series, instance), parser::decode_instance)
    }

    // ── Totals ──

    /// Sum of one instance's file entries. Conventions are counted by the
    /// series, not here.
    pub fn decode_instance(&self, series: &str, instance: &str) -> Aggregate {
        match self.instance_entries(series, instance) {
            Ok(entries) => {
                let counts: Counts = entries.iter().map(entry_counts).sum();
                debug!(series, instance, counts = %counts.summary(), "instance counted");
                Aggregate {
                    counts: counts.titled(instance),
                    failures: Vec::new(),
                }
            }
            Err(e) => {
                warn!(series, instance, error = %e, "instance not counted");
                Aggregate::failed(e).titled(instance)
            }
        }
    }

    /// Totals for one series: its published instances, one convention
    /// each, plus one series.
    pub fn decode_series(&self, series: &str) -> Aggregate {
        let instances = match self.series_entries(series) {
            Ok(instances) => instances,
            Err(e) => {
                warn!(series, error = %e, "series not counted");
                return Aggregate::failed(e).titled(series);
            }
        };
        let published: Vec<&InstanceRef> = instances.iter().filter(|i| i.is_published()).collect();
        info!(series, listed = instances.len(), published = published.len(), "series page decoded");

        let parts = self.map_nodes(&published, |instance| {
            let mut part = self.decode_instance(series, &instance.name);
            if part.is_complete() {
                part.counts.cons = 1;
            }
            part
        });

        let mut total: Aggregate = parts.into_iter().sum();
        total.counts.series += 1;
        total.counts.title = Some(series.to_string());
        total
    }

    /// Walk the whole root index.
    pub fn decode_root(&self) -> Report {
        match self.root_entries() {
            Ok(series) => self.decode_series_list(&series, |_| {}),
            Err(e) => {
                warn!(error = %e, "root index not counted");
                Report {
                    series: Vec::new(),
                    total: Aggregate::failed(e),
                }
            }
        }
    }

    /// Count the published series in `series`; `on_done` sees each series
    /// total as it completes.
    pub fn decode_series_list<C>(&self, series: &[SeriesRef], on_done: C) -> Report
    where
        C: Fn(&Counts) + Sync + Send,
    {
        let published: Vec<&SeriesRef> = series.iter().filter(|s| s.is_published()).collect();
        let parts = self.map_nodes(&published, |s| {
            let part = self.decode_series(&s.name);
            on_done(&part.counts);
            part
        });

        let mut report = Report::default();
        for part in parts {
            report.series.push(part.counts.clone());
            report.total = report.total + part;
        }
        report.total.counts.title = Some("Grand Total".to_string());
        report
    }

    fn map_nodes<T, R, M>(&self, items: &[T], f: M) -> Vec<R>
    where
        T: Sync,
        R: Send,
        M: Fn(&T) -> R + Sync + Send,
    {
        if self.parallel {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }

    fn load<T: Default>(
        &self,
        path: &str,
        decode: impl FnOnce(&str) -> Result<T, DecodeError>,
    ) -> Result<T, NodeError> {
        match self.fetcher.fetch(path, &self.index_name) {
            Ok(Some(text)) => decode(&text).map_err(|e| NodeError::new(path, e)),
            Ok(None) => {
                info!(path, name = %self.index_name, "document does not exist");
                Ok(T::default())
            }
            Err(e) => Err(NodeError::new(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn site() -> MemoryFetcher {
        MemoryFetcher::new()
            .with("", "index.html", fixture("root"))
            .with("/Boskone", "index.html", fixture("series"))
            .with("/Boskone/Boskone 1", "index.html", fixture("instance"))
            .with("/Natcon", "index.html", fixture("legacy_series"))
            .with("/Natcon/Natcon 1", "index.html", fixture("legacy_instance"))
    }

    fn counts(pdfs: u64, pages: u64, images: u64, links: u64, cons: u64, series: u64) -> Counts {
        Counts {
            title: None,
            pdfs,
            pages,
            images,
            links,
            cons,
            series,
        }
    }

    fn untitled(mut c: Counts) -> Counts {
        c.title = None;
        c
    }

    #[test]
    fn pdf_row_contribution() {
        let mut e = FileEntry::file("Title", "foo/bar.pdf", 2.5);
        e.pages = Some(12);
        assert_eq!(entry_counts(&e), counts(1, 12, 0, 0, 0, 0));
    }

    #[test]
    fn link_row_contribution() {
        let e = FileEntry::link("Elsewhere", "http://external.example/page");
        assert_eq!(entry_counts(&e), counts(0, 0, 0, 1, 0, 0));
    }

    #[test]
    fn image_and_text_rows() {
        assert_eq!(entry_counts(&FileEntry::file("f", "Flyer.JPEG", 0.0)).images, 1);
        assert!(entry_counts(&FileEntry::text("Publications")).is_zero());
        let mut empty = FileEntry::file("", "", 0.0);
        empty.notes = "just a note".into();
        assert!(entry_counts(&empty).is_zero());
    }

    #[test]
    fn extension_ignores_query() {
        assert_eq!(extension("PR1.pdf?zoom=50").as_deref(), Some("pdf"));
        assert_eq!(extension("a.PDF#page=2").as_deref(), Some("pdf"));
        assert_eq!(extension("http://external.example/page"), None);
    }

    #[test]
    fn markup_instance_totals() {
        let agg = Aggregator::new(site()).decode_instance("Boskone", "Boskone 1");
        assert!(agg.is_complete());
        assert_eq!(untitled(agg.counts), counts(3, 19, 1, 1, 0, 0));
    }

    #[test]
    fn legacy_instance_totals() {
        let agg = Aggregator::new(site()).decode_instance("Natcon", "Natcon 1");
        assert_eq!(untitled(agg.counts), counts(1, 24, 1, 1, 0, 0));
    }

    #[test]
    fn missing_instance_is_empty_not_error() {
        let agg = Aggregator::new(site()).decode_instance("Boskone", "Boskone 2");
        assert!(agg.is_complete());
        assert!(agg.counts.is_zero());
    }

    #[test]
    fn unpublished_instance_is_skipped() {
        let series = r#"<html><body><fanac-table><table>
<thead><tr><th>Convention</th></tr></thead>
<tr><td><a href="/path">Con1</a></td></tr>
<tr><td>Con2</td></tr>
</table></fanac-table></body></html>"#;
        let instance = r#"<body><fanac-table><li><a href="pb.pdf">PB</a></li></fanac-table></body>"#;
        let fetcher = MemoryFetcher::new()
            .with("/S", "index.html", series)
            .with("/S/Con1", "index.html", instance);
        let agg = Aggregator::new(fetcher).decode_series("S");
        assert_eq!(untitled(agg.counts), counts(1, 0, 0, 0, 1, 1));
    }

    #[test]
    fn series_totals() {
        let agg = Aggregator::new(site()).decode_series("Boskone");
        assert!(agg.is_complete());
        assert_eq!(agg.counts.title.as_deref(), Some("Boskone"));
        // Boskone 2 has no page yet; Boskone 3 is unpublished
        assert_eq!(untitled(agg.counts), counts(3, 19, 1, 1, 2, 1));
    }

    #[test]
    fn root_totals() {
        let report = Aggregator::new(site()).decode_root();
        assert!(report.total.is_complete());
        assert_eq!(report.series.len(), 2);
        assert_eq!(untitled(report.series[1].clone()), counts(1, 24, 1, 1, 1, 1));
        assert_eq!(untitled(report.total.counts), counts(4, 43, 2, 2, 3, 2));
    }

    #[test]
    fn traversal_order_does_not_matter() {
        let parallel = Aggregator::new(site()).decode_root();
        let sequential = Aggregator::new(site()).sequential().decode_root();
        assert_eq!(parallel.total.counts, sequential.total.counts);
        assert_eq!(parallel.series, sequential.series);
    }

    #[test]
    fn failing_node_keeps_partial_total() {
        let fetcher = site().with("/Boskone/Boskone 2", "index.html", "<html>no body here</html>");
        let agg = Aggregator::new(fetcher).sequential().decode_series("Boskone");
        assert_eq!(agg.failures.len(), 1);
        assert_eq!(agg.failures[0].path, "/Boskone/Boskone 2");
        assert_eq!(agg.counts.title.as_deref(), Some("Boskone"));
        // Boskone 1 still counted, the broken instance is not a convention
        assert_eq!(untitled(agg.counts), counts(3, 19, 1, 1, 1, 1));
    }

    #[test]
    fn failing_series_does_not_stop_root() {
        let fetcher = site().with("/Natcon", "index.html", "<fanac-json>{\"ver\": 3, broken json</fanac-json>");
        let report = Aggregator::new(fetcher).decode_root();
        assert_eq!(report.total.failures.len(), 1);
        assert_eq!(report.total.failures[0].path, "/Natcon");
        // the report line for the broken series still carries its name
        assert_eq!(report.series[1].title.as_deref(), Some("Natcon"));
        assert!(report.series[1].is_zero());
        assert_eq!(report.total.counts.title.as_deref(), Some("Grand Total"));
        assert_eq!(untitled(report.total.counts), counts(3, 19, 1, 1, 2, 1));
    }

    #[test]
    fn progress_callback_sees_every_series() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let agg = Aggregator::new(site());
        let series = agg.root_entries().unwrap();
        let seen = AtomicUsize::new(0);
        agg.decode_series_list(&series, |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}

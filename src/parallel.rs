//! Multi-threaded page parsing.
//!
//! A reader thread splits pages off the input, worker threads parse them, and
//! the calling thread writes results. Results carry their input position and
//! are written back in that order.

use crate::dump::{self, RawPage};
use crate::{write_result, Stats};

use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::io::{BufRead, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use wikipage::{LinkPolicy, WikipediaPage};

/// Configuration for parallel processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of parsing threads
    pub num_workers: usize,
    /// Bound of the page and result channels
    pub channel_buffer: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        let cpus = thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4);
        // One core stays with the reader and writer
        Self {
            num_workers: cpus.saturating_sub(1).max(1),
            channel_buffer: 10000,
        }
    }
}

/// Which pages get written.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageFilter {
    pub all_namespaces: bool,
    pub skip_redirects: bool,
}

/// Result of page processing
#[derive(Debug, Default)]
pub struct ProcessedPage {
    pub seq: usize,
    /// Serialized summary, absent when the page was filtered out or unreadable.
    pub json: Option<String>,
    pub was_redirect: bool,
    pub was_non_article: bool,
    pub was_invalid: bool,
    pub has_infobox: bool,
}

/// Parse one page element into its output line.
pub fn process_page_xml(
    page_xml: &str,
    seq: usize,
    policy: &Arc<LinkPolicy>,
    filter: PageFilter,
) -> ProcessedPage {
    // Extract title, namespace, id and text
    match dump::parse_page_xml(page_xml, seq) {
        Some(raw) => process_raw_page(raw, policy, filter),
        None => {
            log::warn!("page #{} has no title, skipping", seq);
            ProcessedPage {
                seq,
                was_invalid: true,
                ..Default::default()
            }
        }
    }
}

pub fn process_raw_page(raw: RawPage, policy: &Arc<LinkPolicy>, filter: PageFilter) -> ProcessedPage {
    let mut result = ProcessedPage {
        seq: raw.seq,
        ..Default::default()
    };

    // Check namespace
    if raw.namespace_id != 0 && !filter.all_namespaces {
        result.was_non_article = true;
        return result;
    }

    // Blank titles are rejected here
    let page = match WikipediaPage::with_policy(
        raw.page_id,
        raw.namespace_id,
        raw.title,
        raw.text,
        Arc::clone(policy),
    ) {
        Ok(page) => page,
        Err(e) => {
            log::warn!("page #{}: {}", raw.seq, e);
            result.was_invalid = true;
            return result;
        }
    };

    // Check for redirects
    result.was_redirect = page.is_redirect();
    if result.was_redirect && filter.skip_redirects {
        return result;
    }
    result.has_infobox = !page.infoboxes().is_empty();

    // Serialize the summary
    match serde_json::to_string(&page.summary()) {
        Ok(json) => result.json = Some(json),
        Err(e) => {
            log::warn!("page {} ({:?}) could not be serialized: {}", page.page_id(), page.title(), e);
            result.was_invalid = true;
        }
    }
    result
}

/// Producer thread reads XML, worker threads parse pages, the calling thread
/// writes. Output order matches input order.
pub fn process_channel_pipeline<W: Write>(
    reader: impl BufRead + Send + 'static,
    writer: W,
    config: &ParallelConfig,
    policy: Arc<LinkPolicy>,
    filter: PageFilter,
    limit: Option<usize>,
    progress: &ProgressBar,
) -> std::io::Result<Stats> {
    // Pages travel as (seq, xml) so the writer can restore input order
    let (page_tx, page_rx): (SyncSender<(usize, String)>, Receiver<(usize, String)>) =
        sync_channel(config.channel_buffer);
    let (result_tx, result_rx): (SyncSender<ProcessedPage>, Receiver<ProcessedPage>) =
        sync_channel(config.channel_buffer);

    let limit_reached = Arc::new(AtomicBool::new(false));
    let start_time = Instant::now();

    // Spawn reader thread
    let reader_limit_flag = Arc::clone(&limit_reached);
    let reader_handle = thread::spawn(move || read_pages_to_channel(reader, page_tx, &reader_limit_flag));

    // Spawn worker threads sharing one receiver
    let page_rx = Arc::new(Mutex::new(page_rx));
    let worker_handles: Vec<JoinHandle<()>> = (0..config.num_workers)
        .map(|_| {
            let rx = Arc::clone(&page_rx);
            let tx = result_tx.clone();
            let limit_flag = Arc::clone(&limit_reached);
            let policy = Arc::clone(&policy);
            thread::spawn(move || process_pages_worker(rx, tx, &limit_flag, &policy, filter))
        })
        .collect();

    // Only workers hold the channel ends from here on: the reader sees a
    // closed channel once they are gone, the writer once they are done.
    drop(page_rx);
    drop(result_tx);

    // Writer in main thread
    let write_outcome = write_results_sorted(result_rx, writer, limit, &limit_reached, progress);

    // Unblock the reader and workers whatever happened to the writer.
    limit_reached.store(true, Ordering::SeqCst);
    // Wait for threads
    match reader_handle.join() {
        Ok(Err(e)) => return Err(e),
        Ok(Ok(pages)) => log::debug!("reader thread finished after {} pages", pages),
        Err(_) => log::error!("reader thread panicked"),
    }
    for handle in worker_handles {
        if handle.join().is_err() {
            log::error!("worker thread panicked");
        }
    }

    let mut stats = write_outcome?;
    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

fn read_pages_to_channel(
    reader: impl BufRead,
    tx: SyncSender<(usize, String)>,
    limit_reached: &AtomicBool,
) -> std::io::Result<usize> {
    let mut seq: usize = 0;
    dump::scan_pages(reader, |page_xml| {
        if limit_reached.load(Ordering::Relaxed) {
            return false;
        }
        if tx.send((seq, page_xml)).is_err() {
            return false;
        }
        seq += 1;
        true
    })?;
    Ok(seq)
}

fn process_pages_worker(
    rx: Arc<Mutex<Receiver<(usize, String)>>>,
    tx: SyncSender<ProcessedPage>,
    limit_reached: &AtomicBool,
    policy: &Arc<LinkPolicy>,
    filter: PageFilter,
) {
    loop {
        if limit_reached.load(Ordering::Relaxed) {
            break;
        }

        // Try to get next page from shared receiver
        let item = {
            let lock = rx.lock().ok();
            lock.and_then(|guard| guard.recv().ok())
        };

        match item {
            Some((seq, xml)) => {
                let result = process_page_xml(&xml, seq, policy, filter);
                // Writer is gone once the limit is reached
                if tx.send(result).is_err() {
                    break;
                }
            }
            None => break,
        }
    }
}

/// Write results in input order using a streaming reorder buffer.
///
/// In-order results are written immediately; early arrivals wait in a
/// BTreeMap until their predecessors are out.
fn write_results_sorted<W: Write>(
    rx: Receiver<ProcessedPage>,
    writer: W,
    limit: Option<usize>,
    limit_reached: &AtomicBool,
    progress: &ProgressBar,
) -> std::io::Result<Stats> {
    let mut writer = BufWriter::with_capacity(256 * 1024, writer);
    let mut stats = Stats::default();
    // Reorder buffer: results that arrived before their turn
    let mut pending: BTreeMap<usize, ProcessedPage> = BTreeMap::new();
    // Next seq we're waiting to write
    let mut next_expected: usize = 0;

    for result in rx {
        if result.seq != next_expected {
            // Out of order - buffer it
            pending.insert(result.seq, result);
            continue;
        }

        if write_result(result, &mut stats, &mut writer, limit, progress)? {
            limit_reached.store(true, Ordering::SeqCst);
            writer.flush()?;
            return Ok(stats);
        }
        next_expected += 1;

        // Drain buffered results that are now ready
        while let Some(buffered) = pending.remove(&next_expected) {
            if write_result(buffered, &mut stats, &mut writer, limit, progress)? {
                limit_reached.store(true, Ordering::SeqCst);
                writer.flush()?;
                return Ok(stats);
            }
            next_expected += 1;
        }
    }

    if !pending.is_empty() {
        log::warn!("{} results arrived after a gap in the sequence", pending.len());
        for (_, result) in std::mem::take(&mut pending) {
            if write_result(result, &mut stats, &mut writer, limit, progress)? {
                break;
            }
        }
    }

    writer.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn page_xml(id: usize, ns: i32, title: &str, text: &str) -> String {
        format!(
            "<page><title>{}</title><ns>{}</ns><id>{}</id><revision><id>1</id>\
             <text xml:space=\"preserve\">{}</text></revision></page>\n",
            title, ns, id, text
        )
    }

    fn export(pages: &[String]) -> String {
        format!("<mediawiki>\n{}</mediawiki>\n", pages.concat())
    }

    fn run(input: String, filter: PageFilter, limit: Option<usize>) -> (Stats, Vec<serde_json::Value>) {
        let mut output = Vec::new();
        let config = ParallelConfig {
            num_workers: 3,
            channel_buffer: 4,
        };
        let stats = process_channel_pipeline(
            Cursor::new(input.into_bytes()),
            &mut output,
            &config,
            Arc::new(LinkPolicy::default()),
            filter,
            limit,
            &ProgressBar::hidden(),
        )
        .unwrap();
        let lines = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (stats, lines)
    }

    #[test]
    fn output_preserves_input_order() {
        let pages: Vec<String> = (0..50)
            .map(|i| page_xml(i + 1, 0, &format!("Page {}", i), "[[Elbe]] {{Infobox river|name=Elbe}}"))
            .collect();
        let (stats, lines) = run(export(&pages), PageFilter::default(), None);

        assert_eq!(stats.pages_processed, 50);
        assert_eq!(stats.pages_written, 50);
        assert_eq!(stats.with_infobox, 50);
        let ids: Vec<u64> = lines.iter().map(|l| l["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, (1..=50).collect::<Vec<u64>>());
    }

    #[test]
    fn filters_namespaces_and_redirects() {
        let pages = vec![
            page_xml(1, 0, "Dresden", "'''Dresden''' [[Category:Cities in Saxony]]"),
            page_xml(2, 14, "Category:Cities in Saxony", "[[Category:Saxony]]"),
            page_xml(3, 0, "Dresda", "#REDIRECT [[Dresden]]"),
        ];
        let filter = PageFilter {
            all_namespaces: false,
            skip_redirects: true,
        };
        let (stats, lines) = run(export(&pages), filter, None);

        assert_eq!(stats.pages_processed, 3);
        assert_eq!(stats.non_article, 1);
        assert_eq!(stats.redirects, 1);
        assert_eq!(stats.pages_written, 1);
        assert_eq!(lines[0]["title"], "Dresden");
        assert_eq!(lines[0]["categories"], serde_json::json!(["Cities in Saxony"]));
    }

    #[test]
    fn redirects_are_written_unless_skipped() {
        let pages = vec![page_xml(3, 0, "Dresda", "#REDIRECT [[Dresden]]")];
        let (stats, lines) = run(export(&pages), PageFilter::default(), None);
        assert_eq!(stats.redirects, 1);
        assert_eq!(lines[0]["redirect"], "Dresden");
    }

    #[test]
    fn limit_stops_writing() {
        let pages: Vec<String> = (0..20).map(|i| page_xml(i + 1, 0, &format!("P{}", i), "text")).collect();
        let (stats, lines) = run(export(&pages), PageFilter::default(), Some(5));
        assert_eq!(stats.pages_written, 5);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4]["id"], 5);
    }

    #[test]
    fn blank_title_is_counted_invalid() {
        let result = process_page_xml(
            "<page><title> </title><ns>0</ns><id>1</id></page>",
            0,
            &Arc::new(LinkPolicy::default()),
            PageFilter::default(),
        );
        assert!(result.was_invalid);
        assert!(result.json.is_none());
    }
}

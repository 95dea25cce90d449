use bzip2::read::BzDecoder;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wikipage::LinkPolicy;

mod dump;
mod parallel;
use parallel::{process_channel_pipeline, process_page_xml, PageFilter, ParallelConfig, ProcessedPage};

/// Processing strategy for parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// One thread reads, parses and writes
    Sequential,
    /// Reader thread, parser pool, ordered writer
    ChannelPipeline,
}

#[derive(Parser)]
#[command(name = "wikipage")]
#[command(about = "Parse a MediaWiki XML export into one JSON summary per page")]
struct Args {
    /// Input XML file (.xml or .xml.bz2)
    input: PathBuf,

    /// Output JSONL file
    output: PathBuf,

    /// Processing strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::ChannelPipeline)]
    strategy: Strategy,

    /// Number of threads (0 = auto-detect)
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Channel buffer size for channel-pipeline strategy
    #[arg(long, default_value_t = 10000)]
    channel_buffer: usize,

    /// Stop after writing this many pages
    #[arg(long)]
    limit: Option<usize>,

    /// Keep pages outside the article namespace
    #[arg(long)]
    all_namespaces: bool,

    /// Leave redirect pages out of the output
    #[arg(long)]
    skip_redirects: bool,

    /// Link policy YAML (default: built-in category/file/image namespaces)
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Default)]
pub struct Stats {
    pub pages_processed: usize,
    pub pages_written: usize,
    pub redirects: usize,
    pub non_article: usize,
    pub with_infobox: usize,
    pub invalid: usize,
    pub elapsed: Duration,
}

fn open_input(path: &Path) -> std::io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead + Send> = if path.to_string_lossy().ends_with(".bz2") {
        Box::new(BufReader::with_capacity(256 * 1024, BzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(256 * 1024, file))
    };
    Ok(reader)
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} [{elapsed}] {pos} pages ({per_sec}) {msg}") {
        pb.set_style(style);
    }
    pb
}

/// Account for one processed page and write its line, if it has one.
///
/// Returns `true` once `limit` pages have been written.
pub fn write_result(
    result: ProcessedPage,
    stats: &mut Stats,
    writer: &mut impl Write,
    limit: Option<usize>,
    progress: &ProgressBar,
) -> std::io::Result<bool> {
    stats.pages_processed += 1;
    progress.inc(1);

    // Skipped pages still count towards the report
    if result.was_redirect {
        stats.redirects += 1;
    }
    if result.was_non_article {
        stats.non_article += 1;
    }
    if result.was_invalid {
        stats.invalid += 1;
    }

    // Write one JSON line per kept page
    if let Some(json) = result.json {
        writeln!(writer, "{}", json)?;
        stats.pages_written += 1;
        if result.has_infobox {
            stats.with_infobox += 1;
        }
        if stats.pages_written % 1000 == 0 {
            progress.set_message(format!("| written: {}", stats.pages_written));
        }
    }

    Ok(limit.is_some_and(|l| stats.pages_written >= l))
}

fn run_sequential(
    reader: impl BufRead,
    writer: impl Write,
    policy: &Arc<LinkPolicy>,
    filter: PageFilter,
    limit: Option<usize>,
    progress: &ProgressBar,
) -> std::io::Result<Stats> {
    let start_time = Instant::now();
    let mut stats = Stats::default();
    let mut writer = BufWriter::with_capacity(256 * 1024, writer);
    let mut seq = 0;
    // scan_pages only speaks io::Result for reading; write failures are
    // carried out of the callback here
    let mut write_error = None;

    dump::scan_pages(reader, |page_xml| {
        let result = process_page_xml(&page_xml, seq, policy, filter);
        seq += 1;
        match write_result(result, &mut stats, &mut writer, limit, progress) {
            Ok(limit_reached) => !limit_reached,
            Err(e) => {
                write_error = Some(e);
                false
            }
        }
    })?;

    if let Some(e) = write_error {
        return Err(e);
    }
    writer.flush()?;

    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

fn print_stats(stats: &Stats, strategy_name: &str) {
    println!();
    println!("============================================================");
    println!("Strategy: {}", strategy_name);
    println!("Pages processed: {}", stats.pages_processed);
    println!("Pages written: {}", stats.pages_written);
    println!("With infobox: {}", stats.with_infobox);
    println!("------------------------------------------------------------");
    println!("Redirects: {}", stats.redirects);
    println!("Non-article pages: {}", stats.non_article);
    println!("Invalid: {}", stats.invalid);
    println!("Time: {}m {}s", stats.elapsed.as_secs() / 60, stats.elapsed.as_secs() % 60);
    println!(
        "Rate: {:.0} pages/sec",
        stats.pages_processed as f64 / stats.elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!("============================================================");
}

fn main() -> std::io::Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Load link policy, falling back to the built-in namespaces
    let policy = match &args.policy {
        Some(path) => match LinkPolicy::load(path) {
            Ok(policy) => policy,
            Err(e) => {
                eprintln!("Error loading link policy: {}", e);
                std::process::exit(1);
            }
        },
        None => LinkPolicy::default(),
    };
    let policy = Arc::new(policy);

    let filter = PageFilter {
        all_namespaces: args.all_namespaces,
        skip_redirects: args.skip_redirects,
    };

    // Build parallel config
    let mut config = ParallelConfig::default();
    if args.threads > 0 {
        config.num_workers = args.threads;
    }
    config.channel_buffer = args.channel_buffer.max(1);

    if !args.quiet {
        println!("Parsing: {}", args.input.display());
        println!("Output: {}", args.output.display());
        println!("Strategy: {:?}", args.strategy);
        if args.strategy != Strategy::Sequential {
            println!("Workers: {}", config.num_workers);
        }
        if let Some(limit) = args.limit {
            println!("Limit: {} pages", limit);
        }
        println!();
    }

    let reader = open_input(&args.input)?;
    let output = File::create(&args.output)?;
    let progress = progress_bar(args.quiet);

    // Run the selected strategy
    let stats = match args.strategy {
        Strategy::Sequential => run_sequential(reader, output, &policy, filter, args.limit, &progress)?,
        Strategy::ChannelPipeline => {
            process_channel_pipeline(reader, output, &config, policy, filter, args.limit, &progress)?
        }
    };
    progress.finish_and_clear();

    if !args.quiet {
        print_stats(&stats, &format!("{:?}", args.strategy));
    }

    Ok(())
}

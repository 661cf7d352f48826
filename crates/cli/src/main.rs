use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use folio_core::fetch::EPUB_SUFFIX;
use folio_core::metadata::TITLE_SELECTOR;
use folio_core::{Article, Converter};
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

mod echo;

use echo::{
    format_size, print_banner, print_detail, print_info, print_step, print_success, print_timing_summary,
    print_warning,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convert a LinuxFr.org article and its comments into an EPUB book
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author = "Folio Contributors")]
#[command(version)]
#[command(about = "Convert a LinuxFr.org article and its comments into an EPUB book", long_about = None)]
struct Args {
    /// Article URL, path on the site (e.g. /news/slug) or local HTML file
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (default: <slug>.epub)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Host articles and images are fetched from
    #[arg(short = 'H', long, value_name = "HOST")]
    host: Option<String>,

    /// Scheme used to reach the host
    #[arg(long, value_name = "SCHEME")]
    scheme: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Where the article comes from.
#[derive(Debug, PartialEq, Eq)]
enum Source {
    /// Path on the source site, ending in `.epub`.
    Remote(String),
    File(PathBuf),
}

/// Scheme and host implied by a URL input.
type Origin = Option<(String, String)>;

fn resolve_input(input: &str) -> anyhow::Result<(Source, Origin)> {
    if input.starts_with("http://") || input.starts_with("https://") {
        let url = Url::parse(input).with_context(|| format!("Invalid URL: {}", input))?;
        let host = url.host_str().with_context(|| format!("URL has no host: {}", input))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Ok((Source::Remote(request_path(url.path())), Some((url.scheme().to_string(), host))))
    } else if input.starts_with('/') && !Path::new(input).exists() {
        Ok((Source::Remote(request_path(input)), None))
    } else {
        Ok((Source::File(PathBuf::from(input)), None))
    }
}

/// Normalizes a site path to the form content requests use.
fn request_path(path: &str) -> String {
    if path.ends_with(EPUB_SUFFIX) {
        return path.to_string();
    }
    format!("{}{}", path.trim_end_matches('/'), EPUB_SUFFIX)
}

fn default_output(identifier: &str) -> PathBuf {
    let name = identifier.rsplit('/').next().filter(|name| *name != EPUB_SUFFIX && !name.is_empty());
    PathBuf::from(name.unwrap_or("article.epub"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "folio_core=debug" } else { "folio_core=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let start = Instant::now();
    let mut timings = Vec::new();
    let (source, origin) = resolve_input(&args.input)?;

    let mut builder = Converter::builder().timeout(args.timeout);
    if let Some((scheme, host)) = origin {
        builder = builder.scheme(scheme).host(host);
    }
    if let Some(host) = &args.host {
        builder = builder.host(host);
    }
    if let Some(scheme) = &args.scheme {
        builder = builder.scheme(scheme);
    }
    if let Some(user_agent) = &args.user_agent {
        builder = builder.user_agent(user_agent);
    }
    let converter = builder.build().context("Failed to build HTTP client")?;

    let step = Instant::now();
    let (article, identifier) = match source {
        Source::Remote(path) => {
            let url = converter
                .upstream_url(&path)
                .with_context(|| format!("Not an article path: {}", path))?;
            if args.verbose {
                print_step(1, 3, &format!("Fetching {}", url.bright_white().underline()));
            }
            let article = converter.fetch(&url).await.with_context(|| format!("Failed to fetch {}", url))?;
            (article, path)
        }
        Source::File(path) => {
            if args.verbose {
                print_step(1, 3, &format!("Reading from file {}", path.display().bright_white()));
            }
            let html =
                fs::read_to_string(&path).with_context(|| format!("Failed to read file: {}", path.display()))?;
            let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("article");
            let article = Article::parse(&html, path.display().to_string())
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            (article, format!("/{}{}", stem, EPUB_SUFFIX))
        }
    };
    timings.push(("Fetch", step.elapsed()));

    if args.verbose {
        if let Some(title) = article.node().first_text(TITLE_SELECTOR) {
            print_detail("Title", &title);
        }
        print_detail("Comment threads", &article.comment_threads().len().to_string());
        eprintln!();
        print_step(2, 3, "Packaging article, comments and images");
    }

    let step = Instant::now();
    let epub = converter
        .package(&article, &identifier, CancellationToken::new())
        .await
        .context("Failed to package article")?;
    timings.push(("Package", step.elapsed()));

    if args.verbose {
        print_detail("Identifier", &identifier);
        print_detail("Size", &format_size(epub.len()));
        eprintln!();
        print_step(3, 3, "Writing output");
    }

    let step = Instant::now();
    let output = args.output.unwrap_or_else(|| default_output(&identifier));
    if output.exists() {
        print_warning(&format!("Overwriting {}", output.display()));
    }
    fs::write(&output, &epub).with_context(|| format!("Failed to write to file: {}", output.display()))?;
    timings.push(("Write", step.elapsed()));

    if args.verbose {
        eprintln!();
        print_timing_summary(start.elapsed(), &timings);
    }
    print_success(&format!("EPUB written to {}", output.display().bright_white()));

    Ok(())
}

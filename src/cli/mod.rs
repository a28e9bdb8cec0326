pub mod shutdown;

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};

use crate::{
    collector::{git::GitCollector, MultiCollector},
    config::{Config, ReportMode},
    models::ReportData,
    report::Generator,
    utils::{
        clock::{Clock, DefaultClock},
        logging::enable_logging,
        time::{resolve_range, TimeRange},
    },
};

const EXAMPLES: &str = "Examples:
  daily-report                          # Generate today's report
  daily-report --date yesterday         # Generate yesterday's report
  daily-report --output report.md       # Save to file
  daily-report --template custom.md     # Use custom template";

#[derive(Parser, Debug)]
#[command(name = "daily-report", version, long_about = None)]
#[command(about = "Generates a Markdown daily report from your work activity", after_help = EXAMPLES)]
struct Args {
    #[arg(long, default_value = "config.yaml", help = "Path to config file")]
    config: PathBuf,
    #[arg(
        long,
        default_value = "today",
        help = "Date range: today, yesterday, YYYY-MM-DD or YYYY-MM-DD,YYYY-MM-DD"
    )]
    date: String,
    #[arg(short, long, help = "Output file path. By default the report is printed to stdout")]
    output: Option<PathBuf>,
    #[arg(long, value_enum, help = "Report mode. Overrides report.mode from the config")]
    mode: Option<ReportMode>,
    #[arg(long, help = "Path to custom Markdown template file")]
    template: Option<PathBuf>,
    #[arg(long, help = "Timeout in seconds for every git invocation")]
    timeout: Option<u64>,
    #[arg(long, help = "Enable debug logging")]
    log: bool,
    #[arg(long, help = "Also write logs into daily rotated files inside this directory")]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.report.mode = mode;
        }
        if let Some(template) = &self.template {
            config.report.template_path = Some(template.clone());
        }
        if let Some(timeout) = self.timeout {
            config.git.timeout_secs = Some(timeout);
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::DEBUG)
    } else {
        None
    };
    enable_logging(args.log_dir.as_deref(), logging_level)?;

    let mut config = Config::load(&args.config).context("Error loading config")?;
    args.apply_overrides(&mut config);

    let range = resolve_range(&args.date, &config.time.timezone, &DefaultClock)
        .context("Error parsing time range")?;
    info!("Generating report from {} to {}", range.start, range.end);

    let markdown = build_report(&config, range, DefaultClock).await;
    write_report(&markdown, args.output.as_deref())
}

/// Collects every source for `range` and renders the report. Failed sources only show up in the
/// report's status line.
pub async fn build_report(config: &Config, range: TimeRange, clock: impl Clock) -> String {
    if config.report.mode == ReportMode::Llm {
        warn!("LLM report mode is not available, using template mode");
    }

    let collectors = create_collectors(config);
    let cancel = CancellationToken::new();
    tokio::spawn(shutdown::detect_shutdown(cancel.clone()));
    let (items, status) = collectors.collect_all(range, &cancel).await;
    // Collection is over, any further Ctrl-C ends the process.
    cancel.cancel();

    let data = ReportData::new(range, items, status);
    create_generator(config).with_clock(clock).generate(&data)
}

fn create_collectors(config: &Config) -> MultiCollector {
    MultiCollector::new(vec![Box::new(GitCollector::new(config.git.clone()))])
}

fn create_generator(config: &Config) -> Generator {
    match &config.report.template_path {
        Some(path) => Generator::with_template_path(path),
        None => Generator::new(),
    }
}

fn write_report(markdown: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, markdown)
                .with_context(|| format!("Error writing output file {}", path.display()))?;
            println!("Report generated: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(markdown.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

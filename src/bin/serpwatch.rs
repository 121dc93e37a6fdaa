use clap::Parser;
use serde::Serialize;
use serpwatch::config::{CliConfig, Config};
use serpwatch::core::constants::output_formats;
use serpwatch::core::types::Dimension;
use serpwatch::insights::{
    CannibalizationRequest, ComparisonRequest, CtrAnalysisRequest, DecayRequest, DropAlertRequest,
    IndexingHealthReport, KeywordDiffRequest, QuickWinRequest, SerpFeatureRequest,
};
use serpwatch::logging;
use serpwatch::ui::{Cli, Commands, ProgressReporter, Tabular, cli_to_config, display_report};
use serpwatch::{HttpPageSignals, HttpSearchConsole, Insights, SerpwatchError};

use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run_serpwatch_logic(&cli).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Main report logic extracted from main() for testing
pub async fn run_serpwatch_logic(cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let cli_config = cli_to_config(cli);
    let config = load_and_merge_config(&cli_config)?;

    let output_settings = setup_output_settings(&cli_config, &config);
    logging::init_logger(output_settings.verbose, output_settings.quiet);
    logging::log_config_info(&config);

    let site = config
        .require_site()
        .inspect_err(|e| logging::log_error("Missing site", Some(e)))?
        .to_string();

    let analytics = Arc::new(HttpSearchConsole::from_config(&config)?);
    let signals = Arc::new(HttpPageSignals::from_config(&config)?);
    let insights = Insights::from_config(&config, analytics, signals)?;

    let started = Instant::now();
    let rows = run_command(&cli.command, &insights, &site, &output_settings).await?;
    logging::log_report_summary(
        command_name(&cli.command),
        rows,
        started.elapsed().as_millis(),
    );

    Ok(0)
}

/// Load configuration from file or standard locations, then the environment,
/// then CLI arguments (CLI takes precedence)
pub fn load_and_merge_config(cli_config: &CliConfig) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if cli_config.no_config {
        Config::default()
    } else if let Some(ref config_file) = cli_config.config_file {
        Config::load_from_file(config_file).inspect_err(|e| {
            logging::log_error(
                &format!("Could not load config file '{config_file}'"),
                Some(e),
            );
        })?
    } else {
        Config::load_from_standard_locations()
    };

    config.apply_env();
    config.merge_with_cli(cli_config);
    config.validate()?;
    Ok(config)
}

/// Settings for output formatting and display
pub struct OutputSettings {
    pub quiet: bool,
    pub verbose: bool,
    pub output_format: String,
    pub show_progress: bool,
}

/// Setup output settings based on CLI and config
pub fn setup_output_settings(cli_config: &CliConfig, config: &Config) -> OutputSettings {
    let quiet = cli_config.quiet;
    let verbose = config.verbose.unwrap_or(false);
    let output_format = config
        .output_format
        .as_deref()
        .unwrap_or(output_formats::DEFAULT)
        .to_string();
    let show_progress = !quiet && !cli_config.no_progress;

    OutputSettings {
        quiet,
        verbose,
        output_format,
        show_progress,
    }
}

pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Compare { .. } => "period comparison",
        Commands::Decay { .. } => "content decay",
        Commands::Cannibalization { .. } => "cannibalization",
        Commands::Keywords { .. } => "keyword diff",
        Commands::QuickWins { .. } => "quick wins",
        Commands::Ctr { .. } => "ctr analysis",
        Commands::SearchTypes { .. } => "search type breakdown",
        Commands::SerpFeatures { .. } => "serp features",
        Commands::Alerts { .. } => "drop alerts",
        Commands::PageHealth { .. } => "page health",
        Commands::IndexingHealth { .. } => "indexing health",
    }
}

/// Run one subcommand and print its report
pub async fn run_command(
    command: &Commands,
    insights: &Insights,
    site: &str,
    settings: &OutputSettings,
) -> Result<usize, SerpwatchError> {
    let spinner = match command {
        Commands::IndexingHealth { .. } => None,
        _ => ProgressReporter::new(settings.show_progress)
            .spinner(&format!("Fetching {}", command_name(command))),
    };
    let result = fetch_report(command, insights, site, settings).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let report = result?;
    report.emit(settings)
}

/// Object-safe view of a printable report
trait Report {
    fn emit(&self, settings: &OutputSettings) -> Result<usize, SerpwatchError>;
}

impl<R: Serialize + Tabular> Report for R {
    fn emit(&self, settings: &OutputSettings) -> Result<usize, SerpwatchError> {
        display_report(self, &settings.output_format)?;
        Ok(self.rows().len())
    }
}

fn boxed<R: Serialize + Tabular + 'static>(report: R) -> Box<dyn Report> {
    Box::new(report)
}

async fn fetch_report(
    command: &Commands,
    insights: &Insights,
    site: &str,
    settings: &OutputSettings,
) -> Result<Box<dyn Report>, SerpwatchError> {
    let report = match command {
        Commands::Compare { window, dimensions } => {
            let request = ComparisonRequest {
                window: window.spec(),
                dimensions: dimensions.iter().map(|&d| Dimension::from(d)).collect(),
                ..Default::default()
            };
            boxed(insights.compare_periods(site, &request).await?)
        }
        Commands::Decay {
            lookback,
            min_clicks,
        } => {
            let request = DecayRequest {
                lookback_days: *lookback,
                min_clicks: *min_clicks,
            };
            boxed(insights.content_decay(site, &request).await?)
        }
        Commands::Cannibalization {
            window,
            min_impressions,
            resolve,
        } => {
            let request = CannibalizationRequest {
                window: window.spec(),
                min_impressions: *min_impressions,
                recommend: *resolve,
            };
            boxed(insights.cannibalization(site, &request).await?)
        }
        Commands::Keywords {
            window,
            min_impressions,
        } => {
            let request = KeywordDiffRequest {
                window: window.spec(),
                min_impressions: *min_impressions,
            };
            boxed(insights.keyword_diff(site, &request).await?)
        }
        Commands::QuickWins {
            window,
            min_impressions,
            target_ctr,
        } => {
            let request = QuickWinRequest {
                window: window.spec(),
                min_impressions: *min_impressions,
                target_ctr: *target_ctr,
                ..Default::default()
            };
            boxed(insights.quick_wins(site, &request).await?)
        }
        Commands::Ctr {
            window,
            min_impressions,
        } => {
            let request = CtrAnalysisRequest {
                window: window.spec(),
                min_impressions: *min_impressions,
            };
            boxed(insights.ctr_analysis(site, &request).await?)
        }
        Commands::SearchTypes { window } => {
            boxed(insights.search_type_breakdown(site, &window.spec()).await?)
        }
        Commands::SerpFeatures {
            total_days,
            window_days,
            step,
        } => {
            let request = SerpFeatureRequest {
                total_days: *total_days,
                window_days: *window_days,
                step_days: *step,
            };
            boxed(insights.serp_feature_trends(site, &request).await?)
        }
        Commands::Alerts {
            days,
            threshold,
            min_clicks,
        } => {
            let request = DropAlertRequest {
                days: *days,
                min_clicks: *min_clicks,
                threshold_percent: *threshold,
            };
            boxed(insights.drop_alerts(site, &request).await?)
        }
        Commands::PageHealth { url } => boxed(insights.page_health(site, url).await),
        Commands::IndexingHealth { urls, urls_file } => {
            let urls = collect_urls(urls, urls_file.as_deref())?;
            boxed(inspect_urls(insights, site, &urls, settings).await)
        }
    };
    Ok(report)
}

async fn inspect_urls(
    insights: &Insights,
    site: &str,
    urls: &[String],
    settings: &OutputSettings,
) -> IndexingHealthReport {
    let mut progress = ProgressReporter::new(settings.show_progress);
    progress.start_inspections(urls.len());

    let report = insights
        .indexing_health(site, urls, |done, total| progress.update(done, total))
        .await;
    progress.finish_inspections(report.inspected, report.total);
    report
}

/// URLs from the command line plus an optional file (one per line, `#` comments)
pub fn collect_urls(urls: &[String], urls_file: Option<&str>) -> Result<Vec<String>, SerpwatchError> {
    let mut collected: Vec<String> = urls.to_vec();

    if let Some(path) = urls_file {
        let content = std::fs::read_to_string(path).inspect_err(|e| {
            logging::log_error(&format!("Could not read URL file '{path}'"), Some(e));
        })?;
        collected.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
    }

    if collected.is_empty() {
        return Err(SerpwatchError::InvalidArgument(
            "No URLs to inspect. Pass URLs or --urls-file.".to_string(),
        ));
    }
    Ok(collected)
}

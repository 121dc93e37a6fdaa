use crate::config::Config;
use crate::core::error::RemoteError;
use crate::core::types::DateRange;
use log::{debug, error, info, warn};
use std::time::Duration;

/// Initialize the logger with appropriate level based on verbosity
pub fn init_logger(verbose: bool, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Off
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    debug!("Logger initialized with level: {level:?}");
}

/// Log configuration information
pub fn log_config_info(config: &Config) {
    let site = config.site.as_deref().unwrap_or("<unset>");
    let policy = config.retry_policy();
    let spacing = config.quota_spacing();
    let row_limit = config.row_limit();

    info!("Configuration: site={site}, row_limit={row_limit}");
    info!(
        "Retry: attempts={}, base_delay={}ms, max_delay={}ms, jitter={}ms",
        policy.max_attempts,
        policy.base_delay.as_millis(),
        policy.max_delay.as_millis(),
        policy.jitter.as_millis()
    );
    info!("Quota spacing: {}ms", spacing.duration().as_millis());
}

/// Log the date window an insight is computed over
pub fn log_window(insight: &str, label: &str, range: &DateRange) {
    debug!("{insight}: {label} window {range}");
}

/// Log a retry that is about to happen
pub fn log_retry(operation: &str, attempt: u32, max_attempts: u32, delay: Duration, err: &RemoteError) {
    warn!(
        "{operation}: attempt {attempt}/{max_attempts} failed ({err}), retrying in {}ms",
        delay.as_millis()
    );
}

/// Log a source or batch entry that settled as a failure
pub fn log_source_failure(source: &str, err: &RemoteError) {
    warn!("{source} failed: {err}");
}

/// Log sequential batch progress
pub fn log_batch_progress(done: usize, total: usize) {
    debug!("Batch progress: {done}/{total}");
}

/// Log the size of a finished report
pub fn log_report_summary(insight: &str, rows: usize, duration_ms: u128) {
    info!("{insight}: {rows} row(s) in {duration_ms}ms");
}

/// Log error information
pub fn log_error(message: &str, source: Option<&dyn std::error::Error>) {
    match source {
        Some(err) => error!("{message}: {err}"),
        None => error!("{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io;

    #[test]
    fn test_logger_initialization_verbose() {
        // Logger can only be initialized once per process
        std::panic::catch_unwind(|| init_logger(true, false)).ok();
    }

    #[test]
    fn test_logger_initialization_quiet() {
        std::panic::catch_unwind(|| init_logger(false, true)).ok();
    }

    #[test]
    fn test_log_config_info() {
        let config = Config {
            site: Some("sc-domain:example.com".to_string()),
            retry_attempts: Some(5),
            quota_spacing: Some(250),
            ..Default::default()
        };
        log_config_info(&config);
        log_config_info(&Config::default());
    }

    #[test]
    fn test_log_helpers_do_not_panic() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        )
        .unwrap();
        let err = RemoteError::transient("connection reset").with_code("503");

        log_window("drop alerts", "recent", &range);
        log_retry("query rows", 1, 3, Duration::from_millis(500), &err);
        log_source_failure("inspection", &err);
        log_batch_progress(3, 10);
        log_report_summary("content decay", 12, 340);
    }

    #[test]
    fn test_log_error_with_and_without_source() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "missing");
        log_error("Config could not be read", Some(&io_error));
        log_error("Something went wrong", None);
    }
}

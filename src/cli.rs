//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use featureservice_core::service::{DEFAULT_MAX_PAGE_SIZE, Statistic, sanitize_layer};

/// Fetch every feature of an ArcGIS Feature Server or Map Server layer.
///
/// Features are written to stdout (or --output) as newline-delimited JSON,
/// one feature per line. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "featureservice")]
#[command(author, version, about)]
pub struct Args {
    /// Service URL, e.g. https://host/arcgis/rest/services/Roads/FeatureServer/0
    pub url: String,

    /// Layer index (overrides any index in the URL)
    #[arg(short = 'l', long, value_parser = parse_layer)]
    pub layer: Option<u32>,

    /// Upper bound on records per page request
    #[arg(long, default_value_t = DEFAULT_MAX_PAGE_SIZE, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_page_size: u64,

    /// Maximum concurrent page requests (1-100) [default: derived from host and geometry]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Retry backoff unit in milliseconds; retry n waits n times this (max 60000)
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub backoff_ms: u64,

    /// Per-request timeout in seconds (1-3600)
    #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout_secs: u64,

    /// Print the resolved layer metadata as JSON and exit
    #[arg(long, conflicts_with = "plan")]
    pub metadata: bool,

    /// Print the paging plan as JSON and exit
    #[arg(long)]
    pub plan: bool,

    /// Print aggregate statistics over FIELD as JSON and exit
    #[arg(long, value_name = "FIELD", conflicts_with_all = ["metadata", "plan"])]
    pub statistics: Option<String>,

    /// Statistics computed by --statistics (min, max, avg, stddev, count, sum)
    #[arg(long = "stat", value_delimiter = ',', default_values_t = [Statistic::Min, Statistic::Max])]
    pub stats: Vec<Statistic>,

    /// Write features to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

fn parse_layer(raw: &str) -> Result<u32, String> {
    sanitize_layer(raw).ok_or_else(|| format!("`{raw}` does not contain a layer index"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/arcgis/rest/services/Roads/FeatureServer";

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["featureservice", URL]).unwrap();
        assert_eq!(args.url, URL);
        assert_eq!(args.layer, None);
        assert_eq!(args.max_page_size, 5000);
        assert_eq!(args.concurrency, None);
        assert_eq!(args.backoff_ms, 1000);
        assert_eq!(args.timeout_secs, 90);
        assert!(!args.metadata);
        assert!(!args.plan);
        assert_eq!(args.statistics, None);
        assert_eq!(args.stats, vec![Statistic::Min, Statistic::Max]);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_url_is_required() {
        let result = Args::try_parse_from(["featureservice"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["featureservice", URL, "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["featureservice", URL, "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        let result = Args::try_parse_from(["featureservice", URL, "-q", "-v"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_layer_is_sanitized() {
        let args = Args::try_parse_from(["featureservice", URL, "--layer", "/3"]).unwrap();
        assert_eq!(args.layer, Some(3));

        let args = Args::try_parse_from(["featureservice", URL, "-l", "12"]).unwrap();
        assert_eq!(args.layer, Some(12));
    }

    #[test]
    fn test_cli_layer_without_digits_rejected() {
        let result = Args::try_parse_from(["featureservice", URL, "--layer", "roads"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = Args::try_parse_from(["featureservice", URL, "-c", "100"]).unwrap();
        assert_eq!(args.concurrency, Some(100));

        for bad in ["0", "101"] {
            let err = Args::try_parse_from(["featureservice", URL, "-c", bad]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_cli_max_page_size_zero_rejected() {
        let err = Args::try_parse_from(["featureservice", URL, "--max-page-size", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_metadata_conflicts_with_plan() {
        let err = Args::try_parse_from(["featureservice", URL, "--metadata", "--plan"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_output_flag() {
        let args = Args::try_parse_from(["featureservice", URL, "-o", "roads.ndjson"]).unwrap();
        assert_eq!(args.output, Some(PathBuf::from("roads.ndjson")));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["featureservice", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_statistics_list() {
        let args = Args::try_parse_from([
            "featureservice",
            URL,
            "--statistics",
            "POP",
            "--stat",
            "SUM,avg",
        ])
        .unwrap();
        assert_eq!(args.statistics.as_deref(), Some("POP"));
        assert_eq!(args.stats, vec![Statistic::Sum, Statistic::Avg]);
    }

    #[test]
    fn test_cli_unknown_statistic_rejected() {
        let err = Args::try_parse_from(["featureservice", URL, "--statistics", "POP", "--stat", "median"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_statistics_conflicts_with_plan() {
        let err = Args::try_parse_from(["featureservice", URL, "--statistics", "POP", "--plan"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}

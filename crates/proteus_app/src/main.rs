//! proteus - identify media files and print their metadata as JSON.

use anyhow::Result;
use clap::Parser;
use proteus_core::{
    parse_file_at, parse_http, Format, MediaInfo, Nature, ParseOptions, ResultsMode,
};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "proteus")]
#[command(version)]
#[command(about = "Identify media files and extract header-level metadata", long_about = None)]
struct Cli {
    /// Files or http(s):// URLs to identify
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Report every matching parser instead of stopping at the first
    #[arg(long)]
    all: bool,

    /// Only try parsers for these natures (image,audio,document,video)
    #[arg(long, value_delimiter = ',')]
    natures: Option<Vec<String>>,

    /// Only try parsers for these formats (png,jpg,ogg,...)
    #[arg(long, value_delimiter = ',')]
    formats: Option<Vec<String>>,

    /// Extra HTTP request header as "Name: value"; repeatable
    #[arg(long = "header")]
    headers: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let options = ParseOptions {
        results: if cli.all {
            ResultsMode::All
        } else {
            ResultsMode::First
        },
        natures: parse_natures(cli.natures),
        formats: parse_formats(cli.formats),
        headers: parse_headers(&cli.headers),
    };

    let mut reports = Vec::with_capacity(cli.inputs.len());
    let mut matched_any = false;

    for input in &cli.inputs {
        let outcome = if is_http_url(input) {
            parse_http(input, &options)
        } else {
            parse_file_at(input, &options)
        };

        let results = match outcome {
            Ok(results) => results,
            Err(err) => {
                log::error!("{input}: {err}");
                eprintln!("proteus: {input}: {err}");
                Vec::new()
            }
        };
        matched_any |= !results.is_empty();
        reports.push(report_for(input, &options, results));
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    std::process::exit(if matched_any { 0 } else { 1 });
}

fn report_for(input: &str, options: &ParseOptions, results: Vec<MediaInfo>) -> serde_json::Value {
    match options.results {
        ResultsMode::First => json!({
            "source_path_or_url": input,
            "options": options,
            "result": results.first(),
        }),
        ResultsMode::All => json!({
            "source_path_or_url": input,
            "options": options,
            "ambiguous": results.len() > 1,
            "results": results,
        }),
    }
}

fn is_http_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn parse_natures(values: Option<Vec<String>>) -> Option<Vec<Nature>> {
    values.map(|values| {
        values
            .iter()
            .filter_map(|value| match value.parse::<Nature>() {
                Ok(nature) => Some(nature),
                Err(_) => {
                    eprintln!("Warning: Unknown nature '{value}'");
                    None
                }
            })
            .collect()
    })
}

fn parse_formats(values: Option<Vec<String>>) -> Option<Vec<Format>> {
    values.map(|values| {
        values
            .iter()
            .filter_map(|value| match value.parse::<Format>() {
                Ok(format) => Some(format),
                Err(_) => {
                    eprintln!("Warning: Unknown format '{value}'");
                    None
                }
            })
            .collect()
    })
}

fn parse_headers(values: &[String]) -> Vec<(String, String)> {
    values
        .iter()
        .filter_map(|value| match value.split_once(':') {
            Some((name, header_value)) => {
                Some((name.trim().to_string(), header_value.trim().to_string()))
            }
            None => {
                eprintln!("Warning: Ignoring malformed header '{value}' (expected \"Name: value\")");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_detection() {
        assert!(is_http_url("http://example.com/a.png"));
        assert!(is_http_url("https://example.com/a.png"));
        assert!(!is_http_url("ftp://example.com/a.png"));
        assert!(!is_http_url("./local/a.png"));
        assert!(!is_http_url("httpfile.png"));
    }

    #[test]
    fn nature_parsing_skips_unknown() {
        let natures = parse_natures(Some(vec!["image".into(), "sculpture".into()]));
        assert_eq!(natures, Some(vec![Nature::Image]));
        assert_eq!(parse_natures(None), None);
    }

    #[test]
    fn format_parsing_accepts_aliases() {
        let formats = parse_formats(Some(vec!["jpeg".into(), "tiff".into()]));
        assert_eq!(formats, Some(vec![Format::Jpg, Format::Tif]));
    }

    #[test]
    fn header_parsing() {
        let headers = parse_headers(&["Authorization: Bearer xyz".to_string()]);
        assert_eq!(
            headers,
            vec![("Authorization".to_string(), "Bearer xyz".to_string())]
        );
        assert!(parse_headers(&["nocolon".to_string()]).is_empty());
    }

    #[test]
    fn first_mode_report_shape() {
        let report = report_for("a.png", &ParseOptions::default(), Vec::new());
        assert_eq!(report["source_path_or_url"], "a.png");
        assert!(report["result"].is_null());
        assert!(report.get("results").is_none());
    }

    #[test]
    fn all_mode_report_shape() {
        let options = ParseOptions {
            results: ResultsMode::All,
            ..ParseOptions::default()
        };
        let report = report_for("a.png", &options, Vec::new());
        assert_eq!(report["ambiguous"], false);
        assert!(report["results"].as_array().unwrap().is_empty());
    }
}

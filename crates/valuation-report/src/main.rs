//! valuation-report: dividend and valuation screen over a list of tickers.
//!
//! Usage:
//!   cargo run -p valuation-report -- --tickers PETR4.SA,TAEE11.SA,BBSE3.SA
//!   cargo run -p valuation-report -- --file tickers.csv --years 10 --rate 8
//!   cargo run -p valuation-report -- --tickers ITSA4.SA --export-dir out --json
//!   cargo run -p valuation-report -- --file tickers.csv --max-pe 12 --min-dy 6 --min-margin 10
//!
//! `--rate` and `--min-dy` are percentages.

mod config;
mod export;

use analysis_core::{tickers_from_csv, NormalizerConfig};
use analysis_orchestrator::{
    BatchParams, BatchReport, CachedGateway, ExecutorConfig, OrchestratorConfig, ScreenFilters, TtlCache,
    ValuationOrchestrator,
};
use anyhow::{Context, Result};
use config::AnalyzerConfig;
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use yahoo_client::{YahooClient, YahooConfig};

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "valuation_report=info,analysis_orchestrator=info,yahoo_client=warn".into()
        })
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }

    // Panic hook: log panic info through tracing
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("PANIC: {info}");
    }));
}

fn read_tickers(config: &AnalyzerConfig) -> Result<String> {
    let mut raw = Vec::new();
    if let Some(path) = &config.ticker_file {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        raw.push(tickers_from_csv(file).with_context(|| format!("reading tickers from {}", path.display()))?);
    }
    if let Some(list) = &config.tickers {
        raw.push(list.clone());
    }
    Ok(raw.join(","))
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string())
}

fn print_summary(report: &BatchReport) {
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>9}  {:<22} {:<16}",
        "Ticker", "Price", "Ceiling", "Graham", "MoS %", "Dividend months", "Best buy months"
    );
    for v in &report.valuations {
        println!(
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>9.2}  {:<22} {:<16}",
            v.ticker,
            v.current_price,
            v.ceiling_price,
            v.fair_price,
            v.margin_of_safety,
            v.payment_months.to_string(),
            v.best_purchase_months.to_string()
        );
    }

    println!();
    println!(
        "{:<12} {:>8} {:>8} {:>8} {:>8} {:>9} {:>6} {:>8} {:>8}",
        "Ticker", "P/E", "P/B", "DY", "Payout", "Debt/EBITDA", "Years", "DPA avg", "DPA CAGR"
    );
    for (row, stats) in report.fundamentals.iter().zip(&report.dividend_stats) {
        println!(
            "{:<12} {:>8} {:>8} {:>8} {:>8.2} {:>9} {:>6} {:>8.4} {:>8.2}",
            row.snapshot.ticker,
            fmt_opt(row.snapshot.pe),
            fmt_opt(row.snapshot.pb),
            fmt_opt(row.snapshot.dividend_yield),
            row.payout_ratio,
            fmt_opt(row.snapshot.debt_to_ebitda),
            stats.consecutive_years,
            stats.dpa_mean,
            stats.dpa_cagr
        );
    }

    if !report.alerts.is_empty() {
        println!();
        for alert in &report.alerts {
            println!("* {}", alert);
        }
    }
    for warning in &report.warnings {
        println!("! {}", warning);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let mut config = AnalyzerConfig::from_env()?;
    config.apply_args(&args)?;
    config.validate()?;

    let raw_tickers = read_tickers(&config)?;
    let as_of = config.market_today()?;

    let yahoo = YahooClient::new(YahooConfig {
        rate_limit: config.yahoo_rate_limit,
        request_timeout: Duration::from_secs(config.call_timeout_secs),
    });
    let gateway = CachedGateway::new(yahoo, Arc::new(TtlCache::new(config.cache_ttl_secs)));

    let orchestrator = ValuationOrchestrator::new(
        Arc::new(gateway),
        OrchestratorConfig {
            normalizer: NormalizerConfig {
                max_tickers: config.max_tickers,
            },
            executor: ExecutorConfig {
                max_workers: config.max_workers,
            },
            call_timeout: Duration::from_secs(config.call_timeout_secs),
        },
    );

    let params = BatchParams {
        years: config.years,
        target_return_pct: config.target_return_pct,
        growth_years: config.growth_years,
        as_of,
        filters: ScreenFilters {
            max_pe: config.max_pe,
            min_dividend_yield: config.min_dy,
            min_margin_of_safety: config.min_margin,
        },
    };

    let report = orchestrator
        .run_batch(&raw_tickers, &params)
        .await
        .context("valuation batch failed")?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if let Some(dir) = &config.export_dir {
        let files = export::export_report(dir, &report)?;
        for f in files {
            tracing::info!("wrote {}", f.display());
        }
    }

    Ok(())
}

use analysis_core::{AnnualDividendRecord, ValuationResult};
use analysis_orchestrator::{BatchReport, FundamentalRow};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

pub fn write_valuations<W: Write>(out: W, rows: &[ValuationResult]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// EPS, BVPS and dividend rate stay internal; sector is reduced to a flag.
pub fn write_fundamentals<W: Write>(out: W, rows: &[FundamentalRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record([
        "ticker",
        "pe",
        "pb",
        "roe",
        "dividend_yield",
        "payout_ratio",
        "debt_to_equity",
        "debt_to_ebitda",
        "ev_to_ebitda",
        "revenue_cagr",
        "net_income_cagr",
        "financial_sector",
    ])?;
    for row in rows {
        let s = &row.snapshot;
        wtr.write_record([
            s.ticker.to_string(),
            opt(s.pe),
            opt(s.pb),
            opt(s.roe),
            opt(s.dividend_yield),
            row.payout_ratio.to_string(),
            opt(s.debt_to_equity),
            opt(s.debt_to_ebitda),
            opt(s.ev_to_ebitda),
            opt(row.revenue_cagr),
            opt(row.net_income_cagr),
            s.is_financial().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_dividends<W: Write>(out: W, rows: &[AnnualDividendRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["ticker", "year", "dpa"])?;
    for r in rows {
        wtr.write_record([r.ticker.to_string(), r.year.to_string(), r.dpa.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write valuation.csv, fundamentals.csv and dividends.csv into `dir`.
pub fn export_report(dir: &Path, report: &BatchReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let valuation = dir.join("valuation.csv");
    let fundamentals = dir.join("fundamentals.csv");
    let dividends = dir.join("dividends.csv");

    write_valuations(
        File::create(&valuation).with_context(|| format!("creating {}", valuation.display()))?,
        &report.valuations,
    )?;
    write_fundamentals(
        File::create(&fundamentals).with_context(|| format!("creating {}", fundamentals.display()))?,
        &report.fundamentals,
    )?;
    write_dividends(
        File::create(&dividends).with_context(|| format!("creating {}", dividends.display()))?,
        &report.dividend_series,
    )?;

    Ok(vec![valuation, fundamentals, dividends])
}

use analysis_core::stats::round2;
use analysis_core::{FundamentalSnapshot, ProviderFundamentals, Ticker};

pub const GRAHAM_MULTIPLIER: f64 = 22.5;
/// Margin reported when it cannot be computed.
pub const MARGIN_SENTINEL: f64 = -100.0;

/// Bazin ceiling: mean DPA ÷ target yield (decimal).
pub fn bazin_ceiling(mean_dpa: f64, rate: f64) -> f64 {
    if mean_dpa > 0.0 && rate > 0.0 {
        mean_dpa / rate
    } else {
        0.0
    }
}

/// √(22.5 × EPS × BVPS)
pub fn graham_fair_price(eps: Option<f64>, bvps: Option<f64>) -> f64 {
    match (eps, bvps) {
        (Some(e), Some(b)) if e > 0.0 && b > 0.0 => (GRAHAM_MULTIPLIER * e * b).sqrt(),
        _ => 0.0,
    }
}

pub fn margin_of_safety(ceiling: f64, price: f64) -> f64 {
    if ceiling > 0.0 && price > 0.0 {
        (ceiling / price - 1.0) * 100.0
    } else {
        MARGIN_SENTINEL
    }
}

/// Dividend rate ÷ EPS in percent, rounded to 2 decimals.
pub fn payout_ratio(snapshot: &FundamentalSnapshot) -> f64 {
    match (snapshot.dividend_rate, snapshot.eps) {
        (Some(rate), Some(eps)) if rate > 0.0 && eps > 0.0 => round2(rate / eps * 100.0),
        _ => 0.0,
    }
}

/// Regular market price, then current price, then 0.
pub fn current_price(provider: &ProviderFundamentals) -> f64 {
    provider
        .regular_market_price
        .or(provider.current_price)
        .unwrap_or(0.0)
}

pub fn opportunity_alert(ticker: &Ticker, price: f64, ceiling: f64, margin: f64) -> Option<String> {
    if margin > 0.0 {
        Some(format!(
            "Opportunity in {}: current price {:.2} < ceiling {:.2}",
            ticker, price, ceiling
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bazin() {
        assert!((bazin_ceiling(1.20, 0.06) - 20.0).abs() < 1e-6);
        assert_eq!(bazin_ceiling(0.0, 0.06), 0.0);
        assert_eq!(bazin_ceiling(1.2, 0.0), 0.0);
    }

    #[test]
    fn test_graham() {
        assert!((graham_fair_price(Some(2.0), Some(10.0)) - 21.2132).abs() < 1e-3);
        assert_eq!(graham_fair_price(Some(-2.0), Some(10.0)), 0.0);
        assert_eq!(graham_fair_price(None, Some(10.0)), 0.0);
    }

    #[test]
    fn test_margin_of_safety() {
        assert!((margin_of_safety(20.0, 15.0) - 33.33).abs() < 0.01);
        assert_eq!(margin_of_safety(0.0, 15.0), -100.0);
        assert_eq!(margin_of_safety(20.0, 0.0), -100.0);
        assert!(margin_of_safety(10.0, 20.0) < 0.0);
    }

    #[test]
    fn test_payout_ratio() {
        let mut snap = FundamentalSnapshot::empty(Ticker::new("X"));
        assert_eq!(payout_ratio(&snap), 0.0);
        snap.eps = Some(3.0);
        snap.dividend_rate = Some(1.0);
        assert_eq!(payout_ratio(&snap), 33.33);
    }

    #[test]
    fn test_current_price_preference() {
        let mut p = ProviderFundamentals {
            regular_market_price: Some(31.5),
            current_price: Some(30.0),
            ..Default::default()
        };
        assert_eq!(current_price(&p), 31.5);
        p.regular_market_price = None;
        assert_eq!(current_price(&p), 30.0);
        p.current_price = None;
        assert_eq!(current_price(&p), 0.0);
    }

    #[test]
    fn test_alert_text() {
        let t = Ticker::new("BBSE3.SA");
        assert_eq!(
            opportunity_alert(&t, 15.0, 20.0, 33.3).as_deref(),
            Some("Opportunity in BBSE3.SA: current price 15.00 < ceiling 20.00")
        );
        assert_eq!(opportunity_alert(&t, 25.0, 20.0, -20.0), None);
    }
}

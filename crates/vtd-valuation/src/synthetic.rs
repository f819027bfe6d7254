//! Synthetic Series Generator.
//!
//! Two deterministic series, both driven by [`KeyedStream`]:
//!
//! - **Demo series** for an empty ledger: `window_days` daily points ending
//!   at `now`, starting at starting cash, compounding a slightly positive
//!   uniform daily return with three fixed shock days (down, up, down).
//! - **Densified series** for a sparse list of key points: one interpolated
//!   point per missing calendar day, each perturbed by uniform noise.
//!
//! Per-symbol price paths ([`simulated_price`]) are a pure function of
//! `(symbol, start_price, day)`.

use chrono::{DateTime, Datelike, Duration, Utc};

use vtd_portfolio::ValuePoint;

use crate::prng::KeyedStream;

/// Daily demo return range. Mean is +0.2%.
const DEMO_RETURN_LO: f64 = -0.012;
const DEMO_RETURN_HI: f64 = 0.016;

/// Interpolated points move at most this fraction off the straight line.
const INTERPOLATION_NOISE: f64 = 0.02;

/// Simulated daily price move bound and its downward bias.
const PRICE_MOVE_BOUND: f64 = 0.03;
const PRICE_DRIFT_BIAS: f64 = -0.001;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_SEED: &str = "vtd-demo";

/// Simulated price of `symbol` after `day` days, starting from `start_price`
/// on day 0.
///
/// Each day's return is `uniform(-3%, +3%) - 0.1%` drawn from the stream
/// keyed by the symbol at index `day`, compounded from day 1.
pub fn simulated_price(symbol: &str, start_price: f64, day: u32) -> f64 {
    let stream = KeyedStream::new(format!("price-path/{}", symbol.to_ascii_uppercase()));
    (1..=day).fold(start_price, |price, d| {
        let r = stream.uniform(u64::from(d), -PRICE_MOVE_BOUND, PRICE_MOVE_BOUND) + PRICE_DRIFT_BIAS;
        price * (1.0 + r)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticSeries {
    window_days: u32,
    seed: String,
}

impl Default for SyntheticSeries {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_DAYS, DEFAULT_SEED)
    }
}

impl SyntheticSeries {
    /// `window_days` below 2 is raised to 2.
    pub fn new(window_days: u32, seed: impl Into<String>) -> Self {
        Self {
            window_days: window_days.max(2),
            seed: seed.into(),
        }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Shock returns at fixed indices of the window.
    fn shock_at(&self, index: u32) -> Option<f64> {
        let n = self.window_days;
        if index == n / 4 {
            Some(-0.035)
        } else if index == n / 2 {
            Some(0.03)
        } else if index == 3 * n / 4 {
            Some(-0.025)
        } else {
            None
        }
    }

    /// Daily demo curve for a ledger with no trades.
    pub fn demo_series(&self, starting_cash: f64, now: DateTime<Utc>) -> Vec<ValuePoint> {
        let stream = KeyedStream::new(format!("{}/demo", self.seed));
        let n = self.window_days;
        let mut value = starting_cash;
        let mut out = Vec::with_capacity(n as usize);
        for i in 0..n {
            if i > 0 {
                let r = self
                    .shock_at(i)
                    .unwrap_or_else(|| stream.uniform(u64::from(i), DEMO_RETURN_LO, DEMO_RETURN_HI));
                value *= 1.0 + r;
            }
            let date = now - Duration::days(i64::from(n - 1 - i));
            out.push(ValuePoint::new(date, value));
        }
        out
    }

    /// Fill each gap of more than one calendar day between consecutive key
    /// points with one point per missing day.
    ///
    /// Key points are kept as-is. An interpolated point sits `k` days after
    /// its left key point at `lerp(left, right, k / gap) * (1 + noise)`, with
    /// noise keyed by the seed and the calendar day, so the same day always
    /// gets the same perturbation.
    pub fn densify(&self, keys: &[ValuePoint]) -> Vec<ValuePoint> {
        let stream = KeyedStream::new(format!("{}/interpolate", self.seed));
        let mut out = Vec::with_capacity(keys.len());
        for (i, point) in keys.iter().enumerate() {
            if let Some(prev) = i.checked_sub(1).map(|j| &keys[j]) {
                let gap = (point.date.date_naive() - prev.date.date_naive()).num_days();
                for k in 1..gap {
                    let date = prev.date + Duration::days(k);
                    let frac = k as f64 / gap as f64;
                    let base = prev.value + (point.value - prev.value) * frac;
                    let day = date.date_naive().num_days_from_ce() as u64;
                    let noise = stream.uniform(day, -INTERPOLATION_NOISE, INTERPOLATION_NOISE);
                    out.push(ValuePoint::new(date, base * (1.0 + noise)));
                }
            }
            out.push(point.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 31, 16, 0, 0).unwrap()
    }

    #[test]
    fn simulated_price_is_bit_identical_on_repeat() {
        for day in [0, 1, 7, 30, 365] {
            let a = simulated_price("AAPL", 150.0, day);
            let b = simulated_price("AAPL", 150.0, day);
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn simulated_price_day_zero_is_start_and_case_insensitive() {
        assert_eq!(simulated_price("msft", 410.0, 0), 410.0);
        assert_eq!(
            simulated_price("msft", 410.0, 12).to_bits(),
            simulated_price("MSFT", 410.0, 12).to_bits()
        );
    }

    #[test]
    fn simulated_price_moves_within_daily_bound() {
        let mut prev = simulated_price("TSLA", 200.0, 0);
        for day in 1..60 {
            let p = simulated_price("TSLA", 200.0, day);
            let r = p / prev - 1.0;
            assert!(r >= -0.031 - 1e-12 && r < 0.029 + 1e-12, "day {day}: {r}");
            prev = p;
        }
    }

    #[test]
    fn demo_series_shape() {
        let s = SyntheticSeries::default();
        let pts = s.demo_series(100_000.0, now());
        assert_eq!(pts.len(), 30);
        assert_eq!(pts[0].value, 100_000.0);
        assert_eq!(pts[29].date, now());
        assert_eq!(pts[0].date, now() - Duration::days(29));
        assert!(pts.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn demo_series_applies_shocks() {
        let s = SyntheticSeries::new(20, "seed");
        let pts = s.demo_series(1_000.0, now());
        let ret = |i: usize| pts[i].value / pts[i - 1].value - 1.0;
        assert!((ret(5) + 0.035).abs() < 1e-12);
        assert!((ret(10) - 0.03).abs() < 1e-12);
        assert!((ret(15) + 0.025).abs() < 1e-12);
    }

    #[test]
    fn demo_series_is_reproducible_and_seeded() {
        let a = SyntheticSeries::new(30, "one").demo_series(50_000.0, now());
        let b = SyntheticSeries::new(30, "one").demo_series(50_000.0, now());
        let c = SyntheticSeries::new(30, "two").demo_series(50_000.0, now());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn tiny_window_is_raised_to_two() {
        let pts = SyntheticSeries::new(0, "x").demo_series(10.0, now());
        assert_eq!(pts.len(), 2);
    }

    #[test]
    fn densify_fills_missing_days_near_the_line() {
        let s = SyntheticSeries::default();
        let keys = vec![
            ValuePoint::new(now() - Duration::days(10), 1_000.0),
            ValuePoint::new(now(), 2_000.0),
        ];
        let dense = s.densify(&keys);
        assert_eq!(dense.len(), 11);
        assert_eq!(dense[0], keys[0]);
        assert_eq!(dense[10], keys[1]);
        for (k, p) in dense.iter().enumerate().take(10).skip(1) {
            let line = 1_000.0 + 100.0 * k as f64;
            assert!((p.value / line - 1.0).abs() <= INTERPOLATION_NOISE + 1e-12);
            assert_eq!(p.date, keys[0].date + Duration::days(k as i64));
        }
    }

    #[test]
    fn densify_leaves_adjacent_and_same_day_points_alone() {
        let s = SyntheticSeries::default();
        let keys = vec![
            ValuePoint::new(now() - Duration::days(1), 1.0),
            ValuePoint::new(now(), 2.0),
            ValuePoint::new(now() + Duration::hours(1), 3.0),
        ];
        assert_eq!(s.densify(&keys), keys);
        assert!(s.densify(&[]).is_empty());
    }
}

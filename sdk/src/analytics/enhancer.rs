//! Order book enhancer.
//!
//! Derives top-of-book prices and the bid/ask imbalance from an accepted
//! snapshot. Pure: the same snapshot always yields the same result.

use rust_decimal::Decimal;

use crate::error::SdkError;
use crate::types::{EnhancedOrderBook, Imbalance, ImbalanceDirection, OrderBookSnapshot};

/// Default ratio above which the book leans to the buy side.
pub const DEFAULT_BUY_THRESHOLD: f64 = 0.55;

/// Default ratio below which the book leans to the sell side.
pub const DEFAULT_SELL_THRESHOLD: f64 = 0.45;

/// Imbalance classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhancerConfig {
    /// `ratio > buy_threshold` classifies as buy.
    pub buy_threshold: f64,
    /// `ratio < sell_threshold` classifies as sell.
    pub sell_threshold: f64,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            buy_threshold: DEFAULT_BUY_THRESHOLD,
            sell_threshold: DEFAULT_SELL_THRESHOLD,
        }
    }
}

impl EnhancerConfig {
    /// Creates a configuration with the given thresholds.
    #[must_use]
    pub const fn new(buy_threshold: f64, sell_threshold: f64) -> Self {
        Self {
            buy_threshold,
            sell_threshold,
        }
    }

    /// Validates the thresholds.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 <= sell <= buy <= 1`.
    pub fn validate(&self) -> Result<(), SdkError> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(self.buy_threshold) || !in_range(self.sell_threshold) {
            return Err(SdkError::InvalidConfig(
                "imbalance thresholds must be within [0, 1]".to_string(),
            ));
        }
        if self.sell_threshold > self.buy_threshold {
            return Err(SdkError::InvalidConfig(
                "sell_threshold must not exceed buy_threshold".to_string(),
            ));
        }
        Ok(())
    }
}

/// Turns snapshots into [`EnhancedOrderBook`]s.
#[derive(Debug, Clone, Default)]
pub struct OrderBookEnhancer {
    config: EnhancerConfig,
}

impl OrderBookEnhancer {
    /// Creates an enhancer.
    ///
    /// # Errors
    ///
    /// Returns an error if the thresholds are invalid.
    pub fn new(config: EnhancerConfig) -> Result<Self, SdkError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the thresholds in use.
    #[must_use]
    pub const fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Computes the imbalance for the given side volumes.
    ///
    /// The ratio is the bid share of total volume, 0.5 for an empty book.
    #[must_use]
    pub fn imbalance(&self, total_bid_volume: u64, total_ask_volume: u64) -> Imbalance {
        let total = total_bid_volume as f64 + total_ask_volume as f64;
        let ratio = if total == 0.0 {
            0.5
        } else {
            total_bid_volume as f64 / total
        };

        let direction = if ratio > self.config.buy_threshold {
            ImbalanceDirection::Buy
        } else if ratio < self.config.sell_threshold {
            ImbalanceDirection::Sell
        } else {
            ImbalanceDirection::Neutral
        };

        Imbalance {
            total_bid_volume,
            total_ask_volume,
            ratio,
            direction,
        }
    }

    /// Enhances a snapshot.
    ///
    /// Derived prices that would overflow `Decimal` are left as `None`.
    #[must_use]
    pub fn enhance(&self, snapshot: OrderBookSnapshot) -> EnhancedOrderBook {
        let best_bid = snapshot.best_bid();
        let best_ask = snapshot.best_ask();

        let (spread, mid_price) = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => (
                ask.checked_sub(bid),
                bid.checked_add(ask)
                    .and_then(|sum| sum.checked_div(Decimal::TWO)),
            ),
            _ => (None, None),
        };
        let spread_pct = spread
            .zip(mid_price)
            .and_then(|(spread, mid)| spread.checked_div(mid))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));

        let imbalance = self.imbalance(snapshot.total_bid_volume(), snapshot.total_ask_volume());

        EnhancedOrderBook {
            snapshot,
            best_bid,
            best_ask,
            spread,
            spread_pct,
            mid_price,
            imbalance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookLevel;
    use chrono::Utc;

    fn book(bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> OrderBookSnapshot {
        OrderBookSnapshot::new("005930", 1, Utc::now())
            .with_bids(bids)
            .with_asks(asks)
    }

    #[test]
    fn test_enhance_two_sided_book() {
        let enhancer = OrderBookEnhancer::default();
        let snapshot = book(
            vec![BookLevel::new(70_000, 1000)],
            vec![BookLevel::new(71_000, 1000)],
        );

        let enhanced = enhancer.enhance(snapshot);

        assert_eq!(enhanced.best_bid, Some(Decimal::from(70_000)));
        assert_eq!(enhanced.best_ask, Some(Decimal::from(71_000)));
        assert_eq!(enhanced.spread, Some(Decimal::from(1000)));
        assert_eq!(enhanced.mid_price, Some(Decimal::from(70_500)));
        let pct = enhanced.spread_pct.expect("spread_pct");
        assert!((pct - Decimal::new(1418, 3)).abs() < Decimal::new(1, 3));
        assert_eq!(enhanced.imbalance.direction, ImbalanceDirection::Neutral);
    }

    #[test]
    fn test_enhance_one_sided_book() {
        let enhancer = OrderBookEnhancer::default();
        let enhanced = enhancer.enhance(book(vec![BookLevel::new(100, 10)], vec![]));

        assert_eq!(enhanced.best_bid, Some(Decimal::from(100)));
        assert_eq!(enhanced.best_ask, None);
        assert_eq!(enhanced.spread, None);
        assert_eq!(enhanced.mid_price, None);
        assert_eq!(enhanced.spread_pct, None);
        assert_eq!(enhanced.imbalance.direction, ImbalanceDirection::Buy);
    }

    #[test]
    fn test_enhance_prices_at_decimal_limits() {
        let enhancer = OrderBookEnhancer::default();
        let snapshot = book(
            vec![BookLevel::new(Decimal::MAX - Decimal::ONE, 10)],
            vec![BookLevel::new(Decimal::MAX, 10)],
        );

        let enhanced = enhancer.enhance(snapshot);

        assert_eq!(enhanced.spread, Some(Decimal::ONE));
        assert_eq!(enhanced.mid_price, None);
        assert_eq!(enhanced.spread_pct, None);
        assert_eq!(enhanced.best_ask, Some(Decimal::MAX));
    }

    #[test]
    fn test_enhance_spread_overflow() {
        let enhancer = OrderBookEnhancer::default();
        let snapshot = book(
            vec![BookLevel::new(Decimal::MIN, 10)],
            vec![BookLevel::new(Decimal::MAX, 10)],
        );

        let enhanced = enhancer.enhance(snapshot);

        assert_eq!(enhanced.spread, None);
        assert_eq!(enhanced.mid_price, Some(Decimal::ZERO));
        assert_eq!(enhanced.spread_pct, None);
    }

    #[test]
    fn test_imbalance_buy_side() {
        let imbalance = OrderBookEnhancer::default().imbalance(5000, 1000);
        assert!((imbalance.ratio - 0.8333).abs() < 0.001);
        assert_eq!(imbalance.direction, ImbalanceDirection::Buy);
    }

    #[test]
    fn test_imbalance_sell_side() {
        let imbalance = OrderBookEnhancer::default().imbalance(1000, 5000);
        assert_eq!(imbalance.direction, ImbalanceDirection::Sell);
    }

    #[test]
    fn test_imbalance_empty_book() {
        let imbalance = OrderBookEnhancer::default().imbalance(0, 0);
        assert!((imbalance.ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(imbalance.direction, ImbalanceDirection::Neutral);
    }

    #[test]
    fn test_imbalance_thresholds_are_exclusive() {
        let enhancer = OrderBookEnhancer::default();
        // 55 / 100 and 45 / 100 sit exactly on the thresholds.
        assert_eq!(enhancer.imbalance(55, 45).direction, ImbalanceDirection::Neutral);
        assert_eq!(enhancer.imbalance(45, 55).direction, ImbalanceDirection::Neutral);
    }

    #[test]
    fn test_imbalance_ratio_bounds() {
        let enhancer = OrderBookEnhancer::default();
        for (bid, ask) in [(0, 1), (1, 0), (u64::MAX, u64::MAX), (u64::MAX, 0), (7, 3)] {
            let ratio = enhancer.imbalance(bid, ask).ratio;
            assert!((0.0..=1.0).contains(&ratio), "ratio {ratio} for {bid}/{ask}");
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let enhancer = OrderBookEnhancer::new(EnhancerConfig::new(0.9, 0.1)).expect("config");
        assert_eq!(enhancer.imbalance(5000, 1000).direction, ImbalanceDirection::Neutral);
    }

    #[test]
    fn test_config_validation() {
        assert!(EnhancerConfig::default().validate().is_ok());
        assert!(EnhancerConfig::new(0.4, 0.6).validate().is_err());
        assert!(EnhancerConfig::new(1.5, 0.1).validate().is_err());
        assert!(OrderBookEnhancer::new(EnhancerConfig::new(-0.1, -0.2)).is_err());
    }
}

//! Market worker: periodic quotes, market stress and alerts
//!
//! Independent of the camera loop; the emitter is the only shared object.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{AlertConfig, MarketConfig};
use crate::core::alerts::AlertTracker;
use crate::core::emitter::{BroadcastEmitter, MARKET_UPDATE, STRESS_ALERT};
use crate::core::scheduler::StopSignal;
use crate::types::{supported_assets, Asset, AssetKind, MarketUpdate, Quote};
use crate::Result;

/// Above this share volume a quote counts as a volume surge
pub const VOLUME_SURGE: u64 = 50_000_000;
const BASE_STRESS: f64 = 0.5;
const VOLATILITY_WEIGHT: f64 = 0.3;
const SURGE_STRESS: f64 = 0.15;
const JITTER: f64 = 0.05;

/// Quote provider
pub trait PriceSource: Send {
    fn quote(&mut self, asset: &Asset) -> Result<Quote>;
}

// =============================================================================
// MOCK PRICES
// =============================================================================

fn base_price(asset: &Asset) -> f64 {
    match asset.kind {
        AssetKind::Stock => match asset.symbol.as_str() {
            "AAPL" => 195.0,
            "GOOGL" => 140.0,
            "MSFT" => 420.0,
            "TSLA" => 250.0,
            "AMZN" => 170.0,
            "META" => 500.0,
            "NVDA" => 875.0,
            "AMD" => 185.0,
            _ => 150.0,
        },
        AssetKind::Crypto => match asset.symbol.as_str() {
            "BTC" => 42000.0,
            "ETH" => 2200.0,
            "XRP" => 0.50,
            "ADA" => 0.40,
            "SOL" => 100.0,
            "DOGE" => 0.08,
            _ => 100.0,
        },
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Random walk around a fixed base price per symbol
pub struct MockPriceSource {
    rng: StdRng,
}

impl Default for MockPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PriceSource for MockPriceSource {
    fn quote(&mut self, asset: &Asset) -> Result<Quote> {
        let base = base_price(asset);
        let timestamp = Utc::now().to_rfc3339();

        let quote = match asset.kind {
            AssetKind::Stock => {
                let change = self.rng.gen_range(-2.0..=2.0);
                Quote {
                    symbol: asset.symbol.clone(),
                    price: round_to(base + change, 2),
                    change: round_to(change, 2),
                    change_percent: round_to(change / base * 100.0, 2),
                    volume: Some(self.rng.gen_range(1_000_000..=100_000_000)),
                    timestamp,
                }
            }
            AssetKind::Crypto => {
                // 24h percent change
                let change = self.rng.gen_range(-3.0..=3.0);
                Quote {
                    symbol: asset.symbol.clone(),
                    price: round_to(base + change, 4),
                    change: round_to(change, 2),
                    change_percent: round_to(change, 2),
                    volume: None,
                    timestamp,
                }
            }
        };
        Ok(quote)
    }
}

// =============================================================================
// MARKET STRESS
// =============================================================================

/// Deterministic part: volatility plus volume surge, clamped
pub fn market_stress(quote: &Quote) -> f64 {
    let mut stress = BASE_STRESS + quote.change_percent.abs() / 100.0 * VOLATILITY_WEIGHT;
    if quote.volume.is_some_and(|v| v > VOLUME_SURGE) {
        stress += SURGE_STRESS;
    }
    stress.clamp(0.0, 1.0)
}

/// Add jitter in [-0.05, 0.05], clamp again and round to two decimals
pub fn jittered(stress: f64, rng: &mut impl Rng) -> f64 {
    let noisy = (stress + rng.gen_range(-JITTER..=JITTER)).clamp(0.0, 1.0);
    round_to(noisy, 2)
}

// =============================================================================
// WORKER
// =============================================================================

pub struct MarketWorker {
    source: Box<dyn PriceSource>,
    assets: Vec<Asset>,
    symbols_per_tick: usize,
    config: MarketConfig,
    alerts: AlertTracker,
    emitter: Arc<BroadcastEmitter>,
    rng: StdRng,
}

impl MarketWorker {
    pub fn new(
        source: Box<dyn PriceSource>,
        emitter: Arc<BroadcastEmitter>,
        config: MarketConfig,
        alerts: AlertConfig,
    ) -> Self {
        Self {
            source,
            assets: supported_assets(),
            symbols_per_tick: config.symbols_per_tick.max(1),
            config,
            alerts: AlertTracker::new(alerts),
            emitter,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixed seed for symbol picks and jitter
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// One tick: quote a random sample of symbols and emit each update
    pub fn tick(&mut self) -> Vec<MarketUpdate> {
        let count = self.symbols_per_tick.min(self.assets.len());
        let picked: Vec<Asset> = self
            .assets
            .choose_multiple(&mut self.rng, count)
            .cloned()
            .collect();

        let mut updates = Vec::with_capacity(picked.len());
        for asset in picked {
            let quote = match self.source.quote(&asset) {
                Ok(quote) => quote,
                Err(e) => {
                    warn!(symbol = %asset.symbol, error = %e, "Quote failed, skipping symbol");
                    continue;
                }
            };

            let stress = jittered(market_stress(&quote), &mut self.rng);
            let update = MarketUpdate {
                symbol: asset.symbol.clone(),
                kind: asset.kind,
                data: quote,
                stress,
                time: Utc::now().to_rfc3339(),
            };
            debug!(symbol = %update.symbol, stress, "Market update");
            self.emitter.emit(MARKET_UPDATE, &update);

            if let Some(alert) = self
                .alerts
                .check(&asset.symbol, stress, Some(asset.symbol.as_str()), Instant::now())
            {
                self.emitter.emit(STRESS_ALERT, &alert);
            }
            updates.push(update);
        }
        updates
    }

    /// Tick on a fixed interval until `stop` is raised
    pub async fn run(mut self, stop: StopSignal) {
        let mut interval = tokio::time::interval(self.config.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(
            interval_ms = self.config.interval_ms,
            symbols_per_tick = self.symbols_per_tick,
            "Market worker started"
        );
        while !stop.is_stopped() {
            interval.tick().await;
            self.tick();
        }
        info!("Market worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn quote(change_percent: f64, volume: Option<u64>) -> Quote {
        Quote {
            symbol: "TEST".to_string(),
            price: 100.0,
            change: change_percent,
            change_percent,
            volume,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_market_stress_formula() {
        assert!((market_stress(&quote(0.0, None)) - 0.5).abs() < 1e-12);
        assert!((market_stress(&quote(-2.0, Some(1_000))) - 0.506).abs() < 1e-12);
        assert!((market_stress(&quote(1.0, Some(60_000_000))) - 0.653).abs() < 1e-12);
        assert_eq!(market_stress(&quote(500.0, Some(60_000_000))), 1.0);
    }

    #[test]
    fn test_jitter_bounded_and_rounded() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let v = jittered(0.5, &mut rng);
            assert!((0.45..=0.55).contains(&v));
            assert!((v * 100.0 - (v * 100.0).round()).abs() < 1e-9);
        }
        let mut rng = StdRng::seed_from_u64(7);
        assert!(jittered(1.0, &mut rng) <= 1.0);
    }

    #[test]
    fn test_mock_quotes_near_base() {
        let mut source = MockPriceSource::seeded(1);
        let aapl = source.quote(&Asset::stock("AAPL")).unwrap();
        assert!((193.0..=197.0).contains(&aapl.price));
        let volume = aapl.volume.unwrap();
        assert!((1_000_000..=100_000_000).contains(&volume));

        let btc = source.quote(&Asset::crypto("BTC")).unwrap();
        assert!((41997.0..=42003.0).contains(&btc.price));
        assert!(btc.volume.is_none());
        assert!(btc.change_percent.abs() <= 3.0);

        let unknown = source.quote(&Asset::stock("ZZZ")).unwrap();
        assert!((148.0..=152.0).contains(&unknown.price));
    }

    struct Failing;

    impl PriceSource for Failing {
        fn quote(&mut self, _asset: &Asset) -> Result<Quote> {
            Err(Error::PriceSource("offline".to_string()))
        }
    }

    #[test]
    fn test_tick_emits_per_symbol() {
        let emitter = Arc::new(BroadcastEmitter::with_channel(64));
        let mut rx = emitter.subscribe().unwrap();
        let config = MarketConfig {
            symbols_per_tick: 3,
            ..MarketConfig::default()
        };
        let mut worker = MarketWorker::new(
            Box::new(MockPriceSource::seeded(3)),
            emitter.clone(),
            config,
            AlertConfig::default(),
        )
        .with_seed(3);

        let updates = worker.tick();
        assert_eq!(updates.len(), 3);
        let mut symbols: Vec<_> = updates.iter().map(|u| u.symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();
        assert_eq!(symbols.len(), 3);

        let mut market_events = 0;
        while let Ok(event) = rx.try_recv() {
            if event.event == "market_update" {
                market_events += 1;
                assert!(event.data["data"]["price"].is_number());
            }
        }
        assert_eq!(market_events, 3);
    }

    #[test]
    fn test_quote_errors_are_skipped() {
        let emitter = Arc::new(BroadcastEmitter::with_channel(8));
        let mut worker = MarketWorker::new(
            Box::new(Failing),
            emitter,
            MarketConfig::default(),
            AlertConfig::default(),
        );
        assert!(worker.tick().is_empty());
    }
}

use async_trait::async_trait;
use folio_core::market::port::{MarketError, PriceOracle};
use rand::RngExt;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// 模拟报价的统一小数位 (货币 2 位)
const PRICE_SCALE: u32 = 2;

/// # Summary
/// 纸面环境的模拟报价源：静态基准价表，每次取价叠加一个
/// 小幅随机抖动，模拟真实行情的逐笔波动。
///
/// # Invariants
/// - 返回价格严格为正：抖动后若跌破零以最小报价单位兜底。
/// - 未收录的标的直接报 `PriceUnavailable`，不做任何猜测。
pub struct MockOracle {
    quotes: HashMap<String, Decimal>,
    /// 单边最大抖动比例 (如 0.005 表示 ±0.5%)
    jitter: f64,
}

impl MockOracle {
    pub fn new(quotes: HashMap<String, Decimal>, jitter: f64) -> Self {
        Self { quotes, jitter }
    }

    /// # Logic
    /// 内置一批常见股票/加密/外汇标的的基准价，供开发与演示环境开箱即用。
    pub fn with_default_universe() -> Self {
        let mut quotes = HashMap::new();
        for (symbol, cents) in [
            ("AAPL", 18_945_i64),
            ("MSFT", 41_230),
            ("NVDA", 12_780),
            ("TSLA", 24_615),
            ("AMZN", 17_890),
            ("GOOG", 16_420),
            ("SPY", 55_340),
        ] {
            quotes.insert(symbol.to_string(), Decimal::new(cents, PRICE_SCALE));
        }
        // 加密与外汇同样走 2 位货币精度的简化报价
        quotes.insert("BTC-USD".to_string(), Decimal::new(6_732_500, PRICE_SCALE));
        quotes.insert("ETH-USD".to_string(), Decimal::new(352_060, PRICE_SCALE));
        quotes.insert("EURUSD".to_string(), Decimal::new(108, PRICE_SCALE));
        Self::new(quotes, 0.005)
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn get_price(&self, symbol: &str) -> Result<Decimal, MarketError> {
        let base = self
            .quotes
            .get(symbol)
            .copied()
            .ok_or_else(|| MarketError::PriceUnavailable(symbol.to_string()))?;

        let mut rng = rand::rng();
        let ratio: f64 = rng.random_range(-self.jitter..=self.jitter);
        let factor = Decimal::from_f64_retain(1.0 + ratio)
            .unwrap_or(Decimal::ONE);

        let mut price = (base * factor).round_dp(PRICE_SCALE);
        if price <= Decimal::ZERO {
            price = Decimal::new(1, PRICE_SCALE);
        }
        tracing::debug!("模拟报价 {} -> {}", symbol, price);
        Ok(price)
    }
}

/// # Summary
/// 完全确定性的静态报价表，测试与回放场景专用：不抖动、可热改。
pub struct StaticOracle {
    quotes: std::sync::RwLock<HashMap<String, Decimal>>,
}

impl StaticOracle {
    pub fn new(quotes: HashMap<String, Decimal>) -> Self {
        Self {
            quotes: std::sync::RwLock::new(quotes),
        }
    }

    /// 单标的快捷构造
    pub fn single(symbol: &str, price: Decimal) -> Self {
        let mut quotes = HashMap::new();
        quotes.insert(symbol.to_string(), price);
        Self::new(quotes)
    }

    /// 热更新某标的报价 (测试脚本在两次下单之间改价)
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        if let Ok(mut guard) = self.quotes.write() {
            guard.insert(symbol.to_string(), price);
        }
    }
}

#[async_trait]
impl PriceOracle for StaticOracle {
    async fn get_price(&self, symbol: &str) -> Result<Decimal, MarketError> {
        let guard = self
            .quotes
            .read()
            .map_err(|e| MarketError::FeedFailure(e.to_string()))?;
        guard
            .get(symbol)
            .copied()
            .ok_or_else(|| MarketError::PriceUnavailable(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn mock_oracle_stays_within_jitter_band() {
        let mut quotes = HashMap::new();
        quotes.insert("AAPL".to_string(), dec!(200.00));
        let oracle = MockOracle::new(quotes, 0.005);

        for _ in 0..200 {
            let price = oracle.get_price("AAPL").await.unwrap();
            assert!(price > Decimal::ZERO);
            assert!(price >= dec!(199.00) && price <= dec!(201.00), "price {} out of band", price);
            assert_eq!(price, price.round_dp(2));
        }
    }

    #[tokio::test]
    async fn mock_oracle_rejects_unknown_symbol() {
        let oracle = MockOracle::with_default_universe();
        let err = oracle.get_price("NO_SUCH").await.unwrap_err();
        assert!(matches!(err, MarketError::PriceUnavailable(_)));
    }

    #[tokio::test]
    async fn static_oracle_is_deterministic_and_mutable() {
        let oracle = StaticOracle::single("X", dec!(50.00));
        assert_eq!(oracle.get_price("X").await.unwrap(), dec!(50.00));
        oracle.set_price("X", dec!(70.00));
        assert_eq!(oracle.get_price("X").await.unwrap(), dec!(70.00));
    }
}

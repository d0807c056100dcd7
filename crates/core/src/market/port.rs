use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// # Summary
/// 行情侧可能发生的错误。
#[derive(Error, Debug)]
pub enum MarketError {
    /// 标的没有可用报价 (未收录、停牌或上游全部失败)
    #[error("标的暂无可用报价: {0}")]
    PriceUnavailable(String),

    /// 上游行情通道错误
    #[error("行情通道错误: {0}")]
    FeedFailure(String),
}

/// # Summary
/// 参考价预言机端口。对执行引擎而言这是一个同步可用的单一报价源：
/// 没有买卖价差、没有历史上下文、不保证新鲜度。
/// 真实实现背后可以是带降级链的多供应商聚合代理，也可以是
/// 静态报价表加随机抖动的模拟器——引擎不感知差异。
///
/// # Invariants
/// - 成功返回的价格必须严格为正。
/// - 失败对一次下单请求是致命的，引擎不在此边界做重试。
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// 获取标的的当前参考价
    async fn get_price(&self, symbol: &str) -> Result<Decimal, MarketError>;
}

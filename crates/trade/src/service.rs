use async_trait::async_trait;
use chrono::Utc;
use folio_core::config::TradingConfig;
use folio_core::market::port::PriceOracle;
use folio_core::trade::averager;
use folio_core::trade::entity::{
    Account, AccountId, AccountKind, AccountOverview, Order, OrderId, OrderRequest, OrderSide,
    OrderType, UserId,
};
use folio_core::trade::port::{LedgerPort, TradeError, TradePort};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// # Summary
/// `ExecutionService` 是订单执行引擎的入口调度者，实现了 `TradePort`。
/// 它编排校验 → 取价 → 资金预检 → 原子成交的完整下单链路，
/// 自身不持有任何跨请求可变状态，全部共享状态经由 `LedgerPort` 落库。
pub struct ExecutionService {
    ledger: Arc<dyn LedgerPort>,
    /// 参考价来源的抽象指针 (用于市价成交计价)
    oracle: Arc<dyn PriceOracle>,
    /// 纸面交易业务参数 (初始注资额度、默认计价货币)
    trading: TradingConfig,
}

impl ExecutionService {
    pub fn new(
        ledger: Arc<dyn LedgerPort>,
        oracle: Arc<dyn PriceOracle>,
        trading: TradingConfig,
    ) -> Self {
        Self {
            ledger,
            oracle,
            trading,
        }
    }

    /// # Logic
    /// 上游参数校验：数量必须严格为正，限价单必须携带正限价。
    /// 负数或零数量一旦放行会打穿摊薄公式，必须在此拦截。
    fn validate(request: &OrderRequest) -> Result<(), TradeError> {
        if request.quantity <= Decimal::ZERO {
            return Err(TradeError::InvalidOrder(format!(
                "委托数量必须为正: {}",
                request.quantity
            )));
        }
        if request.symbol.trim().is_empty() {
            return Err(TradeError::InvalidOrder("标的代码不能为空".to_string()));
        }
        match request.order_type {
            OrderType::Limit => match request.limit_price {
                Some(p) if p > Decimal::ZERO => Ok(()),
                _ => Err(TradeError::InvalidOrder(
                    "限价单必须携带正的限价".to_string(),
                )),
            },
            OrderType::Market => Ok(()),
        }
    }
}

#[async_trait]
impl TradePort for ExecutionService {
    /// # Logic
    /// 1. 参数校验 (数量、限价)。
    /// 2. 解析账户并校验归属——账户存在但属于别人同样报 `AccountNotFound`。
    /// 3. 向预言机取参考价，失败即终止，不落任何记录。
    /// 4. 买单按 `参考价 * 数量` 做资金预检；不足直接拒绝，
    ///    **不产生** Rejected 订单记录 (预检失败不是订单事件)。
    /// 5. 市价单交给账本做原子成交：订单落库、余额借贷、仓位摊薄
    ///    在同一事务内完成，资金校验在事务内重做以堵死预检与提交
    ///    之间的并发透支窗口。成交价就是第 3 步取到的参考价，不重取。
    /// 6. 限价单仅落库为 Pending——系统内没有撮合簿，永不自动成交。
    ///
    /// 重复提交同样参数会产生两笔独立订单：下单设计上不幂等。
    async fn place_order(
        &self,
        user_id: &UserId,
        request: OrderRequest,
    ) -> Result<Order, TradeError> {
        Self::validate(&request)?;

        // 2. 账户归属校验
        let account = self
            .ledger
            .find_account(user_id, &request.account_id)
            .await?
            .ok_or_else(|| TradeError::AccountNotFound(request.account_id.0.clone()))?;

        // 3. 参考价
        let price = self
            .oracle
            .get_price(&request.symbol)
            .await
            .map_err(|e| TradeError::PriceUnavailable(e.to_string()))?;

        // 4. 买单资金预检 (卖单不设做空保证金检查)
        let estimated = averager::estimated_cost(request.quantity, price);
        if request.side == OrderSide::Buy && account.balance < estimated {
            warn!(
                "资金预检拒绝: account={} 需要 {} 实际 {}",
                account.id.0, estimated, account.balance
            );
            return Err(TradeError::InsufficientFunds {
                required: estimated,
                actual: account.balance,
            });
        }

        let order = Order::from_request(
            OrderId(uuid::Uuid::new_v4().to_string()),
            &request,
            Utc::now(),
        );

        match request.order_type {
            OrderType::Market => {
                let filled = self
                    .ledger
                    .execute_market_fill(user_id, &order, price)
                    .await?;
                info!(
                    "市价成交: order={} {:?} {} x {} @ {}",
                    filled.id.0, filled.side, filled.symbol, filled.filled_quantity, price
                );
                Ok(filled)
            }
            OrderType::Limit => {
                // 限价单停在 Pending，等待的"未来撮合"在本系统中不存在
                self.ledger.insert_order(user_id, &order).await?;
                info!(
                    "限价单挂起: order={} {:?} {} x {} @ {:?}",
                    order.id.0, order.side, order.symbol, order.quantity, order.limit_price
                );
                Ok(order)
            }
        }
    }

    async fn get_orders(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<Order>, TradeError> {
        // 查询面同样校验归属，避免横向越权读取
        self.ledger
            .find_account(user_id, account_id)
            .await?
            .ok_or_else(|| TradeError::AccountNotFound(account_id.0.clone()))?;
        self.ledger.orders_of_account(user_id, account_id).await
    }

    async fn get_order(&self, user_id: &UserId, order_id: &OrderId) -> Result<Order, TradeError> {
        let order = self
            .ledger
            .find_order(user_id, order_id)
            .await?
            .ok_or_else(|| TradeError::OrderNotFound(order_id.0.clone()))?;
        // 归属校验走账户维度
        self.ledger
            .find_account(user_id, &order.account_id)
            .await?
            .ok_or_else(|| TradeError::OrderNotFound(order_id.0.clone()))?;
        Ok(order)
    }

    async fn get_accounts(&self, user_id: &UserId) -> Result<Vec<AccountOverview>, TradeError> {
        self.ledger.accounts_of_user(user_id).await
    }

    /// # Logic
    /// 注册时的自动开户：固定初始资金的纸面账户，锁定资金位恒为 0。
    /// 未指定货币时取配置中的默认计价货币。
    async fn open_account(
        &self,
        user_id: &UserId,
        currency: Option<&str>,
    ) -> Result<Account, TradeError> {
        let account = Account {
            id: AccountId(uuid::Uuid::new_v4().to_string()),
            user_id: user_id.clone(),
            kind: AccountKind::Paper,
            currency: currency.unwrap_or(&self.trading.currency).to_string(),
            balance: self.trading.starting_balance,
            locked_balance: Decimal::ZERO,
            created_at: Utc::now(),
        };
        self.ledger.create_account(&account).await?;
        Ok(account)
    }
}

use async_trait::async_trait;
use folio_core::trade::averager::{self, FillOutcome, Lot};
use folio_core::trade::entity::{
    Account, AccountId, AccountOverview, Order, OrderId, OrderSide, OrderStatus, Position, UserId,
};
use folio_core::trade::port::{LedgerPort, TradeError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// # Summary
/// 基于内存的账本实现，供执行引擎测试与临时部署使用。
///
/// # Invariants
/// - 与 SQLite 版语义一致：`execute_market_fill` 在一把写锁内
///   先完成全部校验再做全部写入，失败路径不留任何部分状态。
pub struct MemoryLedgerStore {
    state: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    /// 逻辑键 (account, symbol) -> 仓位
    positions: HashMap<(AccountId, String), Position>,
    /// 按插入先后保存，查询时倒序
    orders: Vec<Order>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
        }
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerPort for MemoryLedgerStore {
    async fn create_account(&self, account: &Account) -> Result<(), TradeError> {
        let mut state = self.state.write().await;
        state.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn find_account(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Option<Account>, TradeError> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .get(account_id)
            .filter(|a| a.user_id == *user_id)
            .cloned())
    }

    async fn accounts_of_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AccountOverview>, TradeError> {
        let state = self.state.read().await;
        let mut overviews: Vec<AccountOverview> = state
            .accounts
            .values()
            .filter(|a| a.user_id == *user_id)
            .map(|account| AccountOverview {
                account: account.clone(),
                positions: state
                    .positions
                    .values()
                    .filter(|p| p.account_id == account.id)
                    .cloned()
                    .collect(),
            })
            .collect();
        overviews.sort_by(|a, b| a.account.created_at.cmp(&b.account.created_at));
        Ok(overviews)
    }

    async fn insert_order(&self, user_id: &UserId, order: &Order) -> Result<(), TradeError> {
        let mut state = self.state.write().await;
        if !state
            .accounts
            .get(&order.account_id)
            .is_some_and(|a| a.user_id == *user_id)
        {
            return Err(TradeError::AccountNotFound(order.account_id.0.clone()));
        }
        state.orders.push(order.clone());
        Ok(())
    }

    /// # Logic
    /// 与 SQLite 版相同的原子成交序列，写锁即事务边界：
    /// 资金校验在锁内重做，校验通过之前不发生任何写入。
    async fn execute_market_fill(
        &self,
        user_id: &UserId,
        order: &Order,
        price: Decimal,
    ) -> Result<Order, TradeError> {
        let mut state = self.state.write().await;

        let balance = match state.accounts.get(&order.account_id) {
            Some(a) if a.user_id == *user_id => a.balance,
            _ => return Err(TradeError::AccountNotFound(order.account_id.0.clone())),
        };

        let gross = averager::estimated_cost(order.quantity, price);
        if order.side == OrderSide::Buy && balance < gross {
            return Err(TradeError::InsufficientFunds {
                required: gross,
                actual: balance,
            });
        }

        let mut filled = order.clone();
        filled.status = OrderStatus::Filled;
        filled.filled_quantity = order.quantity;
        filled.filled_price = Some(price);

        let key = (order.account_id.clone(), order.symbol.clone());
        let lot = state.positions.get(&key).map(|p| Lot {
            quantity: p.quantity,
            average_price: p.average_price,
        });
        let outcome = averager::apply_fill(lot, order.side, filled.filled_quantity, price);

        // 校验全部通过，以下写入按事务语义一次性落齐
        if let Some(account) = state.accounts.get_mut(&order.account_id) {
            account.balance += averager::balance_delta(order.side, filled.filled_quantity, price);
        }
        state.orders.push(filled.clone());
        match outcome {
            FillOutcome::Upsert(next) => {
                let entry = state.positions.entry(key).or_insert_with(|| {
                    Position::from_fill(
                        uuid::Uuid::new_v4().to_string(),
                        order.account_id.clone(),
                        order.symbol.clone(),
                        Decimal::ZERO,
                        Decimal::ZERO,
                    )
                });
                entry.quantity = next.quantity;
                entry.average_price = next.average_price;
            }
            FillOutcome::Close => {
                state.positions.remove(&key);
            }
        }

        Ok(filled)
    }

    async fn orders_of_account(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<Order>, TradeError> {
        let state = self.state.read().await;
        if !state
            .accounts
            .get(account_id)
            .is_some_and(|a| a.user_id == *user_id)
        {
            return Err(TradeError::AccountNotFound(account_id.0.clone()));
        }
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| o.account_id == *account_id)
            .cloned()
            .collect();
        orders.reverse(); // 创建时间倒序
        Ok(orders)
    }

    async fn find_order(
        &self,
        _user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<Option<Order>, TradeError> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == *order_id).cloned())
    }

    async fn positions_of_account(
        &self,
        _user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<Position>, TradeError> {
        let state = self.state.read().await;
        let mut positions: Vec<Position> = state
            .positions
            .values()
            .filter(|p| p.account_id == *account_id)
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }
}

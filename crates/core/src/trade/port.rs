use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use super::entity::{
    Account, AccountId, AccountOverview, Order, OrderId, OrderRequest, Position, UserId,
};

/// # Summary
/// 订单执行链路中可能发生的错误。
/// 四类核心失败 (账户、资金、价格、事务) 必须能被调用方明确区分，
/// 任何一种都不允许被静默吞掉。
#[derive(Error, Debug)]
pub enum TradeError {
    /// 账户不存在，或不归属当前调用用户
    #[error("账户不存在或无权访问: {0}")]
    AccountNotFound(String),

    /// 买单预检资金不足。该路径下不落任何订单记录
    #[error("可用资金不足. 需要: {required}, 实际: {actual}")]
    InsufficientFunds { required: Decimal, actual: Decimal },

    /// 行情源无法给出参考价，下单请求直接终止
    #[error("无法获取参考价: {0}")]
    PriceUnavailable(String),

    /// 原子成交序列中的任何持久化异常。回滚已保证，调用方可整单重试
    /// (重试不幂等，会产生一笔全新订单)
    #[error("事务执行失败: {0}")]
    TransactionFailure(String),

    /// 查询路径：订单未找到
    #[error("订单未找到: {0}")]
    OrderNotFound(String),

    /// 上游参数校验失败 (数量非正、限价单缺限价等)
    #[error("非法委托: {0}")]
    InvalidOrder(String),
}

/// # Summary
/// 订单执行引擎的对外端口。网关层通过它下单和查询，
/// 是业务请求进入账本核心的唯一门户。
///
/// # Invariants
/// - 实现必须是异步且线程安全的 (`Send + Sync`)。
/// - `user_id` 由上层鉴权层提供，实现内部仍须对账户做归属校验。
#[async_trait]
pub trait TradePort: Send + Sync {
    /// 提交一笔新委托
    ///
    /// # Returns
    /// * `Ok(Order)` - 持久化后的订单。市价单此时已是 Filled 并带成交价；
    ///   限价单保持 Pending。
    /// * `Err(TradeError)` - 账户、资金、价格或事务层面的失败。
    async fn place_order(
        &self,
        user_id: &UserId,
        request: OrderRequest,
    ) -> Result<Order, TradeError>;

    /// 查询某账户的全部订单，按创建时间倒序
    async fn get_orders(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<Order>, TradeError>;

    /// 查询某订单
    async fn get_order(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<Order, TradeError>;

    /// 查询用户名下全部账户，并附带各账户的打开仓位
    async fn get_accounts(&self, user_id: &UserId) -> Result<Vec<AccountOverview>, TradeError>;

    /// 为用户开设一个新的纸面账户并注入初始资金 (注册时调用)。
    /// `currency` 为 None 时取配置中的默认计价货币。
    async fn open_account(
        &self,
        user_id: &UserId,
        currency: Option<&str>,
    ) -> Result<Account, TradeError>;
}

/// # Summary
/// 账本持久化端口。核心层永远不直接接触数据库驱动，
/// 所有账户/订单/仓位的读写经由此抽象。
///
/// # Invariants
/// - `execute_market_fill` 必须是一个原子工作单元：订单落库、
///   余额变动、仓位摊薄三者要么全部提交，要么全部回滚。
/// - 资金校验必须在该事务**内部**重做一次：并发打穿预检的买单
///   要在提交点被干净地拒绝为 `InsufficientFunds`，而不是把余额打成负数。
#[async_trait]
pub trait LedgerPort: Send + Sync {
    /// 持久化一个新账户
    async fn create_account(&self, account: &Account) -> Result<(), TradeError>;

    /// 按 (用户, 账户) 查找账户，归属不符视同不存在
    async fn find_account(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Option<Account>, TradeError>;

    /// 用户名下全部账户及其仓位
    async fn accounts_of_user(&self, user_id: &UserId)
        -> Result<Vec<AccountOverview>, TradeError>;

    /// 落库一笔订单原样 (限价单的 Pending 落库路径)
    async fn insert_order(&self, user_id: &UserId, order: &Order) -> Result<(), TradeError>;

    /// 市价单的原子成交：在单个事务内完成订单写入 (Filled)、
    /// 余额借贷与仓位摊薄 (归零即删)。返回持久化后的订单。
    async fn execute_market_fill(
        &self,
        user_id: &UserId,
        order: &Order,
        price: Decimal,
    ) -> Result<Order, TradeError>;

    /// 某账户的全部订单，创建时间倒序
    async fn orders_of_account(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<Order>, TradeError>;

    /// 按订单 ID 查找
    async fn find_order(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<Option<Order>, TradeError>;

    /// 某账户的全部打开仓位
    async fn positions_of_account(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<Position>, TradeError>;
}

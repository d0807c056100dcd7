use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 系统内的唯一用户标识。由上层鉴权网关注入，核心层只做归属校验。
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserId(pub String);

/// # Summary
/// 资金账户的系统内唯一标识。
///
/// # Invariants
/// - AccountId 在整个系统中必须全局唯一。
/// - 一个用户可以持有多个账户，但每个账户只归属一个用户。
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct AccountId(pub String);

/// # Summary
/// 订单的系统内唯一标识。
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// # Summary
/// 账户类型。当前执行链路只会产生 Paper 账户，Live 仅为模式预留。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    /// 纸面模拟账户
    Paper,
    /// 实盘账户 (预留，现有逻辑不触达)
    Live,
}

/// # Summary
/// 订单的交易方向定义。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// 买入 (做多)
    Buy,
    /// 卖出 (做空)
    Sell,
}

/// # Summary
/// 订单执行类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// 市价单：请求到达后以参考价立即全量成交
    Market,
    /// 限价单：仅落库为 Pending，系统内不存在撮合簿，永不自动成交
    Limit,
}

/// # Summary
/// 订单有效期标记。仅存储，执行层当前不做到期处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// 撤单前一直有效 (默认)
    Gtc,
    /// 当日有效
    Day,
}

impl Default for TimeInForce {
    fn default() -> Self {
        Self::Gtc
    }
}

/// # Summary
/// 订单的生命周期状态。
///
/// # Invariants
/// - Pending 是唯一的非终结态。
/// - Filled / Cancelled / Rejected 为终结态，一旦进入绝不允许被改写。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// 待处理 (限价单落库后长期停留于此)
    Pending,
    /// 完全成交
    Filled,
    /// 已撤销 (撤单通道尚未开放，状态预留)
    Cancelled,
    /// 拒绝
    Rejected,
}

impl OrderStatus {
    /// 是否为终结态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

/// # Summary
/// 持仓记录的校验来源。标记这条仓位数据是如何进入系统的。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSource {
    /// 由本系统交易执行产生或手工录入
    Manual,
    /// 由 AI 解析导入 (例如对账单截图识别)
    AiImport,
    /// 通过外部券商 API 同步
    ApiLinked,
}

/// # Summary
/// 资金账户实体。余额是买单准入校验的唯一权威数字。
///
/// # Invariants
/// - balance 仅会被订单执行引擎的成交步骤修改。
/// - 账户创建后永不删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// 归属用户
    pub user_id: UserId,
    pub kind: AccountKind,
    /// 计价货币代码，如 "USD"
    pub currency: String,
    /// 可用资金余额 (2 位小数精度)
    pub balance: Decimal,
    /// 锁定资金 (为将来的保证金/挂单占用预留，现有链路恒为 0)
    pub locked_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// # Summary
/// 指定标的的持仓记录。逻辑主键为 (account, symbol)，
/// 同一账户同一标的至多存在一条打开的仓位。
///
/// # Invariants
/// - average_price 仅在 quantity != 0 时有意义。
/// - quantity 精确归零的瞬间，记录必须被删除而不是保留为 0。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub account_id: AccountId,
    pub symbol: String,
    /// 当前持有数量 (正数表示多头，负数表示空头，允许小数)
    pub quantity: Decimal,
    /// 持仓均价 (单位成本)
    pub average_price: Decimal,
    /// 数据来源
    pub source: PositionSource,
    /// 来源置信度 0..1 (AI 导入时使用)
    pub confidence: Option<Decimal>,
    /// 最近一次校验时间
    pub verified_at: Option<DateTime<Utc>>,
    /// 批量导入批次号
    pub import_batch: Option<String>,
    /// 资产类别，如 "equity" / "crypto"
    pub asset_class: Option<String>,
    /// 外部券商标识
    pub broker: Option<String>,
}

impl Position {
    /// # Logic
    /// 由本系统成交产生的标准仓位记录，校验元数据按 Manual 填充。
    pub fn from_fill(
        id: String,
        account_id: AccountId,
        symbol: String,
        quantity: Decimal,
        average_price: Decimal,
    ) -> Self {
        Self {
            id,
            account_id,
            symbol,
            quantity,
            average_price,
            source: PositionSource::Manual,
            confidence: None,
            verified_at: None,
            import_batch: None,
            asset_class: None,
            broker: None,
        }
    }
}

/// # Summary
/// 详细的逻辑订单模型。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    /// 委托数量 (绝对值)
    pub quantity: Decimal,
    /// 已成交数量。当前引擎只做全有全无成交，该字段为将来的
    /// 部分成交模型保留 schema 兼容位。
    pub filled_quantity: Decimal,
    /// 限价 (市价单为 None)
    pub limit_price: Option<Decimal>,
    /// 止损触发价 (预留，未接入)
    pub stop_price: Option<Decimal>,
    pub status: OrderStatus,
    /// 成交价 (未成交为 None)
    pub filled_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// # Logic
    /// 按委托请求创建一笔全新订单，初始状态为 Pending。
    pub fn from_request(id: OrderId, request: &OrderRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id: request.account_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            time_in_force: request.time_in_force,
            quantity: request.quantity,
            filled_quantity: Decimal::ZERO,
            limit_price: request.limit_price,
            stop_price: None,
            status: OrderStatus::Pending,
            filled_price: None,
            created_at: now,
        }
    }
}

/// # Summary
/// 下单请求。由网关层组装后递交给执行引擎。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub account_id: AccountId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
}

/// # Summary
/// 账户总览：账户本体加上其全部打开仓位，用于查询面。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountOverview {
    pub account: Account,
    pub positions: Vec<Position>,
}

//! # DTO (Data Transfer Object) 层
//!
//! 将内部领域模型转化为面向前端 JSON 输出的轻量结构体。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 Swagger 文档。
//! 金额与数量一律以十进制字符串出入，避免 JSON 浮点精度问题。

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================
//  下单相关 DTO
// ============================================================

/// 下单请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    /// 目标账户 ID
    #[schema(example = "a1b2c3d4-e5f6-7890")]
    pub account_id: String,
    /// 标的代码
    #[schema(example = "AAPL")]
    pub symbol: String,
    /// 方向 ("Buy" / "Sell")
    #[schema(example = "Buy")]
    pub side: String,
    /// 类型 ("Market" / "Limit")
    #[schema(example = "Market")]
    pub order_type: String,
    /// 有效期 ("Gtc" / "Day")，缺省 Gtc
    #[schema(example = "Gtc")]
    pub time_in_force: Option<String>,
    /// 委托数量 (十进制字符串，允许小数)
    #[schema(example = "10")]
    pub quantity: String,
    /// 限价 (限价单必填，市价单忽略)
    #[schema(example = "120.50")]
    pub limit_price: Option<String>,
}

/// 订单 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    /// 订单 ID
    #[schema(example = "ord-123456")]
    pub id: String,
    /// 归属账户 ID
    #[schema(example = "a1b2c3d4-e5f6-7890")]
    pub account_id: String,
    /// 标的代码
    #[schema(example = "NVDA")]
    pub symbol: String,
    /// 方向 (Buy/Sell)
    #[schema(example = "Buy")]
    pub side: String,
    /// 类型 (Market/Limit)
    #[schema(example = "Market")]
    pub order_type: String,
    /// 有效期
    #[schema(example = "Gtc")]
    pub time_in_force: String,
    /// 委托数量
    #[schema(example = "100")]
    pub quantity: String,
    /// 已成交数量
    #[schema(example = "100")]
    pub filled_quantity: String,
    /// 限价 (市价单为 null)
    #[schema(example = "120.50")]
    pub limit_price: Option<String>,
    /// 状态 (Pending / Filled / Cancelled / Rejected)
    #[schema(example = "Filled")]
    pub status: String,
    /// 成交价 (未成交为 null)
    #[schema(example = "121.00")]
    pub filled_price: Option<String>,
    /// 创建时间 (ISO 8601)
    #[schema(example = "2026-03-01T10:00:00Z")]
    pub created_at: String,
}

// ============================================================
//  账户相关 DTO
// ============================================================

/// 开户请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpenAccountRequest {
    /// 计价货币，缺省取服务配置的默认货币
    #[schema(example = "USD")]
    pub currency: Option<String>,
}

/// 持仓明细 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PositionResponse {
    /// 资产标的代码
    #[schema(example = "AAPL")]
    pub symbol: String,
    /// 持仓数量 (正=多头, 负=空头)
    #[schema(example = "100.00")]
    pub quantity: String,
    /// 持仓均价 (单位成本)
    #[schema(example = "175.50")]
    pub average_price: String,
    /// 数据来源 (Manual / AiImport / ApiLinked)
    #[schema(example = "Manual")]
    pub source: String,
}

/// 账户总览 DTO - 账户资金加全部打开仓位
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    /// 系统账户 ID
    #[schema(example = "a1b2c3d4-e5f6-7890")]
    pub id: String,
    /// 账户类型 (Paper / Live)
    #[schema(example = "Paper")]
    pub kind: String,
    /// 计价货币
    #[schema(example = "USD")]
    pub currency: String,
    /// 可用资金余额
    #[schema(example = "99500.00")]
    pub balance: String,
    /// 锁定资金 (预留)
    #[schema(example = "0")]
    pub locked_balance: String,
    /// 创建时间 (ISO 8601)
    #[schema(example = "2026-03-01T00:00:00Z")]
    pub created_at: String,
    /// 当前持仓列表
    pub positions: Vec<PositionResponse>,
}

// ============================================================
//  通用响应 DTO
// ============================================================

/// 统一 API 响应包装器
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 是否成功
    pub success: bool,
    /// 数据载荷 (成功时)
    pub data: Option<T>,
    /// 错误信息 (失败时)
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// 构建失败响应 (不含泛型载荷)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误信息构建
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

// ============================================================
//  领域模型 → DTO 惯用转换 (impl From<T>)
// ============================================================

impl From<folio_core::trade::entity::Order> for OrderResponse {
    fn from(o: folio_core::trade::entity::Order) -> Self {
        Self {
            id: o.id.0,
            account_id: o.account_id.0,
            symbol: o.symbol,
            side: format!("{:?}", o.side),
            order_type: format!("{:?}", o.order_type),
            time_in_force: format!("{:?}", o.time_in_force),
            quantity: o.quantity.to_string(),
            filled_quantity: o.filled_quantity.to_string(),
            limit_price: o.limit_price.map(|p| p.to_string()),
            status: format!("{:?}", o.status),
            filled_price: o.filled_price.map(|p| p.to_string()),
            created_at: o.created_at.to_rfc3339(),
        }
    }
}

impl From<folio_core::trade::entity::Position> for PositionResponse {
    fn from(p: folio_core::trade::entity::Position) -> Self {
        Self {
            symbol: p.symbol,
            quantity: p.quantity.to_string(),
            average_price: p.average_price.to_string(),
            source: format!("{:?}", p.source),
        }
    }
}

impl From<folio_core::trade::entity::AccountOverview> for AccountResponse {
    fn from(v: folio_core::trade::entity::AccountOverview) -> Self {
        Self {
            id: v.account.id.0,
            kind: format!("{:?}", v.account.kind),
            currency: v.account.currency,
            balance: v.account.balance.to_string(),
            locked_balance: v.account.locked_balance.to_string(),
            created_at: v.account.created_at.to_rfc3339(),
            positions: v.positions.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<folio_core::trade::entity::Account> for AccountResponse {
    fn from(a: folio_core::trade::entity::Account) -> Self {
        Self {
            id: a.id.0,
            kind: format!("{:?}", a.kind),
            currency: a.currency,
            balance: a.balance.to_string(),
            locked_balance: a.locked_balance.to_string(),
            created_at: a.created_at.to_rfc3339(),
            positions: Vec::new(),
        }
    }
}

use axum::extract::{Path, State};
use axum::Json;
use folio_core::trade::entity::{
    AccountId, OrderId, OrderRequest, OrderSide, OrderType, TimeInForce,
};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::ApiError;
use crate::middleware::identity::CurrentUser;
use crate::server::AppState;
use crate::types::{ApiResponse, OrderResponse, PlaceOrderRequest};

fn parse_side(s: &str) -> Result<OrderSide, ApiError> {
    match s {
        "Buy" | "buy" | "BUY" => Ok(OrderSide::Buy),
        "Sell" | "sell" | "SELL" => Ok(OrderSide::Sell),
        other => Err(ApiError::BadRequest(format!("未知方向: {}", other))),
    }
}

fn parse_order_type(s: &str) -> Result<OrderType, ApiError> {
    match s {
        "Market" | "market" | "MARKET" => Ok(OrderType::Market),
        "Limit" | "limit" | "LIMIT" => Ok(OrderType::Limit),
        other => Err(ApiError::BadRequest(format!("未知订单类型: {}", other))),
    }
}

fn parse_tif(s: Option<&str>) -> Result<TimeInForce, ApiError> {
    match s {
        None | Some("Gtc") | Some("gtc") | Some("GTC") => Ok(TimeInForce::Gtc),
        Some("Day") | Some("day") | Some("DAY") => Ok(TimeInForce::Day),
        Some(other) => Err(ApiError::BadRequest(format!("未知有效期: {}", other))),
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("{} 不是有效的十进制数: {}", field, raw)))
}

/// 提交新订单
///
/// 市价单在本次请求内同步成交并返回 Filled；限价单落库为 Pending，
/// 系统内没有撮合簿，不会被自动成交。
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "订单交易 (Trade)",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "下单成功，返回持久化后的订单", body = ApiResponse<OrderResponse>),
        (status = 400, description = "参数错误或资金不足"),
        (status = 404, description = "账户不存在或无权访问"),
        (status = 503, description = "行情源无法报价")
    )
)]
pub async fn place_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let request = OrderRequest {
        account_id: AccountId(req.account_id),
        symbol: req.symbol,
        side: parse_side(&req.side)?,
        order_type: parse_order_type(&req.order_type)?,
        time_in_force: parse_tif(req.time_in_force.as_deref())?,
        quantity: parse_decimal("quantity", &req.quantity)?,
        limit_price: req
            .limit_price
            .as_deref()
            .map(|p| parse_decimal("limit_price", p))
            .transpose()?,
    };

    let order = state.trade_port.place_order(&user, request).await?;
    Ok(Json(ApiResponse::ok(order.into())))
}

/// 查询单笔订单详情
#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_id}",
    tag = "订单交易 (Trade)",
    params(
        ("order_id" = String, Path, description = "系统订单 ID")
    ),
    responses(
        (status = 200, description = "订单详情", body = ApiResponse<OrderResponse>),
        (status = 404, description = "订单不存在或无权访问")
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let order = state
        .trade_port
        .get_order(&user, &OrderId(order_id))
        .await?;
    Ok(Json(ApiResponse::ok(order.into())))
}

/// 查询账户的订单流水 (创建时间倒序)
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}/orders",
    tag = "订单交易 (Trade)",
    params(
        ("account_id" = String, Path, description = "系统账户 ID")
    ),
    responses(
        (status = 200, description = "订单列表", body = ApiResponse<Vec<OrderResponse>>),
        (status = 404, description = "账户不存在或无权访问")
    )
)]
pub async fn get_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(account_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ApiError> {
    let orders = state
        .trade_port
        .get_orders(&user, &AccountId(account_id))
        .await?;
    Ok(Json(ApiResponse::ok(
        orders.into_iter().map(Into::into).collect(),
    )))
}

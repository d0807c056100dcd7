use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::middleware::identity::CurrentUser;
use crate::server::AppState;
use crate::types::{AccountResponse, ApiResponse, OpenAccountRequest};

/// 查询当前用户的全部账户，附带各账户打开仓位
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    tag = "账户 (Account)",
    responses(
        (status = 200, description = "账户总览列表", body = ApiResponse<Vec<AccountResponse>>),
        (status = 401, description = "缺少用户身份")
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<AccountResponse>>>, ApiError> {
    let accounts = state.trade_port.get_accounts(&user).await?;
    Ok(Json(ApiResponse::ok(
        accounts.into_iter().map(Into::into).collect(),
    )))
}

/// 开设新的纸面账户 (注册流程调用，自动注入初始资金；
/// 未指定货币时使用服务配置的默认计价货币)
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "账户 (Account)",
    request_body = OpenAccountRequest,
    responses(
        (status = 200, description = "开户成功", body = ApiResponse<AccountResponse>),
        (status = 401, description = "缺少用户身份")
    )
)]
pub async fn open_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<OpenAccountRequest>,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = state
        .trade_port
        .open_account(&user, req.currency.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(account.into())))
}

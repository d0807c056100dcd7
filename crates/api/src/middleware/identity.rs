//! # 身份提取
//!
//! 鉴权本体 (JWT 签发、会话管理) 位于本服务边界之外，由前置网关完成。
//! 这里只信任前置层注入的 `x-user-id` 请求头并转成强类型身份；
//! 账户归属的业务校验仍由执行引擎自己做，不依赖这一层。

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use folio_core::trade::entity::UserId;

use crate::error::ApiError;

/// 前置鉴权层注入的用户身份头
pub const USER_ID_HEADER: &str = "x-user-id";

/// 在 Handler 中提取当前用户的快捷方式
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                tracing::warn!("请求缺少 {} 身份头", USER_ID_HEADER);
                ApiError::Unauthorized(format!("缺少 {} 请求头", USER_ID_HEADER))
            })?;

        Ok(CurrentUser(UserId(raw.to_string())))
    }
}

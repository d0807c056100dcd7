//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 的 DI 容器持有并调用。

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use folio_core::trade::port::TradePort;

use crate::routes::{account, trade};

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - `trade_port` 在服务启动前由 DI 容器注入，生命周期与进程等同。
#[derive(Clone)]
pub struct AppState {
    /// 订单执行与查询端口
    pub trade_port: Arc<dyn TradePort>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Folio 纸面交易 API",
        version = "0.1.0",
        description = "Folio 纸面交易账本的 RESTful API 网关。提供下单、订单流水与账户持仓查询。",
        license(name = "MIT")
    ),
    tags(
        (name = "账户 (Account)", description = "账户开设、资产与持仓查询"),
        (name = "订单交易 (Trade)", description = "下单与订单流水查询")
    )
)]
pub struct ApiDoc;

// ============================================================
//  服务构建与启动
// ============================================================

/// 构建完整的 axum 应用路由树 (测试可直接复用，不绑定端口)。
pub fn build_router(state: AppState) -> Router {
    let api_router = OpenApiRouter::new()
        .routes(routes!(account::list_accounts))
        .routes(routes!(account::open_account))
        .routes(routes!(trade::place_order))
        .routes(routes!(trade::get_order))
        .routes(routes!(trade::get_orders));

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(api_router)
        .with_state(state)
        .split_for_parts();

    // CORS: 开发阶段允许所有来源
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}

/// 绑定端口并启动 HTTP 监听，直到收到退出信号。
///
/// # Arguments
/// * `state` - 由外部 DI 容器注入的共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"0.0.0.0:8080"`
pub async fn start_server(
    state: AppState,
    bind_addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state);

    tracing::info!("🚀 Folio API Server listening on {}", bind_addr);
    tracing::info!("📖 Swagger UI: http://{}/swagger-ui/", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _sig = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received. Exiting...");
        })
        .await?;

    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use folio_api::server::{start_server, AppState};
use folio_core::config::AppConfig;
use folio_market::oracle::MockOracle;
use folio_store::ledger::SqliteLedgerStore;
use folio_trade::service::ExecutionService;
use tracing::info;

/// # Summary
/// 从磁盘与环境变量加载应用配置。
///
/// # Logic
/// 1. 可选读取工作目录下的 `folio.toml`。
/// 2. 叠加 `FOLIO__` 前缀的环境变量（如 `FOLIO__SERVER__PORT=9090`）。
/// 3. 均缺失时回退到内置默认值。
fn load_config() -> AppConfig {
    let loaded = config::Config::builder()
        .add_source(config::File::with_name("folio").required(false))
        .add_source(config::Environment::with_prefix("FOLIO").separator("__"))
        .build()
        .and_then(|c| c.try_deserialize::<AppConfig>());

    match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("配置加载失败，使用内置默认值: {}", e);
            AppConfig::default()
        }
    }
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 HTTP 服务。
///
/// # Logic
/// 1. 初始化全局日志。
/// 2. 加载配置并设定数据目录。
/// 3. 实例化基础设施层（Oracle、LedgerStore）。
/// 4. 构造应用服务层（ExecutionService）。
/// 5. 启动 HTTP 服务，挂起等待外部信号退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    info!("Folio starting...");

    // 2. 加载配置
    let cfg = load_config();
    folio_store::config::set_data_dir(PathBuf::from(&cfg.database.data_dir));

    // 3. 实例化基础设施层
    let ledger = Arc::new(SqliteLedgerStore::new()?);
    let oracle = Arc::new(MockOracle::with_default_universe());

    // 4. 构造应用服务层（注入 Core Trait 抽象）
    let trade_service = Arc::new(ExecutionService::new(ledger, oracle, cfg.trading.clone()));

    let state = AppState {
        trade_port: trade_service,
    };

    // 5. 启动 HTTP 服务（内部处理 ctrl_c 优雅退出）
    let bind_addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    start_server(state, &bind_addr).await?;

    Ok(())
}

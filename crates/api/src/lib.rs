//! # Folio API
//!
//! 账本核心之上的 REST 网关：下单、订单流水、账户与持仓查询。
//! 鉴权本体在系统边界之外完成，网关只消费上游注入的用户身份，
//! 业务归属校验仍由执行引擎自行把关。

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

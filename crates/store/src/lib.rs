//! # Folio Store
//!
//! `LedgerPort` 的持久化适配器：
//! - [`ledger::SqliteLedgerStore`]：SQLite 落盘实现，一户一库，
//!   成交路径在单个数据库事务内完成订单/余额/仓位三元写入。
//! - [`memory::MemoryLedgerStore`]：内存实现，供执行引擎测试与
//!   临时环境使用，语义与落盘版保持一致。

pub mod config;
pub mod ledger;
pub mod memory;

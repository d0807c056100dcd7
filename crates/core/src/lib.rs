//! # Folio Core
//!
//! 纸面交易账本系统的领域核心：实体定义、端口抽象与错误分类。
//! 本 crate 不依赖任何具体基础设施（数据库、HTTP、行情源），
//! 所有外设通过 `port` 模块中的 Trait 注入。

pub mod config;
pub mod market;
pub mod trade;

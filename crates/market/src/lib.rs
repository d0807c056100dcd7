//! # Folio Market
//!
//! 参考价预言机的具体适配器。执行引擎只依赖
//! `folio_core::market::port::PriceOracle`，本 crate 提供两种实现：
//! 带随机抖动的模拟报价表 (`MockOracle`) 与完全确定性的
//! 静态报价表 (`StaticOracle`)。

pub mod oracle;

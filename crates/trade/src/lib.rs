//! # Folio Trade
//!
//! 纸面交易订单执行引擎：校验、取价、资金预检、原子成交编排与查询面。

pub mod service;

pub mod averager;
pub mod entity;
pub mod port;

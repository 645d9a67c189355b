//! 各 crate 共用的小工具：日志、工作区路径、`umbra.toml`

pub mod config;
pub mod init_log;
pub mod resource;

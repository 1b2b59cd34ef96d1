//! # yuan-core
//!
//! Yuan 媒体源核心库, 提供错误类型、时间基与时间戳等基础类型.
//!
//! 流通道 (`yuan-source`) 及上层工具共用本 crate 的定义.

pub mod error;
pub mod media_type;
pub mod rational;
pub mod timestamp;

// 重导出常用类型
pub use error::{YuanError, YuanResult};
pub use media_type::MediaType;
pub use rational::Rational;
pub use timestamp::Timestamp;

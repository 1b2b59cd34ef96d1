//! # Yuan (源)
//!
//! 纯 Rust 实现的媒体源流通道.
//!
//! 解封装器把样本交给流通道, 播放管线按需拉取:
//! - **流通道**: 请求/样本队列按先进先出配对投递
//! - **背压**: 缓冲低于水位时请求生产者读取更多数据
//! - **生命周期**: Stopped / Started / Paused / Shutdown 状态机
//! - **事件**: 状态变化与样本投递通过有序事件队列通知消费者
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use yuan::source::{MediaSource, SourceConfig, StartPosition, StreamDescriptor};
//!
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//! let source = MediaSource::new(
//!     vec![StreamDescriptor::audio(0, "aac", 44100, 2)],
//!     Arc::new(tx),
//!     SourceConfig::default(),
//! )?;
//! source.start(StartPosition::Current)?;
//! source.streams()[0].request_sample(None)?;
//! # Ok::<(), yuan::core::YuanError>(())
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `yuan-core` | 错误类型, 时间基与时间戳 |
//! | `yuan-source` | 流通道, 事件队列与媒体源 |

pub mod logging;

/// 核心类型与错误定义
pub use yuan_core as core;

/// 流通道与媒体源
pub use yuan_source as source;

/// 获取 Yuan 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! # yuan-source
//!
//! 媒体源的基本流通道库.
//!
//! 上游解析器 (生产者) 把样本交给 [`StreamChannel`], 下游消费者通过
//! [`StreamChannel::request_sample`] 拉取; 通道按请求顺序配对投递,
//! 并在缓冲不足时向生产者请求更多数据.
//!
//! 同一个 [`MediaSource`] 下的所有通道共享一把锁, 跨通道的判断
//! (例如所有流均已结束) 因此总能看到一致的状态.

pub mod channel;
pub mod config;
pub mod descriptor;
pub mod event;
pub mod event_queue;
pub mod producer;
pub mod sample;
pub mod source;

mod lock;

// 重导出常用类型
pub use channel::{StreamChannel, StreamState};
pub use config::{LOW_WATERMARK, SourceConfig};
pub use descriptor::{AudioParams, StreamDescriptor, StreamParams, VideoParams};
pub use event::{MediaEvent, StartPosition};
pub use event_queue::{EventQueue, ReceiveFlags, ReceiveResult};
pub use producer::{Producer, ProducerRequest};
pub use sample::{RequestToken, Sample};
pub use source::MediaSource;

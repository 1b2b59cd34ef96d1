//! 媒体源共享锁.
//!
//! 同一媒体源的所有通道状态都放在一把 [`Mutex`] 后面. 通道句柄持有
//! `Arc<SourceLock>` 而不持有 [`MediaSource`](crate::MediaSource) 本身,
//! 关闭之后仍能加锁观察到关闭状态, 且不会形成引用环.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use yuan_core::YuanError;

use crate::channel::{ChannelState, StreamState};
use crate::event::MediaEvent;
use crate::event_queue::EventQueue;
use crate::producer::Producer;

/// 锁内状态
pub(crate) struct SourceInner {
    /// 媒体源自身的状态
    pub(crate) state: StreamState,
    /// 各通道状态, 下标即通道句柄中的 index
    pub(crate) channels: Vec<ChannelState>,
    /// 媒体源事件队列, 兼作错误上报目标; 关闭后为 None
    pub(crate) events: Option<Arc<EventQueue>>,
    /// 是否已发出 EndOfPresentation
    pub(crate) presentation_ended: bool,
}

/// 媒体源共享锁
pub(crate) struct SourceLock {
    inner: Mutex<SourceInner>,
    producer: Arc<dyn Producer>,
}

impl SourceLock {
    pub(crate) fn new(inner: SourceInner, producer: Arc<dyn Producer>) -> Self {
        Self {
            inner: Mutex::new(inner),
            producer,
        }
    }

    /// 加锁, guard 离开作用域时解锁
    pub(crate) fn lock(&self) -> MutexGuard<'_, SourceInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn producer(&self) -> &dyn Producer {
        self.producer.as_ref()
    }
}

/// 通道在一次加锁期间可以访问的外部协作方
pub(crate) struct SourceLinks<'a> {
    pub(crate) producer: &'a dyn Producer,
    pub(crate) source_events: Option<&'a EventQueue>,
}

impl SourceLinks<'_> {
    /// 向媒体源上报错误事件, 上报失败只记日志
    pub(crate) fn report_error(&self, err: YuanError) {
        let Some(events) = self.source_events else {
            debug!("媒体源事件队列已释放, 丢弃错误: {}", err);
            return;
        };
        if let Err(e) = events.enqueue(MediaEvent::Error(err)) {
            debug!("上报错误事件失败: {}", e);
        }
    }
}

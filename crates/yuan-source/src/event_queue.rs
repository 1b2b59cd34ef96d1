//! 事件队列.
//!
//! 先进先出的事件队列, 支持三种取事件方式:
//! - [`EventQueue::receive_now`]: 同步获取, 可选择阻塞等待或立即返回
//! - [`EventQueue::begin_receive`] / [`EventQueue::end_receive`]: 回调式异步获取,
//!   回调在 tokio 运行时的任务中执行, 不会在入队方的调用栈上触发
//! - [`EventQueue::next_event`]: async 获取
//!
//! 关闭后队列丢弃积压事件, 所有调用返回 `AlreadyShutdown`.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log::trace;
use tokio::sync::Notify;
use yuan_core::{YuanError, YuanResult};

use crate::event::MediaEvent;

/// 同步获取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveFlags {
    /// 队列为空时阻塞等待
    Wait,
    /// 队列为空时立即返回 `NoEventAvailable`
    NoWait,
}

/// 异步获取的结果, 交给回调后再由 [`EventQueue::end_receive`] 取出事件
#[derive(Debug)]
pub struct ReceiveResult {
    result: YuanResult<MediaEvent>,
}

/// 事件队列
pub struct EventQueue {
    inner: Mutex<QueueInner>,
    /// 唤醒同步阻塞的接收方
    available: Condvar,
    /// 唤醒 async 接收方
    notify: Notify,
}

struct QueueInner {
    events: VecDeque<MediaEvent>,
    shutdown: bool,
    /// 是否存在未完成的 begin_receive
    receiving: bool,
}

impl EventQueue {
    /// 创建空队列
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                events: VecDeque::new(),
                shutdown: false,
                receiving: false,
            }),
            available: Condvar::new(),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 事件入队
    pub fn enqueue(&self, event: MediaEvent) -> YuanResult<()> {
        let mut inner = self.lock();
        if inner.shutdown {
            return Err(YuanError::AlreadyShutdown);
        }
        trace!("事件入队: {}", event.name());
        inner.events.push_back(event);
        drop(inner);

        self.available.notify_one();
        self.notify.notify_one();
        Ok(())
    }

    /// 同步获取下一个事件
    pub fn receive_now(&self, flags: ReceiveFlags) -> YuanResult<MediaEvent> {
        let mut inner = self.lock();
        loop {
            if inner.shutdown {
                return Err(YuanError::AlreadyShutdown);
            }
            if let Some(event) = inner.events.pop_front() {
                return Ok(event);
            }
            if flags == ReceiveFlags::NoWait {
                return Err(YuanError::NoEventAvailable);
            }
            inner = self
                .available
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// 异步获取下一个事件
    pub async fn next_event(&self) -> YuanResult<MediaEvent> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.lock();
                if inner.shutdown {
                    return Err(YuanError::AlreadyShutdown);
                }
                if let Some(event) = inner.events.pop_front() {
                    return Ok(event);
                }
            }
            notified.await;
        }
    }

    /// 开始一次回调式获取
    ///
    /// 下一个事件到达 (或队列关闭) 时, 在 tokio 任务中调用 `callback`.
    /// 同一时刻只允许一个未完成的获取, 需在当前 tokio 运行时内调用.
    pub fn begin_receive<F>(self: &Arc<Self>, callback: F) -> YuanResult<()>
    where
        F: FnOnce(ReceiveResult) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| YuanError::Unexpected(format!("没有可用的 tokio 运行时: {e}")))?;

        {
            let mut inner = self.lock();
            if inner.shutdown {
                return Err(YuanError::AlreadyShutdown);
            }
            if inner.receiving {
                return Err(YuanError::MultipleBegin);
            }
            inner.receiving = true;
        }

        let queue = Arc::clone(self);
        runtime.spawn(async move {
            let result = queue.next_event().await;
            queue.lock().receiving = false;
            callback(ReceiveResult { result });
        });
        Ok(())
    }

    /// 结束回调式获取, 取出事件
    pub fn end_receive(&self, result: ReceiveResult) -> YuanResult<MediaEvent> {
        result.result
    }

    /// 关闭队列, 丢弃积压事件并唤醒所有等待方
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        if inner.shutdown {
            return;
        }
        inner.shutdown = true;
        let dropped = inner.events.len();
        inner.events.clear();
        drop(inner);

        if dropped > 0 {
            trace!("事件队列关闭, 丢弃 {} 个事件", dropped);
        }
        self.available.notify_all();
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// 是否已关闭
    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    /// 积压事件数
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// 是否没有积压事件
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

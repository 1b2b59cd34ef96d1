//! 基本流通道.
//!
//! [`StreamChannel`] 是对外的句柄, 每个操作先获取媒体源共享锁,
//! 再作用于锁内的 [`ChannelState`]. 通道状态机与分发引擎见子模块.

mod dispatch;
mod state;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use yuan_core::{YuanError, YuanResult};

use crate::descriptor::StreamDescriptor;
use crate::event::{MediaEvent, StartPosition};
use crate::event_queue::{EventQueue, ReceiveFlags, ReceiveResult};
use crate::lock::{SourceLinks, SourceLock};
use crate::sample::{RequestToken, Sample};

pub(crate) use state::ChannelState;
pub use state::StreamState;

/// 基本流通道句柄
///
/// 可以克隆, 所有克隆共享同一份锁内状态.
#[derive(Clone)]
pub struct StreamChannel {
    shared: Arc<SourceLock>,
    index: usize,
    id: u32,
}

impl StreamChannel {
    pub(crate) fn new(shared: Arc<SourceLock>, index: usize, id: u32) -> Self {
        Self { shared, index, id }
    }

    /// 流 id
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 加锁后对通道状态执行 `f`
    fn with_state<R>(
        &self,
        f: impl FnOnce(&mut ChannelState, &SourceLinks<'_>) -> YuanResult<R>,
    ) -> YuanResult<R> {
        let mut guard = self.shared.lock();
        let inner = &mut *guard;
        let links = SourceLinks {
            producer: self.shared.producer(),
            source_events: inner.events.as_deref(),
        };
        let channel = inner
            .channels
            .get_mut(self.index)
            .ok_or(YuanError::StreamNotFound(self.id))?;
        f(channel, &links)
    }

    /// 请求一个样本
    ///
    /// `token` 会挂在投递给本次请求的样本上, 可以为空.
    ///
    /// # 返回
    /// - `Err(AlreadyShutdown)`: 通道已关闭
    /// - `Err(InvalidRequest)`: 通道已停止或未激活
    /// - `Err(EndOfStream)`: 已到达流末尾且没有缓冲样本
    pub fn request_sample(&self, token: Option<RequestToken>) -> YuanResult<()> {
        self.with_state(|channel, links| channel.request_sample(token, links))
    }

    /// 生产者投递一个样本
    pub fn deliver_sample(&self, sample: Sample) -> YuanResult<()> {
        self.with_state(|channel, links| channel.deliver_sample(sample, links))
    }

    /// 开始或恢复, 恢复时立即分发暂停期间积压的请求
    pub fn start(&self, position: StartPosition) -> YuanResult<()> {
        self.with_state(|channel, links| channel.start(position, links))
    }

    /// 暂停, 暂停期间不投递样本
    pub fn pause(&self) -> YuanResult<()> {
        self.with_state(|channel, _| channel.pause())
    }

    /// 停止, 丢弃所有积压的请求与样本
    pub fn stop(&self) -> YuanResult<()> {
        self.with_state(|channel, _| channel.stop())
    }

    /// 关闭通道, 不可逆
    pub fn shutdown(&self) -> YuanResult<()> {
        self.with_state(|channel, _| channel.shutdown())
    }

    /// 激活或停用, 停用时丢弃所有积压的请求与样本
    pub fn activate(&self, active: bool) -> YuanResult<()> {
        self.with_state(|channel, _| channel.activate(active))
    }

    /// 生产者通知本流不会再有新样本
    pub fn end_of_stream(&self) -> YuanResult<()> {
        self.with_state(|channel, links| channel.end_of_stream(links))
    }

    /// 是否需要生产者提供更多数据
    pub fn needs_data(&self) -> bool {
        self.with_state(|channel, _| Ok(channel.needs_data()))
            .unwrap_or(false)
    }

    /// 流描述, 关闭后返回 `Unexpected`
    pub fn descriptor(&self) -> YuanResult<StreamDescriptor> {
        self.with_state(|channel, _| channel.descriptor().cloned())
    }

    /// 当前状态
    pub fn state(&self) -> StreamState {
        self.with_state(|channel, _| Ok(channel.state()))
            .unwrap_or(StreamState::Shutdown)
    }

    /// 是否处于激活状态
    pub fn is_active(&self) -> bool {
        self.with_state(|channel, _| Ok(channel.is_active()))
            .unwrap_or(false)
    }

    /// 是否已收到流末尾通知
    pub fn is_end_of_stream(&self) -> bool {
        self.with_state(|channel, _| Ok(channel.is_end_of_stream()))
            .unwrap_or(false)
    }

    /// 缓冲中的样本数
    pub fn queued_samples(&self) -> usize {
        self.with_state(|channel, _| Ok(channel.queued_samples()))
            .unwrap_or(0)
    }

    /// 等待中的请求数
    pub fn pending_requests(&self) -> usize {
        self.with_state(|channel, _| Ok(channel.pending_requests()))
            .unwrap_or(0)
    }

    /// 取出通道事件队列的句柄
    fn event_queue(&self) -> YuanResult<Arc<EventQueue>> {
        self.with_state(|channel, _| channel.event_queue())
    }

    /// 同步获取通道事件
    ///
    /// 阻塞等待发生在锁外, 不影响同一媒体源的其他通道.
    pub fn receive_now(&self, flags: ReceiveFlags) -> YuanResult<MediaEvent> {
        let queue = self.event_queue()?;
        queue.receive_now(flags)
    }

    /// 开始回调式获取通道事件
    pub fn begin_receive<F>(&self, callback: F) -> YuanResult<()>
    where
        F: FnOnce(ReceiveResult) + Send + 'static,
    {
        self.with_state(|channel, _| channel.event_queue()?.begin_receive(callback))
    }

    /// 结束回调式获取, 取出事件
    pub fn end_receive(&self, result: ReceiveResult) -> YuanResult<MediaEvent> {
        self.with_state(|channel, _| channel.event_queue()?.end_receive(result))
    }

    /// async 获取通道事件
    pub async fn next_event(&self) -> YuanResult<MediaEvent> {
        let queue = self.event_queue()?;
        queue.next_event().await
    }

    /// 向通道事件队列追加事件
    pub fn queue_event(&self, event: MediaEvent) -> YuanResult<()> {
        self.with_state(|channel, _| channel.emit(event))
    }
}

impl std::fmt::Debug for StreamChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamChannel")
            .field("id", &self.id)
            .field("index", &self.index)
            .finish()
    }
}

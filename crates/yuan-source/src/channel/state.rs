//! 通道状态与生命周期状态机.
//!
//! 状态: `Stopped` (初始) / `Started` / `Paused` / `Shutdown` (终态).
//! `Shutdown` 之外的三个状态之间可以任意切换; 进入 `Shutdown` 后
//! 除流描述查询外的所有操作都返回 `AlreadyShutdown`.
//! 激活标志与这四个状态正交.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use log::debug;
use yuan_core::{YuanError, YuanResult};

use crate::descriptor::StreamDescriptor;
use crate::event::{MediaEvent, StartPosition};
use crate::event_queue::EventQueue;
use crate::lock::SourceLinks;
use crate::sample::{RequestToken, Sample};

/// 通道状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// 已停止 (初始状态)
    Stopped,
    /// 播放中
    Started,
    /// 已暂停
    Paused,
    /// 已关闭 (终态)
    Shutdown,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Shutdown => "shutdown",
        };
        write!(f, "{name}")
    }
}

/// 锁内的通道状态
pub(crate) struct ChannelState {
    pub(super) id: u32,
    pub(super) state: StreamState,
    pub(super) active: bool,
    /// 流末尾锁存, 置位后不再复位
    pub(super) end_of_stream: bool,
    /// 是否已发出 EndOfStream 事件
    pub(super) eos_notified: bool,
    pub(super) requests: VecDeque<Option<RequestToken>>,
    pub(super) samples: VecDeque<Sample>,
    pub(super) events: Option<Arc<EventQueue>>,
    descriptor: Option<StreamDescriptor>,
    pub(super) low_watermark: usize,
}

impl ChannelState {
    pub(crate) fn new(descriptor: StreamDescriptor, low_watermark: usize) -> Self {
        Self {
            id: descriptor.id,
            state: StreamState::Stopped,
            active: false,
            end_of_stream: false,
            eos_notified: false,
            requests: VecDeque::new(),
            samples: VecDeque::new(),
            events: Some(Arc::new(EventQueue::new())),
            descriptor: Some(descriptor),
            low_watermark,
        }
    }

    pub(crate) fn check_shutdown(&self) -> YuanResult<()> {
        if self.state == StreamState::Shutdown {
            return Err(YuanError::AlreadyShutdown);
        }
        Ok(())
    }

    pub(crate) fn event_queue(&self) -> YuanResult<Arc<EventQueue>> {
        self.check_shutdown()?;
        self.events.clone().ok_or(YuanError::AlreadyShutdown)
    }

    /// 向通道事件队列追加事件
    pub(crate) fn emit(&self, event: MediaEvent) -> YuanResult<()> {
        self.check_shutdown()?;
        match &self.events {
            Some(events) => events.enqueue(event),
            None => Err(YuanError::AlreadyShutdown),
        }
    }

    /// 丢弃积压的请求与样本, 不发送任何事件
    fn clear_queues(&mut self) {
        if !self.samples.is_empty() || !self.requests.is_empty() {
            debug!(
                "流 {}: 丢弃 {} 个样本, {} 个请求",
                self.id,
                self.samples.len(),
                self.requests.len()
            );
        }
        self.samples.clear();
        self.requests.clear();
    }

    pub(crate) fn start(
        &mut self,
        position: StartPosition,
        links: &SourceLinks<'_>,
    ) -> YuanResult<()> {
        self.check_shutdown()?;
        self.emit(MediaEvent::StreamStarted {
            stream_id: self.id,
            position,
        })?;
        debug!("流 {}: {} -> started", self.id, self.state);
        self.state = StreamState::Started;

        // 从暂停恢复时可能有积压的请求
        self.dispatch(links);
        Ok(())
    }

    pub(crate) fn pause(&mut self) -> YuanResult<()> {
        self.check_shutdown()?;
        debug!("流 {}: {} -> paused", self.id, self.state);
        self.state = StreamState::Paused;
        self.emit(MediaEvent::StreamPaused { stream_id: self.id })
    }

    pub(crate) fn stop(&mut self) -> YuanResult<()> {
        self.check_shutdown()?;
        self.clear_queues();
        debug!("流 {}: {} -> stopped", self.id, self.state);
        self.state = StreamState::Stopped;
        self.emit(MediaEvent::StreamStopped { stream_id: self.id })
    }

    pub(crate) fn shutdown(&mut self) -> YuanResult<()> {
        self.check_shutdown()?;
        debug!("流 {}: {} -> shutdown", self.id, self.state);
        self.state = StreamState::Shutdown;

        if let Some(events) = self.events.take() {
            events.shutdown();
        }
        self.clear_queues();
        self.descriptor = None;
        Ok(())
    }

    pub(crate) fn activate(&mut self, active: bool) -> YuanResult<()> {
        self.check_shutdown()?;
        if self.active == active {
            return Ok(());
        }
        debug!("流 {}: active={}", self.id, active);
        self.active = active;
        if !active {
            self.clear_queues();
        }
        Ok(())
    }

    pub(crate) fn end_of_stream(&mut self, links: &SourceLinks<'_>) -> YuanResult<()> {
        self.check_shutdown()?;
        if !self.end_of_stream {
            debug!("流 {}: 生产者已无更多样本", self.id);
        }
        self.end_of_stream = true;
        self.dispatch(links);
        Ok(())
    }

    pub(crate) fn descriptor(&self) -> YuanResult<&StreamDescriptor> {
        let descriptor = self
            .descriptor
            .as_ref()
            .ok_or_else(|| YuanError::Unexpected("流描述已释放".into()))?;
        self.check_shutdown()?;
        Ok(descriptor)
    }

    pub(crate) fn state(&self) -> StreamState {
        self.state
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// 流末尾已锁存且 EndOfStream 事件已发出
    pub(crate) fn is_drained(&self) -> bool {
        self.end_of_stream && self.eos_notified
    }

    pub(crate) fn queued_samples(&self) -> usize {
        self.samples.len()
    }

    pub(crate) fn pending_requests(&self) -> usize {
        self.requests.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::test_support::{Harness, drain};
    use crate::event_queue::ReceiveFlags;

    #[test]
    fn test_state_初始为停止且未激活() {
        let h = Harness::new();
        assert_eq!(h.channel.state(), StreamState::Stopped);
        assert!(!h.channel.is_active());
        assert!(!h.channel.is_end_of_stream());
    }

    #[test]
    fn test_state_开始暂停停止事件() {
        let mut h = Harness::started();
        assert!(h.channel.pause().is_ok());
        assert_eq!(h.channel.state(), StreamState::Paused);
        assert!(h.channel.stop().is_ok());
        assert_eq!(h.channel.state(), StreamState::Stopped);

        let names: Vec<_> = drain(&h.channel).iter().map(|e| e.name()).collect();
        assert_eq!(names, ["StreamStarted", "StreamPaused", "StreamStopped"]);
    }

    #[test]
    fn test_state_停止丢弃队列() {
        let mut h = Harness::started();
        assert!(h.deliver(1).is_ok());
        assert!(h.deliver(2).is_ok());
        assert!(h.deliver(3).is_ok());
        assert!(h.channel.stop().is_ok());
        assert_eq!(h.channel.queued_samples(), 0);
        assert_eq!(h.channel.pending_requests(), 0);
    }

    #[test]
    fn test_state_关闭释放资源() {
        let mut h = Harness::started();
        assert!(h.deliver(1).is_ok());
        let queue = match h.channel.event_queue() {
            Ok(queue) => queue,
            Err(err) => panic!("获取事件队列失败: {}", err),
        };

        assert!(h.channel.shutdown().is_ok());
        assert_eq!(h.channel.state(), StreamState::Shutdown);
        assert_eq!(h.channel.queued_samples(), 0);
        assert_eq!(h.channel.pending_requests(), 0);
        assert!(h.channel.events.is_none());
        assert!(queue.is_shutdown());
        assert!(matches!(
            h.channel.descriptor(),
            Err(YuanError::Unexpected(_))
        ));
        assert_eq!(
            queue.receive_now(ReceiveFlags::NoWait).err(),
            Some(YuanError::AlreadyShutdown)
        );
    }

    #[test]
    fn test_state_关闭后操作均失败() {
        let mut h = Harness::started();
        assert!(h.channel.shutdown().is_ok());

        let (channel, links) = h.split();
        let position = StartPosition::Current;
        assert_eq!(
            channel.start(position, &links).err(),
            Some(YuanError::AlreadyShutdown)
        );
        assert_eq!(channel.pause().err(), Some(YuanError::AlreadyShutdown));
        assert_eq!(channel.stop().err(), Some(YuanError::AlreadyShutdown));
        assert_eq!(channel.shutdown().err(), Some(YuanError::AlreadyShutdown));
        assert_eq!(
            channel.activate(false).err(),
            Some(YuanError::AlreadyShutdown)
        );
        assert_eq!(
            channel.end_of_stream(&links).err(),
            Some(YuanError::AlreadyShutdown)
        );
        assert!(!h.channel.needs_data());
        // 关闭错误只返回给调用方, 不上报
        assert!(h.source_events.is_empty());
    }

    #[test]
    fn test_state_重复激活为空操作() {
        let mut h = Harness::started();
        assert!(h.deliver(1).is_ok());
        assert!(h.channel.activate(true).is_ok());
        assert_eq!(h.channel.queued_samples(), 1);
        assert!(h.channel.activate(false).is_ok());
        assert_eq!(h.channel.queued_samples(), 0);
        assert!(h.channel.activate(false).is_ok());
        assert!(!h.channel.is_active());
    }
}

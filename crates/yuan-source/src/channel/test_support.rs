//! 通道单元测试的公共设施.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use yuan_core::{YuanError, YuanResult};

use super::state::ChannelState;
use crate::config::LOW_WATERMARK;
use crate::descriptor::StreamDescriptor;
use crate::event::{MediaEvent, StartPosition};
use crate::event_queue::{EventQueue, ReceiveFlags};
use crate::lock::SourceLinks;
use crate::producer::{Producer, ProducerRequest};
use crate::sample::{RequestToken, Sample};

/// 记录所有回调的生产者
#[derive(Default)]
pub(crate) struct RecordingProducer {
    calls: Mutex<Vec<ProducerRequest>>,
    failing: AtomicBool,
}

impl RecordingProducer {
    /// 取走已记录的回调
    pub(crate) fn take(&self) -> Vec<ProducerRequest> {
        match self.calls.lock() {
            Ok(mut calls) => std::mem::take(&mut *calls),
            Err(err) => panic!("生产者记录锁中毒: {}", err),
        }
    }

    /// 之后的回调都返回失败
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, request: ProducerRequest) -> YuanResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(YuanError::Dispatch("模拟生产者失败".into()));
        }
        Ok(())
    }
}

impl Producer for RecordingProducer {
    fn on_need_more_data(&self, stream_id: u32) -> YuanResult<()> {
        self.record(ProducerRequest::NeedData(stream_id))
    }

    fn on_aggregate_end_of_stream(&self) -> YuanResult<()> {
        self.record(ProducerRequest::EndOfStream)
    }
}

/// 脱离媒体源单独驱动一个通道状态
pub(crate) struct Harness {
    pub(crate) channel: ChannelState,
    pub(crate) producer: RecordingProducer,
    pub(crate) source_events: EventQueue,
}

impl Harness {
    /// 初始状态: 已停止, 未激活
    pub(crate) fn new() -> Self {
        let descriptor = StreamDescriptor::audio(0, "aac", 44100, 2);
        Self {
            channel: ChannelState::new(descriptor, LOW_WATERMARK),
            producer: RecordingProducer::default(),
            source_events: EventQueue::new(),
        }
    }

    /// 已激活并开始; 清空开始时产生的生产者回调, 保留通道事件
    pub(crate) fn started() -> Self {
        let mut h = Self::new();
        if let Err(err) = h.channel.activate(true) {
            panic!("激活失败: {}", err);
        }
        if let Err(err) = h.start() {
            panic!("开始失败: {}", err);
        }
        h.producer.take();
        h
    }

    pub(crate) fn split(&mut self) -> (&mut ChannelState, SourceLinks<'_>) {
        let links = SourceLinks {
            producer: &self.producer,
            source_events: Some(&self.source_events),
        };
        (&mut self.channel, links)
    }

    pub(crate) fn start(&mut self) -> YuanResult<()> {
        let (channel, links) = self.split();
        channel.start(StartPosition::Current, &links)
    }

    pub(crate) fn end_of_stream(&mut self) -> YuanResult<()> {
        let (channel, links) = self.split();
        channel.end_of_stream(&links)
    }

    pub(crate) fn request(&mut self, token: Option<RequestToken>) -> YuanResult<()> {
        let (channel, links) = self.split();
        channel.request_sample(token, &links)
    }

    /// 投递一个 pts 为 `pts` 的样本
    pub(crate) fn deliver(&mut self, pts: i64) -> YuanResult<()> {
        let mut sample = Sample::from_data(vec![pts as u8; 4]);
        sample.pts = pts;
        sample.dts = pts;
        let (channel, links) = self.split();
        channel.deliver_sample(sample, &links)
    }
}

/// 取出队列中所有积压事件
pub(crate) fn drain_queue(queue: &EventQueue) -> Vec<MediaEvent> {
    let mut events = Vec::new();
    while let Ok(event) = queue.receive_now(ReceiveFlags::NoWait) {
        events.push(event);
    }
    events
}

/// 取出通道事件队列中所有积压事件
pub(crate) fn drain(channel: &ChannelState) -> Vec<MediaEvent> {
    match channel.event_queue() {
        Ok(queue) => drain_queue(&queue),
        Err(_) => Vec::new(),
    }
}

//! 媒体源.
//!
//! 持有共享锁与媒体源事件队列, 为每条流创建一个 [`StreamChannel`].
//! 媒体源级的开始/暂停/停止/关闭转发给各通道, 并在所有激活的流都到达
//! 末尾时发出 `EndOfPresentation`.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info};
use yuan_core::{YuanError, YuanResult};

use crate::channel::{ChannelState, StreamChannel, StreamState};
use crate::config::SourceConfig;
use crate::descriptor::StreamDescriptor;
use crate::event::{MediaEvent, StartPosition};
use crate::event_queue::{EventQueue, ReceiveFlags, ReceiveResult};
use crate::lock::{SourceInner, SourceLinks, SourceLock};
use crate::producer::Producer;

/// 媒体源
pub struct MediaSource {
    shared: Arc<SourceLock>,
    channels: Vec<StreamChannel>,
}

impl MediaSource {
    /// 按流描述创建媒体源
    ///
    /// 默认选中 (`selected`) 的流创建后即处于激活状态.
    pub fn new(
        descriptors: Vec<StreamDescriptor>,
        producer: Arc<dyn Producer>,
        config: SourceConfig,
    ) -> YuanResult<Self> {
        config.validate()?;
        if descriptors.is_empty() {
            return Err(YuanError::InvalidArgument("媒体源至少需要一条流".into()));
        }
        let mut ids = HashSet::new();
        for desc in &descriptors {
            if !ids.insert(desc.id) {
                return Err(YuanError::InvalidArgument(format!(
                    "流 id 重复: {}",
                    desc.id
                )));
            }
        }

        let ids: Vec<u32> = descriptors.iter().map(|d| d.id).collect();
        let mut states = Vec::with_capacity(descriptors.len());
        for desc in descriptors {
            let selected = desc.selected;
            let mut state = ChannelState::new(desc, config.low_watermark);
            state.activate(selected)?;
            states.push(state);
        }

        let shared = Arc::new(SourceLock::new(
            SourceInner {
                state: StreamState::Stopped,
                channels: states,
                events: Some(Arc::new(EventQueue::new())),
                presentation_ended: false,
            },
            producer,
        ));
        let channels: Vec<StreamChannel> = ids
            .into_iter()
            .enumerate()
            .map(|(index, id)| StreamChannel::new(Arc::clone(&shared), index, id))
            .collect();

        debug!("媒体源创建完成, 共 {} 条流", channels.len());
        Ok(Self { shared, channels })
    }

    /// 所有流通道
    pub fn streams(&self) -> &[StreamChannel] {
        &self.channels
    }

    /// 按 id 查找流通道
    pub fn stream(&self, id: u32) -> YuanResult<&StreamChannel> {
        self.channels
            .iter()
            .find(|c| c.id() == id)
            .ok_or(YuanError::StreamNotFound(id))
    }

    /// 当前状态
    pub fn state(&self) -> StreamState {
        self.shared.lock().state
    }

    /// 是否已关闭
    pub fn is_shutdown(&self) -> bool {
        self.state() == StreamState::Shutdown
    }

    /// 加锁, 检查关闭后对锁内状态执行 `f`
    fn with_inner<R>(
        &self,
        f: impl FnOnce(&mut SourceInner, &SourceLinks<'_>) -> YuanResult<R>,
    ) -> YuanResult<R> {
        let mut guard = self.shared.lock();
        if guard.state == StreamState::Shutdown {
            return Err(YuanError::AlreadyShutdown);
        }
        let inner = &mut *guard;
        let events = inner.events.clone();
        let links = SourceLinks {
            producer: self.shared.producer(),
            source_events: events.as_deref(),
        };
        f(inner, &links)
    }

    /// 开始播放, 所有激活的流随之开始
    pub fn start(&self, position: StartPosition) -> YuanResult<()> {
        self.with_inner(|inner, links| {
            for channel in inner.channels.iter_mut().filter(|c| is_playing(c)) {
                channel.start(position, links)?;
            }
            inner.state = StreamState::Started;
            info!("媒体源开始播放");
            emit(inner, MediaEvent::SourceStarted { position })
        })
    }

    /// 暂停, 仅在播放中有效
    pub fn pause(&self) -> YuanResult<()> {
        self.with_inner(|inner, _| {
            if inner.state != StreamState::Started {
                return Err(YuanError::InvalidRequest(format!(
                    "媒体源处于 {} 状态, 不能暂停",
                    inner.state
                )));
            }
            for channel in inner.channels.iter_mut().filter(|c| is_playing(c)) {
                channel.pause()?;
            }
            inner.state = StreamState::Paused;
            info!("媒体源暂停");
            emit(inner, MediaEvent::SourcePaused)
        })
    }

    /// 停止, 激活的流以及播放中被取消选中的流都随之停止
    pub fn stop(&self) -> YuanResult<()> {
        self.with_inner(|inner, _| {
            let needs_stop = |c: &&mut ChannelState| {
                c.state() != StreamState::Shutdown
                    && (c.is_active() || c.state() != StreamState::Stopped)
            };
            for channel in inner.channels.iter_mut().filter(needs_stop) {
                channel.stop()?;
            }
            inner.state = StreamState::Stopped;
            info!("媒体源停止");
            emit(inner, MediaEvent::SourceStopped)
        })
    }

    /// 关闭媒体源与所有流, 不可逆
    pub fn shutdown(&self) -> YuanResult<()> {
        self.with_inner(|inner, _| {
            // 单独关闭过的流跳过
            for channel in inner
                .channels
                .iter_mut()
                .filter(|c| c.state() != StreamState::Shutdown)
            {
                channel.shutdown()?;
            }
            if let Some(events) = inner.events.take() {
                events.shutdown();
            }
            inner.state = StreamState::Shutdown;
            info!("媒体源已关闭");
            Ok(())
        })
    }

    /// 选中或取消选中一条流
    pub fn select_stream(&self, id: u32, selected: bool) -> YuanResult<()> {
        self.stream(id)?.activate(selected)
    }

    /// 生产者读到容器末尾, 通知所有流不会再有新样本
    pub fn end_of_data(&self) -> YuanResult<()> {
        self.with_inner(|inner, links| {
            for channel in inner.channels.iter_mut().filter(|c| c.is_active()) {
                channel.end_of_stream(links)?;
            }
            Ok(())
        })
    }

    /// 处理一次流末尾汇总
    ///
    /// 所有激活的流都已投递完末尾样本时发出一次 `EndOfPresentation`,
    /// 返回本次是否发出.
    pub fn end_of_stream_reached(&self) -> YuanResult<bool> {
        self.with_inner(|inner, _| {
            if inner.presentation_ended {
                return Ok(false);
            }
            // 单独关闭的流不再参与汇总
            let mut active = inner.channels.iter().filter(|c| is_playing(c)).peekable();
            if active.peek().is_none() {
                return Ok(false);
            }
            if !active.all(|c| c.is_drained()) {
                return Ok(false);
            }
            inner.presentation_ended = true;
            info!("所有流均已结束");
            emit(inner, MediaEvent::EndOfPresentation)?;
            Ok(true)
        })
    }

    fn event_queue(&self) -> YuanResult<Arc<EventQueue>> {
        self.with_inner(|inner, _| inner.events.clone().ok_or(YuanError::AlreadyShutdown))
    }

    /// 同步获取媒体源事件, 阻塞等待发生在锁外
    pub fn receive_now(&self, flags: ReceiveFlags) -> YuanResult<MediaEvent> {
        self.event_queue()?.receive_now(flags)
    }

    /// 开始回调式获取媒体源事件
    pub fn begin_receive<F>(&self, callback: F) -> YuanResult<()>
    where
        F: FnOnce(ReceiveResult) + Send + 'static,
    {
        self.event_queue()?.begin_receive(callback)
    }

    /// 结束回调式获取
    pub fn end_receive(&self, result: ReceiveResult) -> YuanResult<MediaEvent> {
        self.event_queue()?.end_receive(result)
    }

    /// async 获取媒体源事件
    pub async fn next_event(&self) -> YuanResult<MediaEvent> {
        let queue = self.event_queue()?;
        queue.next_event().await
    }
}

/// 激活且未关闭的流才跟随媒体源的播放状态
fn is_playing(channel: &ChannelState) -> bool {
    channel.is_active() && channel.state() != StreamState::Shutdown
}

fn emit(inner: &SourceInner, event: MediaEvent) -> YuanResult<()> {
    match &inner.events {
        Some(events) => events.enqueue(event),
        None => Err(YuanError::AlreadyShutdown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::test_support::{RecordingProducer, drain_queue};
    use crate::producer::ProducerRequest;
    use crate::sample::Sample;
    use yuan_core::Rational;

    fn make_source(producer: Arc<RecordingProducer>) -> MediaSource {
        let descriptors = vec![
            StreamDescriptor::video(0, "h264", 640, 360, Rational::new(25, 1)),
            StreamDescriptor::audio(1, "aac", 44100, 2),
            StreamDescriptor::audio(2, "mp3", 44100, 2).with_selected(false),
        ];
        match MediaSource::new(descriptors, producer, SourceConfig::default()) {
            Ok(source) => source,
            Err(err) => panic!("创建媒体源失败: {}", err),
        }
    }

    fn source_events(source: &MediaSource) -> Vec<MediaEvent> {
        match source.event_queue() {
            Ok(queue) => drain_queue(&queue),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_source_创建参数校验() {
        let producer = Arc::new(RecordingProducer::default());
        let empty = MediaSource::new(Vec::new(), producer.clone(), SourceConfig::default());
        assert!(matches!(empty, Err(YuanError::InvalidArgument(_))));

        let dup = vec![
            StreamDescriptor::audio(1, "aac", 44100, 2),
            StreamDescriptor::audio(1, "aac", 44100, 2),
        ];
        let dup = MediaSource::new(dup, producer, SourceConfig::default());
        assert!(matches!(dup, Err(YuanError::InvalidArgument(_))));
    }

    #[test]
    fn test_source_默认选中决定激活() {
        let source = make_source(Arc::new(RecordingProducer::default()));
        assert_eq!(source.streams().len(), 3);
        assert!(source.streams()[0].is_active());
        assert!(source.streams()[1].is_active());
        assert!(!source.streams()[2].is_active());
        assert_eq!(source.stream(9).err(), Some(YuanError::StreamNotFound(9)));
    }

    #[test]
    fn test_source_开始只启动激活的流() {
        let producer = Arc::new(RecordingProducer::default());
        let source = make_source(producer.clone());
        assert!(source.start(StartPosition::Current).is_ok());

        assert_eq!(source.streams()[0].state(), StreamState::Started);
        assert_eq!(source.streams()[1].state(), StreamState::Started);
        assert_eq!(source.streams()[2].state(), StreamState::Stopped);
        assert_eq!(
            producer.take(),
            [ProducerRequest::NeedData(0), ProducerRequest::NeedData(1)]
        );
        assert!(matches!(
            source_events(&source).as_slice(),
            [MediaEvent::SourceStarted { .. }]
        ));
    }

    #[test]
    fn test_source_未播放时不能暂停() {
        let source = make_source(Arc::new(RecordingProducer::default()));
        assert!(matches!(
            source.pause(),
            Err(YuanError::InvalidRequest(_))
        ));
        assert!(source.start(StartPosition::Current).is_ok());
        assert!(source.pause().is_ok());
        assert_eq!(source.state(), StreamState::Paused);
        assert_eq!(source.streams()[0].state(), StreamState::Paused);
    }

    #[test]
    fn test_source_所有流结束后发出一次结束事件() {
        let producer = Arc::new(RecordingProducer::default());
        let source = make_source(producer.clone());
        assert!(source.start(StartPosition::Current).is_ok());
        source_events(&source);

        let video = &source.streams()[0];
        let audio = &source.streams()[1];
        assert!(video.deliver_sample(Sample::from_data(vec![0u8; 8])).is_ok());
        assert!(source.end_of_data().is_ok());

        // 音频已排空, 视频还有一个样本未被请求
        assert!(!source.end_of_stream_reached().unwrap_or(true));
        assert!(video.request_sample(None).is_ok());
        assert!(audio.is_end_of_stream());

        let eos_calls = producer
            .take()
            .into_iter()
            .filter(|r| *r == ProducerRequest::EndOfStream)
            .count();
        assert_eq!(eos_calls, 2);

        assert_eq!(source.end_of_stream_reached(), Ok(true));
        assert_eq!(source.end_of_stream_reached(), Ok(false));
        assert!(matches!(
            source_events(&source).as_slice(),
            [MediaEvent::EndOfPresentation]
        ));
    }

    #[test]
    fn test_source_跳过单独关闭的流开始与暂停() {
        let source = make_source(Arc::new(RecordingProducer::default()));
        assert!(source.streams()[1].shutdown().is_ok());

        assert!(source.start(StartPosition::Current).is_ok());
        assert_eq!(source.state(), StreamState::Started);
        assert_eq!(source.streams()[0].state(), StreamState::Started);
        assert_eq!(source.streams()[1].state(), StreamState::Shutdown);
        assert!(matches!(
            source_events(&source).as_slice(),
            [MediaEvent::SourceStarted { .. }]
        ));

        assert!(source.pause().is_ok());
        assert_eq!(source.streams()[0].state(), StreamState::Paused);
        assert!(source.stop().is_ok());
        assert_eq!(source.streams()[0].state(), StreamState::Stopped);
    }

    #[test]
    fn test_source_单独关闭的流不阻止结束事件() {
        let source = make_source(Arc::new(RecordingProducer::default()));
        assert!(source.start(StartPosition::Current).is_ok());
        assert!(source.streams()[1].shutdown().is_ok());
        source_events(&source);

        let video = &source.streams()[0];
        assert!(video.deliver_sample(Sample::from_data(vec![0u8; 8])).is_ok());
        assert!(video.end_of_stream().is_ok());
        assert_eq!(source.end_of_stream_reached(), Ok(false));
        assert!(video.request_sample(None).is_ok());

        assert_eq!(source.end_of_stream_reached(), Ok(true));
        assert!(matches!(
            source_events(&source).as_slice(),
            [MediaEvent::EndOfPresentation]
        ));
    }

    #[test]
    fn test_source_停止包含播放中取消选中的流() {
        let source = make_source(Arc::new(RecordingProducer::default()));
        assert!(source.start(StartPosition::Current).is_ok());
        assert!(source.select_stream(1, false).is_ok());
        assert_eq!(source.streams()[1].state(), StreamState::Started);

        assert!(source.stop().is_ok());
        assert_eq!(source.streams()[0].state(), StreamState::Stopped);
        assert_eq!(source.streams()[1].state(), StreamState::Stopped);

        // 从未开始的流不产生停止事件
        let idle = &source.streams()[2];
        assert_eq!(idle.state(), StreamState::Stopped);
        assert_eq!(
            idle.receive_now(ReceiveFlags::NoWait).err(),
            Some(YuanError::NoEventAvailable)
        );

        // 重新选中后随媒体源一起开始
        assert!(source.select_stream(1, true).is_ok());
        assert!(source.start(StartPosition::Current).is_ok());
        assert_eq!(source.streams()[1].state(), StreamState::Started);
    }

    #[test]
    fn test_source_请求失败上报到媒体源() {
        let source = make_source(Arc::new(RecordingProducer::default()));
        let audio = &source.streams()[1];
        assert!(matches!(
            audio.request_sample(None),
            Err(YuanError::InvalidRequest(_))
        ));
        assert!(matches!(
            source_events(&source).as_slice(),
            [MediaEvent::Error(YuanError::InvalidRequest(_))]
        ));
    }

    #[test]
    fn test_source_关闭() {
        let source = make_source(Arc::new(RecordingProducer::default()));
        let audio = source.streams()[1].clone();
        assert!(audio.shutdown().is_ok());

        assert!(source.shutdown().is_ok());
        assert!(source.is_shutdown());
        assert_eq!(source.shutdown().err(), Some(YuanError::AlreadyShutdown));
        assert_eq!(
            source.start(StartPosition::Current).err(),
            Some(YuanError::AlreadyShutdown)
        );
        assert_eq!(
            source.receive_now(ReceiveFlags::NoWait).err(),
            Some(YuanError::AlreadyShutdown)
        );
        for channel in source.streams() {
            assert_eq!(channel.state(), StreamState::Shutdown);
        }
        // 通道句柄在媒体源关闭后仍可安全调用
        assert_eq!(
            audio.request_sample(None).err(),
            Some(YuanError::AlreadyShutdown)
        );
    }
}

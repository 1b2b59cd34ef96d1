//! 模拟会话: 合成生产者按背压请求产出样本, 每条流一个消费者按需拉取.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow, bail};
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use yuan_core::{Rational, Timestamp, YuanError, YuanResult};
use yuan_source::{
    MediaEvent, MediaSource, ProducerRequest, RequestToken, Sample, SourceConfig, StartPosition,
    StreamChannel, StreamDescriptor,
};

/// 视频样本时长 (毫秒)
const VIDEO_SAMPLE_MS: i64 = 40;
/// 音频样本时长 (毫秒, AAC 1024 采样 @ 44.1kHz)
const AUDIO_SAMPLE_MS: i64 = 23;
/// 关键帧间隔
const GOP_SIZE: u32 = 25;

/// 模拟参数
#[derive(Debug, Clone)]
pub struct SimOptions {
    pub video_streams: u32,
    pub audio_streams: u32,
    pub samples_per_stream: u32,
    pub timeout_secs: u64,
    pub config: SourceConfig,
}

/// 单条流的投递统计
#[derive(Debug, Clone, Serialize)]
pub struct StreamStats {
    pub id: u32,
    pub media_type: String,
    pub codec_name: String,
    pub samples: u64,
    pub bytes: u64,
    pub ended: bool,
}

/// 模拟结果
#[derive(Debug, Serialize)]
pub struct SimSummary {
    pub streams: Vec<StreamStats>,
    /// 媒体源收到的错误事件数 (不含流末尾后的拉取)
    pub errors: u32,
    pub elapsed_ms: u128,
}

fn build_descriptors(options: &SimOptions) -> Vec<StreamDescriptor> {
    let video = (0..options.video_streams)
        .map(|id| StreamDescriptor::video(id, "h264", 1280, 720, Rational::new(25, 1)));
    let audio = (0..options.audio_streams)
        .map(|i| StreamDescriptor::audio(options.video_streams + i, "aac", 44100, 2));
    video.chain(audio).collect()
}

/// 运行一次模拟, 直到所有流结束或超时
pub async fn run(options: SimOptions) -> anyhow::Result<SimSummary> {
    if options.video_streams + options.audio_streams == 0 {
        bail!("至少需要一条流");
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let source = Arc::new(MediaSource::new(
        build_descriptors(&options),
        Arc::new(tx),
        options.config.clone(),
    )?);
    let started_at = Instant::now();

    let producer = tokio::spawn(produce(
        Arc::clone(&source),
        rx,
        options.samples_per_stream,
    ));

    source.start(StartPosition::At(Timestamp::from_hns(0)))?;
    info!(
        "模拟开始: {} 条流, 每条 {} 个样本",
        source.streams().len(),
        options.samples_per_stream
    );

    let consumers: Vec<_> = source
        .streams()
        .iter()
        .cloned()
        .map(|channel| tokio::spawn(consume(channel)))
        .collect();

    let waited = tokio::time::timeout(
        Duration::from_secs(options.timeout_secs),
        wait_for_presentation_end(&source),
    )
    .await;
    let errors = match waited {
        Ok(result) => result?,
        Err(_) => {
            producer.abort();
            for consumer in &consumers {
                consumer.abort();
            }
            source.shutdown()?;
            return Err(anyhow!("模拟超时 ({} 秒)", options.timeout_secs));
        }
    };

    let mut streams = Vec::with_capacity(consumers.len());
    for consumer in consumers {
        streams.push(consumer.await.context("消费任务异常退出")??);
    }
    producer.await.context("生产任务异常退出")??;
    source.shutdown()?;

    Ok(SimSummary {
        streams,
        errors,
        elapsed_ms: started_at.elapsed().as_millis(),
    })
}

/// 合成第 `index` 个样本
fn synth_sample(desc: &StreamDescriptor, index: u32) -> Sample {
    let (size, duration, keyframe) = match desc.media_type {
        yuan_core::MediaType::Video => {
            let keyframe = index % GOP_SIZE == 0;
            (if keyframe { 4096 } else { 1024 }, VIDEO_SAMPLE_MS, keyframe)
        }
        _ => (256, AUDIO_SAMPLE_MS, true),
    };
    let mut sample = Sample::from_data(Bytes::from(vec![(index & 0xff) as u8; size]));
    sample.pts = i64::from(index) * duration;
    sample.dts = sample.pts;
    sample.duration = duration;
    sample.time_base = desc.time_base;
    sample.stream_id = desc.id;
    sample.is_keyframe = keyframe;
    sample
}

/// 生产者任务: 响应 NeedData 投递样本, 产完后锁存流末尾
async fn produce(
    source: Arc<MediaSource>,
    mut rx: UnboundedReceiver<ProducerRequest>,
    total: u32,
) -> YuanResult<()> {
    let mut produced: HashMap<u32, u32> = HashMap::new();
    while let Some(request) = rx.recv().await {
        match request {
            ProducerRequest::NeedData(id) => {
                let channel = source.stream(id)?;
                let count = produced.entry(id).or_default();
                if *count >= total {
                    channel.end_of_stream()?;
                    continue;
                }
                let desc = channel.descriptor()?;
                channel.deliver_sample(synth_sample(&desc, *count))?;
                *count += 1;
                if *count == total {
                    debug!("流 {}: 样本已全部产出", id);
                    channel.end_of_stream()?;
                }
            }
            ProducerRequest::EndOfStream => {
                if source.end_of_stream_reached()? {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// 消费者任务: 保持一个未完成的请求, 收到样本后再拉下一个
async fn consume(channel: StreamChannel) -> YuanResult<StreamStats> {
    let desc = channel.descriptor()?;
    let mut stats = StreamStats {
        id: desc.id,
        media_type: desc.media_type.to_string(),
        codec_name: desc.codec_name.clone(),
        samples: 0,
        bytes: 0,
        ended: false,
    };

    if !request_next(&channel, &mut stats)? {
        return Ok(stats);
    }
    loop {
        let event = match channel.next_event().await {
            Ok(event) => event,
            // 超时后媒体源被关闭, 已收到的统计照常返回
            Err(err) if err.is_shutdown() => {
                debug!("流 {}: 通道已关闭, 停止消费", desc.id);
                break;
            }
            Err(err) => return Err(err),
        };
        match event {
            MediaEvent::MediaSample(sample) => {
                let token = sample.token().and_then(|t| t.downcast_ref::<u64>()).copied();
                if token != Some(stats.samples) {
                    warn!("流 {}: 令牌不匹配, 期望 {}, 实际 {:?}", desc.id, stats.samples, token);
                }
                stats.samples += 1;
                stats.bytes += sample.size() as u64;
                if !request_next(&channel, &mut stats)? {
                    break;
                }
            }
            MediaEvent::EndOfStream { .. } => {
                stats.ended = true;
                break;
            }
            _ => {}
        }
    }
    debug!("流 {}: 消费结束, 共 {} 个样本", desc.id, stats.samples);
    Ok(stats)
}

/// 发出下一个请求, 已到流末尾时返回 false
fn request_next(channel: &StreamChannel, stats: &mut StreamStats) -> YuanResult<bool> {
    match channel.request_sample(Some(RequestToken::new(stats.samples))) {
        Ok(()) => Ok(true),
        Err(YuanError::EndOfStream) => {
            stats.ended = true;
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

async fn wait_for_presentation_end(source: &MediaSource) -> YuanResult<u32> {
    let mut errors = 0;
    loop {
        let event = source.next_event().await?;
        match event.status() {
            // 消费者在流末尾之后的请求, 属正常收尾
            Err(YuanError::EndOfStream) => {}
            Err(err) => {
                warn!("媒体源错误事件: {}", err);
                errors += 1;
            }
            Ok(()) if matches!(event, MediaEvent::EndOfPresentation) => return Ok(errors),
            Ok(()) => debug!("媒体源事件: {}", event.name()),
        }
    }
}

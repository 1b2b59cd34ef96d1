//! 媒体事件定义.
//!
//! 通道与媒体源通过事件队列向消费者报告状态变化与样本投递.
//! 同一队列中的事件按入队顺序交付.

use yuan_core::{Timestamp, YuanError};

use crate::sample::Sample;

/// 起播位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// 从当前位置继续
    Current,
    /// 从指定时间开始
    At(Timestamp),
}

/// 媒体事件
#[derive(Debug, Clone)]
pub enum MediaEvent {
    /// 流已开始
    StreamStarted {
        /// 流 id
        stream_id: u32,
        /// 起播位置
        position: StartPosition,
    },
    /// 流已暂停
    StreamPaused {
        /// 流 id
        stream_id: u32,
    },
    /// 流已停止
    StreamStopped {
        /// 流 id
        stream_id: u32,
    },
    /// 样本就绪
    MediaSample(Sample),
    /// 流已结束
    EndOfStream {
        /// 流 id
        stream_id: u32,
    },
    /// 错误
    Error(YuanError),
    /// 媒体源已开始
    SourceStarted {
        /// 起播位置
        position: StartPosition,
    },
    /// 媒体源已暂停
    SourcePaused,
    /// 媒体源已停止
    SourceStopped,
    /// 所有流均已结束
    EndOfPresentation,
}

impl MediaEvent {
    /// 事件名称, 用于日志
    pub fn name(&self) -> &'static str {
        match self {
            Self::StreamStarted { .. } => "StreamStarted",
            Self::StreamPaused { .. } => "StreamPaused",
            Self::StreamStopped { .. } => "StreamStopped",
            Self::MediaSample(_) => "MediaSample",
            Self::EndOfStream { .. } => "EndOfStream",
            Self::Error(_) => "Error",
            Self::SourceStarted { .. } => "SourceStarted",
            Self::SourcePaused => "SourcePaused",
            Self::SourceStopped => "SourceStopped",
            Self::EndOfPresentation => "EndOfPresentation",
        }
    }

    /// 若为样本事件, 返回样本
    pub fn sample(&self) -> Option<&Sample> {
        match self {
            Self::MediaSample(sample) => Some(sample),
            _ => None,
        }
    }

    /// 事件附带的状态码, 仅错误事件非空
    pub fn status(&self) -> Result<(), &YuanError> {
        match self {
            Self::Error(err) => Err(err),
            _ => Ok(()),
        }
    }
}

//! 流描述.
//!
//! 描述一条基本流的媒体类型, 编解码器与参数. 由解封装器在枚举流时生成,
//! 通道在整个生命周期内持有, 关闭时释放.

use bytes::Bytes;
use yuan_core::{MediaType, Rational};

/// 流描述
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// 流 id (在媒体源内唯一)
    pub id: u32,
    /// 媒体类型
    pub media_type: MediaType,
    /// 编解码器名称 (如 "h264", "aac")
    pub codec_name: String,
    /// 时间基
    pub time_base: Rational,
    /// 流时长 (以 time_base 为单位, -1 表示未知)
    pub duration: i64,
    /// 编解码器私有数据 (如 AVCDecoderConfigurationRecord)
    pub extra_data: Bytes,
    /// 流特定参数
    pub params: StreamParams,
    /// 元数据 (标题, 语言等)
    pub metadata: Vec<(String, String)>,
    /// 默认是否选中
    pub selected: bool,
}

/// 流特定参数
#[derive(Debug, Clone, PartialEq)]
pub enum StreamParams {
    /// 视频流参数
    Video(VideoParams),
    /// 音频流参数
    Audio(AudioParams),
    /// 其他
    Other,
}

/// 视频流参数
#[derive(Debug, Clone, PartialEq)]
pub struct VideoParams {
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 帧率
    pub frame_rate: Rational,
}

/// 音频流参数
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u32,
    /// 采样位深
    pub bits_per_sample: u32,
}

impl StreamDescriptor {
    /// 创建音频流描述, 时间基为毫秒
    pub fn audio(id: u32, codec_name: impl Into<String>, sample_rate: u32, channels: u32) -> Self {
        Self {
            id,
            media_type: MediaType::Audio,
            codec_name: codec_name.into(),
            time_base: Rational::MILLI,
            duration: -1,
            extra_data: Bytes::new(),
            params: StreamParams::Audio(AudioParams {
                sample_rate,
                channels,
                bits_per_sample: 16,
            }),
            metadata: Vec::new(),
            selected: true,
        }
    }

    /// 创建视频流描述, 时间基为毫秒
    pub fn video(
        id: u32,
        codec_name: impl Into<String>,
        width: u32,
        height: u32,
        frame_rate: Rational,
    ) -> Self {
        Self {
            id,
            media_type: MediaType::Video,
            codec_name: codec_name.into(),
            time_base: Rational::MILLI,
            duration: -1,
            extra_data: Bytes::new(),
            params: StreamParams::Video(VideoParams {
                width,
                height,
                frame_rate,
            }),
            metadata: Vec::new(),
            selected: true,
        }
    }

    /// 设置默认选中状态
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// 查询元数据
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

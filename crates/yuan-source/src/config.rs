//! 媒体源配置.

use serde::{Deserialize, Serialize};
use yuan_core::{YuanError, YuanResult};

/// 每个通道尽量预先缓冲的样本数
pub const LOW_WATERMARK: usize = 2;

/// 媒体源配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    /// 样本队列低水位, 低于此值时向生产者请求数据
    #[serde(default = "default_low_watermark")]
    pub low_watermark: usize,
}

fn default_low_watermark() -> usize {
    LOW_WATERMARK
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            low_watermark: default_low_watermark(),
        }
    }
}

impl SourceConfig {
    /// 校验配置
    pub fn validate(&self) -> YuanResult<()> {
        if self.low_watermark == 0 {
            return Err(YuanError::InvalidArgument(
                "low_watermark 必须大于 0".into(),
            ));
        }
        Ok(())
    }
}

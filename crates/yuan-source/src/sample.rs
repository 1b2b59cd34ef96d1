//! 媒体样本与请求令牌.
//!
//! 样本是生产者已经解析好的一帧压缩数据, 进入通道后归通道所有,
//! 直到随 [`MediaEvent::MediaSample`](crate::MediaEvent::MediaSample) 交给消费者.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use yuan_core::Rational;
use yuan_core::timestamp::NOPTS_VALUE;

/// 请求令牌
///
/// 消费者在拉取时附带的不透明句柄, 投递时原样挂在对应样本上,
/// 供消费者把样本与请求关联起来.
#[derive(Clone)]
pub struct RequestToken(Arc<dyn Any + Send + Sync>);

impl RequestToken {
    /// 用任意值创建令牌
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// 按具体类型取回令牌内容
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// 是否为同一个令牌
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestToken(..)")
    }
}

/// 媒体样本
#[derive(Debug, Clone)]
pub struct Sample {
    /// 压缩数据
    pub data: Bytes,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 解码时间戳 (DTS)
    pub dts: i64,
    /// 样本时长 (以 time_base 为单位)
    pub duration: i64,
    /// 时间基
    pub time_base: Rational,
    /// 所属流的 id
    pub stream_id: u32,
    /// 是否为关键帧
    pub is_keyframe: bool,
    /// 投递时附加的请求令牌
    token: Option<RequestToken>,
}

impl Sample {
    /// 创建空样本
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: NOPTS_VALUE,
            dts: NOPTS_VALUE,
            duration: 0,
            time_base: Rational::UNDEFINED,
            stream_id: 0,
            is_keyframe: false,
            token: None,
        }
    }

    /// 从数据创建样本
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 附加的请求令牌
    pub fn token(&self) -> Option<&RequestToken> {
        self.token.as_ref()
    }

    /// 附加请求令牌, 覆盖已有令牌
    pub fn set_token(&mut self, token: RequestToken) {
        self.token = Some(token);
    }

    /// 取走请求令牌
    pub fn take_token(&mut self) -> Option<RequestToken> {
        self.token.take()
    }
}

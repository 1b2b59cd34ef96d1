//! 统一错误类型定义.
//!
//! 同步调用直接返回 [`YuanError`]; 分发过程中的失败则通过事件队列异步上报,
//! 两者共用同一套错误码.

use thiserror::Error;

/// Yuan 统一错误类型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YuanError {
    /// 对象已关闭 (shutdown 之后的任何调用)
    #[error("对象已关闭")]
    AlreadyShutdown,

    /// 当前状态下不接受该请求 (流已停止或未激活)
    #[error("无效请求: {0}")]
    InvalidRequest(String),

    /// 已到达流末尾且没有缓冲样本
    #[error("已到达流末尾")]
    EndOfStream,

    /// 分发样本或发送事件时失败
    #[error("分发失败: {0}")]
    Dispatch(String),

    /// 事件队列当前为空 (非阻塞接收)
    #[error("没有可用事件")]
    NoEventAvailable,

    /// 已存在未完成的异步接收
    #[error("已存在未完成的异步接收")]
    MultipleBegin,

    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 未找到指定的流
    #[error("未找到流: id {0}")]
    StreamNotFound(u32),

    /// 意外状态 (资源已释放等)
    #[error("意外状态: {0}")]
    Unexpected(String),
}

impl YuanError {
    /// 是否为关闭错误
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::AlreadyShutdown)
    }
}

/// Yuan 统一 Result 类型
pub type YuanResult<T> = Result<T, YuanError>;

//! 生产者回调.
//!
//! 分发引擎在持有媒体源锁时调用 [`Producer`]. 实现方只能登记工作
//! (入队, 发消息), 不得阻塞, 也不得在回调内同步地回调通道.

use tokio::sync::mpsc::UnboundedSender;
use yuan_core::{YuanError, YuanResult};

/// 生产者回调接口
pub trait Producer: Send + Sync {
    /// 通道 `stream_id` 的缓冲低于水位, 需要更多样本
    fn on_need_more_data(&self, stream_id: u32) -> YuanResult<()>;

    /// 某个通道已把末尾样本全部投递, 由生产者判断是否所有流都已结束
    fn on_aggregate_end_of_stream(&self) -> YuanResult<()>;
}

/// 发给生产者任务的请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerRequest {
    /// 为指定流读取更多数据
    NeedData(u32),
    /// 检查是否所有流都已结束
    EndOfStream,
}

impl Producer for UnboundedSender<ProducerRequest> {
    fn on_need_more_data(&self, stream_id: u32) -> YuanResult<()> {
        self.send(ProducerRequest::NeedData(stream_id))
            .map_err(|_| YuanError::Dispatch("生产者已断开".into()))
    }

    fn on_aggregate_end_of_stream(&self) -> YuanResult<()> {
        self.send(ProducerRequest::EndOfStream)
            .map_err(|_| YuanError::Dispatch("生产者已断开".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_通过通道登记请求() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(tx.on_need_more_data(3).is_ok());
        assert!(tx.on_aggregate_end_of_stream().is_ok());
        assert_eq!(rx.try_recv().ok(), Some(ProducerRequest::NeedData(3)));
        assert_eq!(rx.try_recv().ok(), Some(ProducerRequest::EndOfStream));
    }

    #[test]
    fn test_producer_接收端关闭() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<ProducerRequest>();
        drop(rx);
        assert!(matches!(
            tx.on_need_more_data(0),
            Err(YuanError::Dispatch(_))
        ));
    }
}

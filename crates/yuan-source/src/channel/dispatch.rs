//! 请求/样本队列与分发引擎.
//!
//! 每次任一队列变化 (以及 `start`/`end_of_stream`) 后执行一次分发:
//! 1. 非 `Started` 状态直接返回
//! 2. 两个队列都非空时按先进先出成对取出, 令牌挂到样本上, 发送 `MediaSample`
//! 3. 样本队列已空且流末尾已锁存 => 发送一次 `EndOfStream` 并通知生产者;
//!    否则若缓冲低于水位 => 向生产者请求更多数据
//! 4. 过程中的失败不返回给触发方, 而是作为错误事件上报给媒体源

use log::warn;
use yuan_core::{YuanError, YuanResult};

use super::state::{ChannelState, StreamState};
use crate::event::MediaEvent;
use crate::lock::SourceLinks;
use crate::producer::Producer;
use crate::sample::{RequestToken, Sample};

impl ChannelState {
    /// 消费者请求样本
    ///
    /// 前置检查失败时, 除已关闭外都向媒体源上报错误事件.
    pub(crate) fn request_sample(
        &mut self,
        token: Option<RequestToken>,
        links: &SourceLinks<'_>,
    ) -> YuanResult<()> {
        let result = self.enqueue_request(token, links);
        if let Err(err) = &result {
            if self.state != StreamState::Shutdown {
                links.report_error(err.clone());
            }
        }
        result
    }

    fn enqueue_request(
        &mut self,
        token: Option<RequestToken>,
        links: &SourceLinks<'_>,
    ) -> YuanResult<()> {
        self.check_shutdown()?;
        if self.state == StreamState::Stopped {
            return Err(YuanError::InvalidRequest(format!("流 {} 已停止", self.id)));
        }
        if !self.active {
            return Err(YuanError::InvalidRequest(format!("流 {} 未激活", self.id)));
        }
        if self.end_of_stream && self.samples.is_empty() {
            return Err(YuanError::EndOfStream);
        }

        self.requests.push_back(token);
        self.dispatch(links);
        Ok(())
    }

    /// 生产者投递样本
    pub(crate) fn deliver_sample(
        &mut self,
        sample: Sample,
        links: &SourceLinks<'_>,
    ) -> YuanResult<()> {
        self.check_shutdown()?;
        if self.end_of_stream {
            return Err(YuanError::InvalidRequest(format!(
                "流 {} 已锁存流末尾, 不再接受样本",
                self.id
            )));
        }
        self.samples.push_back(sample);
        self.dispatch(links);
        Ok(())
    }

    /// 背压判定: 激活, 未到流末尾, 且缓冲少于低水位
    pub(crate) fn needs_data(&self) -> bool {
        self.state != StreamState::Shutdown
            && self.active
            && !self.end_of_stream
            && self.samples.len() < self.low_watermark
    }

    /// 执行一次分发, 总是成功返回
    pub(crate) fn dispatch(&mut self, links: &SourceLinks<'_>) {
        // 生产者的完成可能晚于暂停/停止/关闭到达, 此时不投递
        if self.state != StreamState::Started {
            return;
        }

        if let Err(err) = self.dispatch_pass(links.producer) {
            warn!("流 {}: 分发失败: {}", self.id, err);
            if self.state != StreamState::Shutdown {
                links.report_error(err);
            }
        }
    }

    fn dispatch_pass(&mut self, producer: &dyn Producer) -> YuanResult<()> {
        let events = self
            .events
            .clone()
            .ok_or_else(|| YuanError::Dispatch("事件队列已释放".into()))?;

        while !self.samples.is_empty() && !self.requests.is_empty() {
            let (Some(mut sample), Some(token)) =
                (self.samples.pop_front(), self.requests.pop_front())
            else {
                break;
            };
            if let Some(token) = token {
                sample.set_token(token);
            }
            events
                .enqueue(MediaEvent::MediaSample(sample))
                .map_err(|e| YuanError::Dispatch(format!("发送样本事件失败: {e}")))?;
        }

        if self.samples.is_empty() && self.end_of_stream {
            if !self.eos_notified {
                events
                    .enqueue(MediaEvent::EndOfStream { stream_id: self.id })
                    .map_err(|e| YuanError::Dispatch(format!("发送流末尾事件失败: {e}")))?;
                self.eos_notified = true;
                producer.on_aggregate_end_of_stream()?;
            }
        } else if self.needs_data() {
            producer.on_need_more_data(self.id)?;
        }
        Ok(())
    }
}

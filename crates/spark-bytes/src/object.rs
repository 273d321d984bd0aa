//! 流对象生命周期：打开、失败、关闭。
//!
//! # 契约说明（What）
//! - 失败是永久的：首个失败被记录，之后的失败被忽略，直到对象被关闭；
//! - 已关闭对象 `ok() == false`，若从未失败则 [`ObjectState::status`] 报告 `stream.closed`；
//! - 内省（位置、状态）在任何生命周期阶段都可调用。

use crate::error::{Result, StreamError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lifecycle {
    Open,
    Failed(StreamError),
    Closed(Option<StreamError>),
}

/// 所有 Reader/Writer 共享的生命周期与状态容器。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectState {
    lifecycle: Lifecycle,
}

impl Default for ObjectState {
    fn default() -> Self {
        Self::open()
    }
}

impl ObjectState {
    /// 处于打开且健康状态的对象。
    pub fn open() -> Self {
        Self {
            lifecycle: Lifecycle::Open,
        }
    }

    /// 已关闭的对象，相当于“尚未初始化”的占位值。
    pub fn closed() -> Self {
        Self {
            lifecycle: Lifecycle::Closed(None),
        }
    }

    /// 对象尚未关闭（可能已失败）。
    pub fn is_open(&self) -> bool {
        !matches!(self.lifecycle, Lifecycle::Closed(_))
    }

    /// 对象打开且未失败。
    pub fn ok(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Open)
    }

    /// 首个失败的诊断；未失败时为 `None`。
    pub fn error(&self) -> Option<&StreamError> {
        match &self.lifecycle {
            Lifecycle::Failed(err) | Lifecycle::Closed(Some(err)) => Some(err),
            _ => None,
        }
    }

    /// 以 `Result` 形式暴露状态。
    pub fn status(&self) -> Result<()> {
        match &self.lifecycle {
            Lifecycle::Open => Ok(()),
            Lifecycle::Failed(err) | Lifecycle::Closed(Some(err)) => Err(err.clone()),
            Lifecycle::Closed(None) => Err(StreamError::closed()),
        }
    }

    /// 记录失败并返回 `false`，便于 `return state.fail(err)` 的写法。
    ///
    /// 已失败或已关闭的对象保持原有诊断。
    pub fn fail(&mut self, err: StreamError) -> bool {
        if let Lifecycle::Open = self.lifecycle {
            tracing::debug!(code = err.code(), detail = err.message(), "stream failed");
            self.lifecycle = Lifecycle::Failed(err);
        }
        false
    }

    /// 标记为已关闭，保留已有失败。返回关闭前是否处于打开状态。
    pub fn mark_closed(&mut self) -> bool {
        match core::mem::replace(&mut self.lifecycle, Lifecycle::Closed(None)) {
            Lifecycle::Open => true,
            Lifecycle::Failed(err) => {
                self.lifecycle = Lifecycle::Closed(Some(err));
                true
            }
            closed @ Lifecycle::Closed(_) => {
                self.lifecycle = closed;
                false
            }
        }
    }
}

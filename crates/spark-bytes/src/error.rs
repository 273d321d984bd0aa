//! 字节流层统一错误域。
//!
//! # 设计背景（Why）
//! - 流对象一旦失败便进入“粘滞失败”状态，此后每次数据操作都要再次报告同一诊断，
//!   因此错误必须可克隆、可比较，并且携带稳定错误码，便于日志聚合与测试断言。
//! - 装饰器需要在被包装流的诊断之上追加自身上下文（例如相对位置），
//!   所以错误对象提供 [`StreamError::annotate`] 以追加而非覆盖。
//!
//! # 契约说明（What）
//! - 错误码遵循 `<域>.<语义>` 约定，全部收敛在 [`codes`] 模块；
//! - 展示格式固定为 `[code] message`，与 `spark-core::CoreError` 保持一致；
//! - 前置条件违反（编程错误）不经过本类型，而是直接断言失败。

use alloc::{borrow::Cow, format, string::String};

use thiserror::Error;

use crate::Position;

/// 稳定错误码集合。
pub mod codes {
    /// 位置计算超出 [`Position`](crate::Position) 可表示的最大值。
    pub const OVERFLOW: &str = "stream.overflow";
    /// 定位到装饰器配置的基准位置之前。
    pub const UNDERFLOW: &str = "stream.underflow";
    /// 对象已关闭。
    pub const CLOSED: &str = "stream.closed";
    /// 具体流实现不支持该操作。
    pub const UNSUPPORTED: &str = "stream.unsupported";
    /// 参数非法（例如超出数据范围的定位）。
    pub const INVALID_ARGUMENT: &str = "stream.invalid_argument";
    /// 期望已到达数据末尾，但仍有剩余数据。
    pub const UNEXPECTED_DATA: &str = "stream.unexpected_data";
}

/// 流对象的失败诊断。
///
/// # 契约说明（What）
/// - `code`：稳定错误码，取自 [`codes`]；
/// - `message`：面向排障人员的描述，可被 [`annotate`](Self::annotate) 逐层追加上下文。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct StreamError {
    code: &'static str,
    message: Cow<'static, str>,
}

impl StreamError {
    /// 以稳定错误码与描述构造错误。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 位置溢出。
    pub fn overflow() -> Self {
        Self::new(codes::OVERFLOW, "Position overflow")
    }

    /// 定位到基准位置之前。
    pub fn underflow(new_pos: Position, base_pos: Position) -> Self {
        Self::new(
            codes::UNDERFLOW,
            format!("position out of range: {new_pos} < {base_pos}"),
        )
    }

    /// 对象已关闭。
    pub fn closed() -> Self {
        Self::new(codes::CLOSED, "Object closed")
    }

    /// 操作不被当前实现支持，`operation` 形如 `Reader::size()`。
    pub fn unsupported(operation: &'static str) -> Self {
        Self::new(codes::UNSUPPORTED, format!("{operation} not supported"))
    }

    /// 参数非法。
    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(codes::INVALID_ARGUMENT, message)
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 当前描述（含已追加的上下文）。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 在描述末尾追加上下文，形如 `message; context`。
    ///
    /// 装饰器借此标注“失败源自被包装的流”，调用方可沿分号逐层阅读诊断链路。
    pub fn annotate(mut self, context: impl AsRef<str>) -> Self {
        let mut message = String::from(core::mem::take(&mut self.message));
        message.push_str("; ");
        message.push_str(context.as_ref());
        self.message = Cow::Owned(message);
        self
    }

    /// 判断是否为指定错误码。
    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

/// 字节流层统一返回值别名。
pub type Result<T, E = StreamError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_contains_code_and_message() {
        let err = StreamError::overflow();
        assert_eq!(err.to_string(), "[stream.overflow] Position overflow");
    }

    #[test]
    fn annotate_appends_context_in_order() {
        let err = StreamError::unsupported("Reader::size()")
            .annotate("at byte 7")
            .annotate("with relative position at byte 17");
        assert_eq!(err.code(), codes::UNSUPPORTED);
        assert_eq!(
            err.message(),
            "Reader::size() not supported; at byte 7; with relative position at byte 17"
        );
    }

    #[test]
    fn underflow_reports_both_positions() {
        let err = StreamError::underflow(9, 10);
        assert!(err.is(codes::UNDERFLOW));
        assert!(err.message().contains("9 < 10"));
    }
}

//! 写缓冲长度策略。
//!
//! 一次“运行”（run）指从 [`WriteBufferSizer::begin_run`] 到 [`WriteBufferSizer::end_run`]
//! 之间连续增长缓冲的过程。没有写入量提示时，新缓冲长度与本次运行已写入的数据量成正比，
//! 使长流逐步获得更大的缓冲；上一次运行的长度会作为下一次运行的起点。

use alloc::format;

use crate::{Position, StreamError};

/// 缓冲长度上下限。
///
/// 反序列化经过与构造器相同的校验，上下限倒置或上限为 0 的配置以
/// `stream.invalid_argument` 拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawBufferOptions"))]
pub struct BufferOptions {
    min_buffer_size: usize,
    max_buffer_size: usize,
}

impl BufferOptions {
    /// 默认最小缓冲长度。
    pub const DEFAULT_MIN_BUFFER_SIZE: usize = 256;
    /// 默认最大缓冲长度。
    pub const DEFAULT_MAX_BUFFER_SIZE: usize = 64 << 10;

    /// 默认选项。
    pub const fn new() -> Self {
        Self {
            min_buffer_size: Self::DEFAULT_MIN_BUFFER_SIZE,
            max_buffer_size: Self::DEFAULT_MAX_BUFFER_SIZE,
        }
    }

    /// 设置最小缓冲长度。
    ///
    /// # Panics
    /// 超过最大缓冲长度时断言失败。
    pub fn with_min_buffer_size(mut self, min_buffer_size: usize) -> Self {
        assert!(
            min_buffer_size <= self.max_buffer_size,
            "Failed precondition of BufferOptions::with_min_buffer_size(): \
             min_buffer_size > max_buffer_size"
        );
        self.min_buffer_size = min_buffer_size;
        self
    }

    /// 设置最大缓冲长度。
    ///
    /// # Panics
    /// 为 0 或小于最小缓冲长度时断言失败。
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        assert!(
            max_buffer_size > 0,
            "Failed precondition of BufferOptions::with_max_buffer_size(): zero max_buffer_size"
        );
        assert!(
            max_buffer_size >= self.min_buffer_size,
            "Failed precondition of BufferOptions::with_max_buffer_size(): \
             max_buffer_size < min_buffer_size"
        );
        self.max_buffer_size = max_buffer_size;
        self
    }

    /// 以给定上下限构造，非法组合返回错误而不是断言失败。
    pub fn try_new(min_buffer_size: usize, max_buffer_size: usize) -> Result<Self, StreamError> {
        if max_buffer_size == 0 {
            return Err(StreamError::invalid_argument("zero max_buffer_size"));
        }
        if min_buffer_size > max_buffer_size {
            return Err(StreamError::invalid_argument(format!(
                "min_buffer_size {min_buffer_size} > max_buffer_size {max_buffer_size}"
            )));
        }
        Ok(Self {
            min_buffer_size,
            max_buffer_size,
        })
    }

    /// 最小缓冲长度。
    pub fn min_buffer_size(&self) -> usize {
        self.min_buffer_size
    }

    /// 最大缓冲长度。
    pub fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// 未校验的反序列化形态，缺省字段取默认值。
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(default)]
struct RawBufferOptions {
    min_buffer_size: usize,
    max_buffer_size: usize,
}

#[cfg(feature = "serde")]
impl Default for RawBufferOptions {
    fn default() -> Self {
        Self {
            min_buffer_size: BufferOptions::DEFAULT_MIN_BUFFER_SIZE,
            max_buffer_size: BufferOptions::DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<RawBufferOptions> for BufferOptions {
    type Error = StreamError;

    fn try_from(raw: RawBufferOptions) -> Result<Self, Self::Error> {
        Self::try_new(raw.min_buffer_size, raw.max_buffer_size)
    }
}

/// 依据运行进度与写入量提示计算缓冲长度。
#[derive(Debug, Clone)]
pub struct WriteBufferSizer {
    options: BufferOptions,
    base_pos: Position,
    buffer_length_from_last_run: usize,
    exact_size: Option<Position>,
}

impl WriteBufferSizer {
    /// 以给定选项构造，运行起点为 0。
    pub fn new(options: BufferOptions) -> Self {
        Self {
            options,
            base_pos: 0,
            buffer_length_from_last_run: 0,
            exact_size: None,
        }
    }

    /// 当前选项。
    pub fn options(&self) -> &BufferOptions {
        &self.options
    }

    /// 在 `pos` 处开始新的运行。
    pub fn begin_run(&mut self, pos: Position) {
        self.base_pos = pos;
    }

    /// 在 `pos` 处结束当前运行，记住本次运行的长度。
    pub fn end_run(&mut self, pos: Position) {
        let run_length = pos.saturating_sub(self.base_pos);
        self.buffer_length_from_last_run = usize::try_from(run_length).unwrap_or(usize::MAX);
        tracing::debug!(
            base_pos = self.base_pos,
            end_pos = pos,
            run_length,
            "write buffer run ended"
        );
    }

    /// 记录从 `pos` 开始预计还会写入 `write_size_hint` 字节；`None` 清除提示。
    pub fn set_write_size_hint(&mut self, pos: Position, write_size_hint: Option<Position>) {
        self.exact_size = write_size_hint.map(|hint| pos.saturating_add(hint));
    }

    /// 预计写入结束的位置。
    pub fn exact_size(&self) -> Option<Position> {
        self.exact_size
    }

    /// 在 `pos` 处需要至少 `min_length` 字节时应分配的缓冲长度。
    ///
    /// 结果总不小于 `min_length`。
    pub fn buffer_length(
        &self,
        pos: Position,
        min_length: usize,
        recommended_length: usize,
    ) -> usize {
        let max = self.options.max_buffer_size;
        if let Some(exact_size) = self.exact_size {
            if exact_size > pos {
                let remaining = usize::try_from(exact_size - pos).unwrap_or(usize::MAX);
                return remaining.min(max).max(min_length);
            }
        }
        let written = usize::try_from(pos.saturating_sub(self.base_pos)).unwrap_or(usize::MAX);
        let proportional = written.max(self.buffer_length_from_last_run);
        proportional
            .max(self.options.min_buffer_size)
            .min(max)
            .max(recommended_length.min(max))
            .max(min_length)
    }
}

impl Default for WriteBufferSizer {
    fn default() -> Self {
        Self::new(BufferOptions::default())
    }
}

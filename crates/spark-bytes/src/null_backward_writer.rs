//! `NullBackwardWriter`：只记账、不落盘的反向写入器。
//!
//! # 设计背景（Why）
//! - 反向编码（先写后缀再写前缀）常需要先“演练”一遍以得知输出长度，
//!   此时真正的目的地并不存在，只需要准确的位置记账。
//!
//! # 逻辑解析（How）
//! - 切片写入仍然落在一块可复用的暂存缓冲上，以保证快路径与普通写入器完全一致；
//! - [`Chain`]、[`Rope`]、[`ByteFill`] 的批量写入只推进位置，不复制任何负载；
//! - 暂存缓冲长度由 [`WriteBufferSizer`] 决定，截断到窗口之外时结束当前运行并开始新运行。
//!
//! # 契约说明（What）
//! - 位置超过 [`Position::MAX`] 的写入以 `stream.overflow` 失败；
//! - 暂存缓冲内容未定义，关闭时释放。

use bytes::BytesMut;

use crate::{
    BackwardWriter, BackwardWriterState, BufferOptions, ByteFill, Chain, Position, Rope,
    WriteBufferSizer,
};

/// [`NullBackwardWriter`] 的配置。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NullBackwardWriterOptions {
    buffer_options: BufferOptions,
    write_size_hint: Option<Position>,
}

impl NullBackwardWriterOptions {
    /// 默认配置。
    pub fn new() -> Self {
        Self::default()
    }

    /// 暂存缓冲长度上下限。
    pub fn with_buffer_options(mut self, buffer_options: BufferOptions) -> Self {
        self.buffer_options = buffer_options;
        self
    }

    /// 预计写入的总字节数。
    pub fn with_write_size_hint(mut self, write_size_hint: Option<Position>) -> Self {
        self.write_size_hint = write_size_hint;
        self
    }

    /// 暂存缓冲长度上下限。
    pub fn buffer_options(&self) -> &BufferOptions {
        &self.buffer_options
    }

    /// 预计写入的总字节数。
    pub fn write_size_hint(&self) -> Option<Position> {
        self.write_size_hint
    }
}

/// 丢弃全部数据的反向写入器。
#[derive(Debug)]
pub struct NullBackwardWriter {
    state: BackwardWriterState,
    buffer: BytesMut,
    sizer: WriteBufferSizer,
}

impl Default for NullBackwardWriter {
    fn default() -> Self {
        Self::new(NullBackwardWriterOptions::default())
    }
}

impl NullBackwardWriter {
    /// 以给定配置构造。
    pub fn new(options: NullBackwardWriterOptions) -> Self {
        let mut sizer = WriteBufferSizer::new(options.buffer_options);
        sizer.set_write_size_hint(0, options.write_size_hint);
        sizer.begin_run(0);
        Self {
            state: BackwardWriterState::new(),
            buffer: BytesMut::new(),
            sizer,
        }
    }

    /// 当前暂存缓冲容量。
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.len()
    }

    fn sync_buffer(&mut self) {
        let pos = self.state.pos();
        let limit = self.state.limit();
        self.state.set_start_pos(pos);
        self.state.set_cursor(limit);
    }

    fn make_buffer(&mut self, min_length: usize, recommended_length: usize) -> bool {
        let start_pos = self.state.start_pos();
        let headroom = Position::MAX - start_pos;
        if min_length as Position > headroom {
            return self.fail_overflow();
        }
        let buffer_length = self
            .sizer
            .buffer_length(start_pos, min_length, recommended_length);
        if self.buffer.len() < buffer_length {
            tracing::trace!(start_pos, buffer_length, "growing null backward writer buffer");
            self.buffer.resize(buffer_length, 0);
        }
        let window = self
            .buffer
            .len()
            .min(buffer_length.saturating_mul(2))
            .min(usize::try_from(headroom).unwrap_or(usize::MAX));
        self.state.set_window(start_pos, window);
        true
    }

    /// 只推进位置的批量写入。
    fn skip_ahead(&mut self, length: Position) -> bool {
        if !self.ok() {
            return false;
        }
        if length > Position::MAX - self.pos() {
            return self.fail_overflow();
        }
        self.sync_buffer();
        let start_pos = self.state.start_pos() + length;
        self.state.set_start_pos(start_pos);
        self.make_buffer(0, 0)
    }
}

impl BackwardWriter for NullBackwardWriter {
    fn state(&self) -> &BackwardWriterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BackwardWriterState {
        &mut self.state
    }

    fn buffer_mut(&mut self) -> &mut [u8] {
        let limit = self.state.limit();
        &mut self.buffer[..limit]
    }

    fn push_slow(&mut self, min_length: usize, recommended_length: usize) -> bool {
        debug_assert!(
            self.available() < min_length,
            "Failed precondition of BackwardWriter::push_slow(): \
             enough space available, use push() instead"
        );
        if !self.ok() {
            return false;
        }
        self.sync_buffer();
        self.make_buffer(min_length, recommended_length)
    }

    fn write_chain_slow(&mut self, src: &Chain) -> bool {
        self.skip_ahead(src.len() as Position)
    }

    fn write_rope_slow(&mut self, src: &Rope) -> bool {
        self.skip_ahead(src.len() as Position)
    }

    fn write_fill_slow(&mut self, src: ByteFill) -> bool {
        self.skip_ahead(src.size())
    }

    fn truncate_impl(&mut self, new_size: Position) -> bool {
        let start_pos = self.state.start_pos();
        if new_size >= start_pos {
            if new_size > self.pos() {
                return false;
            }
            let limit = self.state.limit();
            self.state.set_cursor(limit - (new_size - start_pos) as usize);
            return true;
        }
        let pos = self.pos();
        self.sizer.end_run(pos);
        let limit = self.state.limit();
        self.state.set_start_pos(new_size);
        self.state.set_cursor(limit);
        self.sizer.begin_run(new_size);
        tracing::debug!(from = pos, to = new_size, "null backward writer truncated, new run");
        true
    }

    fn set_write_size_hint_impl(&mut self, write_size_hint: Option<Position>) {
        let pos = self.pos();
        self.sizer.set_write_size_hint(pos, write_size_hint);
    }

    fn supports_truncate(&self) -> bool {
        true
    }

    fn done(&mut self) {
        let pos = self.pos();
        self.sizer.end_run(pos);
        self.state.drop_window();
        self.buffer = BytesMut::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_writes_skip_without_copying() {
        let mut writer = NullBackwardWriter::default();
        assert!(writer.write(b"abc"));
        let chain = Chain::from(&[7u8; 1000][..]);
        assert!(writer.write_chain(&chain));
        assert_eq!(writer.pos(), 1003);
        assert!(writer.write_fill(ByteFill::new(1 << 20, 1)));
        assert_eq!(writer.pos(), 1003 + (1 << 20));
        assert!(writer.buffer_capacity() <= BufferOptions::DEFAULT_MAX_BUFFER_SIZE * 2);
    }

    #[test]
    fn truncate_within_window_moves_cursor() {
        let mut writer = NullBackwardWriter::default();
        assert!(writer.write(&[0u8; 10]));
        let start = writer.start_pos();
        assert!(writer.truncate(4));
        assert_eq!(writer.pos(), 4);
        assert_eq!(writer.start_pos(), start);
    }

    #[test]
    fn truncate_before_window_starts_new_run() {
        let mut writer = NullBackwardWriter::default();
        assert!(writer.write_zeros(5000));
        assert!(writer.write(&[1u8; 10]));
        assert!(writer.truncate(100));
        assert_eq!(writer.pos(), 100);
        assert_eq!(writer.start_pos(), 100);
        assert!(writer.write(&[2u8; 50]));
        assert_eq!(writer.pos(), 150);
    }

    #[test]
    fn size_hint_shapes_first_buffer() {
        let options = NullBackwardWriterOptions::new().with_write_size_hint(Some(1000));
        let mut writer = NullBackwardWriter::new(options);
        assert!(writer.write_byte(1));
        assert_eq!(writer.buffer_capacity(), 1000);
    }

    #[test]
    fn close_releases_buffer() {
        let mut writer = NullBackwardWriter::default();
        assert!(writer.write(&[0u8; 300]));
        writer.close().expect("关闭成功");
        assert_eq!(writer.buffer_capacity(), 0);
        assert_eq!(writer.pos(), 300);
        assert!(!writer.write_byte(0));
    }
}

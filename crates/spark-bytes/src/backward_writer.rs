//! 反向写入契约：数据被逐段前插，窗口向低地址方向消耗。
//!
//! # 逻辑解析（How）
//! - 窗口 `buffer_mut()[..limit]` 中 `cursor` 之后为已写入数据，之前为空闲空间；
//!   写入 `n` 字节即复制到 `[cursor - n, cursor)` 并令 `cursor -= n`；
//! - `start_pos` 是窗口建立时已写入的总字节数，`pos = start_pos + (limit - cursor)`。
//!
//! # 契约说明（What）
//! - 单次写入的字节在最终输出中保持原顺序，多次写入之间后写者在前；
//! - 多片段来源（[`Chain`]、[`Rope`]）按末片段优先写入，整体顺序因此保持不变。

use alloc::format;

use crate::{
    ByteFill, Chain, MAX_BYTES_TO_COPY, ObjectState, Position, Rope,
    error::{Result, StreamError},
};

/// 反向写入器的窗口与生命周期状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackwardWriterState {
    start_pos: Position,
    cursor: usize,
    limit: usize,
    object: ObjectState,
}

impl Default for BackwardWriterState {
    fn default() -> Self {
        Self::new()
    }
}

impl BackwardWriterState {
    /// 打开状态，窗口为空，位置为 0。
    pub fn new() -> Self {
        Self {
            start_pos: 0,
            cursor: 0,
            limit: 0,
            object: ObjectState::open(),
        }
    }

    /// 窗口建立时已写入的字节数。
    pub fn start_pos(&self) -> Position {
        self.start_pos
    }

    /// 游标在窗口内的偏移。
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 窗口长度。
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 窗口内空闲字节数。
    pub fn available(&self) -> usize {
        self.cursor
    }

    /// 当前窗口内已写入的字节数。
    pub fn written_to_buffer(&self) -> usize {
        self.limit - self.cursor
    }

    /// 当前绝对位置。
    pub fn pos(&self) -> Position {
        self.start_pos + self.written_to_buffer() as Position
    }

    /// 生命周期状态。
    pub fn object(&self) -> &ObjectState {
        &self.object
    }

    /// 可变生命周期状态。
    pub fn object_mut(&mut self) -> &mut ObjectState {
        &mut self.object
    }

    /// 消耗 `length` 字节空闲空间。
    pub fn move_cursor(&mut self, length: usize) {
        debug_assert!(
            length <= self.available(),
            "Failed precondition of BackwardWriterState::move_cursor(): length > available"
        );
        self.cursor -= length;
    }

    /// 设置游标。
    pub fn set_cursor(&mut self, cursor: usize) {
        debug_assert!(
            cursor <= self.limit,
            "Failed precondition of BackwardWriterState::set_cursor(): cursor out of window"
        );
        self.cursor = cursor;
    }

    /// 设置窗口起点位置。
    pub fn set_start_pos(&mut self, start_pos: Position) {
        self.start_pos = start_pos;
    }

    /// 替换整个窗口，游标位于窗口末端（尚未写入）。
    pub fn set_window(&mut self, start_pos: Position, limit: usize) {
        self.start_pos = start_pos;
        self.cursor = limit;
        self.limit = limit;
    }

    /// 清空窗口并保持 `pos()`。
    pub fn drop_window(&mut self) {
        self.start_pos = self.pos();
        self.cursor = 0;
        self.limit = 0;
    }
}

/// 带缓冲窗口的反向写入器。
pub trait BackwardWriter {
    /// 窗口与生命周期状态。
    fn state(&self) -> &BackwardWriterState;

    /// 可变窗口与生命周期状态。
    fn state_mut(&mut self) -> &mut BackwardWriterState;

    /// 当前窗口，长度必须等于 `state().limit()`。
    fn buffer_mut(&mut self) -> &mut [u8];

    /// 使窗口内至少有 `min_length` 字节空闲。
    ///
    /// 前置条件：`available() < min_length`。
    fn push_slow(&mut self, min_length: usize, recommended_length: usize) -> bool;

    /// 窗口不足时写入切片，尾部先行。
    fn write_slow(&mut self, src: &[u8]) -> bool {
        debug_assert!(
            src.len() > self.available(),
            "Failed precondition of BackwardWriter::write_slow(): \
             enough space available, use write() instead"
        );
        if !self.ok() {
            return false;
        }
        if src.len() as Position > Position::MAX - self.pos() {
            return self.fail_overflow();
        }
        let mut remaining = src.len();
        loop {
            let length = self.available().min(remaining);
            let cursor = self.state().cursor();
            self.buffer_mut()[cursor - length..cursor]
                .copy_from_slice(&src[remaining - length..remaining]);
            self.state_mut().move_cursor(length);
            remaining -= length;
            if remaining == 0 {
                return true;
            }
            if !self.push_slow(1, remaining) {
                return false;
            }
        }
    }

    /// 写入 [`Chain`]；默认按末块优先逐块复制。
    fn write_chain_slow(&mut self, src: &Chain) -> bool {
        src.blocks().rev().all(|block| self.write(block))
    }

    /// 写入 [`Rope`]；默认按末片段优先逐片段复制。
    fn write_rope_slow(&mut self, src: &Rope) -> bool {
        src.fragments().rev().all(|fragment| self.write(fragment))
    }

    /// 写入重复字节；默认逐窗口填充。
    fn write_fill_slow(&mut self, src: ByteFill) -> bool {
        if !self.ok() {
            return false;
        }
        if src.size() > Position::MAX - self.pos() {
            return self.fail_overflow();
        }
        let mut remaining = src.size();
        while remaining > 0 {
            let recommended = usize::try_from(remaining).unwrap_or(usize::MAX);
            if !self.push(1, recommended) {
                return false;
            }
            let length = usize::try_from(remaining)
                .unwrap_or(usize::MAX)
                .min(self.available());
            let cursor = self.state().cursor();
            self.buffer_mut()[cursor - length..cursor].fill(src.fill());
            self.state_mut().move_cursor(length);
            remaining -= length as Position;
        }
        true
    }

    /// 截断到 `new_size`；默认不支持。
    fn truncate_impl(&mut self, _new_size: Position) -> bool {
        self.fail(StreamError::unsupported("BackwardWriter::truncate()"))
    }

    /// 写入量提示；默认忽略。
    fn set_write_size_hint_impl(&mut self, _write_size_hint: Option<Position>) {}

    /// 关闭时释放资源；在状态被标记为关闭之前调用。
    fn done(&mut self) {}

    /// 为失败附加位置上下文。
    fn annotate_status(&mut self, err: StreamError) -> StreamError {
        if self.is_open() {
            err.annotate(format!("at byte {}", self.pos()))
        } else {
            err
        }
    }

    /// 是否支持 [`BackwardWriter::truncate`]。
    fn supports_truncate(&self) -> bool {
        false
    }

    // ---- 以下为快路径 ----

    /// 当前绝对位置，即已写入的总字节数。
    fn pos(&self) -> Position {
        self.state().pos()
    }

    /// 窗口起点的绝对位置。
    fn start_pos(&self) -> Position {
        self.state().start_pos()
    }

    /// 窗口内空闲字节数。
    fn available(&self) -> usize {
        self.state().available()
    }

    /// 未失败且未关闭。
    fn ok(&self) -> bool {
        self.state().object().ok()
    }

    /// 未关闭。
    fn is_open(&self) -> bool {
        self.state().object().is_open()
    }

    /// 当前状态。
    fn status(&self) -> Result<()> {
        self.state().object().status()
    }

    /// 以位置上下文记录失败，返回 `false`。
    fn fail(&mut self, err: StreamError) -> bool {
        let err = self.annotate_status(err);
        self.fail_without_annotation(err)
    }

    /// 原样记录失败，返回 `false`。
    fn fail_without_annotation(&mut self, err: StreamError) -> bool {
        let state = self.state_mut();
        if state.object().ok() {
            state.drop_window();
        }
        state.object_mut().fail(err)
    }

    /// 记录位置溢出。
    fn fail_overflow(&mut self) -> bool {
        self.fail(StreamError::overflow())
    }

    /// 确保至少 `min_length` 字节空闲。
    fn push(&mut self, min_length: usize, recommended_length: usize) -> bool {
        if self.available() >= min_length {
            return true;
        }
        self.push_slow(min_length, recommended_length)
    }

    /// 前插切片。
    fn write(&mut self, src: &[u8]) -> bool {
        if src.len() <= self.available() {
            let cursor = self.state().cursor();
            self.buffer_mut()[cursor - src.len()..cursor].copy_from_slice(src);
            self.state_mut().move_cursor(src.len());
            return true;
        }
        self.write_slow(src)
    }

    /// 前插单个字节。
    fn write_byte(&mut self, byte: u8) -> bool {
        self.write(&[byte])
    }

    /// 前插 [`Chain`]。
    fn write_chain(&mut self, src: &Chain) -> bool {
        if src.len() <= self.available() && src.len() <= MAX_BYTES_TO_COPY {
            return src.blocks().rev().all(|block| self.write(block));
        }
        self.write_chain_slow(src)
    }

    /// 前插 [`Rope`]。
    fn write_rope(&mut self, src: &Rope) -> bool {
        if src.len() <= self.available() && src.len() <= MAX_BYTES_TO_COPY {
            return src.fragments().rev().all(|fragment| self.write(fragment));
        }
        self.write_rope_slow(src)
    }

    /// 前插重复字节。
    fn write_fill(&mut self, src: ByteFill) -> bool {
        if src.size() <= self.available() as Position && src.size() <= MAX_BYTES_TO_COPY as Position
        {
            let length = src.size() as usize;
            let cursor = self.state().cursor();
            self.buffer_mut()[cursor - length..cursor].fill(src.fill());
            self.state_mut().move_cursor(length);
            return true;
        }
        self.write_fill_slow(src)
    }

    /// 前插 `length` 个零字节。
    fn write_zeros(&mut self, length: Position) -> bool {
        self.write_fill(ByteFill::zeros(length))
    }

    /// 丢弃最近写入的数据，使总长度回到 `new_size`。
    /// `new_size` 超过当前位置时返回 `false` 且不失败。
    fn truncate(&mut self, new_size: Position) -> bool {
        if !self.ok() {
            return false;
        }
        self.truncate_impl(new_size)
    }

    /// 提示从当前位置起预计写入的字节数。
    fn set_write_size_hint(&mut self, write_size_hint: Option<Position>) {
        if self.ok() {
            self.set_write_size_hint_impl(write_size_hint);
        }
    }

    /// 关闭写入器，返回首个失败。重复关闭是幂等的。
    fn close(&mut self) -> Result<()> {
        if self.is_open() {
            self.done();
            let state = self.state_mut();
            if state.object().ok() {
                state.drop_window();
            }
            state.object_mut().mark_closed();
        }
        match self.state().object().error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_stubs::RecordingBackwardWriter;
    use bytes::Bytes;

    #[test]
    fn later_writes_come_first() {
        let mut writer = RecordingBackwardWriter::new(4);
        assert!(writer.write(b"world"));
        assert!(writer.write_byte(b' '));
        assert!(writer.write(b"hello"));
        assert_eq!(writer.pos(), 11);
        writer.close().expect("关闭成功");
        assert_eq!(writer.data(), b"hello world");
    }

    #[test]
    fn multi_fragment_sources_keep_order() {
        let mut chain = Chain::new();
        chain.append_bytes(Bytes::from(alloc::vec![b'a'; 300]));
        chain.append_bytes(Bytes::from(alloc::vec![b'b'; 300]));
        let mut writer = RecordingBackwardWriter::new(64);
        assert!(writer.write_chain(&chain));
        assert!(writer.write_fill(ByteFill::new(2, b'-')));
        let data = writer.data();
        assert_eq!(data.len(), 602);
        assert_eq!(&data[..3], b"--a");
        assert_eq!(data[301], b'a');
        assert_eq!(data[302], b'b');
    }

    #[test]
    fn truncate_is_unsupported_by_default() {
        let mut writer = RecordingBackwardWriter::new(8);
        assert!(writer.write(b"abc"));
        assert!(!writer.truncate(1));
        assert!(writer.status().unwrap_err().is(crate::error::codes::UNSUPPORTED));
    }
}

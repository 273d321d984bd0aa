//! 前向读取契约。
//!
//! # 设计背景（Why）
//! - 解码器逐字节或逐段消费输入，若每次都穿透到底层设备代价过高；
//!   统一的“窗口 + 慢路径”纪律让绝大多数读取只是一次切片复制。
//!
//! # 逻辑解析（How）
//! - 实现者暴露当前窗口 [`Reader::buffer`]（长度恰为 `limit`），并在 [`ReaderState`] 中记录
//!   游标与窗口末端对应的绝对位置 `limit_pos`；
//! - 快路径（`pull`、`read`、`seek` 等）只在窗口不足时才调用对应的 `*_slow` 方法；
//! - 慢路径默认实现全部基于 [`Reader::pull_slow`]，具体流可覆写以提供零拷贝或随机访问。
//!
//! # 契约说明（What）
//! - `pos = limit_pos - (limit - cursor)`，`start_pos = limit_pos - limit`；
//! - 读到数据末尾时操作返回 `false` 但流仍然 `ok()`；失败则是粘滞的；
//! - 失败时窗口被清空但 `pos()` 保持不变；
//! - 慢路径前置条件（窗口确实不足）由 `debug_assert!` 检查。

use alloc::{boxed::Box, format};

use crate::{
    BackwardWriter, Chain, MAX_BYTES_TO_COPY, ObjectState, Position, Rope, Writer,
    error::{Result, StreamError, codes},
};

/// 读取器的窗口与生命周期状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderState {
    cursor: usize,
    limit: usize,
    limit_pos: Position,
    object: ObjectState,
}

impl Default for ReaderState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderState {
    /// 打开状态，窗口为空，位置为 0。
    pub fn new() -> Self {
        Self {
            cursor: 0,
            limit: 0,
            limit_pos: 0,
            object: ObjectState::open(),
        }
    }

    /// 已关闭状态。
    pub fn closed() -> Self {
        Self {
            object: ObjectState::closed(),
            ..Self::new()
        }
    }

    /// 游标在窗口内的偏移。
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 窗口长度。
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 窗口末端对应的绝对位置。
    pub fn limit_pos(&self) -> Position {
        self.limit_pos
    }

    /// 窗口内尚未消费的字节数。
    pub fn available(&self) -> usize {
        self.limit - self.cursor
    }

    /// 当前绝对位置。
    pub fn pos(&self) -> Position {
        self.limit_pos - self.available() as Position
    }

    /// 窗口起点对应的绝对位置。
    pub fn start_pos(&self) -> Position {
        self.limit_pos - self.limit as Position
    }

    /// 生命周期状态。
    pub fn object(&self) -> &ObjectState {
        &self.object
    }

    /// 可变生命周期状态。
    pub fn object_mut(&mut self) -> &mut ObjectState {
        &mut self.object
    }

    /// 设置游标。
    pub fn set_cursor(&mut self, cursor: usize) {
        debug_assert!(
            cursor <= self.limit,
            "Failed precondition of ReaderState::set_cursor(): cursor out of window"
        );
        self.cursor = cursor;
    }

    /// 前移游标。
    pub fn move_cursor(&mut self, length: usize) {
        debug_assert!(
            length <= self.available(),
            "Failed precondition of ReaderState::move_cursor(): length > available"
        );
        self.cursor += length;
    }

    /// 替换整个窗口。
    pub fn set_window(&mut self, cursor: usize, limit: usize, limit_pos: Position) {
        debug_assert!(
            cursor <= limit,
            "Failed precondition of ReaderState::set_window(): cursor > limit"
        );
        debug_assert!(
            limit as Position <= limit_pos,
            "Failed precondition of ReaderState::set_window(): window starts before 0"
        );
        self.cursor = cursor;
        self.limit = limit;
        self.limit_pos = limit_pos;
    }

    /// 清空窗口并保持 `pos()`。
    pub fn drop_window(&mut self) {
        self.limit_pos = self.pos();
        self.cursor = 0;
        self.limit = 0;
    }
}

/// 带缓冲窗口的前向读取器。
///
/// 该 trait 是对象安全的，装饰器与批量传输以 `&mut dyn Reader` 组合不同实现。
pub trait Reader {
    /// 窗口与生命周期状态。
    fn state(&self) -> &ReaderState;

    /// 可变窗口与生命周期状态。
    fn state_mut(&mut self) -> &mut ReaderState;

    /// 当前窗口，长度必须等于 `state().limit()`。
    fn buffer(&self) -> &[u8];

    /// 使窗口内至少有 `min_length` 字节可读。
    ///
    /// 前置条件：`available() < min_length`。到达末尾时返回 `false` 且不失败。
    fn pull_slow(&mut self, min_length: usize, recommended_length: usize) -> bool;

    /// 窗口不足时的切片读取；失败或到达末尾时已读部分保留在 `dest` 前缀。
    fn read_slow(&mut self, dest: &mut [u8]) -> bool {
        debug_assert!(
            dest.len() > self.available(),
            "Failed precondition of Reader::read_slow(): enough data available, use read() instead"
        );
        let mut filled = 0;
        loop {
            let length = self.available().min(dest.len() - filled);
            dest[filled..filled + length].copy_from_slice(&self.chunk()[..length]);
            self.move_cursor(length);
            filled += length;
            if filled == dest.len() {
                return true;
            }
            if !self.pull_slow(1, dest.len() - filled) {
                return false;
            }
        }
    }

    /// 窗口不足或数据较长时读取到 [`Chain`]。
    fn read_slow_to_chain(&mut self, length: usize, dest: &mut Chain) -> bool {
        let mut remaining = length;
        loop {
            let chunk_length = self.available().min(remaining);
            dest.append_slice(&self.chunk()[..chunk_length]);
            self.move_cursor(chunk_length);
            remaining -= chunk_length;
            if remaining == 0 {
                return true;
            }
            if !self.pull_slow(1, remaining) {
                return false;
            }
        }
    }

    /// 窗口不足或数据较长时读取到 [`Rope`]。
    fn read_slow_to_rope(&mut self, length: usize, dest: &mut Rope) -> bool {
        let mut chain = Chain::new();
        let result = self.read_slow_to_chain(length, &mut chain);
        for block in chain.blocks() {
            dest.append_bytes(block.clone());
        }
        result
    }

    /// 窗口不足或数据较长时复制到前向写入器。
    fn copy_slow(&mut self, length: Position, dest: &mut dyn Writer) -> bool {
        let mut remaining = length;
        loop {
            let chunk_length = usize::try_from(remaining)
                .unwrap_or(usize::MAX)
                .min(self.available());
            let written = dest.write(&self.chunk()[..chunk_length]);
            self.move_cursor(chunk_length);
            if !written {
                return false;
            }
            remaining -= chunk_length as Position;
            if remaining == 0 {
                return true;
            }
            let recommended = usize::try_from(remaining).unwrap_or(usize::MAX);
            if !self.pull_slow(1, recommended) {
                return false;
            }
        }
    }

    /// 窗口不足或数据较长时复制到反向写入器。
    ///
    /// 反向写入器要求数据整体到位后再前插，因此先收集到 [`Chain`]。
    fn copy_slow_to_backward(&mut self, length: usize, dest: &mut dyn BackwardWriter) -> bool {
        let mut data = Chain::new();
        if !self.read_to_chain(length, &mut data) {
            // 数据不足时不写入任何内容。
            return false;
        }
        dest.write_chain(&data)
    }

    /// 提示即将读取 `min_length` 字节；默认忽略。
    fn read_hint_slow(&mut self, _min_length: usize, _recommended_length: usize) {}

    /// 窗口外定位。默认只支持向前跳过。
    fn seek_slow(&mut self, new_pos: Position) -> bool {
        debug_assert!(
            new_pos < self.start_pos() || new_pos > self.limit_pos(),
            "Failed precondition of Reader::seek_slow(): position in the buffer, use seek() instead"
        );
        if !self.ok() {
            return false;
        }
        if new_pos <= self.limit_pos() {
            return self.fail(StreamError::unsupported("Reader::seek() backwards"));
        }
        loop {
            let limit = self.state().limit();
            self.state_mut().set_cursor(limit);
            if !self.pull_slow(1, 0) {
                return false;
            }
            if new_pos <= self.limit_pos() {
                let behind = (self.limit_pos() - new_pos) as usize;
                let limit = self.state().limit();
                self.state_mut().set_cursor(limit - behind);
                return true;
            }
        }
    }

    /// 数据总长度；默认不支持。
    fn size_impl(&mut self) -> Option<Position> {
        self.fail(StreamError::unsupported("Reader::size()"));
        None
    }

    /// 构造独立读取同一数据、从 `initial_pos` 开始的新读取器；默认不支持。
    fn new_reader_impl(&mut self, _initial_pos: Position) -> Option<Box<dyn Reader>> {
        self.fail(StreamError::unsupported("Reader::new_reader()"));
        None
    }

    /// 提示调用方会读取全部剩余数据；默认忽略。
    fn set_read_all_hint_impl(&mut self, _read_all_hint: bool) {}

    /// 校验已到达数据末尾。
    fn verify_end_impl(&mut self) -> bool {
        if self.pull(1, 0) {
            return self.fail(StreamError::new(
                codes::UNEXPECTED_DATA,
                "End of data expected",
            ));
        }
        self.ok()
    }

    /// 为失败附加位置上下文。
    fn annotate_status(&mut self, err: StreamError) -> StreamError {
        if self.is_open() {
            err.annotate(format!("at byte {}", self.pos()))
        } else {
            err
        }
    }

    /// 关闭时释放资源；在状态被标记为关闭之前调用，可以记录失败。
    fn done(&mut self) {}

    /// 读取器是否可以安全地预读超出请求的数据。
    fn tolerates_reading_ahead(&self) -> bool {
        false
    }

    /// 是否支持任意位置定位。
    fn supports_random_access(&self) -> bool {
        false
    }

    /// 是否支持向后定位。
    fn supports_rewind(&self) -> bool {
        self.supports_random_access()
    }

    /// 是否支持 [`Reader::size`]。
    fn supports_size(&self) -> bool {
        self.supports_random_access()
    }

    /// 是否支持 [`Reader::new_reader`]。
    fn supports_new_reader(&self) -> bool {
        false
    }

    // ---- 以下为快路径，具体实现通常无需覆写 ----

    /// 当前绝对位置。
    fn pos(&self) -> Position {
        self.state().pos()
    }

    /// 窗口起点的绝对位置。
    fn start_pos(&self) -> Position {
        self.state().start_pos()
    }

    /// 窗口末端的绝对位置。
    fn limit_pos(&self) -> Position {
        self.state().limit_pos()
    }

    /// 窗口内可读字节数。
    fn available(&self) -> usize {
        self.state().available()
    }

    /// 窗口内尚未消费的数据。
    fn chunk(&self) -> &[u8] {
        &self.buffer()[self.state().cursor()..]
    }

    /// 前移游标。
    fn move_cursor(&mut self, length: usize) {
        self.state_mut().move_cursor(length);
    }

    /// 设置游标。
    fn set_cursor(&mut self, cursor: usize) {
        self.state_mut().set_cursor(cursor);
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

    /// 确保至少 `min_length` 字节可读。
    fn pull(&mut self, min_length: usize, recommended_length: usize) -> bool {
        if self.available() >= min_length {
            return true;
        }
        self.pull_slow(min_length, recommended_length)
    }

    /// 读满 `dest`。
    fn read(&mut self, dest: &mut [u8]) -> bool {
        let length = dest.len();
        if length <= self.available() {
            dest.copy_from_slice(&self.chunk()[..length]);
            self.move_cursor(length);
            return true;
        }
        self.read_slow(dest)
    }

    /// 读取单个字节。
    fn read_byte(&mut self) -> Option<u8> {
        if !self.pull(1, 0) {
            return None;
        }
        let byte = self.chunk()[0];
        self.move_cursor(1);
        Some(byte)
    }

    /// 读取 `length` 字节并追加到 `dest`。
    fn read_to_chain(&mut self, length: usize, dest: &mut Chain) -> bool {
        if length <= self.available() && length <= MAX_BYTES_TO_COPY {
            dest.append_slice(&self.chunk()[..length]);
            self.move_cursor(length);
            return true;
        }
        self.read_slow_to_chain(length, dest)
    }

    /// 读取 `length` 字节并追加到 `dest`。
    fn read_to_rope(&mut self, length: usize, dest: &mut Rope) -> bool {
        if length <= self.available() && length <= MAX_BYTES_TO_COPY {
            dest.append_slice(&self.chunk()[..length]);
            self.move_cursor(length);
            return true;
        }
        self.read_slow_to_rope(length, dest)
    }

    /// 复制 `length` 字节到前向写入器。
    fn copy_to(&mut self, length: Position, dest: &mut dyn Writer) -> bool {
        if length <= self.available() as Position && length <= MAX_BYTES_TO_COPY as Position {
            let length = length as usize;
            let written = dest.write(&self.chunk()[..length]);
            self.move_cursor(length);
            return written;
        }
        self.copy_slow(length, dest)
    }

    /// 复制 `length` 字节到反向写入器。
    fn copy_to_backward(&mut self, length: usize, dest: &mut dyn BackwardWriter) -> bool {
        if length <= self.available() && length <= MAX_BYTES_TO_COPY {
            let written = dest.write(&self.chunk()[..length]);
            self.move_cursor(length);
            return written;
        }
        self.copy_slow_to_backward(length, dest)
    }

    /// 提示即将读取的数据量。
    fn read_hint(&mut self, min_length: usize, recommended_length: usize) {
        if self.available() < min_length {
            self.read_hint_slow(min_length, recommended_length);
        }
    }

    /// 定位到 `new_pos`；越过末尾时停在末尾并返回 `false`。
    fn seek(&mut self, new_pos: Position) -> bool {
        if new_pos >= self.start_pos() && new_pos <= self.limit_pos() {
            let cursor = (new_pos - self.start_pos()) as usize;
            self.set_cursor(cursor);
            return true;
        }
        self.seek_slow(new_pos)
    }

    /// 跳过 `length` 字节。
    fn skip(&mut self, length: Position) -> bool {
        if length <= self.available() as Position {
            self.move_cursor(length as usize);
            return true;
        }
        let target = self.pos().saturating_add(length);
        self.seek_slow(target)
    }

    /// 数据总长度；不支持或失败时为 `None`。
    fn size(&mut self) -> Option<Position> {
        if !self.ok() {
            return None;
        }
        self.size_impl()
    }

    /// 构造从 `initial_pos` 开始的新读取器。
    fn new_reader(&mut self, initial_pos: Position) -> Option<Box<dyn Reader>> {
        if !self.ok() {
            return None;
        }
        self.new_reader_impl(initial_pos)
    }

    /// 提示是否会读取全部剩余数据。
    fn set_read_all_hint(&mut self, read_all_hint: bool) {
        if self.ok() {
            self.set_read_all_hint_impl(read_all_hint);
        }
    }

    /// 校验已到达末尾，否则以 `stream.unexpected_data` 失败。
    fn verify_end(&mut self) -> bool {
        if !self.ok() {
            return false;
        }
        self.verify_end_impl()
    }

    /// 关闭读取器，返回首个失败。重复关闭是幂等的。
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
    use crate::{BytesReader, test_stubs::ChunkedReader};
    use bytes::Bytes;

    fn sample(len: usize) -> Bytes {
        (0..len).map(|i| i as u8).collect::<alloc::vec::Vec<u8>>().into()
    }

    #[test]
    fn state_derives_positions() {
        let mut state = ReaderState::new();
        state.set_window(3, 10, 110);
        assert_eq!(state.pos(), 103);
        assert_eq!(state.start_pos(), 100);
        assert_eq!(state.available(), 7);
        state.drop_window();
        assert_eq!(state.pos(), 103);
        assert_eq!(state.limit(), 0);
    }

    #[test]
    fn read_spans_windows() {
        let mut reader = ChunkedReader::new(sample(20), 3);
        let mut dest = [0u8; 11];
        assert!(reader.read(&mut dest));
        assert_eq!(dest, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(reader.pos(), 11);
    }

    #[test]
    fn read_past_end_stays_ok() {
        let mut reader = ChunkedReader::new(sample(5), 2);
        let mut dest = [0u8; 8];
        assert!(!reader.read(&mut dest));
        assert!(reader.ok());
        assert_eq!(reader.pos(), 5);
        assert_eq!(&dest[..5], &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn forward_seek_skips_and_backward_fails() {
        let mut reader = ChunkedReader::new(sample(50), 4);
        assert!(reader.seek(30));
        assert_eq!(reader.read_byte(), Some(30));
        assert!(!reader.seek(2));
        assert!(reader.status().unwrap_err().is(codes::UNSUPPORTED));
        assert_eq!(reader.pos(), 31, "失败后位置保持不变");
    }

    #[test]
    fn verify_end_reports_trailing_data() {
        let mut reader = BytesReader::new(sample(2));
        assert!(!reader.verify_end());
        assert!(reader.status().unwrap_err().is(codes::UNEXPECTED_DATA));

        let mut drained = BytesReader::new(sample(2));
        assert!(drained.skip(2));
        assert!(drained.verify_end());
    }

    #[test]
    fn close_is_idempotent_and_blocks_reads() {
        let mut reader = BytesReader::new(sample(4));
        assert!(reader.close().is_ok());
        assert!(reader.close().is_ok());
        assert_eq!(reader.read_byte(), None);
        assert!(reader.status().unwrap_err().is(codes::CLOSED));
    }

    #[test]
    fn failure_message_carries_position() {
        let mut reader = ChunkedReader::new(sample(10), 4);
        assert!(reader.skip(6));
        reader.fail(StreamError::overflow());
        let err = reader.status().unwrap_err();
        assert!(err.message().ends_with("at byte 6"), "{}", err.message());
    }
}

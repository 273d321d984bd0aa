//! `PositionShiftingReader`：把被包装读取器的位置整体平移 `base_pos`。
//!
//! # 设计背景（Why）
//! - 某些消费者要求输入从特定位置（通常是 0）开始，而数据实际位于更大寻址空间的某个偏移处；
//!   装饰器让两者对齐而无需复制数据。
//!
//! # 逻辑解析（How）
//! - 装饰器直接复用被包装读取器的窗口：游标与窗口长度相同，仅 `limit_pos` 加上 `base_pos`；
//! - 快路径只移动装饰器自身的游标；任何委托前先 `sync_buffer` 把游标写回被包装读取器，
//!   委托后再 `make_buffer` 从被包装读取器重建窗口；
//! - 窗口只保存索引，数据切片每次访问时经 [`Dependency`] 重新取得，
//!   因此装饰器与被包装对象在内存中移动都不会产生悬垂视图，移动后的轨迹与移动前完全一致。
//!
//! # 契约说明（What）
//! - 打开期间：被包装读取器的游标（同步后）等于装饰器游标，
//!   `limit_pos() == src.limit_pos() + base_pos`；
//! - 定位到 `base_pos` 之前是永久失败（`stream.underflow`）；
//! - 被包装读取器失败时，装饰器以 `with relative position at byte N` 标注并接收该失败；
//! - 只有拥有被包装读取器时，关闭、`set_read_all_hint`、`verify_end` 才会转发。

use alloc::{boxed::Box, format};

use crate::{
    BackwardWriter, Chain, Dependency, Position, Reader, ReaderState, Rope, StreamError, Writer,
};

/// [`PositionShiftingReader`] 的配置。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PositionShiftingReaderOptions {
    base_pos: Position,
}

impl PositionShiftingReaderOptions {
    /// 默认配置，`base_pos = 0`。
    pub const fn new() -> Self {
        Self { base_pos: 0 }
    }

    /// 被包装读取器位置 0 对应的装饰器位置。
    pub const fn with_base_pos(mut self, base_pos: Position) -> Self {
        self.base_pos = base_pos;
        self
    }

    /// 基准位置。
    pub const fn base_pos(&self) -> Position {
        self.base_pos
    }
}

/// 位置平移读取器。
///
/// `S` 决定持有方式：`&mut R` 借用，`Box<R>`、[`Owned<R>`](crate::Owned) 拥有，
/// [`MaybeOwned`](crate::MaybeOwned) 在运行期选择。
pub struct PositionShiftingReader<S>
where
    S: Dependency,
    S::Target: Reader,
{
    state: ReaderState,
    base_pos: Position,
    src: S,
}

impl<S> PositionShiftingReader<S>
where
    S: Dependency,
    S::Target: Reader,
{
    /// 包装 `src`，立即从其当前窗口建立自身窗口。
    pub fn new(src: S, options: PositionShiftingReaderOptions) -> Self {
        let base_pos = options.base_pos();
        let mut state = ReaderState::new();
        state.set_window(0, 0, base_pos);
        let mut reader = Self {
            state,
            base_pos,
            src,
        };
        reader.make_buffer();
        reader
    }

    /// 基准位置。
    pub fn base_pos(&self) -> Position {
        self.base_pos
    }

    /// 被包装读取器的持有者。
    pub fn src(&self) -> &S {
        &self.src
    }

    /// 可变持有者。调用方修改被包装读取器后，装饰器不会感知其窗口变化。
    pub fn src_mut(&mut self) -> &mut S {
        &mut self.src
    }

    /// 被包装读取器。
    pub fn src_reader(&self) -> &S::Target {
        self.src.get()
    }

    fn sync_buffer(&mut self) {
        let cursor = self.state.cursor();
        self.src.get_mut().state_mut().set_cursor(cursor);
    }

    /// 从被包装读取器重建窗口；返回装饰器是否仍然健康。
    fn make_buffer(&mut self) -> bool {
        let src = self.src.get();
        let Some(limit_pos) = src.limit_pos().checked_add(self.base_pos) else {
            return self.fail_overflow_detached();
        };
        let (cursor, limit) = (src.state().cursor(), src.state().limit());
        let src_status = src.status();
        self.state.set_window(cursor, limit, limit_pos);
        if let Err(err) = src_status {
            let err = self.annotate_over_src(err);
            return self.fail_without_annotation(err);
        }
        true
    }

    /// 窗口已与被包装读取器脱节时记录溢出：不同步游标，位置停在上一个有效窗口。
    fn fail_overflow_detached(&mut self) -> bool {
        let mut err = StreamError::overflow();
        if self.src.is_owning() {
            err = self.src.get_mut().annotate_status(err);
        }
        let err = self.annotate_over_src(err);
        self.state.drop_window();
        self.state.object_mut().fail(err)
    }

    fn annotate_over_src(&self, err: StreamError) -> StreamError {
        if self.state.object().is_open() {
            err.annotate(format!("with relative position at byte {}", self.state.pos()))
        } else {
            err
        }
    }

    fn fail_underflow(&mut self, new_pos: Position) -> bool {
        let base_pos = self.base_pos;
        self.fail(StreamError::underflow(new_pos, base_pos))
    }

    /// 同步、委托、重建的通用骨架。
    fn delegate<T>(&mut self, op: impl FnOnce(&mut S::Target) -> T) -> (T, bool) {
        self.sync_buffer();
        let result = op(self.src.get_mut());
        let healthy = self.make_buffer();
        (result, healthy)
    }
}

impl<S> Reader for PositionShiftingReader<S>
where
    S: Dependency,
    S::Target: Reader,
{
    fn state(&self) -> &ReaderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ReaderState {
        &mut self.state
    }

    fn buffer(&self) -> &[u8] {
        &self.src.get().buffer()[..self.state.limit()]
    }

    fn pull_slow(&mut self, min_length: usize, recommended_length: usize) -> bool {
        debug_assert!(
            self.available() < min_length,
            "Failed precondition of Reader::pull_slow(): enough data available, use pull() instead"
        );
        if !self.ok() {
            return false;
        }
        let (pulled, healthy) = self.delegate(|src| src.pull(min_length, recommended_length));
        pulled && healthy
    }

    fn read_slow(&mut self, dest: &mut [u8]) -> bool {
        debug_assert!(
            dest.len() > self.available(),
            "Failed precondition of Reader::read_slow(): enough data available, use read() instead"
        );
        if !self.ok() {
            return false;
        }
        let (read, healthy) = self.delegate(|src| src.read(dest));
        read && healthy
    }

    fn read_slow_to_chain(&mut self, length: usize, dest: &mut Chain) -> bool {
        if !self.ok() {
            return false;
        }
        let (read, healthy) = self.delegate(|src| src.read_to_chain(length, dest));
        read && healthy
    }

    fn read_slow_to_rope(&mut self, length: usize, dest: &mut Rope) -> bool {
        if !self.ok() {
            return false;
        }
        let (read, healthy) = self.delegate(|src| src.read_to_rope(length, dest));
        read && healthy
    }

    fn copy_slow(&mut self, length: Position, dest: &mut dyn Writer) -> bool {
        if !self.ok() {
            return false;
        }
        let (copied, healthy) = self.delegate(|src| src.copy_to(length, dest));
        copied && healthy
    }

    fn copy_slow_to_backward(&mut self, length: usize, dest: &mut dyn BackwardWriter) -> bool {
        if !self.ok() {
            return false;
        }
        let (copied, healthy) = self.delegate(|src| src.copy_to_backward(length, dest));
        copied && healthy
    }

    fn read_hint_slow(&mut self, min_length: usize, recommended_length: usize) {
        if !self.ok() {
            return;
        }
        self.delegate(|src| src.read_hint(min_length, recommended_length));
    }

    fn seek_slow(&mut self, new_pos: Position) -> bool {
        debug_assert!(
            new_pos < self.start_pos() || new_pos > self.limit_pos(),
            "Failed precondition of Reader::seek_slow(): position in the buffer, use seek() instead"
        );
        if !self.ok() {
            return false;
        }
        if new_pos < self.base_pos {
            return self.fail_underflow(new_pos);
        }
        let base_pos = self.base_pos;
        let (sought, healthy) = self.delegate(|src| src.seek(new_pos - base_pos));
        sought && healthy
    }

    fn size_impl(&mut self) -> Option<Position> {
        let (size, healthy) = self.delegate(|src| src.size());
        if !healthy {
            return None;
        }
        let size = size?;
        match size.checked_add(self.base_pos) {
            Some(size) => Some(size),
            None => {
                self.fail_overflow();
                None
            }
        }
    }

    fn new_reader_impl(&mut self, initial_pos: Position) -> Option<Box<dyn Reader>> {
        let base_pos = self.base_pos;
        let (src_reader, _) =
            self.delegate(|src| src.new_reader(initial_pos.saturating_sub(base_pos)));
        let src_reader = src_reader?;
        let mut reader = PositionShiftingReader::new(
            src_reader,
            PositionShiftingReaderOptions::new().with_base_pos(base_pos),
        );
        if initial_pos < base_pos {
            reader.fail_underflow(initial_pos);
        }
        Some(Box::new(reader))
    }

    fn set_read_all_hint_impl(&mut self, read_all_hint: bool) {
        if self.src.is_owning() {
            self.delegate(|src| src.set_read_all_hint(read_all_hint));
        }
    }

    fn verify_end_impl(&mut self) -> bool {
        if self.src.is_owning() {
            let (verified, healthy) = self.delegate(|src| src.verify_end());
            return verified && healthy;
        }
        if self.pull(1, 0) {
            return self.fail(StreamError::new(
                crate::error::codes::UNEXPECTED_DATA,
                "End of data expected",
            ));
        }
        self.ok()
    }

    fn annotate_status(&mut self, err: StreamError) -> StreamError {
        if !self.state.object().is_open() {
            return err;
        }
        let err = if self.src.is_owning() {
            if self.state.object().ok() {
                self.sync_buffer();
            }
            self.src.get_mut().annotate_status(err)
        } else {
            err
        };
        self.annotate_over_src(err)
    }

    fn fail_without_annotation(&mut self, err: StreamError) -> bool {
        if self.state.object().ok() {
            // 窗口即将清空，先把已消费的字节交还被包装读取器。
            self.sync_buffer();
            self.state.drop_window();
        }
        self.state.object_mut().fail(err)
    }

    fn done(&mut self) {
        if self.state.object().ok() {
            self.sync_buffer();
            // 被包装读取器关闭后窗口失效，此后不得再同步。
            self.state.drop_window();
        }
        if self.src.is_owning() {
            if let Err(err) = self.src.get_mut().close() {
                let err = self.annotate_over_src(err);
                self.state.object_mut().fail(err);
            }
        }
    }

    fn tolerates_reading_ahead(&self) -> bool {
        self.src.get().tolerates_reading_ahead()
    }

    fn supports_random_access(&self) -> bool {
        self.src.get().supports_random_access()
    }

    fn supports_rewind(&self) -> bool {
        self.src.get().supports_rewind()
    }

    fn supports_size(&self) -> bool {
        self.src.get().supports_size()
    }

    fn supports_new_reader(&self) -> bool {
        self.src.get().supports_new_reader()
    }
}

impl<S> core::fmt::Debug for PositionShiftingReader<S>
where
    S: Dependency,
    S::Target: Reader,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PositionShiftingReader")
            .field("state", &self.state)
            .field("base_pos", &self.base_pos)
            .field("owning", &self.src.is_owning())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BytesReader, Owned, error::codes, test_stubs::ChunkedReader};
    use bytes::Bytes;

    fn data() -> Bytes {
        Bytes::from_static(b"abcdefghijklmnopqrstuvwxyz")
    }

    #[test]
    fn window_mirrors_source() {
        let mut src = BytesReader::new(data());
        assert!(src.skip(3));
        let reader = PositionShiftingReader::new(
            &mut src,
            PositionShiftingReaderOptions::new().with_base_pos(100),
        );
        assert_eq!(reader.pos(), 103);
        assert_eq!(reader.limit_pos(), 126);
        assert_eq!(reader.chunk(), &b"defghijklmnopqrstuvwxyz"[..]);
    }

    #[test]
    fn close_syncs_borrowed_source_without_closing_it() {
        let mut src = ChunkedReader::new(data(), 5);
        {
            let mut reader = PositionShiftingReader::new(
                &mut src,
                PositionShiftingReaderOptions::new().with_base_pos(7),
            );
            let mut dest = [0u8; 8];
            assert!(reader.read(&mut dest));
            assert_eq!(reader.pos(), 15);
            reader.close().expect("关闭成功");
        }
        assert!(src.is_open());
        assert_eq!(src.pos(), 8);
        assert_eq!(src.read_byte(), Some(b'i'));
    }

    #[test]
    fn construction_overflow_fails() {
        let reader = PositionShiftingReader::new(
            Owned(BytesReader::new(data())),
            PositionShiftingReaderOptions::new().with_base_pos(Position::MAX - 5),
        );
        assert!(!reader.ok());
        assert!(reader.status().unwrap_err().is(codes::OVERFLOW));
        assert_eq!(reader.pos(), Position::MAX - 5, "位置停在基准位置");
    }

    #[test]
    fn annotate_status_wraps_owned_source_context() {
        let mut reader = PositionShiftingReader::new(
            Owned(BytesReader::new(data())),
            PositionShiftingReaderOptions::new().with_base_pos(10),
        );
        assert!(reader.skip(2));
        reader.fail(StreamError::invalid_argument("bad"));
        let err = reader.status().unwrap_err();
        assert_eq!(
            err.message(),
            "bad; at byte 2; with relative position at byte 12"
        );
    }
}

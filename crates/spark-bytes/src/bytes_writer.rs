//! 写入内存 [`BytesMut`] 的前向写入器。

use bytes::{Bytes, BytesMut};

use crate::{BufferOptions, Position, WriteBufferSizer, Writer, WriterState};

/// 写入自有 [`BytesMut`]。
///
/// `dest[..start_pos]` 为已提交数据，窗口为 `dest[start_pos..start_pos + limit]`。
/// 窗口长度由 [`WriteBufferSizer`] 决定，因此长流的扩容次数随数据量对数增长。
#[derive(Debug)]
pub struct BytesWriter {
    state: WriterState,
    dest: BytesMut,
    sizer: WriteBufferSizer,
}

impl Default for BytesWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BytesWriter {
    /// 以默认缓冲选项构造。
    pub fn new() -> Self {
        Self::with_options(BufferOptions::default())
    }

    /// 以给定缓冲选项构造。
    pub fn with_options(options: BufferOptions) -> Self {
        let mut sizer = WriteBufferSizer::new(options);
        sizer.begin_run(0);
        Self {
            state: WriterState::new(),
            dest: BytesMut::new(),
            sizer,
        }
    }

    /// 已写入的数据。
    pub fn written(&self) -> &[u8] {
        &self.dest[..self.state.pos() as usize]
    }

    /// 取出已写入的数据。
    pub fn into_bytes(mut self) -> Bytes {
        let pos = self.state.pos() as usize;
        self.dest.truncate(pos);
        self.dest.freeze()
    }

    fn sync_buffer(&mut self) {
        let pos = self.state.pos();
        self.dest.truncate(pos as usize);
        self.state.set_window(pos, 0, 0);
    }
}

impl Writer for BytesWriter {
    fn state(&self) -> &WriterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut WriterState {
        &mut self.state
    }

    fn buffer_mut(&mut self) -> &mut [u8] {
        let start = self.state.start_pos() as usize;
        let limit = self.state.limit();
        &mut self.dest[start..start + limit]
    }

    fn push_slow(&mut self, min_length: usize, recommended_length: usize) -> bool {
        debug_assert!(
            self.available() < min_length,
            "Failed precondition of Writer::push_slow(): enough space available, use push() instead"
        );
        if !self.ok() {
            return false;
        }
        let pos = self.state.pos();
        if min_length > usize::MAX - pos as usize {
            return self.fail_overflow();
        }
        self.sync_buffer();
        let length = self
            .sizer
            .buffer_length(pos, min_length, recommended_length)
            .min(usize::MAX - pos as usize);
        tracing::trace!(pos, length, "growing bytes writer buffer");
        self.dest.resize(pos as usize + length, 0);
        self.state.set_window(pos, 0, length);
        true
    }

    fn truncate_impl(&mut self, new_size: Position) -> bool {
        if new_size > self.state.pos() {
            return false;
        }
        self.sync_buffer();
        self.dest.truncate(new_size as usize);
        self.state.set_window(new_size, 0, 0);
        true
    }

    fn set_write_size_hint_impl(&mut self, write_size_hint: Option<Position>) {
        self.sizer.set_write_size_hint(self.state.pos(), write_size_hint);
    }

    fn supports_truncate(&self) -> bool {
        true
    }

    fn done(&mut self) {
        let pos = self.state.pos();
        self.sync_buffer();
        self.sizer.end_run(pos);
    }
}

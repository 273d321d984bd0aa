//! 字节流契约的测试桩。
//!
//! # 设计定位（Why）
//! - [`BytesReader`](crate::BytesReader) 一次暴露全部数据，慢路径几乎不会被触发；
//!   装饰器与默认慢路径的测试需要一个按小块供数、可注入失败的读取器；
//! - 反向写入的顺序语义需要一个保留数据的反向写入器来断言输出。
//!
//! # 契约说明（What）
//! - 这些类型只用于测试、基准与模糊测试，生产代码不应依赖；
//! - 行为确定，不涉及 IO 或线程。

use alloc::{collections::VecDeque, vec::Vec};

use bytes::Bytes;

use crate::{BackwardWriter, BackwardWriterState, Position, Reader, ReaderState, StreamError};

/// 注入失败使用的错误码。
pub const INJECTED_FAILURE: &str = "test_stubs.injected_failure";

/// 每次最多暴露 `chunk_size` 字节窗口的读取器。
///
/// 支持大小查询，不支持随机访问；可在指定位置注入失败。
#[derive(Debug, Clone)]
pub struct ChunkedReader {
    state: ReaderState,
    data: Bytes,
    chunk_size: usize,
    window_start: usize,
    fail_at: Option<Position>,
}

impl ChunkedReader {
    /// 以 `chunk_size` 为窗口粒度读取 `data`。
    ///
    /// # Panics
    /// `chunk_size == 0` 时断言失败。
    pub fn new(data: impl Into<Bytes>, chunk_size: usize) -> Self {
        assert!(
            chunk_size > 0,
            "Failed precondition of ChunkedReader::new(): zero chunk_size"
        );
        Self {
            state: ReaderState::new(),
            data: data.into(),
            chunk_size,
            window_start: 0,
            fail_at: None,
        }
    }

    /// 读取到 `pos` 时以 [`INJECTED_FAILURE`] 失败。
    pub fn with_failure_at(mut self, pos: Position) -> Self {
        self.fail_at = Some(pos);
        self
    }
}

impl Reader for ChunkedReader {
    fn state(&self) -> &ReaderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ReaderState {
        &mut self.state
    }

    fn buffer(&self) -> &[u8] {
        &self.data[self.window_start..self.window_start + self.state.limit()]
    }

    fn pull_slow(&mut self, min_length: usize, _recommended_length: usize) -> bool {
        debug_assert!(
            self.available() < min_length,
            "Failed precondition of Reader::pull_slow(): enough data available, use pull() instead"
        );
        if !self.ok() {
            return false;
        }
        let pos = self.pos() as usize;
        let mut end = self
            .data
            .len()
            .min(pos + self.chunk_size.max(min_length));
        if let Some(fail_at) = self.fail_at {
            let fail_at = usize::try_from(fail_at).unwrap_or(usize::MAX);
            if fail_at <= pos {
                return self.fail(StreamError::new(INJECTED_FAILURE, "injected failure"));
            }
            end = end.min(fail_at);
        }
        // 窗口止于失败点，越过它的下一次拉取才会失败。
        self.window_start = pos;
        self.state.set_window(0, end - pos, end as Position);
        self.available() >= min_length
    }

    fn size_impl(&mut self) -> Option<Position> {
        Some(self.data.len() as Position)
    }

    fn supports_size(&self) -> bool {
        true
    }

    fn done(&mut self) {
        self.state.drop_window();
        self.window_start = 0;
    }
}

/// 保留全部数据的反向写入器。
///
/// 每次写入的片段被前插到结果中，[`RecordingBackwardWriter::data`] 返回最终顺序。
#[derive(Debug, Default)]
pub struct RecordingBackwardWriter {
    state: BackwardWriterState,
    committed: VecDeque<u8>,
    window: Vec<u8>,
    window_size: usize,
}

impl RecordingBackwardWriter {
    /// 窗口长度为 `window_size` 的写入器。
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            ..Self::default()
        }
    }

    /// 写入的全部数据，按最终顺序排列。
    pub fn data(&self) -> Vec<u8> {
        let cursor = self.state.cursor();
        let mut out = Vec::with_capacity(self.window.len() - cursor + self.committed.len());
        out.extend_from_slice(&self.window[cursor..self.state.limit()]);
        out.extend(self.committed.iter().copied());
        out
    }

    fn sync_buffer(&mut self) {
        let cursor = self.state.cursor();
        let limit = self.state.limit();
        for &byte in self.window[cursor..limit].iter().rev() {
            self.committed.push_front(byte);
        }
        let pos = self.state.pos();
        self.state.set_window(pos, 0);
    }
}

impl BackwardWriter for RecordingBackwardWriter {
    fn state(&self) -> &BackwardWriterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BackwardWriterState {
        &mut self.state
    }

    fn buffer_mut(&mut self) -> &mut [u8] {
        let limit = self.state.limit();
        &mut self.window[..limit]
    }

    fn push_slow(&mut self, min_length: usize, _recommended_length: usize) -> bool {
        if !self.ok() {
            return false;
        }
        self.sync_buffer();
        let length = self.window_size.max(min_length);
        self.window.clear();
        self.window.resize(length, 0);
        let pos = self.state.pos();
        self.state.set_window(pos, length);
        true
    }

    fn done(&mut self) {
        self.sync_buffer();
    }
}

//! 基于内存 [`Bytes`] 的读取器：整段数据即一个窗口。

use alloc::boxed::Box;

use bytes::Bytes;

use crate::{Chain, Position, Reader, ReaderState, Rope};

/// 从 [`Bytes`] 读取。
///
/// 支持随机访问、大小查询与 [`Reader::new_reader`]；读取到 [`Chain`]/[`Rope`] 时
/// 超过 [`MAX_BYTES_TO_COPY`](crate::MAX_BYTES_TO_COPY) 的数据直接共享源内存。
#[derive(Debug, Clone)]
pub struct BytesReader {
    state: ReaderState,
    data: Bytes,
}

impl BytesReader {
    /// 从头读取 `data`。
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let mut state = ReaderState::new();
        state.set_window(0, data.len(), data.len() as Position);
        Self { state, data }
    }

    /// 被读取的数据。
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    fn share(&mut self, length: usize) -> (Bytes, bool) {
        let length_read = length.min(self.state.available());
        let cursor = self.state.cursor();
        let shared = self.data.slice(cursor..cursor + length_read);
        self.state.move_cursor(length_read);
        (shared, length_read == length)
    }
}

impl Reader for BytesReader {
    fn state(&self) -> &ReaderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ReaderState {
        &mut self.state
    }

    fn buffer(&self) -> &[u8] {
        &self.data[..self.state.limit()]
    }

    fn pull_slow(&mut self, min_length: usize, _recommended_length: usize) -> bool {
        debug_assert!(
            self.available() < min_length,
            "Failed precondition of Reader::pull_slow(): enough data available, use pull() instead"
        );
        false
    }

    fn read_slow_to_chain(&mut self, length: usize, dest: &mut Chain) -> bool {
        if !self.ok() {
            return false;
        }
        let (shared, complete) = self.share(length);
        dest.append_bytes(shared);
        complete
    }

    fn read_slow_to_rope(&mut self, length: usize, dest: &mut Rope) -> bool {
        if !self.ok() {
            return false;
        }
        let (shared, complete) = self.share(length);
        dest.append_bytes(shared);
        complete
    }

    fn seek_slow(&mut self, new_pos: Position) -> bool {
        if !self.ok() {
            return false;
        }
        debug_assert!(
            new_pos > self.limit_pos(),
            "Failed precondition of Reader::seek_slow(): position in the buffer, use seek() instead"
        );
        let limit = self.state.limit();
        self.state.set_cursor(limit);
        false
    }

    fn size_impl(&mut self) -> Option<Position> {
        Some(self.data.len() as Position)
    }

    fn new_reader_impl(&mut self, initial_pos: Position) -> Option<Box<dyn Reader>> {
        let mut reader = BytesReader::new(self.data.clone());
        reader.seek(initial_pos);
        Some(Box::new(reader))
    }

    fn done(&mut self) {
        self.data = Bytes::new();
        self.state.drop_window();
    }

    fn tolerates_reading_ahead(&self) -> bool {
        true
    }

    fn supports_random_access(&self) -> bool {
        true
    }

    fn supports_new_reader(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn large_reads_share_source_memory() {
        let data = Bytes::from(vec![3u8; 1000]);
        let mut reader = BytesReader::new(data.clone());
        assert!(reader.skip(100));
        let mut chain = Chain::new();
        assert!(reader.read_to_chain(600, &mut chain));
        let block = chain.blocks().next().expect("存在块");
        assert_eq!(block.as_ptr(), data[100..].as_ptr());
        assert_eq!(reader.pos(), 700);

        let mut rope = Rope::new();
        assert!(!reader.read_to_rope(400, &mut rope), "剩余数据不足");
        assert_eq!(rope.len(), 300);
        assert!(reader.ok());
    }

    #[test]
    fn random_access_and_size() {
        let mut reader = BytesReader::new(&b"0123456789"[..]);
        assert!(reader.seek(7));
        assert_eq!(reader.read_byte(), Some(b'7'));
        assert!(reader.seek(2));
        assert_eq!(reader.read_byte(), Some(b'2'));
        assert_eq!(reader.size(), Some(10));
        assert!(!reader.seek(20));
        assert_eq!(reader.pos(), 10);
        assert!(reader.ok());
    }

    #[test]
    fn new_reader_is_independent() {
        let mut reader = BytesReader::new(&b"abcdef"[..]);
        assert!(reader.skip(1));
        let mut other = reader.new_reader(4).expect("支持 new_reader");
        assert_eq!(other.read_byte(), Some(b'e'));
        assert_eq!(reader.read_byte(), Some(b'b'));
    }
}

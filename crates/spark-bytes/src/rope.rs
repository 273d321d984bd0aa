//! `Rope`：可廉价共享的绳索式字节缓冲。
//!
//! 克隆只增加一次引用计数；修改时按需复制片段列表（写时复制），片段本身始终共享。

use alloc::{collections::VecDeque, sync::Arc, vec::Vec};
use core::fmt;

use bytes::Bytes;

/// 共享的绳索式缓冲。
#[derive(Clone, Default)]
pub struct Rope {
    fragments: Arc<VecDeque<Bytes>>,
    size: usize,
}

impl Rope {
    /// 空缓冲。
    pub fn new() -> Self {
        Self::default()
    }

    /// 总字节数。
    pub fn len(&self) -> usize {
        self.size
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// 依次遍历片段。
    pub fn fragments(&self) -> impl DoubleEndedIterator<Item = &Bytes> + ExactSizeIterator {
        self.fragments.iter()
    }

    /// 零拷贝追加。
    pub fn append_bytes(&mut self, src: Bytes) {
        if src.is_empty() {
            return;
        }
        self.grow(src.len());
        Arc::make_mut(&mut self.fragments).push_back(src);
    }

    /// 零拷贝前插。
    pub fn prepend_bytes(&mut self, src: Bytes) {
        if src.is_empty() {
            return;
        }
        self.grow(src.len());
        Arc::make_mut(&mut self.fragments).push_front(src);
    }

    /// 复制追加。
    pub fn append_slice(&mut self, src: &[u8]) {
        self.append_bytes(Bytes::copy_from_slice(src));
    }

    /// 复制前插。
    pub fn prepend_slice(&mut self, src: &[u8]) {
        self.prepend_bytes(Bytes::copy_from_slice(src));
    }

    /// 扁平化为连续字节。
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size);
        for fragment in self.fragments.iter() {
            out.extend_from_slice(fragment);
        }
        out
    }

    fn grow(&mut self, length: usize) {
        self.size = self
            .size
            .checked_add(length)
            .expect("Failed precondition of Rope: size overflow");
    }
}

impl PartialEq for Rope {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self
                .fragments
                .iter()
                .flat_map(|fragment| fragment.iter())
                .eq(other.fragments.iter().flat_map(|fragment| fragment.iter()))
    }
}

impl Eq for Rope {}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rope")
            .field("size", &self.size)
            .field("num_fragments", &self.fragments.len())
            .finish()
    }
}

impl From<&[u8]> for Rope {
    fn from(src: &[u8]) -> Self {
        let mut rope = Rope::new();
        rope.append_slice(src);
        rope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_until_modified() {
        let mut original = Rope::from(&b"hello"[..]);
        let snapshot = original.clone();
        original.append_slice(b" world");
        assert_eq!(snapshot.to_vec(), b"hello");
        assert_eq!(original.to_vec(), b"hello world");
        let first = original.fragments().next().expect("存在首片段");
        let shared = snapshot.fragments().next().expect("存在首片段");
        assert_eq!(first.as_ptr(), shared.as_ptr());
    }

    #[test]
    fn prepend_keeps_order() {
        let mut rope = Rope::new();
        rope.append_slice(b"cd");
        rope.prepend_slice(b"ab");
        assert_eq!(rope.to_vec(), b"abcd");
        assert_eq!(rope.len(), 4);
    }
}

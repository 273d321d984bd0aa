//! `Chain`：拥有所有权、面向追加优化的分段字节缓冲。
//!
//! # 设计背景（Why）
//! - 批量读写需要一个既能零拷贝接纳外部引用计数块（[`Bytes`]），又能廉价追加短数据的目标容器；
//! - 与 `spark-buffer` 的 `PooledBuffer` 一样复用 `bytes` 的引用计数，块之间不共享可变状态。
//!
//! # 逻辑解析（How）
//! - 内部以 `VecDeque<Bytes>` 保存块，头尾两端的零拷贝插入都是 O(1)；
//! - 短数据（不超过 [`MAX_BYTES_TO_COPY`]）与相邻短块合并为一次复制，避免块数量爆炸。
//!
//! # 契约说明（What）
//! - 块永不为空；`len()` 始终等于所有块长度之和；
//! - 相等性按内容比较，与分块方式无关。

use alloc::{collections::VecDeque, vec::Vec};
use core::fmt;

use bytes::{Bytes, BytesMut};

use crate::MAX_BYTES_TO_COPY;

/// 分段字节缓冲。
#[derive(Clone, Default)]
pub struct Chain {
    blocks: VecDeque<Bytes>,
    size: usize,
}

impl Chain {
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

    /// 块数量。
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// 依次遍历各块。
    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = &Bytes> + ExactSizeIterator {
        self.blocks.iter()
    }

    /// 清空内容。
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.size = 0;
    }

    /// 零拷贝地追加一个引用计数块。
    pub fn append_bytes(&mut self, src: Bytes) {
        if src.is_empty() {
            return;
        }
        if src.len() <= MAX_BYTES_TO_COPY {
            self.append_slice(&src);
            return;
        }
        self.grow(src.len());
        self.blocks.push_back(src);
    }

    /// 零拷贝地前插一个引用计数块。
    pub fn prepend_bytes(&mut self, src: Bytes) {
        if src.is_empty() {
            return;
        }
        if src.len() <= MAX_BYTES_TO_COPY {
            self.prepend_slice(&src);
            return;
        }
        self.grow(src.len());
        self.blocks.push_front(src);
    }

    /// 复制追加一段字节。
    pub fn append_slice(&mut self, src: &[u8]) {
        if src.is_empty() {
            return;
        }
        self.grow(src.len());
        match self.blocks.back_mut() {
            Some(last) if last.len() + src.len() <= MAX_BYTES_TO_COPY => {
                let mut merged = BytesMut::with_capacity(last.len() + src.len());
                merged.extend_from_slice(last);
                merged.extend_from_slice(src);
                *last = merged.freeze();
            }
            _ => self.blocks.push_back(Bytes::copy_from_slice(src)),
        }
    }

    /// 复制前插一段字节。
    pub fn prepend_slice(&mut self, src: &[u8]) {
        if src.is_empty() {
            return;
        }
        self.grow(src.len());
        match self.blocks.front_mut() {
            Some(first) if first.len() + src.len() <= MAX_BYTES_TO_COPY => {
                let mut merged = BytesMut::with_capacity(first.len() + src.len());
                merged.extend_from_slice(src);
                merged.extend_from_slice(first);
                *first = merged.freeze();
            }
            _ => self.blocks.push_front(Bytes::copy_from_slice(src)),
        }
    }

    /// 追加另一个 `Chain` 的全部块（共享，不复制）。
    pub fn append_chain(&mut self, src: &Chain) {
        for block in src.blocks() {
            self.append_bytes(block.clone());
        }
    }

    /// 扁平化为连续字节。
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size);
        for block in &self.blocks {
            out.extend_from_slice(block);
        }
        out
    }

    /// 扁平化为单个 [`Bytes`]；只有一块时直接共享该块。
    pub fn to_bytes(&self) -> Bytes {
        match self.blocks.len() {
            0 => Bytes::new(),
            1 => self.blocks[0].clone(),
            _ => Bytes::from(self.to_vec()),
        }
    }

    fn grow(&mut self, length: usize) {
        self.size = self
            .size
            .checked_add(length)
            .expect("Failed precondition of Chain: size overflow");
    }
}

impl PartialEq for Chain {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self
                .blocks
                .iter()
                .flat_map(|block| block.iter())
                .eq(other.blocks.iter().flat_map(|block| block.iter()))
    }
}

impl Eq for Chain {}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("size", &self.size)
            .field("num_blocks", &self.blocks.len())
            .finish()
    }
}

impl From<&[u8]> for Chain {
    fn from(src: &[u8]) -> Self {
        let mut chain = Chain::new();
        chain.append_slice(src);
        chain
    }
}

impl From<Bytes> for Chain {
    fn from(src: Bytes) -> Self {
        let mut chain = Chain::new();
        chain.append_bytes(src);
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn short_appends_are_coalesced() {
        let mut chain = Chain::new();
        chain.append_slice(b"ab");
        chain.append_slice(b"cd");
        chain.prepend_slice(b"01");
        assert_eq!(chain.num_blocks(), 1);
        assert_eq!(chain.to_vec(), b"01abcd");
    }

    #[test]
    fn large_bytes_are_adopted_without_copy() {
        let payload = Bytes::from(vec![7u8; 1024]);
        let mut chain = Chain::new();
        chain.append_bytes(payload.clone());
        chain.prepend_bytes(payload.clone());
        assert_eq!(chain.num_blocks(), 2);
        assert_eq!(chain.len(), 2048);
        let first = chain.blocks().next().expect("存在首块");
        assert_eq!(first.as_ptr(), payload.as_ptr(), "块应与原始 Bytes 共享内存");
    }

    #[test]
    fn equality_ignores_block_boundaries() {
        let mut a = Chain::new();
        a.append_bytes(Bytes::from(vec![1u8; 300]));
        a.append_slice(&[2u8; 10]);
        let mut flat = vec![1u8; 300];
        flat.extend_from_slice(&[2u8; 10]);
        let b = Chain::from(flat.as_slice());
        assert_eq!(a, b);
        assert_eq!(a.to_bytes(), Bytes::from(flat));
    }
}

//! `ByteFill`：`size` 个相同字节的惰性表示。
//!
//! # 设计背景（Why）
//! - 写入大段零或填充字节时，物化 `size` 字节既浪费内存也浪费带宽；
//! - 下游容器（[`Chain`]、[`Rope`]）支持零拷贝接纳引用计数块，因此只需准备一块填充数据，
//!   再以多个视图引用同一块即可。
//!
//! # 逻辑解析（How）
//! - [`ByteFill::blocks`] 选定块宽 `W` 与后备存储，一次性分解为 `ceil(size / W)` 个块；
//! - 后备存储为封闭枚举 [`BlockStorage`]：
//!   - `Zero`：进程级静态零块，`fill == 0` 时使用，零分配；
//!   - `Small`：64 字节内联块，小尺寸非零填充时就地构造；
//!   - `Shared`：引用计数的 [`Bytes`]，大尺寸非零填充时分配一次、填充一次，被所有块共享。
//! - 块视图每次访问都从存储重新推导数据地址，移动 [`Blocks`] 不会留下悬垂视图。
//!
//! # 契约说明（What）
//! - `num_blocks > 0` 时 `size == non_last_block_size * (num_blocks - 1) + last_block_size`；
//! - 每个块非空，按序拼接后与 `size` 个 `fill` 逐字节相同；
//! - 内联块无法独立于 [`Blocks`] 存活，因此 [`BlockRef::to_bytes`] 对其强制物理复制。

use alloc::vec;
use core::{fmt, ops::Deref};

use bytes::Bytes;

use crate::{Chain, Position, Rope};

/// 非零小填充使用的内联块宽度。
pub const SMALL_BLOCK_SIZE: usize = 64;

/// 进程级共享零块的宽度。
pub const BLOCK_OF_ZEROS_SIZE: usize = 64 << 10;

/// 非零大填充共享块的最大宽度。
pub const MAX_SHARED_BLOCK_SIZE: usize = 64 << 10;

// 零初始化的静态数据位于 .bss，首次触碰时才由操作系统映射，无需运行期初始化与析构。
static BLOCK_OF_ZEROS: [u8; BLOCK_OF_ZEROS_SIZE] = [0; BLOCK_OF_ZEROS_SIZE];

/// `size` 个 `fill` 字节。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteFill {
    size: Position,
    fill: u8,
}

impl ByteFill {
    /// 构造 `size` 个 `fill`。
    pub const fn new(size: Position, fill: u8) -> Self {
        Self { size, fill }
    }

    /// 构造 `size` 个零字节。
    pub const fn zeros(size: Position) -> Self {
        Self::new(size, 0)
    }

    /// 是否为空。
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// 字节数。
    pub const fn size(&self) -> Position {
        self.size
    }

    /// 填充值。
    pub const fn fill(&self) -> u8 {
        self.fill
    }

    /// 从本序列中移除 `difference` 个字节，并以新的 `ByteFill` 返回被移除的部分。
    ///
    /// # Panics
    /// `difference > size()` 时断言失败。
    pub fn extract(&mut self, difference: Position) -> ByteFill {
        assert!(
            difference <= self.size,
            "Failed precondition of ByteFill::extract(): size underflow"
        );
        self.size -= difference;
        ByteFill::new(difference, self.fill)
    }

    /// 分解为零拷贝块。
    pub fn blocks(&self) -> Blocks {
        Blocks::new(self.size, self.fill)
    }

    /// 转换为 [`Chain`]。
    pub fn to_chain(&self) -> Chain {
        let mut dest = Chain::new();
        self.append_to_chain(&mut dest);
        dest
    }

    /// 转换为 [`Rope`]。
    pub fn to_rope(&self) -> Rope {
        let mut dest = Rope::new();
        self.append_to_rope(&mut dest);
        dest
    }

    /// 追加到 `dest`。
    pub fn append_to_chain(&self, dest: &mut Chain) {
        for block in &self.blocks() {
            dest.append_bytes(block.to_bytes());
        }
    }

    /// 前插到 `dest`。
    pub fn prepend_to_chain(&self, dest: &mut Chain) {
        for block in self.blocks().iter().rev() {
            dest.prepend_bytes(block.to_bytes());
        }
    }

    /// 追加到 `dest`。
    pub fn append_to_rope(&self, dest: &mut Rope) {
        for block in &self.blocks() {
            dest.append_bytes(block.to_bytes());
        }
    }

    /// 前插到 `dest`。
    pub fn prepend_to_rope(&self, dest: &mut Rope) {
        for block in self.blocks().iter().rev() {
            dest.prepend_bytes(block.to_bytes());
        }
    }

    /// 以原始字节写出到 `out`，按不超过 `usize::MAX` 的切片分段。
    #[cfg(feature = "std")]
    pub fn write_to<W: std::io::Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        for block in &self.blocks() {
            out.write_all(block.as_slice())?;
        }
        Ok(())
    }
}

impl fmt::Debug for ByteFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteFill")
            .field("size", &self.size)
            .field("fill", &format_args!("{:#04x}", self.fill))
            .finish()
    }
}

/// 块的后备存储，在分解时一次性选定。
#[derive(Clone)]
enum BlockStorage {
    Zero,
    Small(SmallBlock),
    Shared(Bytes),
}

/// 64 字节内联填充块。
#[derive(Clone)]
struct SmallBlock {
    data: [u8; SMALL_BLOCK_SIZE],
}

impl SmallBlock {
    fn new(fill: u8) -> Self {
        Self {
            data: [fill; SMALL_BLOCK_SIZE],
        }
    }
}

/// `ByteFill` 分解后的块集合。
///
/// 块以“距末尾的补数”编址：`complement = num_blocks - index`，
/// 这样只有补数为 1 的块需要查询 `last_block_size`，补数 0 天然表示末尾。
#[derive(Clone)]
pub struct Blocks {
    num_blocks: Position,
    non_last_block_size: u32,
    last_block_size: u32,
    storage: BlockStorage,
}

impl Blocks {
    fn new(size: Position, fill: u8) -> Self {
        if size == 0 {
            return Self {
                num_blocks: 0,
                non_last_block_size: 0,
                last_block_size: 0,
                storage: BlockStorage::Zero,
            };
        }
        let (block_size, storage) = if fill == 0 {
            (BLOCK_OF_ZEROS_SIZE, BlockStorage::Zero)
        } else if size <= SMALL_BLOCK_SIZE as Position {
            (SMALL_BLOCK_SIZE, BlockStorage::Small(SmallBlock::new(fill)))
        } else {
            let width = size.min(MAX_SHARED_BLOCK_SIZE as Position) as usize;
            tracing::trace!(width, fill, "allocating shared fill block");
            (width, BlockStorage::Shared(Bytes::from(vec![fill; width])))
        };
        let block_size = block_size as Position;
        let num_blocks = (size - 1) / block_size + 1;
        let last_block_size = size - (num_blocks - 1) * block_size;
        Self {
            num_blocks,
            non_last_block_size: block_size as u32,
            last_block_size: last_block_size as u32,
            storage,
        }
    }

    /// 块数量。
    ///
    /// 块数量理论上可超过 `usize`，此处按 `usize::MAX` 饱和。
    pub fn len(&self) -> usize {
        usize::try_from(self.num_blocks).unwrap_or(usize::MAX)
    }

    /// 以 [`Position`] 表示的块数量。
    pub fn num_blocks(&self) -> Position {
        self.num_blocks
    }

    /// 是否没有块。
    pub fn is_empty(&self) -> bool {
        self.num_blocks == 0
    }

    /// 第 `index` 块；越界返回 `None`。
    pub fn get(&self, index: Position) -> Option<BlockRef<'_>> {
        (index < self.num_blocks).then(|| BlockRef::new(self, self.num_blocks - index))
    }

    /// 第 `index` 块。
    ///
    /// # Panics
    /// 越界时断言失败。
    pub fn at(&self, index: Position) -> BlockRef<'_> {
        assert!(
            index < self.num_blocks,
            "Failed precondition of ByteFill::Blocks::at(): block index out of range"
        );
        BlockRef::new(self, self.num_blocks - index)
    }

    /// 首块。
    pub fn front(&self) -> Option<BlockRef<'_>> {
        self.get(0)
    }

    /// 末块。
    pub fn back(&self) -> Option<BlockRef<'_>> {
        (!self.is_empty()).then(|| BlockRef::new(self, 1))
    }

    /// 按序遍历所有块。
    pub fn iter(&self) -> BlockIter<'_> {
        BlockIter {
            blocks: self,
            front: self.num_blocks,
            back: 0,
        }
    }

    fn data(&self) -> &[u8] {
        match &self.storage {
            BlockStorage::Zero => &BLOCK_OF_ZEROS[..],
            BlockStorage::Small(small) => &small.data[..],
            BlockStorage::Shared(shared) => shared,
        }
    }

    fn size(&self, complement: Position) -> usize {
        if complement == 1 {
            self.last_block_size as usize
        } else {
            self.non_last_block_size as usize
        }
    }
}

impl fmt::Debug for Blocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = match self.storage {
            BlockStorage::Zero => "zero",
            BlockStorage::Small(_) => "small",
            BlockStorage::Shared(_) => "shared",
        };
        f.debug_struct("Blocks")
            .field("num_blocks", &self.num_blocks)
            .field("non_last_block_size", &self.non_last_block_size)
            .field("last_block_size", &self.last_block_size)
            .field("storage", &storage)
            .finish()
    }
}

impl<'a> IntoIterator for &'a Blocks {
    type Item = BlockRef<'a>;
    type IntoIter = BlockIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 单个块的零拷贝视图。
#[derive(Clone, Copy)]
pub struct BlockRef<'a> {
    blocks: &'a Blocks,
    complement: Position,
}

impl<'a> BlockRef<'a> {
    fn new(blocks: &'a Blocks, complement: Position) -> Self {
        debug_assert!(complement > 0 && complement <= blocks.num_blocks);
        Self { blocks, complement }
    }

    /// 块内容。
    pub fn as_slice(&self) -> &'a [u8] {
        &self.blocks.data()[..self.blocks.size(self.complement)]
    }

    /// 块长度，总是大于 0。
    pub fn len(&self) -> usize {
        self.blocks.size(self.complement)
    }

    /// 块永不为空。
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 转换为可脱离 `ByteFill` 存活的外部引用。
    ///
    /// 静态零块与共享块零拷贝；内联块不具备独立生命周期，退化为一次复制。
    pub fn to_bytes(&self) -> Bytes {
        let len = self.len();
        match &self.blocks.storage {
            BlockStorage::Zero => Bytes::from_static(&BLOCK_OF_ZEROS[..len]),
            BlockStorage::Small(small) => Bytes::copy_from_slice(&small.data[..len]),
            BlockStorage::Shared(shared) => shared.slice(..len),
        }
    }
}

impl Deref for BlockRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for BlockRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockRef")
            .field("index", &(self.blocks.num_blocks - self.complement))
            .field("len", &self.len())
            .finish()
    }
}

/// 双端块迭代器，游标同样以补数表示：`front` 指向下一个前端块，`back` 为已消费的末端边界。
#[derive(Clone)]
pub struct BlockIter<'a> {
    blocks: &'a Blocks,
    front: Position,
    back: Position,
}

impl<'a> Iterator for BlockIter<'a> {
    type Item = BlockRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let block = BlockRef::new(self.blocks, self.front);
        self.front -= 1;
        Some(block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.front - self.back;
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        let remaining = self.front - self.back;
        if n as Position >= remaining {
            self.front = self.back;
            return None;
        }
        self.front -= n as Position;
        self.next()
    }
}

impl DoubleEndedIterator for BlockIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back += 1;
        Some(BlockRef::new(self.blocks, self.back))
    }
}

impl ExactSizeIterator for BlockIter<'_> {}

impl core::iter::FusedIterator for BlockIter<'_> {}

#![cfg_attr(not(feature = "std"), no_std)]

//! `spark-bytes` 提供可组合的同步字节流层：带位置记账的缓冲读写契约、
//! 位置平移装饰器、丢弃型反向写入器，以及惰性的重复字节序列。
//!
//! # 模块定位（Why）
//! - 编码、压缩、摘要等上层组件只关心“从哪里拉取字节、把字节推到哪里”，
//!   不应关心底层是内存、文件还是另一个流；本 crate 把这层缓冲纪律固化为 trait 契约；
//! - 与 `spark-buffer` 一样以 `bytes` 为零拷贝基础，引用计数块可在流与容器之间共享而不复制。
//!
//! # 设计概要（How）
//! - [`Reader`]、[`Writer`]、[`BackwardWriter`] 定义“快路径 + 慢路径”契约：
//!   快路径直接操作当前窗口，窗口不足时才调用实现者提供的慢路径；
//! - 窗口以索引描述（`cursor`/`limit`），数据切片每次访问都从持有者重新推导，
//!   因此对象在内存中移动后无需修补任何视图；
//! - [`PositionShiftingReader`] 借助 [`Dependency`] 抽象同时支持借用与拥有被包装的读取器；
//! - [`ByteFill`] 把 `N` 个相同字节分解为少量共享块，零块来自进程级静态存储。
//!
//! # 契约说明（What）
//! - 失败是粘滞的：首个失败被记录，之后的数据操作立即返回 `false`，位置与状态仍可查询；
//! - 前置条件违反属于编程错误，以断言失败呈现，不会转换为 [`StreamError`]；
//! - 所有类型都是单线程、同步的，本层不引入锁或后台线程。
//!
//! # 命名约定（Consistency）
//! - 位置统一使用 [`Position`]；窗口内偏移与长度使用 `usize`。

extern crate alloc;

mod backward_writer;
mod buffer_sizer;
mod byte_fill;
mod bytes_reader;
mod bytes_writer;
mod chain;
mod dependency;
pub mod error;
mod null_backward_writer;
mod object;
mod position_shifting_reader;
mod reader;
mod rope;
pub mod test_stubs;
mod writer;

/// 流中的绝对字节位置。
pub type Position = u64;

/// 不超过该长度的批量传输即使可以零拷贝也直接复制，避免产生大量细碎块。
pub const MAX_BYTES_TO_COPY: usize = 255;

pub use backward_writer::{BackwardWriter, BackwardWriterState};
pub use buffer_sizer::{BufferOptions, WriteBufferSizer};
pub use byte_fill::{
    BLOCK_OF_ZEROS_SIZE, BlockIter, BlockRef, Blocks, ByteFill, MAX_SHARED_BLOCK_SIZE,
    SMALL_BLOCK_SIZE,
};
pub use bytes_reader::BytesReader;
pub use bytes_writer::BytesWriter;
pub use chain::Chain;
pub use dependency::{Dependency, MaybeOwned, Owned};
pub use error::{Result, StreamError};
pub use null_backward_writer::{NullBackwardWriter, NullBackwardWriterOptions};
pub use object::ObjectState;
pub use position_shifting_reader::{PositionShiftingReader, PositionShiftingReaderOptions};
pub use reader::{Reader, ReaderState};
pub use rope::Rope;
pub use writer::{Writer, WriterState};

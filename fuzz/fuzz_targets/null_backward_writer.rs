#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spark_bytes::{BackwardWriter, ByteFill, Chain, NullBackwardWriter, Position, Rope};

/// Fuzz 指令：描述一次写入器操作序列。
///
/// - **Why**：丢弃型写入器唯一的输出是位置，截断跨越窗口、批量写入后重建窗口等路径组合繁多，
///   逐一手写用例难以覆盖；
/// - **How**：以影子计数器 `expected` 独立计算位置，每步之后与写入器比对；
/// - **What**：写入器健康时位置必须与影子计数一致；一旦溢出失败，之后所有写入都必须返回 `false`。
#[derive(Debug, Arbitrary)]
struct WriterCase {
    ops: Vec<WriterOp>,
}

/// 具体写入操作。
#[derive(Debug, Arbitrary)]
enum WriterOp {
    /// 写入 `len` 字节切片（上限 4 KiB）。
    Write { len: u16 },
    /// 写入单个字节。
    WriteByte(u8),
    /// 写入由 `blocks` 个块组成的 `Chain`。
    WriteChain { blocks: u8, block_len: u16 },
    /// 写入 `Rope`。
    WriteRope { len: u16 },
    /// 写入填充序列，长度可以接近 `Position::MAX` 以触发溢出。
    WriteFill { size: u64, fill: u8 },
    /// 截断到当前位置减去 `back`。
    Truncate { back: u32 },
    /// 截断到当前位置之后，必须被拒绝。
    TruncateAhead { ahead: u8 },
    /// 更新写入量提示。
    Hint(Option<u32>),
}

fuzz_target!(|case: WriterCase| {
    let mut writer = NullBackwardWriter::default();
    let mut expected: Position = 0;

    for op in case.ops {
        if !writer.ok() {
            assert!(!writer.write_byte(0), "失败后写入必须被拒绝");
            return;
        }
        let delta = match op {
            WriterOp::Write { len } => {
                let len = usize::from(len % 4097);
                writer.write(&vec![0xA5; len]);
                Some(len as Position)
            }
            WriterOp::WriteByte(byte) => {
                writer.write_byte(byte);
                Some(1)
            }
            WriterOp::WriteChain { blocks, block_len } => {
                let mut chain = Chain::new();
                for _ in 0..blocks % 8 {
                    chain.append_slice(&vec![1; usize::from(block_len % 2048)]);
                }
                writer.write_chain(&chain);
                Some(chain.len() as Position)
            }
            WriterOp::WriteRope { len } => {
                let rope = Rope::from(&vec![2; usize::from(len % 4097)][..]);
                writer.write_rope(&rope);
                Some(rope.len() as Position)
            }
            WriterOp::WriteFill { size, fill } => {
                writer.write_fill(ByteFill::new(size, fill));
                Some(size)
            }
            WriterOp::Truncate { back } => {
                let new_size = expected.saturating_sub(Position::from(back));
                assert!(writer.truncate(new_size));
                expected = new_size;
                None
            }
            WriterOp::TruncateAhead { ahead } => {
                if expected < Position::MAX {
                    let target = expected.saturating_add(Position::from(ahead) + 1);
                    assert!(!writer.truncate(target));
                    assert!(writer.ok(), "拒绝截断不应使写入器失败");
                }
                None
            }
            WriterOp::Hint(hint) => {
                writer.set_write_size_hint(hint.map(Position::from));
                None
            }
        };
        if let Some(delta) = delta {
            match expected.checked_add(delta) {
                Some(next) => {
                    assert!(writer.ok());
                    expected = next;
                }
                None => {
                    assert!(!writer.ok(), "越过最大位置必须失败");
                    assert_eq!(writer.pos(), expected);
                    continue;
                }
            }
        }
        assert_eq!(writer.pos(), expected);
    }
    let _ = writer.close();
});

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spark_bytes::{
    Owned, Position, PositionShiftingReader, PositionShiftingReaderOptions, Reader,
    test_stubs::ChunkedReader,
};

/// Fuzz 指令：在任意基准位置上驱动位置平移读取器。
///
/// - **Why**：装饰器的窗口镜像与游标同步在跨块、定位、失败之间交错时最容易出错；
/// - **How**：影子模型只记录“相对数据起点的偏移”，每步比对 `pos() - base_pos` 与读取内容；
/// - **What**：健康时读取内容必须等于原数据对应位置；定位到基准之前必须永久失败。
#[derive(Debug, Arbitrary)]
struct ReaderCase {
    data: Vec<u8>,
    chunk: u8,
    base_pos: u64,
    ops: Vec<ReaderOp>,
}

#[derive(Debug, Arbitrary)]
enum ReaderOp {
    ReadByte,
    Read { len: u16 },
    Skip { len: u16 },
    SeekForward { by: u16 },
    SeekBeforeBase { by: u8 },
}

fuzz_target!(|case: ReaderCase| {
    let chunk = usize::from(case.chunk).max(1);
    let len = case.data.len() as Position;
    if case.base_pos.checked_add(len).is_none() {
        return;
    }
    let data = case.data.clone();
    let mut reader = PositionShiftingReader::new(
        Owned(ChunkedReader::new(case.data, chunk)),
        PositionShiftingReaderOptions::new().with_base_pos(case.base_pos),
    );
    let base = case.base_pos;

    for op in case.ops {
        if !reader.ok() {
            assert!(reader.read_byte().is_none());
            return;
        }
        let offset = reader.pos() - base;
        match op {
            ReaderOp::ReadByte => match reader.read_byte() {
                Some(byte) => assert_eq!(byte, data[offset as usize]),
                None => assert_eq!(offset, len),
            },
            ReaderOp::Read { len: n } => {
                let mut dest = vec![0u8; usize::from(n)];
                let complete = reader.read(&mut dest);
                let end = (offset + Position::from(n)).min(len);
                assert_eq!(complete, offset + Position::from(n) <= len);
                assert_eq!(reader.pos() - base, end);
                assert_eq!(&dest[..(end - offset) as usize], &data[offset as usize..end as usize]);
            }
            ReaderOp::Skip { len: n } | ReaderOp::SeekForward { by: n } => {
                let target = offset + Position::from(n);
                let moved = reader.seek(base + target);
                assert_eq!(moved, target <= len);
                assert_eq!(reader.pos() - base, target.min(len));
            }
            ReaderOp::SeekBeforeBase { by } => {
                if base >= Position::from(by) + 1 {
                    assert!(!reader.seek(base - Position::from(by) - 1));
                    assert!(!reader.ok());
                }
            }
        }
    }
    let _ = reader.close();
});

//! `byte_fill_contract` 集成测试：惰性填充序列的分块与转换契约。
//!
//! # 测试总览（Why）
//! - 分块是零拷贝写入的基础：块大小之和、块非空、拼接内容三者任一出错都会污染下游输出；
//! - 边界尺寸（块宽整数倍、恰好越过内联宽度、恰好越过零块宽度）最容易出现差一错误，单独列举；
//! - 其余尺寸交给 proptest 随机覆盖。

use proptest::prelude::*;
use spark_bytes::{
    BLOCK_OF_ZEROS_SIZE, ByteFill, Chain, MAX_SHARED_BLOCK_SIZE, Position, Rope, SMALL_BLOCK_SIZE,
};

const BOUNDARY_SIZES: [Position; 7] = [0, 1, 63, 64, 65, 65536, 65537];
const FILL_VALUES: [u8; 2] = [0, 0xFF];

fn assert_blocks_cover(fill: ByteFill) {
    let blocks = fill.blocks();
    let mut total: Position = 0;
    for block in &blocks {
        assert!(!block.is_empty(), "块不得为空: {fill:?}");
        assert!(
            block.iter().all(|&b| b == fill.fill()),
            "块内容必须全部为填充值: {fill:?}"
        );
        total += block.len() as Position;
    }
    assert_eq!(total, fill.size(), "块大小之和必须等于序列长度: {fill:?}");
    assert_eq!(blocks.iter().len(), blocks.len());
}

/// 边界尺寸下，转换到两种容器都应得到 `N` 个 `V`。
#[test]
fn conversions_match_literal_fill_at_boundaries() {
    for &size in &BOUNDARY_SIZES {
        for &value in &FILL_VALUES {
            let fill = ByteFill::new(size, value);
            assert_blocks_cover(fill);

            let chain = fill.to_chain();
            assert_eq!(chain.len() as Position, size);
            assert!(chain.to_vec().iter().all(|&b| b == value));

            let rope = fill.to_rope();
            assert_eq!(rope.len() as Position, size);
            assert!(rope.to_vec().iter().all(|&b| b == value));
        }
    }
}

/// 追加与前插保持与既有内容的相对顺序。
#[test]
fn append_and_prepend_preserve_surrounding_content() {
    let fill = ByteFill::new(1000, b'.');

    let mut chain = Chain::from(&b"<"[..]);
    fill.append_to_chain(&mut chain);
    chain.append_slice(b">");
    fill.prepend_to_chain(&mut chain);
    let flat = chain.to_vec();
    assert_eq!(flat.len(), 2002);
    assert_eq!(flat[1000], b'<');
    assert_eq!(flat[2001], b'>');

    let mut rope = Rope::from(&b"|"[..]);
    fill.prepend_to_rope(&mut rope);
    fill.append_to_rope(&mut rope);
    let flat = rope.to_vec();
    assert_eq!(flat.len(), 2001);
    assert_eq!(flat[1000], b'|');
}

/// 零填充不分配：所有块引用同一静态存储，且可脱离 `ByteFill` 存活。
#[test]
fn zero_blocks_share_static_storage() {
    let size = BLOCK_OF_ZEROS_SIZE as Position * 4;
    let external: Vec<bytes::Bytes> = {
        let blocks = ByteFill::zeros(size).blocks();
        blocks.iter().map(|block| block.to_bytes()).collect()
    };
    assert_eq!(external.len(), 4);
    let first = external[0].as_ptr();
    assert!(external.iter().all(|bytes| bytes.as_ptr() == first));
}

/// 大尺寸非零填充只分配一块共享缓冲，宽度受上限约束。
#[test]
fn large_fill_allocates_one_shared_block() {
    let fill = ByteFill::new(MAX_SHARED_BLOCK_SIZE as Position * 3 + 17, 0x42);
    let blocks = fill.blocks();
    assert_eq!(blocks.num_blocks(), 4);
    assert_eq!(blocks.front().map(|b| b.len()), Some(MAX_SHARED_BLOCK_SIZE));
    assert_eq!(blocks.back().map(|b| b.len()), Some(17));
    let pointers: Vec<*const u8> = blocks.iter().map(|b| b.to_bytes().as_ptr()).collect();
    assert!(pointers.windows(2).all(|pair| pair[0] == pair[1]));
}

/// 小尺寸非零填充使用内联块，其外部引用必须是独立副本。
#[test]
fn small_fill_blocks_are_copied_out() {
    let fill = ByteFill::new(SMALL_BLOCK_SIZE as Position, 9);
    let blocks = fill.blocks();
    assert_eq!(blocks.len(), 1);
    let external = blocks.at(0).to_bytes();
    drop(blocks);
    assert_eq!(&external[..], &[9u8; SMALL_BLOCK_SIZE][..]);
}

/// 写出到 `std::io::Write` 与字面量一致。
#[test]
fn write_to_matches_literal() {
    let mut out = Vec::new();
    ByteFill::new(70_000, 3).write_to(&mut out).expect("写入内存不会失败");
    assert_eq!(out.len(), 70_000);
    assert!(out.iter().all(|&b| b == 3));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// 任意尺寸与填充值下，块覆盖整个序列且内容正确。
    #[test]
    fn prop_blocks_cover_sequence(size in 0u64..300_000, value in any::<u8>()) {
        let fill = ByteFill::new(size, value);
        let blocks = fill.blocks();
        let mut total: Position = 0;
        for block in &blocks {
            prop_assert!(!block.is_empty());
            prop_assert!(block.iter().all(|&b| b == value));
            total += block.len() as Position;
        }
        prop_assert_eq!(total, size);
        prop_assert_eq!(blocks.is_empty(), size == 0);
    }

    /// 逆序迭代与正序迭代给出相同的块长度序列。
    #[test]
    fn prop_reverse_iteration_mirrors_forward(size in 0u64..400_000, value in any::<u8>()) {
        let blocks = ByteFill::new(size, value).blocks();
        let forward: Vec<usize> = blocks.iter().map(|b| b.len()).collect();
        let mut backward: Vec<usize> = blocks.iter().rev().map(|b| b.len()).collect();
        backward.reverse();
        prop_assert_eq!(forward, backward);
    }

    /// `extract(d)` 拆出 `d` 并留下 `N - d`。
    #[test]
    fn prop_extract_splits_size(size in 0u64..1_000_000, value in any::<u8>(), ratio in 0.0f64..=1.0) {
        let difference = ((size as f64) * ratio) as Position;
        let difference = difference.min(size);
        let mut fill = ByteFill::new(size, value);
        let taken = fill.extract(difference);
        prop_assert_eq!(taken, ByteFill::new(difference, value));
        prop_assert_eq!(fill.size(), size - difference);

        let rest = fill.size();
        fill.extract(rest);
        prop_assert!(fill.is_empty());
        prop_assert!(fill.blocks().is_empty());
    }
}

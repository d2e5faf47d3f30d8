//! # 块存储层
//!
//! 定长块组成的块池，以及记录各块分配情况的位图。

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use derive_more::{Display, From, Into};

use crate::{Error, Result};

/// 位图分组，每组记录 64 个块
type BitmapGroup = u64;

const GROUP_BITS: usize = BitmapGroup::BITS as usize;

/// 块编号，即块在块池中的下标
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct BlockId(usize);

#[derive(Debug, Clone)]
pub struct BlockStorage {
    block_size: usize,
    blocks: Vec<Box<[u8]>>,
    /// 位为1表示块已被占用
    bitmap: Vec<BitmapGroup>,
}

impl BlockStorage {
    /// 创建`num_blocks`个全零且空闲的块
    pub fn new(num_blocks: usize, block_size: usize) -> Self {
        Self {
            block_size,
            blocks: (0..num_blocks)
                .map(|_| vec![0u8; block_size].into_boxed_slice())
                .collect(),
            bitmap: vec![0; num_blocks.div_ceil(GROUP_BITS)],
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// 空闲块个数
    pub fn free_blocks(&self) -> usize {
        let used: usize = self
            .bitmap
            .iter()
            .map(|bits| bits.count_ones() as usize)
            .sum();
        self.num_blocks() - used
    }

    /// # Panics
    ///
    /// 编号超出块池范围时panic。
    pub fn is_allocated(&self, id: BlockId) -> bool {
        let (group_index, mask) = Self::locate(id);
        self.bitmap[group_index] & mask != 0
    }

    /// 按编号顺序寻找第一个空闲块并标记为占用。
    /// 块池用尽时返回 [`Error::OutOfBlocks`]，位图保持不变。
    pub fn allocate_block(&mut self) -> Result<BlockId> {
        // 组内仍有0位的第一个组，其最低的0位就是编号最小的空闲块
        let (group_index, ingroup_index) = self
            .bitmap
            .iter()
            .enumerate()
            .find_map(|(group_index, &bits)| {
                (bits != BitmapGroup::MAX).then_some((group_index, bits.trailing_ones() as usize))
            })
            .ok_or(Error::OutOfBlocks)?;

        // 最后一组可能有不对应任何块的尾部位
        let id = group_index * GROUP_BITS + ingroup_index;
        if id >= self.num_blocks() {
            return Err(Error::OutOfBlocks);
        }

        let mask: BitmapGroup = 1 << ingroup_index;
        self.bitmap[group_index] |= mask;
        log::trace!("allocate block {id}");
        Ok(BlockId(id))
    }

    /// 释放块并立即清零其内容；块本就空闲时什么也不做。
    ///
    /// 不检查是否仍有描述符引用该块，这由调用者保证。
    ///
    /// # Panics
    ///
    /// 编号超出块池范围时panic。
    pub fn free_block(&mut self, id: BlockId) {
        if !self.is_allocated(id) {
            return;
        }

        let (group_index, mask) = Self::locate(id);
        self.bitmap[group_index] &= !mask;
        self.blocks[id.0].fill(0);
        log::trace!("free block {id}");
    }

    /// 从块首开始覆盖写入`data`，块内其余字节保持不变
    ///
    /// # Panics
    ///
    /// 编号超出块池范围时panic。
    #[inline]
    pub fn write_block(&mut self, id: BlockId, data: &[u8]) -> Result<()> {
        self.write_block_at(id, 0, data)
    }

    /// 从块内偏移`offset`处覆盖写入`data`，越过块尾时返回 [`Error::BlockTooLarge`]
    ///
    /// # Panics
    ///
    /// 编号超出块池范围时panic。
    pub fn write_block_at(&mut self, id: BlockId, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= self.block_size)
            .ok_or(Error::BlockTooLarge {
                len: offset.saturating_add(data.len()),
                block_size: self.block_size,
            })?;

        self.blocks[id.0][offset..end].copy_from_slice(data);
        Ok(())
    }

    /// 整个块的内容，包括逻辑大小之外的字节
    ///
    /// # Panics
    ///
    /// 编号超出块池范围时panic。
    #[inline]
    pub fn read_block(&self, id: BlockId) -> &[u8] {
        &self.blocks[id.0]
    }

    /// 块编号在位图中的`(组索引, 组内掩码)`
    #[inline]
    fn locate(id: BlockId) -> (usize, BitmapGroup) {
        (id.0 / GROUP_BITS, 1 << (id.0 % GROUP_BITS))
    }
}

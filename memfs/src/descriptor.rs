//! # 文件描述符层
//!
//! 描述符相当于 inode，只有直接索引：
//! 描述符内联存放至多`max_direct_blocks`个块编号，
//! 逻辑偏移`o`位于第`o / block_size`个已分配块的`o % block_size`处。
//!
//! 已分配的槽位总是构成前缀，槽位本身的数量在描述符的生命周期内不变。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::{BlockId, Error, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    #[default]
    Regular,
    Directory,
    Symlink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    kind: FileKind,
    /// 硬链接个数，即指向此描述符的命名空间项个数
    pub(crate) links: usize,
    /// 逻辑大小(字节)
    pub(crate) size: usize,
    /// 直接索引块，`None`为空槽位
    direct: Box<[Option<BlockId>]>,
    /// 仅符号链接持有，原样保存的目标路径
    symlink: Option<String>,
}

impl FileDescriptor {
    pub fn new(kind: FileKind, max_direct_blocks: usize) -> Self {
        Self {
            kind,
            links: 1,
            size: 0,
            direct: vec![None; max_direct_blocks].into_boxed_slice(),
            symlink: None,
        }
    }

    pub fn new_symlink(target: &str, max_direct_blocks: usize) -> Self {
        Self {
            symlink: Some(String::from(target)),
            ..Self::new(FileKind::Symlink, max_direct_blocks)
        }
    }

    #[inline]
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    #[inline]
    pub fn links(&self) -> usize {
        self.links
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn symlink_target(&self) -> Option<&str> {
        self.symlink.as_deref()
    }

    #[inline]
    pub fn max_direct_blocks(&self) -> usize {
        self.direct.len()
    }

    /// 将块编号放入第一个空槽位。
    /// 槽位全满时返回 [`Error::NoFreeDirectSlot`]，文件已达最大容量。
    pub fn add_block(&mut self, id: BlockId) -> Result<()> {
        let slot = self
            .direct
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(Error::NoFreeDirectSlot)?;
        *slot = Some(id);
        Ok(())
    }

    /// 按逻辑顺序排列的已分配块
    pub fn blocks(&self) -> Vec<BlockId> {
        self.direct.iter().map_while(|slot| *slot).collect()
    }

    /// 第`index`个逻辑块
    #[inline]
    pub fn block(&self, index: usize) -> Option<BlockId> {
        self.direct.get(index).copied().flatten()
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.direct.iter().take_while(|slot| slot.is_some()).count()
    }

    #[inline]
    pub fn free_slots(&self) -> usize {
        self.max_direct_blocks() - self.block_count()
    }

    /// 清空第`keep`个槽位及其后的所有槽位，按顺序返回被移出的块
    pub fn release_from(&mut self, keep: usize) -> Vec<BlockId> {
        self.direct
            .iter_mut()
            .skip(keep)
            .filter_map(Option::take)
            .collect()
    }

    /// 容纳`size`字节需要多少个块
    #[inline]
    pub fn blocks_for(size: usize, block_size: usize) -> usize {
        size.div_ceil(block_size)
    }
}

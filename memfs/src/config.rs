use crate::{DEFAULT_BLOCK_SIZE, DEFAULT_MAX_DIRECT_BLOCKS, DEFAULT_MAX_FILES, DEFAULT_NUM_BLOCKS};

/// 文件系统的几何参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    /// 块池中的块数
    pub num_blocks: usize,
    /// 每块的字节数
    pub block_size: usize,
    /// 描述符表的槽位数，包括根目录
    pub max_files: usize,
    /// 每个描述符的直接索引块个数
    pub max_direct_blocks: usize,
}

impl FsConfig {
    /// 单个普通文件的最大字节数
    #[inline]
    pub fn max_file_size(&self) -> usize {
        self.max_direct_blocks * self.block_size
    }
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            num_blocks: DEFAULT_NUM_BLOCKS,
            block_size: DEFAULT_BLOCK_SIZE,
            max_files: DEFAULT_MAX_FILES,
            max_direct_blocks: DEFAULT_MAX_DIRECT_BLOCKS,
        }
    }
}

#![no_std]

extern crate alloc;

/* memfs 的整体架构，自上而下 */

// 命名空间层：路径解析、文件创建、打开、读写等操作
mod fs;

// 文件描述符层：文件元信息与直接索引块
mod descriptor;

// 块存储层：内存中的定长块池与位图
mod storage;

// 描述符表所用的定长槽位容器
mod slot_vec;

mod config;
mod error;
mod path;

pub use enumflags2::BitFlags;

pub use self::{
    config::FsConfig,
    descriptor::{FileDescriptor, FileKind},
    error::{Error, Result},
    fs::{DirEntry, FileSystem, Handle, OpenFlag, SlotId},
    path::Path,
    storage::{BlockId, BlockStorage},
};

pub const DEFAULT_NUM_BLOCKS: usize = 100;
pub const DEFAULT_BLOCK_SIZE: usize = 512;
pub const DEFAULT_MAX_FILES: usize = 50;
/// 每个描述符可容纳的直接索引块个数
pub const DEFAULT_MAX_DIRECT_BLOCKS: usize = 10;
/// 打开文件时最多跟随的符号链接层数，与 Linux 的 `MAXSYMLINKS` 一致
pub const MAX_SYMLINK_HOPS: usize = 40;

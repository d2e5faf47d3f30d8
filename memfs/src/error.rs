use alloc::string::String;

use thiserror::Error;

use crate::Handle;

pub type Result<T> = core::result::Result<T, Error>;

/// 文件系统各操作的失败原因。
///
/// 任何失败之后文件系统仍保持一致、可继续使用。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("file exists: {0}")]
    AlreadyExists(String),

    /// `link` 的源路径不存在
    #[error("link source not found: {0}")]
    SourceNotFound(String),

    /// `link` 的目标路径已存在
    #[error("link destination exists: {0}")]
    DestExists(String),

    /// 块池中没有空闲块
    #[error("no free blocks left")]
    OutOfBlocks,

    /// 描述符的直接索引块已全部占用，文件达到最大容量
    #[error("no free direct block slot")]
    NoFreeDirectSlot,

    /// 描述符表已满
    #[error("too many files")]
    TooManyFiles,

    #[error("data of {len} bytes does not fit a {block_size}-byte block")]
    BlockTooLarge { len: usize, block_size: usize },

    #[error("bad file handle: {0}")]
    BadHandle(Handle),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("not a symbolic link: {0}")]
    NotASymlink(String),

    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// 根目录或当前目录无法删除
    #[error("resource busy: {0}")]
    Busy(String),

    /// 符号链接的跟随层数超过 [`MAX_SYMLINK_HOPS`](crate::MAX_SYMLINK_HOPS)
    #[error("too many levels of symbolic links: {0}")]
    InvalidSymlinkCycle(String),
}

impl Error {
    /// 对应的 POSIX errno
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound(_) | Self::SourceNotFound(_) => 2, // ENOENT
            Self::BadHandle(_) => 9,                          // EBADF
            Self::Busy(_) => 16,                              // EBUSY
            Self::AlreadyExists(_) | Self::DestExists(_) => 17, // EEXIST
            Self::NotADirectory(_) => 20,                     // ENOTDIR
            Self::IsADirectory(_) => 21,                      // EISDIR
            Self::NotASymlink(_) => 22,                       // EINVAL
            Self::TooManyFiles => 23,                         // ENFILE
            Self::NoFreeDirectSlot | Self::BlockTooLarge { .. } => 27, // EFBIG
            Self::OutOfBlocks => 28,                          // ENOSPC
            Self::InvalidSymlinkCycle(_) => 40,               // ELOOP
            Self::DirectoryNotEmpty(_) => 39,                 // ENOTEMPTY
        }
    }
}

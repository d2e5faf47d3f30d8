//! # 命名空间层
//!
//! 位于内存的文件系统，确立了文件系统的操作逻辑：
//! 命名空间将规范化的绝对路径映射到描述符表的槽位，
//! 打开文件表将句柄映射到`(槽位, 游标)`。
//!
//! 所有操作都从 [`FileSystem`] 进入：先解析路径得到槽位，
//! 再委托 [`BlockStorage`] 读写块，最后更新描述符的元信息。
//!
//! 命名空间是平坦的，目录成员关系靠路径前缀判断，
//! 因此`rmdir`与`read_dir`的开销与命名空间项数成正比。

use alloc::borrow::ToOwned;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use derive_more::{Display, From, Into};
use enumflags2::{BitFlags, bitflags};

use crate::descriptor::{FileDescriptor, FileKind};
use crate::path::Path;
use crate::slot_vec::SlotVec;
use crate::{BlockId, BlockStorage, Error, FsConfig, MAX_SYMLINK_HOPS, Result};

/// 描述符表中的槽位编号
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct SlotId(usize);

/// 打开文件的句柄，单调递增，格式化之前不会复用
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct Handle(u64);

#[rustfmt::skip]
#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlag {
    /// 文件不存在时先创建
    CREATE = 0b0000_0010_0000_0000,
    /// 先清空文件，再交给用户
    TRUNC  = 0b0000_0100_0000_0000,
    /// 每次写入前将游标移至文件末尾
    APPEND = 0b0000_1000_0000_0000,
}

/// 目录下的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub slot: SlotId,
    pub kind: FileKind,
}

#[derive(Debug, Clone, Copy)]
struct OpenFile {
    slot: SlotId,
    /// **文件**内的偏移量
    cursor: usize,
    flags: BitFlags<OpenFlag>,
}

const ROOT: SlotId = SlotId(0);

#[derive(Debug, Clone)]
pub struct FileSystem {
    storage: BlockStorage,
    descriptors: SlotVec<FileDescriptor>,
    namespace: BTreeMap<String, SlotId>,
    open_files: BTreeMap<Handle, OpenFile>,
    next_handle: u64,
    cwd: String,
    max_direct_blocks: usize,
}

impl FileSystem {
    /// 以默认的直接索引块个数创建文件系统
    ///
    /// # Panics
    ///
    /// 块大小或文件数为0时panic。
    pub fn new(num_blocks: usize, block_size: usize, max_files: usize) -> Self {
        Self::with_config(FsConfig {
            num_blocks,
            block_size,
            max_files,
            ..FsConfig::default()
        })
    }

    /// 创建文件系统及其根目录
    ///
    /// # Panics
    ///
    /// 块大小、文件数或直接索引块个数为0时panic。
    pub fn with_config(config: FsConfig) -> Self {
        assert!(config.block_size > 0, "block size must not be zero");
        assert!(config.max_files > 0, "descriptor table must hold the root");
        assert!(config.max_direct_blocks > 0, "files must own a direct block");

        let mut descriptors = SlotVec::with_slots(config.max_files);
        let root = FileDescriptor::new(FileKind::Directory, config.max_direct_blocks);
        assert_eq!(descriptors.insert(root).ok(), Some(ROOT.0));

        let mut namespace = BTreeMap::new();
        namespace.insert(String::from("/"), ROOT);

        log::debug!("format: {config:?}");

        Self {
            storage: BlockStorage::new(config.num_blocks, config.block_size),
            descriptors,
            namespace,
            open_files: BTreeMap::new(),
            next_handle: 0,
            cwd: String::from("/"),
            max_direct_blocks: config.max_direct_blocks,
        }
    }

    /// 格式化：丢弃全部文件与句柄，只保留块池与直接索引的尺寸
    ///
    /// # Panics
    ///
    /// `max_files`为0时panic。
    pub fn reinitialize(&mut self, max_files: usize) {
        *self = Self::with_config(FsConfig {
            max_files,
            ..self.config()
        });
    }

    pub fn config(&self) -> FsConfig {
        FsConfig {
            num_blocks: self.storage.num_blocks(),
            block_size: self.storage.block_size(),
            max_files: self.descriptors.len(),
            max_direct_blocks: self.max_direct_blocks,
        }
    }

    #[inline]
    pub fn storage(&self) -> &BlockStorage {
        &self.storage
    }

    /// 当前工作目录
    #[inline]
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// 已占用的描述符个数，包括根目录
    #[inline]
    pub fn file_count(&self) -> usize {
        self.descriptors.occupied()
    }

    /// 相对于当前目录规范化路径，不检查存在性
    #[inline]
    pub fn resolve_path(&self, path: &str) -> String {
        path.normalize(&self.cwd)
    }

    /// 整个命名空间：路径到槽位的映射
    #[inline]
    pub fn ls(&self) -> &BTreeMap<String, SlotId> {
        &self.namespace
    }

    /// 按槽位查看描述符
    #[inline]
    pub fn descriptor(&self, slot: SlotId) -> Option<&FileDescriptor> {
        self.descriptors.get(slot.0)
    }

    /// 路径所绑定的描述符，不跟随符号链接
    pub fn stat(&self, path: &str) -> Result<&FileDescriptor> {
        let slot = self.lookup(&self.resolve_path(path))?;
        Ok(self.fd(slot))
    }

    pub fn readlink(&self, path: &str) -> Result<&str> {
        let path = self.resolve_path(path);
        let slot = self.lookup(&path)?;
        self.fd(slot)
            .symlink_target()
            .ok_or(Error::NotASymlink(path))
    }

    /// 目录的直接子项，按名字排序
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let path = self.resolve_path(path);
        let slot = self.lookup(&path)?;
        if !self.fd(slot).is_dir() {
            return Err(Error::NotADirectory(path));
        }

        let entries = self
            .namespace
            .iter()
            .filter_map(|(entry, &slot)| {
                let (parent, name) = entry.parent_file()?;
                (parent == path).then(|| DirEntry {
                    name: name.to_owned(),
                    slot,
                    kind: self.fd(slot).kind(),
                })
            })
            .collect();

        Ok(entries)
    }

    pub fn cd(&mut self, path: &str) -> Result<()> {
        let path = self.resolve_path(path);
        let slot = self.lookup(&path)?;
        if !self.fd(slot).is_dir() {
            return Err(Error::NotADirectory(path));
        }

        log::debug!("cd {path}");
        self.cwd = path;
        Ok(())
    }

    /// 创建空的普通文件
    pub fn create(&mut self, path: &str) -> Result<SlotId> {
        let fd = FileDescriptor::new(FileKind::Regular, self.max_direct_blocks);
        self.install(path, fd)
    }

    pub fn mkdir(&mut self, path: &str) -> Result<SlotId> {
        let fd = FileDescriptor::new(FileKind::Directory, self.max_direct_blocks);
        self.install(path, fd)
    }

    /// 创建指向`target`的符号链接`linkname`，目标原样保存
    pub fn symlink(&mut self, target: &str, linkname: &str) -> Result<SlotId> {
        let fd = FileDescriptor::new_symlink(target, self.max_direct_blocks);
        self.install(linkname, fd)
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let path = self.resolve_path(path);
        let slot = self.lookup(&path)?;
        if !self.fd(slot).is_dir() {
            return Err(Error::NotADirectory(path));
        }
        if slot == ROOT || path == self.cwd {
            return Err(Error::Busy(path));
        }
        if self.namespace.keys().any(|entry| entry.is_within(&path)) {
            return Err(Error::DirectoryNotEmpty(path));
        }

        log::debug!("rmdir {path}");
        self.namespace.remove(&path);
        self.release_link(slot);
        Ok(())
    }

    /// 为`src`所绑定的描述符增加新路径`dst`
    pub fn link(&mut self, src: &str, dst: &str) -> Result<()> {
        let src = self.resolve_path(src);
        let dst = self.resolve_path(dst);

        let Some(&slot) = self.namespace.get(&src) else {
            return Err(Error::SourceNotFound(src));
        };
        if self.namespace.contains_key(&dst) {
            return Err(Error::DestExists(dst));
        }
        if self.fd(slot).is_dir() {
            return Err(Error::IsADirectory(src));
        }
        self.check_parent(&dst)?;

        log::debug!("link {src} -> {dst}");
        self.fd_mut(slot).links += 1;
        self.namespace.insert(dst, slot);
        Ok(())
    }

    /// 删除路径绑定；链接数归零且没有句柄打开时回收描述符与其块
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let path = self.resolve_path(path);
        let slot = self.lookup(&path)?;
        if self.fd(slot).is_dir() {
            return Err(Error::IsADirectory(path));
        }

        log::debug!("unlink {path}");
        self.namespace.remove(&path);
        self.release_link(slot);
        Ok(())
    }

    /// 将文件截断或扩展到`size`字节，跟随符号链接。
    ///
    /// 扩展出的字节为0；容量不足时什么也不改变。
    pub fn truncate(&mut self, path: &str, size: usize) -> Result<()> {
        let slot = self.follow(path)?;
        if self.fd(slot).is_dir() {
            return Err(Error::IsADirectory(self.resolve_path(path)));
        }

        self.resize(slot, size)
    }

    #[inline]
    pub fn open(&mut self, path: &str) -> Result<Handle> {
        self.open_with(path, BitFlags::empty())
    }

    /// 打开文件并返回新句柄，游标位于文件开头。
    ///
    /// 符号链接会被跟随，至多 [`MAX_SYMLINK_HOPS`] 层。
    pub fn open_with(&mut self, path: &str, flags: BitFlags<OpenFlag>) -> Result<Handle> {
        let path = self.resolve_path(path);
        if flags.contains(OpenFlag::CREATE) && !self.namespace.contains_key(&path) {
            self.create(&path)?;
        }

        let slot = self.follow(&path)?;
        if flags.contains(OpenFlag::TRUNC) && self.fd(slot).kind() == FileKind::Regular {
            self.resize(slot, 0)?;
        }

        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        self.open_files.insert(
            handle,
            OpenFile {
                slot,
                cursor: 0,
                flags,
            },
        );

        log::debug!("open {path}: handle={handle} slot={slot}");
        Ok(handle)
    }

    /// 关闭句柄；若这是已被删除文件的最后一个句柄，则回收该文件
    pub fn close(&mut self, handle: Handle) -> Result<()> {
        let file = self
            .open_files
            .remove(&handle)
            .ok_or(Error::BadHandle(handle))?;

        if self.fd(file.slot).links == 0 && !self.is_open(file.slot) {
            self.reclaim(file.slot);
        }

        Ok(())
    }

    /// 移动游标，允许越过文件末尾
    pub fn seek(&mut self, handle: Handle, offset: usize) -> Result<()> {
        let file = self
            .open_files
            .get_mut(&handle)
            .ok_or(Error::BadHandle(handle))?;
        file.cursor = offset;
        Ok(())
    }

    /// 游标当前位置
    pub fn tell(&self, handle: Handle) -> Result<usize> {
        self.open_file(handle).map(|file| file.cursor)
    }

    /// 从游标处读出至多`n`字节，不会越过文件末尾
    pub fn read(&mut self, handle: Handle, n: usize) -> Result<Vec<u8>> {
        let file = self.open_file(handle)?;
        let fd = self.fd(file.slot);
        let block_size = self.storage.block_size();

        let start = file.cursor;
        let end = fd.size.min(start.saturating_add(n));
        if start >= end {
            return Ok(Vec::new());
        }

        let mut data = Vec::with_capacity(end - start);
        let blocks = fd.blocks();
        for &id in &blocks[start / block_size..end.div_ceil(block_size)] {
            // 绝对地址 % 块大小 = 块内偏移
            let offset = (start + data.len()) % block_size;
            let len = (block_size - offset).min(end - start - data.len());
            data.extend_from_slice(&self.storage.read_block(id)[offset..offset + len]);
        }

        self.set_cursor(handle, end);
        Ok(data)
    }

    /// 读出至多`n`字节并按UTF-8解码，非法序列以替换字符代替
    pub fn read_to_string(&mut self, handle: Handle, n: usize) -> Result<String> {
        self.read(handle, n)
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }

    /// 从游标处写入`data`，返回写入的字节数。
    ///
    /// 游标越过文件末尾时，中间的空隙以0填充。
    /// 中途分配块失败时，本次已写入的字节保留，游标与文件大小随之前进，
    /// 然后返回错误。
    pub fn write(&mut self, handle: Handle, data: &[u8]) -> Result<usize> {
        let file = self.open_file(handle)?;
        let fd = self.fd(file.slot);
        if fd.is_dir() {
            return Err(Error::IsADirectory(self.path_of(file.slot)));
        }

        let start = if file.flags.contains(OpenFlag::APPEND) {
            fd.size
        } else {
            file.cursor
        };
        let mut cursor = start;
        let result = self.write_at(file.slot, &mut cursor, data);

        let block_size = self.storage.block_size();
        let fd = self.fd_mut(file.slot);
        if cursor > start {
            fd.size = fd.size.max(cursor);
        }
        if result.is_err() {
            // 归还为空隙或失败的写入而分配、却没有落在文件大小之内的块
            let keep = FileDescriptor::blocks_for(fd.size, block_size);
            for id in fd.release_from(keep) {
                self.storage.free_block(id);
            }
        }
        self.set_cursor(handle, cursor);

        log::trace!("write handle={handle}: {}/{} bytes", cursor - start, data.len());
        result.map(|()| cursor - start)
    }
}

impl FileSystem {
    /// # Panics
    ///
    /// 槽位为空时panic：命名空间项与句柄只会指向已占用的槽位。
    fn fd(&self, slot: SlotId) -> &FileDescriptor {
        match self.descriptors.get(slot.0) {
            Some(fd) => fd,
            None => panic!("dangling descriptor slot {slot}"),
        }
    }

    fn fd_mut(&mut self, slot: SlotId) -> &mut FileDescriptor {
        match self.descriptors.get_mut(slot.0) {
            Some(fd) => fd,
            None => panic!("dangling descriptor slot {slot}"),
        }
    }

    /// 规范化路径所绑定的槽位
    fn lookup(&self, path: &str) -> Result<SlotId> {
        self.namespace
            .get(path)
            .copied()
            .ok_or_else(|| Error::NotFound(path.to_owned()))
    }

    /// 任一绑定到槽位的路径，仅用于错误信息
    fn path_of(&self, slot: SlotId) -> String {
        self.namespace
            .iter()
            .find_map(|(path, &s)| (s == slot).then(|| path.clone()))
            .unwrap_or_default()
    }

    fn open_file(&self, handle: Handle) -> Result<OpenFile> {
        self.open_files
            .get(&handle)
            .copied()
            .ok_or(Error::BadHandle(handle))
    }

    fn set_cursor(&mut self, handle: Handle, cursor: usize) {
        if let Some(file) = self.open_files.get_mut(&handle) {
            file.cursor = cursor;
        }
    }

    fn is_open(&self, slot: SlotId) -> bool {
        self.open_files.values().any(|file| file.slot == slot)
    }

    /// 解析路径并跟随符号链接，返回最终的槽位
    fn follow(&self, path: &str) -> Result<SlotId> {
        let origin = self.resolve_path(path);
        let mut path = origin.clone();

        for _ in 0..=MAX_SYMLINK_HOPS {
            let slot = self.lookup(&path)?;
            match self.fd(slot).symlink_target() {
                Some(target) => path = self.resolve_path(target),
                None => return Ok(slot),
            }
        }

        Err(Error::InvalidSymlinkCycle(origin))
    }

    /// 新路径的父目录必须存在且是目录
    fn check_parent(&self, path: &str) -> Result<()> {
        let Some((parent, _)) = path.parent_file() else {
            return Ok(());
        };

        let slot = self.lookup(parent)?;
        if !self.fd(slot).is_dir() {
            return Err(Error::NotADirectory(parent.to_owned()));
        }

        Ok(())
    }

    /// 将描述符放入第一个空槽位并绑定路径
    fn install(&mut self, path: &str, fd: FileDescriptor) -> Result<SlotId> {
        let path = self.resolve_path(path);
        if self.namespace.contains_key(&path) {
            return Err(Error::AlreadyExists(path));
        }
        self.check_parent(&path)?;

        let kind = fd.kind();
        let slot = self
            .descriptors
            .insert(fd)
            .map(SlotId)
            .map_err(|_| Error::TooManyFiles)?;

        log::debug!("install {kind:?} {path}: slot={slot}");
        self.namespace.insert(path, slot);
        Ok(slot)
    }

    /// 去掉一个链接；链接数归零时，若无句柄打开则立即回收，否则推迟到最后一次关闭
    fn release_link(&mut self, slot: SlotId) {
        let fd = self.fd_mut(slot);
        fd.links -= 1;
        if fd.links > 0 {
            return;
        }

        if self.is_open(slot) {
            log::warn!("slot {slot} is still open, reclamation deferred");
        } else {
            self.reclaim(slot);
        }
    }

    /// 清空槽位并释放其全部块
    fn reclaim(&mut self, slot: SlotId) {
        let Some(fd) = self.descriptors.remove(slot.0) else {
            return;
        };

        let blocks = fd.blocks();
        log::debug!("reclaim slot {slot}: {} blocks", blocks.len());
        for id in blocks {
            self.storage.free_block(id);
        }
    }

    /// 确保第`index`个逻辑块已分配，不足时依次以全零块补齐
    fn ensure_block(&mut self, slot: SlotId, index: usize) -> Result<BlockId> {
        loop {
            let fd = self.fd(slot);
            if let Some(id) = fd.block(index) {
                return Ok(id);
            }
            // 先确认有空槽位，避免分配出去的块无处安放
            if fd.free_slots() == 0 {
                return Err(Error::NoFreeDirectSlot);
            }

            let id = self.storage.allocate_block()?;
            self.fd_mut(slot).add_block(id)?;
        }
    }

    fn write_at(&mut self, slot: SlotId, cursor: &mut usize, data: &[u8]) -> Result<()> {
        let block_size = self.storage.block_size();

        let mut written = 0;
        while written < data.len() {
            let id = self.ensure_block(slot, *cursor / block_size)?;
            let offset = *cursor % block_size;
            let len = (block_size - offset).min(data.len() - written);

            self.storage
                .write_block_at(id, offset, &data[written..written + len])?;

            written += len;
            *cursor += len;
        }

        Ok(())
    }

    /// 将普通文件调整到`size`字节。
    /// 先检查容量再分配，失败时文件保持原样。
    fn resize(&mut self, slot: SlotId, size: usize) -> Result<()> {
        let block_size = self.storage.block_size();
        let fd = self.fd(slot);
        let old_size = fd.size;
        let have = fd.block_count();
        let need = FileDescriptor::blocks_for(size, block_size);

        if need > have {
            let extra = need - have;
            if extra > fd.free_slots() {
                return Err(Error::NoFreeDirectSlot);
            }
            if extra > self.storage.free_blocks() {
                return Err(Error::OutOfBlocks);
            }

            for _ in 0..extra {
                let id = self.storage.allocate_block()?;
                self.fd_mut(slot).add_block(id)?;
            }
        } else {
            for id in self.fd_mut(slot).release_from(need) {
                self.storage.free_block(id);
            }

            // 保持“文件大小之外的字节全为0”：清零最后一块的尾部
            let offset = size % block_size;
            if size < old_size && offset != 0 {
                if let Some(id) = self.fd(slot).block(need - 1) {
                    let zeros = vec![0; block_size - offset];
                    self.storage.write_block_at(id, offset, &zeros)?;
                }
            }
        }

        log::debug!("resize slot {slot}: {old_size} -> {size}");
        self.fd_mut(slot).size = size;
        Ok(())
    }
}

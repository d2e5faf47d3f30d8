//! 一行一条命令，以空白分隔参数。
//!
//! 以`#`开头的词及其后的内容为注释；`write`例外，句柄之后的整段文本原样写入。

use std::num::NonZeroUsize;

use memfs::{BitFlags, FileKind, FileSystem, Handle, OpenFlag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Create(&'a str),
    Touch(&'a str),
    Mkdir(&'a str),
    Rmdir(&'a str),
    Link { src: &'a str, dst: &'a str },
    Symlink { target: &'a str, link: &'a str },
    Unlink(&'a str),
    Stat(&'a str),
    Readlink(&'a str),
    Ls(Option<&'a str>),
    Tree,
    Cd(&'a str),
    Pwd,
    Open(&'a str, BitFlags<OpenFlag>),
    Close(Handle),
    Seek(Handle, usize),
    Read(Handle, usize),
    Write(Handle, &'a str),
    Truncate(&'a str, usize),
    Mkfs(NonZeroUsize),
    Df,
    Exit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0}: missing argument")]
    MissingArgument(String),
    #[error("{0}: too many arguments")]
    TooManyArguments(String),
    #[error("not a number: {0}")]
    BadNumber(String),
    #[error("unknown open flag: {0}")]
    BadFlag(String),
}

struct Args<'a> {
    name: &'a str,
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            return None;
        }

        let (word, rest) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        self.rest = rest;
        Some(word)
    }

    fn required(&mut self) -> Result<&'a str, ParseError> {
        self.next()
            .ok_or_else(|| ParseError::MissingArgument(self.name.to_owned()))
    }

    fn number<T: std::str::FromStr>(&mut self) -> Result<T, ParseError> {
        let word = self.required()?;
        word.parse().map_err(|_| ParseError::BadNumber(word.to_owned()))
    }

    fn handle(&mut self) -> Result<Handle, ParseError> {
        self.number::<u64>().map(Handle::from)
    }

    /// 剩余部分原样保留，只去掉开头的一个分隔空白
    fn remainder(&mut self) -> &'a str {
        let rest = self.rest;
        self.rest = "";
        rest.strip_prefix(char::is_whitespace).unwrap_or(rest)
    }

    fn finish<T>(mut self, value: T) -> Result<T, ParseError> {
        match self.next() {
            Some(_) => Err(ParseError::TooManyArguments(self.name.to_owned())),
            None => Ok(value),
        }
    }
}

impl<'a> Command<'a> {
    /// 解析一行输入，空行与注释返回`None`
    pub fn parse(line: &'a str) -> Result<Option<Self>, ParseError> {
        let line = line.trim_start();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        if name.is_empty() || name.starts_with('#') {
            return Ok(None);
        }

        let rest = match name {
            "write" => rest.strip_suffix('\r').unwrap_or(rest),
            _ => strip_comment(rest),
        };
        let mut args = Args { name, rest };

        let cmd = match name {
            "create" => Self::Create(args.required()?),
            "touch" => Self::Touch(args.required()?),
            "mkdir" => Self::Mkdir(args.required()?),
            "rmdir" => Self::Rmdir(args.required()?),
            "ln" => match args.required()? {
                "-s" => Self::Symlink {
                    target: args.required()?,
                    link: args.required()?,
                },
                src => Self::Link {
                    src,
                    dst: args.required()?,
                },
            },
            "symlink" => Self::Symlink {
                target: args.required()?,
                link: args.required()?,
            },
            "rm" | "unlink" => Self::Unlink(args.required()?),
            "stat" => Self::Stat(args.required()?),
            "readlink" => Self::Readlink(args.required()?),
            "ls" => Self::Ls(args.next()),
            "tree" => Self::Tree,
            "cd" => Self::Cd(args.next().unwrap_or("/")),
            "pwd" => Self::Pwd,
            "open" => {
                let path = args.required()?;
                let mut flags = BitFlags::empty();
                while let Some(flag) = args.next() {
                    flags |= match flag {
                        "create" => OpenFlag::CREATE,
                        "trunc" => OpenFlag::TRUNC,
                        "append" => OpenFlag::APPEND,
                        other => return Err(ParseError::BadFlag(other.to_owned())),
                    };
                }
                Self::Open(path, flags)
            }
            "close" => Self::Close(args.handle()?),
            "seek" => Self::Seek(args.handle()?, args.number()?),
            "read" => Self::Read(args.handle()?, args.number()?),
            "write" => {
                let handle = args.handle()?;
                Self::Write(handle, args.remainder())
            }
            "truncate" => Self::Truncate(args.required()?, args.number()?),
            "mkfs" => Self::Mkfs(args.number()?),
            "df" => Self::Df,
            "exit" | "quit" => Self::Exit,
            _ => return Err(ParseError::Unknown(name.to_owned())),
        };

        args.finish(Some(cmd))
    }

    /// 执行命令，返回要打印的输出(可能为空)
    pub fn execute(self, fs: &mut FileSystem) -> memfs::Result<String> {
        let mut out = String::new();

        match self {
            Self::Create(path) => {
                fs.create(path)?;
            }
            Self::Touch(path) => {
                let handle = fs.open_with(path, OpenFlag::CREATE.into())?;
                fs.close(handle)?;
            }
            Self::Mkdir(path) => {
                fs.mkdir(path)?;
            }
            Self::Rmdir(path) => fs.rmdir(path)?,
            Self::Link { src, dst } => fs.link(src, dst)?,
            Self::Symlink { target, link } => {
                fs.symlink(target, link)?;
            }
            Self::Unlink(path) => fs.unlink(path)?,
            Self::Stat(path) => {
                let fd = fs.stat(path)?;
                out = format!(
                    "{}: {} links={} size={} blocks={:?}",
                    fs.resolve_path(path),
                    kind_name(fd.kind()),
                    fd.links(),
                    fd.size(),
                    fd.blocks().into_iter().map(usize::from).collect::<Vec<_>>(),
                );
                if let Some(target) = fd.symlink_target() {
                    out.push_str(" -> ");
                    out.push_str(target);
                }
            }
            Self::Readlink(path) => out.push_str(fs.readlink(path)?),
            Self::Ls(path) => {
                let path = path.unwrap_or(".");
                let entries = fs.read_dir(path)?;
                let names: Vec<_> = entries
                    .iter()
                    .map(|entry| match entry.kind {
                        FileKind::Regular => entry.name.clone(),
                        FileKind::Directory => format!("{}/", entry.name),
                        FileKind::Symlink => format!("{}@", entry.name),
                    })
                    .collect();
                out.push_str(&names.join("  "));
            }
            Self::Tree => {
                let lines: Vec<_> = fs
                    .ls()
                    .iter()
                    .map(|(path, &slot)| format!("{:>4}  {path}", usize::from(slot)))
                    .collect();
                out.push_str(&lines.join("\n"));
            }
            Self::Cd(path) => fs.cd(path)?,
            Self::Pwd => out.push_str(fs.cwd()),
            Self::Open(path, flags) => {
                let handle = fs.open_with(path, flags)?;
                out = handle.to_string();
            }
            Self::Close(handle) => fs.close(handle)?,
            Self::Seek(handle, offset) => fs.seek(handle, offset)?,
            Self::Read(handle, n) => out = fs.read_to_string(handle, n)?,
            Self::Write(handle, text) => {
                let n = fs.write(handle, text.as_bytes())?;
                out = format!("{n} bytes written");
            }
            Self::Truncate(path, size) => fs.truncate(path, size)?,
            Self::Mkfs(max_files) => fs.reinitialize(max_files.get()),
            Self::Df => {
                let config = fs.config();
                let storage = fs.storage();
                out = format!(
                    "blocks: {}/{} used ({} B each)\nfiles: {}/{}",
                    storage.num_blocks() - storage.free_blocks(),
                    storage.num_blocks(),
                    storage.block_size(),
                    fs.file_count(),
                    config.max_files,
                );
            }
            Self::Exit => (),
        }

        Ok(out)
    }
}

/// 去掉从词首`#`开始的注释
fn strip_comment(s: &str) -> &str {
    let mut word_start = true;
    for (i, c) in s.char_indices() {
        if c == '#' && word_start {
            return &s[..i];
        }
        word_start = c.is_whitespace();
    }

    s
}

fn kind_name(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Regular => "regular",
        FileKind::Directory => "directory",
        FileKind::Symlink => "symlink",
    }
}

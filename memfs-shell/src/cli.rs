use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use memfs::{
    DEFAULT_BLOCK_SIZE, DEFAULT_MAX_DIRECT_BLOCKS, DEFAULT_MAX_FILES, DEFAULT_NUM_BLOCKS,
    FsConfig,
};

#[derive(Parser)]
#[command(about = "Run shell commands against an in-memory file system")]
pub struct Cli {
    /// Number of blocks in the block pool
    #[arg(long, short, default_value_t = nonzero(DEFAULT_NUM_BLOCKS))]
    pub blocks: NonZeroUsize,

    /// Bytes per block
    #[arg(long, short = 's', default_value_t = nonzero(DEFAULT_BLOCK_SIZE))]
    pub block_size: NonZeroUsize,

    /// Descriptor slots, the root directory included
    #[arg(long, short = 'f', default_value_t = nonzero(DEFAULT_MAX_FILES))]
    pub max_files: NonZeroUsize,

    /// Direct block slots per descriptor
    #[arg(long, short = 'd', default_value_t = nonzero(DEFAULT_MAX_DIRECT_BLOCKS))]
    pub max_direct: NonZeroUsize,

    /// Read commands from this file instead of stdin
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Exit with a failure status if any command failed
    #[arg(long)]
    pub strict: bool,
}

impl Cli {
    pub fn config(&self) -> FsConfig {
        FsConfig {
            num_blocks: self.blocks.get(),
            block_size: self.block_size.get(),
            max_files: self.max_files.get(),
            max_direct_blocks: self.max_direct.get(),
        }
    }
}

const fn nonzero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => panic!("default geometry must be non-zero"),
    }
}

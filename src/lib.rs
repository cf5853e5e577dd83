pub mod collect;
pub mod context;
pub mod error;
pub mod export;
pub mod git;
pub mod packages;
pub mod util;

pub use collect::ToolchainInfo;
pub use context::{
    Context, ContextOptions, EditableReposReport, FileEntry, FileSet, Record, RepoOptions,
    RepoRecord, DEFAULT_CATEGORY,
};
pub use error::{Error, Result};
pub use git::{GitInfo, GitStatus};
pub use packages::Package;
pub use util::{sha256_bytes, sha256_file};

pub mod entry;
pub mod error;
pub mod path;

pub use entry::{Depth, Entry, FileTimes, Parameters, StorageTier};
pub use error::{FsError, FsResult};

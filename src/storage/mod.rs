pub mod local;
pub mod memory;
pub mod models;
pub mod traits;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use models::{ByteRange, ObjectMeta, StoreError, StoreResult};
#[cfg(any(test, feature = "mockall"))]
pub use traits::MockObjectStore;
pub use traits::ObjectStore;

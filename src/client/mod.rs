// Filesystem-client contract and the object-store leaf
//
// The contract is what the mount dispatcher drives; `ObjectStoreClient` is the
// leaf that turns it into object-store requests.

pub mod backend;
pub mod interface;
pub mod write_buffer;

pub use backend::ObjectStoreClient;
pub use interface::{FilesystemClient, describe_node};
pub use write_buffer::WriteBuffers;

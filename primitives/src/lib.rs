pub mod bytes;
pub mod compact;
pub mod hash;

pub use bytes::Bytes;
pub use compact::Compact;
pub use hash::{Hash160, Hash256};

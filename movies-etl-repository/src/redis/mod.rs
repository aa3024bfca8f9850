//! Redis implementation of the watermark storage.

mod storage;

pub use storage::RedisStateStorage;

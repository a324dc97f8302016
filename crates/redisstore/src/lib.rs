//! Redis 集合类型的内存键空间
//!
//! 提供与 Redis 语义一致的 List / Hash / Set / Sorted Set 操作以及键过期，
//! 用于测试和进程内嵌入
//!
//! # 示例
//! ```rust
//! use redisstore::MemoryStore;
//!
//! let store = MemoryStore::new();
//! store.sadd(b"set", vec![b"a".to_vec()]).unwrap();
//! assert!(store.sismember(b"set", b"a").unwrap());
//! ```

mod memory;
mod sorted_set;

pub use memory::{MemoryStore, RedisValue};
pub use sorted_set::SortedSet;

/// 存储错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// 类型不匹配（如对 Hash 执行 List 操作）
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    /// 无效参数
    #[error("ERR {0}")]
    InvalidArgument(String),
    /// 分数不是合法浮点数（NaN）
    #[error("ERR value is not a valid float")]
    NotFloat,
}

pub type StoreResult<T> = Result<T, StoreError>;

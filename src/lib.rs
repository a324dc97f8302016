//! 存储原生集合命令之上的类型化视图
//!
//! 集合（Set）、列表（List）、哈希（Hash）和有序集合（ZSet）视图各自绑定一个 key，
//! 通过共享的 [`StoreHandle`] 发送命令。列表与哈希的值以 JSON 文本存储，
//! 有序集合额外提供稠密排名推导。
//!
//! ```no_run
//! use std::sync::Arc;
//! use blue_redis::{ClientConfig, Connection, RedisZSet, StoreHandle};
//!
//! # async fn run() -> blue_redis::Result<()> {
//! let store: Arc<dyn StoreHandle> = Arc::new(Connection::connect(&ClientConfig::default()).await?);
//! let board = RedisZSet::new("leaderboard", store)?;
//! board.add(&[(100.0, "Hujia"), (80.0, "dev")]).await?;
//! for member in board.range_descending(0, -1).await? {
//!     println!("{} {} {}", member.name, member.score, member.rank);
//! }
//! # Ok(())
//! # }
//! ```

pub mod collection;
pub mod config;
pub mod error;
pub mod hash;
pub mod list;
pub mod rank;
pub mod set;
pub mod store;
pub mod zset;

pub use collection::KeyedCollection;
pub use config::ClientConfig;
pub use error::{Error, Result, StoreError, StoreResult};
pub use hash::RedisHash;
pub use list::{DEFAULT_BLOCKING_TIMEOUT, RedisList};
pub use rank::{Order, RankBaseline, RankedMember, derive_dense_ranks};
pub use set::RedisSet;
pub use store::{Connection, MemoryHandle, StoreHandle};
pub use zset::RedisZSet;

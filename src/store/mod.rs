//! 存储句柄抽象
//!
//! 每个方法对应一条存储原生命令，一次请求一次回复。
//! 句柄以 `Arc<dyn StoreHandle>` 的形式被多个集合包装共享，
//! 其生命周期独立于任何包装实例

mod connection;
mod memory;
mod reply;

pub use connection::Connection;
pub use memory::MemoryHandle;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::rank::Order;

#[async_trait]
pub trait StoreHandle: Send + Sync {
    // ==================== 通用操作 ====================

    /// DEL: 返回删除的键数量（0 或 1）
    async fn del(&self, key: &str) -> StoreResult<i64>;

    /// EXISTS
    async fn exists(&self, key: &str) -> StoreResult<i64>;

    /// EXPIRE: 相对过期时间（秒）
    async fn expire(&self, key: &str, seconds: i64) -> StoreResult<i64>;

    /// EXPIREAT: 绝对过期时间（Unix 秒）
    async fn expireat(&self, key: &str, timestamp: i64) -> StoreResult<i64>;

    /// TTL: -2 表示键不存在，-1 表示永不过期
    async fn ttl(&self, key: &str) -> StoreResult<i64>;

    /// PERSIST
    async fn persist(&self, key: &str) -> StoreResult<i64>;

    // ==================== Set 操作 ====================

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<i64>;

    async fn srem(&self, key: &str, member: &str) -> StoreResult<i64>;

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>>;

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<i64>;

    async fn scard(&self, key: &str) -> StoreResult<i64>;

    // ==================== List 操作 ====================

    /// LPUSH: 按参数顺序依次压入头部，返回列表长度
    async fn lpush(&self, key: &str, values: Vec<String>) -> StoreResult<i64>;

    async fn rpop(&self, key: &str) -> StoreResult<Option<String>>;

    /// BLPOP: 超时返回 `None`，否则返回 (key, element)
    async fn blpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<(String, String)>>;

    /// BRPOP: 同 BLPOP，从尾部弹出
    async fn brpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<(String, String)>>;

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    async fn llen(&self, key: &str) -> StoreResult<i64>;

    // ==================== Hash 操作 ====================

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// HSET: 新字段返回 1，覆盖返回 0
    async fn hset(&self, key: &str, field: &str, value: String) -> StoreResult<i64>;

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<i64>;

    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>>;

    // ==================== Sorted Set 操作 ====================

    /// ZADD: 返回新增成员数，已有成员的分数更新不计数
    async fn zadd(&self, key: &str, pairs: Vec<(f64, String)>) -> StoreResult<i64>;

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;

    /// ZRANK / ZREVRANK
    async fn zrank(&self, key: &str, member: &str, order: Order) -> StoreResult<Option<i64>>;

    /// ZRANGE / ZREVRANGE（仅成员）
    async fn zrange(&self, key: &str, start: i64, stop: i64, order: Order)
    -> StoreResult<Vec<String>>;

    /// ZRANGE / ZREVRANGE ... WITHSCORES
    async fn zrange_withscores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        order: Order,
    ) -> StoreResult<Vec<(String, f64)>>;

    async fn zcard(&self, key: &str) -> StoreResult<i64>;

    /// ZCOUNT: 闭区间 [min, max]，允许 ±inf
    async fn zcount(&self, key: &str, min: f64, max: f64) -> StoreResult<i64>;
}

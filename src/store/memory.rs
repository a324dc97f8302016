//! 进程内存储句柄
//!
//! 以 `redisstore::MemoryStore` 为后端，阻塞弹出通过 `Notify` 等待压入

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redisstore::MemoryStore;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::StoreHandle;
use crate::error::{StoreError, StoreResult};
use crate::rank::Order;

#[derive(Clone, Default)]
pub struct MemoryHandle {
    store: MemoryStore,
    pushed: Arc<Notify>,
}

fn text(command: &str, bytes: Vec<u8>) -> StoreResult<String> {
    String::from_utf8(bytes).map_err(|_| StoreError::UnexpectedReply {
        command: command.to_string(),
        detail: "stored value is not valid UTF-8".to_string(),
    })
}

fn texts(command: &str, items: Vec<Vec<u8>>) -> StoreResult<Vec<String>> {
    items.into_iter().map(|b| text(command, b)).collect()
}

fn count(n: usize) -> i64 {
    n as i64
}

impl MemoryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 底层键空间，可绕过句柄直接读写
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    async fn blocking_pop(
        &self,
        command: &str,
        key: &str,
        timeout: Duration,
        front: bool,
    ) -> StoreResult<Option<(String, String)>> {
        let deadline = Instant::now() + timeout;
        loop {
            // 先登记等待再检查列表，避免错过检查与等待之间的压入
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let popped = self
                .store
                .pop_with(key.as_bytes(), front, |b| text(command, b.to_vec()))??;
            if let Some(value) = popped {
                return Ok(Some((key.to_string(), value)));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }
}

#[async_trait]
impl StoreHandle for MemoryHandle {
    async fn del(&self, key: &str) -> StoreResult<i64> {
        Ok(count(self.store.del(&[key.as_bytes()])))
    }

    async fn exists(&self, key: &str) -> StoreResult<i64> {
        Ok(count(self.store.exists(&[key.as_bytes()])))
    }

    async fn expire(&self, key: &str, seconds: i64) -> StoreResult<i64> {
        Ok(self.store.expire(key.as_bytes(), seconds)? as i64)
    }

    async fn expireat(&self, key: &str, timestamp: i64) -> StoreResult<i64> {
        Ok(self.store.expireat(key.as_bytes(), timestamp)? as i64)
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        Ok(self.store.ttl(key.as_bytes()))
    }

    async fn persist(&self, key: &str) -> StoreResult<i64> {
        Ok(self.store.persist(key.as_bytes()) as i64)
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<i64> {
        Ok(count(self.store.sadd(key.as_bytes(), vec![member.as_bytes().to_vec()])?))
    }

    async fn srem(&self, key: &str, member: &str) -> StoreResult<i64> {
        Ok(count(self.store.srem(key.as_bytes(), &[member.as_bytes()])?))
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        texts("SMEMBERS", self.store.smembers(key.as_bytes())?)
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<i64> {
        Ok(self.store.sismember(key.as_bytes(), member.as_bytes())? as i64)
    }

    async fn scard(&self, key: &str) -> StoreResult<i64> {
        Ok(count(self.store.scard(key.as_bytes())?))
    }

    async fn lpush(&self, key: &str, values: Vec<String>) -> StoreResult<i64> {
        let values = values.into_iter().map(String::into_bytes).collect();
        let len = self.store.lpush(key.as_bytes(), values)?;
        self.pushed.notify_waiters();
        Ok(count(len))
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<String>> {
        // 非 UTF-8 的元素保留在列表中
        self.store
            .pop_with(key.as_bytes(), false, |b| text("RPOP", b.to_vec()))?
    }

    async fn blpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<(String, String)>> {
        self.blocking_pop("BLPOP", key, timeout, true).await
    }

    async fn brpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<(String, String)>> {
        self.blocking_pop("BRPOP", key, timeout, false).await
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        texts("LRANGE", self.store.lrange(key.as_bytes(), start, stop)?)
    }

    async fn llen(&self, key: &str) -> StoreResult<i64> {
        Ok(count(self.store.llen(key.as_bytes())?))
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.store
            .hget(key.as_bytes(), field.as_bytes())?
            .map(|v| text("HGET", v))
            .transpose()
    }

    async fn hset(&self, key: &str, field: &str, value: String) -> StoreResult<i64> {
        let created = self
            .store
            .hset(key.as_bytes(), field.as_bytes().to_vec(), value.into_bytes())?;
        Ok(created as i64)
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<i64> {
        Ok(count(self.store.hdel(key.as_bytes(), &[field.as_bytes()])?))
    }

    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>> {
        self.store
            .hgetall(key.as_bytes())?
            .into_iter()
            .map(|(f, v)| -> StoreResult<(String, String)> {
                Ok((text("HGETALL", f)?, text("HGETALL", v)?))
            })
            .collect()
    }

    async fn zadd(&self, key: &str, pairs: Vec<(f64, String)>) -> StoreResult<i64> {
        let pairs = pairs
            .into_iter()
            .map(|(score, member)| (score, member.into_bytes()))
            .collect();
        Ok(count(self.store.zadd(key.as_bytes(), pairs)?))
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        Ok(self.store.zscore(key.as_bytes(), member.as_bytes())?)
    }

    async fn zrank(&self, key: &str, member: &str, order: Order) -> StoreResult<Option<i64>> {
        let rank = self
            .store
            .zrank(key.as_bytes(), member.as_bytes(), order.is_descending())?;
        Ok(rank.map(count))
    }

    async fn zrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        order: Order,
    ) -> StoreResult<Vec<String>> {
        let pairs = self.zrange_withscores(key, start, stop, order).await?;
        Ok(pairs.into_iter().map(|(member, _)| member).collect())
    }

    async fn zrange_withscores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        order: Order,
    ) -> StoreResult<Vec<(String, f64)>> {
        self.store
            .zrange(key.as_bytes(), start, stop, order.is_descending())?
            .into_iter()
            .map(|(member, score)| -> StoreResult<(String, f64)> {
                Ok((text("ZRANGE", member)?, score))
            })
            .collect()
    }

    async fn zcard(&self, key: &str) -> StoreResult<i64> {
        Ok(count(self.store.zcard(key.as_bytes())?))
    }

    async fn zcount(&self, key: &str, min: f64, max: f64) -> StoreResult<i64> {
        Ok(count(self.store.zcount(key.as_bytes(), min, max)?))
    }
}

//! 绑定单个 key 的集合包装
//!
//! 所有集合视图共享的生命周期操作：删除、过期与存在性检查

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::StoreHandle;

/// 毫秒时间戳的十进制位数
const MILLIS_TIMESTAMP_DIGITS: u32 = 13;

/// 13 位时间戳视为毫秒并整除到秒，其他位数原样返回
pub fn normalize_timestamp(timestamp: i64) -> i64 {
    if timestamp.unsigned_abs().checked_ilog10() == Some(MILLIS_TIMESTAMP_DIGITS - 1) {
        timestamp / 1000
    } else {
        timestamp
    }
}

/// (key, 存储句柄) 二元组
///
/// 句柄是共享引用，包装本身不持有任何需要释放的资源
#[derive(Clone)]
pub struct KeyedCollection {
    key: String,
    store: Arc<dyn StoreHandle>,
}

impl fmt::Debug for KeyedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCollection")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl KeyedCollection {
    /// 空 key 在构造时即报错
    pub fn new(key: impl Into<String>, store: Arc<dyn StoreHandle>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::InvalidArgument(
                "collection key must not be empty".to_string(),
            ));
        }
        Ok(Self { key, store })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &Arc<dyn StoreHandle> {
        &self.store
    }

    /// 删除整个集合，返回删除的键数量（0 或 1）
    pub async fn delete(&self) -> Result<i64> {
        Ok(self.store.del(&self.key).await?)
    }

    /// 设置相对过期时间，键存在时返回 1
    pub async fn expire(&self, seconds: i64) -> Result<i64> {
        Ok(self.store.expire(&self.key, seconds).await?)
    }

    /// 设置绝对过期时间，接受秒或毫秒时间戳
    pub async fn expire_at(&self, timestamp: i64) -> Result<i64> {
        let timestamp = normalize_timestamp(timestamp);
        Ok(self.store.expireat(&self.key, timestamp).await?)
    }

    pub async fn exists(&self) -> Result<i64> {
        Ok(self.store.exists(&self.key).await?)
    }

    /// 剩余生存秒数，-2 表示不存在，-1 表示永不过期
    pub async fn ttl(&self) -> Result<i64> {
        Ok(self.store.ttl(&self.key).await?)
    }

    /// 移除过期时间
    pub async fn persist(&self) -> Result<i64> {
        Ok(self.store.persist(&self.key).await?)
    }
}

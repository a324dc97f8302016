//! 集合视图，成员为原始字符串，不做 JSON 编码

use std::ops::Deref;
use std::sync::Arc;

use crate::collection::KeyedCollection;
use crate::error::Result;
use crate::store::StoreHandle;

#[derive(Debug, Clone)]
pub struct RedisSet {
    inner: KeyedCollection,
}

impl Deref for RedisSet {
    type Target = KeyedCollection;

    fn deref(&self) -> &KeyedCollection {
        &self.inner
    }
}

impl RedisSet {
    pub fn new(key: impl Into<String>, store: Arc<dyn StoreHandle>) -> Result<Self> {
        Ok(Self {
            inner: KeyedCollection::new(key, store)?,
        })
    }

    /// 全部成员，无顺序保证
    pub async fn members(&self) -> Result<Vec<String>> {
        Ok(self.store().smembers(self.key()).await?)
    }

    /// 是成员返回 1，否则 0
    pub async fn contains(&self, member: &str) -> Result<i64> {
        Ok(self.store().sismember(self.key(), member).await?)
    }

    /// 新增返回 1，已存在返回 0
    pub async fn add(&self, member: &str) -> Result<i64> {
        Ok(self.store().sadd(self.key(), member).await?)
    }

    /// 删除返回 1，不存在返回 0
    pub async fn remove(&self, member: &str) -> Result<i64> {
        Ok(self.store().srem(self.key(), member).await?)
    }

    pub async fn len(&self) -> Result<i64> {
        Ok(self.store().scard(self.key()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryHandle;

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let set = RedisSet::new("test_sets", Arc::new(MemoryHandle::new())).unwrap();

        assert!(set.members().await.unwrap().is_empty());
        assert_eq!(set.add("111").await.unwrap(), 1);
        assert_eq!(set.add("222").await.unwrap(), 1);
        let before = set.members().await.unwrap();

        assert_eq!(set.add("111").await.unwrap(), 0);
        let after = set.members().await.unwrap();
        assert_eq!(before.len(), after.len());
        assert_eq!(set.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_contains_and_remove() {
        let set = RedisSet::new("test_sets", Arc::new(MemoryHandle::new())).unwrap();
        set.add("111").await.unwrap();

        assert_eq!(set.contains("111").await.unwrap(), 1);
        assert_eq!(set.remove("111").await.unwrap(), 1);
        assert_eq!(set.remove("111").await.unwrap(), 0);
        assert_eq!(set.contains("111").await.unwrap(), 0);
        assert_eq!(set.exists().await.unwrap(), 0);
    }
}

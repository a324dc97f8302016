//! 列表视图，元素以 JSON 文本存储

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::collection::KeyedCollection;
use crate::error::{Error, Result};
use crate::store::StoreHandle;

/// 阻塞弹出的默认超时
pub const DEFAULT_BLOCKING_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RedisList<T = serde_json::Value> {
    inner: KeyedCollection,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RedisList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for RedisList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RedisList").field(&self.inner).finish()
    }
}

impl<T> Deref for RedisList<T> {
    type Target = KeyedCollection;

    fn deref(&self) -> &KeyedCollection {
        &self.inner
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(text)?)
}

impl<T: Serialize + DeserializeOwned> RedisList<T> {
    pub fn new(key: impl Into<String>, store: Arc<dyn StoreHandle>) -> Result<Self> {
        Ok(Self {
            inner: KeyedCollection::new(key, store)?,
            _marker: PhantomData,
        })
    }

    /// 逐个 JSON 编码后压入头部，最后一个值位于最前，返回列表长度
    pub async fn push_left(&self, values: &[T]) -> Result<i64> {
        if values.is_empty() {
            return Err(Error::InvalidArgument(
                "push_left needs at least one value".to_string(),
            ));
        }
        let encoded = values
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(self.store().lpush(self.key(), encoded).await?)
    }

    /// 弹出尾部元素，列表为空时返回 `None`
    pub async fn pop_right(&self) -> Result<Option<T>> {
        match self.store().rpop(self.key()).await? {
            Some(text) => decode(&text).map(Some),
            None => Ok(None),
        }
    }

    /// 阻塞弹出头部元素，超时返回 `None`
    pub async fn blocking_pop_left(&self, timeout: Duration) -> Result<Option<T>> {
        check_timeout(timeout)?;
        match self.store().blpop(self.key(), timeout).await? {
            Some((_, text)) => decode(&text).map(Some),
            None => Ok(None),
        }
    }

    /// 阻塞弹出尾部元素，超时返回 `None`
    pub async fn blocking_pop_right(&self, timeout: Duration) -> Result<Option<T>> {
        check_timeout(timeout)?;
        match self.store().brpop(self.key(), timeout).await? {
            Some((_, text)) => decode(&text).map(Some),
            None => Ok(None),
        }
    }

    /// 闭区间 [start, end]，负索引从尾部计数（-1 为最后一个）
    pub async fn range(&self, start: i64, end: i64) -> Result<Vec<T>> {
        self.store()
            .lrange(self.key(), start, end)
            .await?
            .iter()
            .map(|text| decode(text))
            .collect()
    }

    /// 全部元素
    pub async fn all(&self) -> Result<Vec<T>> {
        self.range(0, -1).await
    }

    pub async fn len(&self) -> Result<i64> {
        Ok(self.store().llen(self.key()).await?)
    }
}

/// 超时为 0 在服务端表示永久阻塞
fn check_timeout(timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        return Err(Error::InvalidArgument(
            "blocking pop timeout must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryHandle;
    use serde::Deserialize;
    use serde_json::json;

    fn open<T: Serialize + DeserializeOwned>(handle: &MemoryHandle) -> RedisList<T> {
        RedisList::new("t_list", Arc::new(handle.clone())).unwrap()
    }

    #[tokio::test]
    async fn test_push_left_order() {
        let handle = MemoryHandle::new();
        let list: RedisList<i64> = open(&handle);

        assert_eq!(list.push_left(&[111]).await.unwrap(), 1);
        assert_eq!(list.push_left(&[1, 2, 3, 4]).await.unwrap(), 5);
        assert_eq!(list.all().await.unwrap(), vec![4, 3, 2, 1, 111]);
        assert_eq!(list.range(-2, -1).await.unwrap(), vec![1, 111]);
        assert_eq!(list.pop_right().await.unwrap(), Some(111));
        assert_eq!(list.len().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_structured_values_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Job {
            id: u32,
            tags: Vec<String>,
        }

        let handle = MemoryHandle::new();
        let list: RedisList<Job> = open(&handle);
        let job = Job {
            id: 7,
            tags: vec!["a".into(), "b".into()],
        };
        list.push_left(&[job]).await.unwrap();
        let popped = list.pop_right().await.unwrap().unwrap();
        assert_eq!(popped, Job { id: 7, tags: vec!["a".into(), "b".into()] });
    }

    #[tokio::test]
    async fn test_pop_empty_is_none() {
        let handle = MemoryHandle::new();
        let list: RedisList = open(&handle);
        assert_eq!(list.pop_right().await.unwrap(), None);
        assert!(list.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blocking_pops_decode() {
        let handle = MemoryHandle::new();
        let list: RedisList = open(&handle);
        list.push_left(&[json!({"a": 1}), json!("x")]).await.unwrap();

        let left = list.blocking_pop_left(Duration::from_secs(1)).await.unwrap();
        assert_eq!(left, Some(json!("x")));
        let right = list.blocking_pop_right(Duration::from_secs(1)).await.unwrap();
        assert_eq!(right, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let handle = MemoryHandle::new();
        let list: RedisList<i64> = open(&handle);
        assert!(matches!(list.push_left(&[]).await, Err(Error::InvalidArgument(_))));
        assert!(matches!(
            list.blocking_pop_left(Duration::ZERO).await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_element_is_decode_error() {
        let handle = MemoryHandle::new();
        handle.store().rpush(b"t_list", vec![b"not json".to_vec()]).unwrap();
        let list: RedisList = open(&handle);
        assert!(matches!(list.range(0, -1).await, Err(Error::Decode(_))));
        assert!(matches!(list.pop_right().await, Err(Error::Decode(_))));
    }
}

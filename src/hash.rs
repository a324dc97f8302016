//! 哈希视图，字段值以 JSON 文本存储

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::collection::KeyedCollection;
use crate::error::Result;
use crate::store::StoreHandle;

pub struct RedisHash<T = Value> {
    inner: KeyedCollection,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RedisHash<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for RedisHash<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RedisHash").field(&self.inner).finish()
    }
}

impl<T> Deref for RedisHash<T> {
    type Target = KeyedCollection;

    fn deref(&self) -> &KeyedCollection {
        &self.inner
    }
}

/// 按 JavaScript 的宽松真值规则判断：null、false、0、"" 为假，
/// 空数组和空对象为真
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl<T: Serialize + DeserializeOwned> RedisHash<T> {
    pub fn new(key: impl Into<String>, store: Arc<dyn StoreHandle>) -> Result<Self> {
        Ok(Self {
            inner: KeyedCollection::new(key, store)?,
            _marker: PhantomData,
        })
    }

    /// 全部字段及解码后的值
    pub async fn get_all(&self) -> Result<HashMap<String, T>> {
        self.store()
            .hgetall(self.key())
            .await?
            .into_iter()
            .map(|(field, text)| -> Result<(String, T)> {
                Ok((field, serde_json::from_str(&text)?))
            })
            .collect()
    }

    /// 字段不存在时返回 `None`
    pub async fn get(&self, field: &str) -> Result<Option<T>> {
        match self.store().hget(self.key(), field).await? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// 写入字段，新字段返回 `Some(1)`，覆盖返回 `Some(0)`
    ///
    /// 值为假（见 [`is_truthy`]）时不发送任何命令并返回 `None`，
    /// 因此 `0`、`false`、`""` 无法通过该方法写入
    pub async fn set(&self, field: &str, value: &T) -> Result<Option<i64>> {
        if !is_truthy(&serde_json::to_value(value)?) {
            debug!(key = self.key(), field, "skipping falsy hash value");
            return Ok(None);
        }
        let text = serde_json::to_string(value)?;
        Ok(Some(self.store().hset(self.key(), field, text).await?))
    }

    /// 删除字段，返回删除数量（0 或 1）
    pub async fn delete_field(&self, field: &str) -> Result<i64> {
        Ok(self.store().hdel(self.key(), field).await?)
    }
}

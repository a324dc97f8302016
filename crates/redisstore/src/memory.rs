//! 内存存储实现
//!
//! 使用 HashMap 实现的内存键空间，支持 Redis 集合类型与键过期。
//! 过期采用惰性删除：访问时发现已过期即移除

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::sorted_set::SortedSet;
use crate::{StoreError, StoreResult};

/// Redis 值类型
#[derive(Debug, Clone)]
pub enum RedisValue {
    List(VecDeque<Vec<u8>>),
    Hash(HashMap<Vec<u8>, Vec<u8>>),
    Set(HashSet<Vec<u8>>),
    SortedSet(SortedSet),
}

impl RedisValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RedisValue::List(_) => "list",
            RedisValue::Hash(_) => "hash",
            RedisValue::Set(_) => "set",
            RedisValue::SortedSet(_) => "zset",
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            RedisValue::List(l) => l.is_empty(),
            RedisValue::Hash(h) => h.is_empty(),
            RedisValue::Set(s) => s.is_empty(),
            RedisValue::SortedSet(z) => z.is_empty(),
        }
    }
}

/// 带过期时间的值
#[derive(Debug, Clone)]
struct Entry {
    value: RedisValue,
    expire_at: Option<Instant>,
}

impl Entry {
    fn new(value: RedisValue) -> Self {
        Self {
            value,
            expire_at: None,
        }
    }

    fn is_expired(&self) -> bool {
        self.expire_at.is_some_and(|t| Instant::now() >= t)
    }
}

/// 将 Redis 风格的闭区间 [start, stop]（支持负索引）规范化为有效下标
pub(crate) fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

fn invalid_expire_time(command: &str) -> StoreError {
    StoreError::InvalidArgument(format!("invalid expire time in '{}' command", command))
}

type Keyspace = HashMap<Vec<u8>, Entry>;

/// 内存存储实现
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Keyspace>>,
}

macro_rules! expect_type {
    ($value:expr, $variant:ident) => {
        match $value {
            RedisValue::$variant(inner) => Ok(inner),
            _ => Err(StoreError::WrongType),
        }
    };
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取未过期的值
    fn live<'a>(data: &'a Keyspace, key: &[u8]) -> Option<&'a RedisValue> {
        data.get(key).filter(|e| !e.is_expired()).map(|e| &e.value)
    }

    /// 获取可变值，顺便删除已过期的键
    fn live_mut<'a>(data: &'a mut Keyspace, key: &[u8]) -> Option<&'a mut Entry> {
        if data.get(key).is_some_and(Entry::is_expired) {
            data.remove(key);
            return None;
        }
        data.get_mut(key)
    }

    /// 获取或创建指定类型的值
    fn live_or_insert<'a>(
        data: &'a mut Keyspace,
        key: &[u8],
        create: fn() -> RedisValue,
    ) -> &'a mut RedisValue {
        if data.get(key).is_some_and(Entry::is_expired) {
            data.remove(key);
        }
        &mut data
            .entry(key.to_vec())
            .or_insert_with(|| Entry::new(create()))
            .value
    }

    /// 集合被清空后删除键（与 Redis 一致）
    fn drop_if_empty(data: &mut Keyspace, key: &[u8]) {
        if data.get(key).is_some_and(|e| e.value.is_empty()) {
            data.remove(key);
        }
    }

    // ==================== 通用操作 ====================

    /// DEL: 删除键（支持多个）
    pub fn del(&self, keys: &[&[u8]]) -> usize {
        let mut data = self.data.write();
        keys.iter()
            .filter(|key| match data.remove(**key) {
                Some(entry) => !entry.is_expired(),
                None => false,
            })
            .count()
    }

    /// EXISTS: 检查键是否存在（支持多个，重复键重复计数）
    pub fn exists(&self, keys: &[&[u8]]) -> usize {
        let data = self.data.read();
        keys.iter()
            .filter(|key| Self::live(&data, key).is_some())
            .count()
    }

    /// TYPE: 获取键的类型
    pub fn key_type(&self, key: &[u8]) -> Option<&'static str> {
        let data = self.data.read();
        Self::live(&data, key).map(RedisValue::type_name)
    }

    /// EXPIRE: 设置相对过期时间（秒），非正数立即删除
    ///
    /// 过期时间点超出 `Instant` 的表示范围时返回 `InvalidArgument`
    pub fn expire(&self, key: &[u8], secs: i64) -> StoreResult<bool> {
        let mut data = self.data.write();
        if Self::live_mut(&mut data, key).is_none() {
            return Ok(false);
        }
        if secs <= 0 {
            data.remove(key);
            return Ok(true);
        }
        let deadline = Instant::now()
            .checked_add(Duration::from_secs(secs as u64))
            .ok_or_else(|| invalid_expire_time("expire"))?;
        if let Some(entry) = data.get_mut(key) {
            entry.expire_at = Some(deadline);
        }
        Ok(true)
    }

    /// EXPIREAT: 设置绝对过期时间（Unix 秒），过去的时间点立即删除
    pub fn expireat(&self, key: &[u8], unix_secs: i64) -> StoreResult<bool> {
        let deadline = UNIX_EPOCH
            .checked_add(Duration::from_secs(unix_secs.max(0) as u64))
            .ok_or_else(|| invalid_expire_time("expireat"))?;
        let mut data = self.data.write();
        if Self::live_mut(&mut data, key).is_none() {
            return Ok(false);
        }
        match deadline.duration_since(SystemTime::now()) {
            Ok(remaining) if !remaining.is_zero() => {
                let at = Instant::now()
                    .checked_add(remaining)
                    .ok_or_else(|| invalid_expire_time("expireat"))?;
                if let Some(entry) = data.get_mut(key) {
                    entry.expire_at = Some(at);
                }
            }
            _ => {
                debug!("expireat in the past, removing key");
                data.remove(key);
            }
        }
        Ok(true)
    }

    /// TTL: 剩余过期时间（秒，四舍五入），-1 表示永不过期，-2 表示键不存在
    pub fn ttl(&self, key: &[u8]) -> i64 {
        let data = self.data.read();
        match data.get(key).filter(|e| !e.is_expired()) {
            None => -2,
            Some(Entry {
                expire_at: None, ..
            }) => -1,
            Some(Entry {
                expire_at: Some(t),
                ..
            }) => {
                let remaining = t.saturating_duration_since(Instant::now());
                ((remaining.as_millis() + 500) / 1000) as i64
            }
        }
    }

    /// PERSIST: 移除过期时间
    pub fn persist(&self, key: &[u8]) -> bool {
        let mut data = self.data.write();
        match Self::live_mut(&mut data, key) {
            Some(entry) => entry.expire_at.take().is_some(),
            None => false,
        }
    }

    /// DBSIZE: 获取键数量（含尚未清理的过期键）
    pub fn dbsize(&self) -> usize {
        self.data.read().len()
    }

    /// FLUSHDB: 清空所有数据
    pub fn flushdb(&self) {
        self.data.write().clear();
    }

    // ==================== Set 操作 ====================

    /// SADD: 添加集合成员，返回新增个数
    pub fn sadd(&self, key: &[u8], members: Vec<Vec<u8>>) -> StoreResult<usize> {
        let mut data = self.data.write();
        let value = Self::live_or_insert(&mut data, key, || RedisValue::Set(HashSet::new()));
        let set = expect_type!(value, Set)?;
        Ok(members.into_iter().filter(|m| set.insert(m.clone())).count())
    }

    /// SREM: 删除集合成员
    pub fn srem(&self, key: &[u8], members: &[&[u8]]) -> StoreResult<usize> {
        let mut data = self.data.write();
        let removed = match Self::live_mut(&mut data, key) {
            Some(entry) => {
                let set = expect_type!(&mut entry.value, Set)?;
                members.iter().filter(|m| set.remove(**m)).count()
            }
            None => 0,
        };
        Self::drop_if_empty(&mut data, key);
        Ok(removed)
    }

    /// SMEMBERS: 获取所有集合成员（无序）
    pub fn smembers(&self, key: &[u8]) -> StoreResult<Vec<Vec<u8>>> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, Set)?.iter().cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    /// SISMEMBER: 检查是否为集合成员
    pub fn sismember(&self, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, Set)?.contains(member)),
            None => Ok(false),
        }
    }

    /// SCARD: 获取集合大小
    pub fn scard(&self, key: &[u8]) -> StoreResult<usize> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, Set)?.len()),
            None => Ok(0),
        }
    }

    // ==================== List 操作 ====================

    /// LPUSH: 依次插入头部，最后一个参数位于最前
    pub fn lpush(&self, key: &[u8], values: Vec<Vec<u8>>) -> StoreResult<usize> {
        let mut data = self.data.write();
        let value = Self::live_or_insert(&mut data, key, || RedisValue::List(VecDeque::new()));
        let list = expect_type!(value, List)?;
        for v in values {
            list.push_front(v);
        }
        Ok(list.len())
    }

    /// RPUSH: 从右侧插入元素
    pub fn rpush(&self, key: &[u8], values: Vec<Vec<u8>>) -> StoreResult<usize> {
        let mut data = self.data.write();
        let value = Self::live_or_insert(&mut data, key, || RedisValue::List(VecDeque::new()));
        let list = expect_type!(value, List)?;
        list.extend(values);
        Ok(list.len())
    }

    fn pop(&self, key: &[u8], front: bool) -> StoreResult<Option<Vec<u8>>> {
        let mut data = self.data.write();
        let popped = match Self::live_mut(&mut data, key) {
            Some(entry) => {
                let list = expect_type!(&mut entry.value, List)?;
                if front { list.pop_front() } else { list.pop_back() }
            }
            None => None,
        };
        Self::drop_if_empty(&mut data, key);
        Ok(popped)
    }

    /// 弹出前先用 `convert` 检查端部元素，转换失败时元素保留在列表中
    pub fn pop_with<T, E>(
        &self,
        key: &[u8],
        front: bool,
        convert: impl FnOnce(&[u8]) -> Result<T, E>,
    ) -> StoreResult<Result<Option<T>, E>> {
        let mut data = self.data.write();
        let Some(entry) = Self::live_mut(&mut data, key) else {
            return Ok(Ok(None));
        };
        let list = expect_type!(&mut entry.value, List)?;
        let end = if front { list.front() } else { list.back() };
        let Some(bytes) = end else {
            return Ok(Ok(None));
        };
        let value = match convert(bytes.as_slice()) {
            Ok(value) => value,
            Err(e) => return Ok(Err(e)),
        };
        if front {
            list.pop_front();
        } else {
            list.pop_back();
        }
        Self::drop_if_empty(&mut data, key);
        Ok(Ok(Some(value)))
    }

    /// LPOP: 从左侧弹出元素
    pub fn lpop(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.pop(key, true)
    }

    /// RPOP: 从右侧弹出元素
    pub fn rpop(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.pop(key, false)
    }

    /// LRANGE: 获取列表闭区间，支持负索引
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>> {
        let data = self.data.read();
        let Some(value) = Self::live(&data, key) else {
            return Ok(Vec::new());
        };
        let list = expect_type!(value, List)?;
        Ok(match normalize_range(start, stop, list.len()) {
            Some((start, stop)) => list.range(start..=stop).cloned().collect(),
            None => Vec::new(),
        })
    }

    /// LLEN: 获取列表长度
    pub fn llen(&self, key: &[u8]) -> StoreResult<usize> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, List)?.len()),
            None => Ok(0),
        }
    }

    // ==================== Hash 操作 ====================

    /// HGET: 获取 hash 字段值
    pub fn hget(&self, key: &[u8], field: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, Hash)?.get(field).cloned()),
            None => Ok(None),
        }
    }

    /// HSET: 设置 hash 字段值，新字段返回 true
    pub fn hset(&self, key: &[u8], field: Vec<u8>, value: Vec<u8>) -> StoreResult<bool> {
        let mut data = self.data.write();
        let entry = Self::live_or_insert(&mut data, key, || RedisValue::Hash(HashMap::new()));
        let hash = expect_type!(entry, Hash)?;
        Ok(hash.insert(field, value).is_none())
    }

    /// HDEL: 删除 hash 字段
    pub fn hdel(&self, key: &[u8], fields: &[&[u8]]) -> StoreResult<usize> {
        let mut data = self.data.write();
        let removed = match Self::live_mut(&mut data, key) {
            Some(entry) => {
                let hash = expect_type!(&mut entry.value, Hash)?;
                fields.iter().filter(|f| hash.remove(**f).is_some()).count()
            }
            None => 0,
        };
        Self::drop_if_empty(&mut data, key);
        Ok(removed)
    }

    /// HGETALL: 获取所有 hash 字段和值
    pub fn hgetall(&self, key: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, Hash)?
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// HLEN: 获取 hash 字段数量
    pub fn hlen(&self, key: &[u8]) -> StoreResult<usize> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, Hash)?.len()),
            None => Ok(0),
        }
    }

    // ==================== Sorted Set 操作 ====================

    /// ZADD: 添加或更新成员，返回新增成员数（更新不计数）
    pub fn zadd(&self, key: &[u8], pairs: Vec<(f64, Vec<u8>)>) -> StoreResult<usize> {
        if pairs.iter().any(|(score, _)| score.is_nan()) {
            return Err(StoreError::NotFloat);
        }
        let mut data = self.data.write();
        let value = Self::live_or_insert(&mut data, key, || RedisValue::SortedSet(SortedSet::new()));
        let zset = expect_type!(value, SortedSet)?;
        Ok(pairs
            .into_iter()
            .filter(|(score, member)| zset.insert(*score, member.clone()))
            .count())
    }

    /// ZREM: 删除成员
    pub fn zrem(&self, key: &[u8], members: &[&[u8]]) -> StoreResult<usize> {
        let mut data = self.data.write();
        let removed = match Self::live_mut(&mut data, key) {
            Some(entry) => {
                let zset = expect_type!(&mut entry.value, SortedSet)?;
                members.iter().filter(|m| zset.remove(m)).count()
            }
            None => 0,
        };
        Self::drop_if_empty(&mut data, key);
        Ok(removed)
    }

    /// ZSCORE: 获取成员分数
    pub fn zscore(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<f64>> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, SortedSet)?.score(member)),
            None => Ok(None),
        }
    }

    /// ZRANK / ZREVRANK
    pub fn zrank(&self, key: &[u8], member: &[u8], rev: bool) -> StoreResult<Option<usize>> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, SortedSet)?.rank(member, rev)),
            None => Ok(None),
        }
    }

    /// ZRANGE / ZREVRANGE ... WITHSCORES
    pub fn zrange(
        &self,
        key: &[u8],
        start: i64,
        stop: i64,
        rev: bool,
    ) -> StoreResult<Vec<(Vec<u8>, f64)>> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, SortedSet)?.range(start, stop, rev)),
            None => Ok(Vec::new()),
        }
    }

    /// ZCARD: 成员数量
    pub fn zcard(&self, key: &[u8]) -> StoreResult<usize> {
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, SortedSet)?.len()),
            None => Ok(0),
        }
    }

    /// ZCOUNT: 分数位于闭区间 [min, max] 的成员数量
    pub fn zcount(&self, key: &[u8], min: f64, max: f64) -> StoreResult<usize> {
        if min.is_nan() || max.is_nan() {
            return Err(StoreError::InvalidArgument(
                "min or max is not a float".to_string(),
            ));
        }
        let data = self.data.read();
        match Self::live(&data, key) {
            Some(value) => Ok(expect_type!(value, SortedSet)?.count(min, max)),
            None => Ok(0),
        }
    }
}

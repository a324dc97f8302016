//! 有序集合视图，成员为原始字符串，分数为浮点
//!
//! `range` 系列在服务端返回的有序片段上推导稠密排名，见 [`crate::rank`]。
//! `dense_rank` 先查位置排名再取 `[0, rank]` 片段，两次请求之间没有原子性保证。

use std::ops::Deref;
use std::sync::Arc;

use crate::collection::KeyedCollection;
use crate::error::{Error, Result};
use crate::rank::{Order, RankBaseline, RankedMember, derive_dense_ranks};
use crate::store::StoreHandle;

#[derive(Debug, Clone)]
pub struct RedisZSet {
    inner: KeyedCollection,
    baseline: RankBaseline,
}

impl Deref for RedisZSet {
    type Target = KeyedCollection;

    fn deref(&self) -> &KeyedCollection {
        &self.inner
    }
}

impl RedisZSet {
    pub fn new(key: impl Into<String>, store: Arc<dyn StoreHandle>) -> Result<Self> {
        Ok(Self {
            inner: KeyedCollection::new(key, store)?,
            baseline: RankBaseline::default(),
        })
    }

    /// 替换稠密排名的起始状态
    pub fn with_baseline(mut self, baseline: RankBaseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn baseline(&self) -> RankBaseline {
        self.baseline
    }

    pub async fn size(&self) -> Result<i64> {
        Ok(self.store().zcard(self.key()).await?)
    }

    /// 分数在闭区间 [min, max] 内的成员数
    pub async fn count(&self, min: f64, max: f64) -> Result<i64> {
        Ok(self.store().zcount(self.key(), min, max).await?)
    }

    /// 写入 (score, member)，返回新增成员数，仅更新分数的不计入
    pub async fn add(&self, pairs: &[(f64, &str)]) -> Result<i64> {
        if pairs.is_empty() {
            return Err(Error::InvalidArgument(
                "add needs at least one (score, member) pair".to_string(),
            ));
        }
        let pairs = pairs
            .iter()
            .map(|(score, member)| (*score, member.to_string()))
            .collect();
        Ok(self.store().zadd(self.key(), pairs).await?)
    }

    pub async fn score(&self, member: &str) -> Result<Option<f64>> {
        Ok(self.store().zscore(self.key(), member).await?)
    }

    /// 升序零基位置
    pub async fn rank(&self, member: &str) -> Result<Option<i64>> {
        Ok(self.store().zrank(self.key(), member, Order::Ascending).await?)
    }

    /// 降序零基位置
    pub async fn rank_descending(&self, member: &str) -> Result<Option<i64>> {
        Ok(self.store().zrank(self.key(), member, Order::Descending).await?)
    }

    /// 位置闭区间 [from, to] 内的成员及其稠密排名，`to` 可为负
    pub async fn range(&self, from: i64, to: i64) -> Result<Vec<RankedMember>> {
        self.ranked(from, to, Order::Ascending).await
    }

    pub async fn range_descending(&self, from: i64, to: i64) -> Result<Vec<RankedMember>> {
        self.ranked(from, to, Order::Descending).await
    }

    /// 成员不存在时返回 `None`
    pub async fn dense_rank(&self, member: &str) -> Result<Option<u64>> {
        self.dense_rank_in(member, Order::Ascending).await
    }

    pub async fn dense_rank_descending(&self, member: &str) -> Result<Option<u64>> {
        self.dense_rank_in(member, Order::Descending).await
    }

    pub async fn members(&self, from: i64, to: i64) -> Result<Vec<String>> {
        Ok(self.store().zrange(self.key(), from, to, Order::Ascending).await?)
    }

    pub async fn members_descending(&self, from: i64, to: i64) -> Result<Vec<String>> {
        Ok(self.store().zrange(self.key(), from, to, Order::Descending).await?)
    }

    /// (member, score) 对，不推导排名
    pub async fn scores(&self, from: i64, to: i64) -> Result<Vec<(String, f64)>> {
        Ok(self
            .store()
            .zrange_withscores(self.key(), from, to, Order::Ascending)
            .await?)
    }

    pub async fn scores_descending(&self, from: i64, to: i64) -> Result<Vec<(String, f64)>> {
        Ok(self
            .store()
            .zrange_withscores(self.key(), from, to, Order::Descending)
            .await?)
    }

    async fn ranked(&self, from: i64, to: i64, order: Order) -> Result<Vec<RankedMember>> {
        let pairs = self
            .store()
            .zrange_withscores(self.key(), from, to, order)
            .await?;
        Ok(derive_dense_ranks(pairs, from, order, self.baseline))
    }

    async fn dense_rank_in(&self, member: &str, order: Order) -> Result<Option<u64>> {
        let Some(position) = self.store().zrank(self.key(), member, order).await? else {
            return Ok(None);
        };
        // 两次请求之间成员可能已被删除，片段为空时按不存在处理
        let ranked = self.ranked(0, position, order).await?;
        Ok(ranked.last().map(|m| m.rank))
    }
}

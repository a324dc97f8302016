//! 有序集合
//!
//! 成员按 (score, member) 字典序排列，与 Redis 相同

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::memory::normalize_range;

/// 可排序的分数（NaN 在插入前已被拒绝）
#[derive(Debug, Clone, Copy, PartialEq)]
struct Score(f64);

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: HashMap<Vec<u8>, f64>,
    ordered: BTreeSet<(Score, Vec<u8>)>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// 插入或更新成员分数，新成员返回 true
    pub fn insert(&mut self, score: f64, member: Vec<u8>) -> bool {
        // -0.0 与 0.0 视为同一分数
        let score = if score == 0.0 { 0.0 } else { score };
        match self.scores.insert(member.clone(), score) {
            Some(old) => {
                self.ordered.remove(&(Score(old), member.clone()));
                self.ordered.insert((Score(score), member));
                false
            }
            None => {
                self.ordered.insert((Score(score), member));
                true
            }
        }
    }

    pub fn remove(&mut self, member: &[u8]) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered.remove(&(Score(score), member.to_vec()));
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// 成员的零基排名，`rev` 为按分数递减
    pub fn rank(&self, member: &[u8], rev: bool) -> Option<usize> {
        let score = *self.scores.get(member)?;
        let key = (Score(score), member.to_vec());
        let below = self.ordered.range(..key).count();
        Some(if rev { self.len() - 1 - below } else { below })
    }

    /// 闭区间 [min, max] 内的成员数
    pub fn count(&self, min: f64, max: f64) -> usize {
        self.ordered
            .iter()
            .filter(|(s, _)| s.0 >= min && s.0 <= max)
            .count()
    }

    /// 按排名区间取成员及分数，负索引从尾部计数
    pub fn range(&self, start: i64, stop: i64, rev: bool) -> Vec<(Vec<u8>, f64)> {
        let Some((start, stop)) = normalize_range(start, stop, self.len()) else {
            return Vec::new();
        };
        let take = stop - start + 1;
        let to_pair = |(s, m): &(Score, Vec<u8>)| (m.clone(), s.0);
        if rev {
            self.ordered.iter().rev().skip(start).take(take).map(to_pair).collect()
        } else {
            self.ordered.iter().skip(start).take(take).map(to_pair).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SortedSet {
        let mut z = SortedSet::new();
        for (score, member) in [(100.0, "Hujia"), (80.0, "sth"), (70.0, "mfg"), (80.0, "dev")] {
            assert!(z.insert(score, member.as_bytes().to_vec()));
        }
        z
    }

    #[test]
    fn test_ties_order_by_member() {
        let z = seeded();
        let names: Vec<Vec<u8>> = z.range(0, -1, false).into_iter().map(|(m, _)| m).collect();
        assert_eq!(
            names,
            vec![b"mfg".to_vec(), b"dev".to_vec(), b"sth".to_vec(), b"Hujia".to_vec()]
        );
        assert_eq!(z.rank(b"dev", false), Some(1));
        assert_eq!(z.rank(b"dev", true), Some(2));
        assert_eq!(z.rank(b"nobody", false), None);
    }

    #[test]
    fn test_update_moves_member() {
        let mut z = seeded();
        assert!(!z.insert(10.0, b"Hujia".to_vec()));
        assert_eq!(z.len(), 4);
        assert_eq!(z.rank(b"Hujia", false), Some(0));
        assert_eq!(z.score(b"Hujia"), Some(10.0));
    }

    #[test]
    fn test_count_and_remove() {
        let mut z = seeded();
        assert_eq!(z.count(80.0, 80.0), 2);
        assert_eq!(z.count(f64::NEG_INFINITY, f64::INFINITY), 4);
        assert!(z.remove(b"sth"));
        assert!(!z.remove(b"sth"));
        assert_eq!(z.count(80.0, 80.0), 1);
    }

    #[test]
    fn test_range_negative_indices() {
        let z = seeded();
        let top: Vec<(Vec<u8>, f64)> = z.range(0, 0, true);
        assert_eq!(top, vec![(b"Hujia".to_vec(), 100.0)]);
        assert_eq!(z.range(-2, -1, false).len(), 2);
        assert!(z.range(3, 1, false).is_empty());
        assert!(z.range(10, 20, false).is_empty());
    }
}

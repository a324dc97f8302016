//! 稠密排名推导
//!
//! 输入为已按分数排好序的 (member, score) 序列，输出每个成员的
//! 位置排名和稠密排名：分数相同共享排名，分数变化时排名加一，排名之间没有空缺。
//!
//! 运行状态从哨兵 `(rank = 0, score = 0.0)` 开始，只有越过哨兵的分数才会开启
//! 第一个排名。升序时首位分数 <= 0 的成员因此得到排名 0；降序时所有正分数
//! 都不会低于哨兵，全部停留在排名 0。需要首个成员总是排名 1 时使用
//! [`RankBaseline::FirstMember`]。

use serde::{Deserialize, Serialize};

/// 按分数排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// 分数从小到大（ZRANGE / ZRANK）
    #[default]
    Ascending,
    /// 分数从大到小（ZREVRANGE / ZREVRANK）
    Descending,
}

impl Order {
    pub fn is_descending(self) -> bool {
        self == Order::Descending
    }
}

/// 排名推导的起始状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankBaseline {
    /// 以分数 0 为哨兵
    #[default]
    Zero,
    /// 第一个成员总是开启排名 1
    FirstMember,
}

/// 带排名的成员
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMember {
    pub name: String,
    pub score: f64,
    /// 在有序集合中的零基位置（`from + 序号`）
    pub position: i64,
    /// 一基稠密排名
    pub rank: u64,
}

/// 对从位置 `from` 开始的有序片段推导稠密排名
pub fn derive_dense_ranks<I>(
    pairs: I,
    from: i64,
    order: Order,
    baseline: RankBaseline,
) -> Vec<RankedMember>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut current_rank = 0u64;
    let mut current_score = 0.0f64;

    pairs
        .into_iter()
        .enumerate()
        .map(|(index, (name, score))| {
            let opens_first = index == 0 && baseline == RankBaseline::FirstMember;
            let advances = match order {
                Order::Ascending => score > current_score,
                Order::Descending => score < current_score,
            };
            if opens_first || advances {
                current_rank += 1;
                current_score = score;
            }
            RankedMember {
                name,
                score,
                position: from + index as i64,
                rank: current_rank,
            }
        })
        .collect()
}

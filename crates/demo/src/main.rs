//! blue-redis 演示程序
//!
//! 连接到运行中的服务端，依次演练集合、列表、哈希和有序集合视图，
//! 任何一项期望不成立即以非零状态退出。

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use blue_redis::{
    ClientConfig, Connection, KeyedCollection, RedisHash, RedisList, RedisSet, RedisZSet,
    StoreHandle,
};
use clap::Parser;
use serde_json::json;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

type DemoResult<T = ()> = Result<T, Box<dyn Error>>;

/// 演示程序配置
#[derive(Parser, Debug)]
#[command(name = "blue-redis-demo")]
#[command(about = "Walk through the blue-redis collection views against a live server")]
struct Args {
    /// 服务端主机
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// 服务端端口
    #[arg(short, long, default_value_t = 6379)]
    port: u16,

    /// 数据库编号，非数字按 0 处理
    #[arg(long, default_value = "0")]
    db: String,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 所有演示 key 的前缀
    #[arg(long, default_value = "blue_redis_demo:")]
    prefix: String,
}

fn ensure(condition: bool, what: &str) -> DemoResult {
    if condition {
        Ok(())
    } else {
        Err(format!("expectation failed: {}", what).into())
    }
}

async fn demo_keys(store: Arc<dyn StoreHandle>, prefix: &str) -> DemoResult {
    let key = KeyedCollection::new(format!("{}test_key", prefix), store.clone())?;
    let set = RedisSet::new(key.key(), store)?;

    if key.exists().await? == 1 {
        info!("[keys] del {}", key.delete().await?);
    }
    set.add("xxx").await?;
    ensure(key.exists().await? == 1, "key exists after add")?;

    key.expire(3).await?;
    let ttl = key.ttl().await?;
    info!("[keys] expire 3s, ttl {}", ttl);
    ensure((0..=3).contains(&ttl), "ttl within the expiry window")?;

    ensure(key.persist().await? == 1, "persist clears the expiry")?;
    ensure(key.ttl().await? == -1, "no expiry after persist")?;

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?;
    let millis = i64::try_from(now.as_millis())? + 60_000;
    key.expire_at(millis).await?;
    let ttl = key.ttl().await?;
    info!("[keys] expire_at {} (ms), ttl {}", millis, ttl);
    ensure((58..=60).contains(&ttl), "millisecond timestamp is read as seconds")?;

    info!("[keys] free {}", key.delete().await?);
    ensure(key.exists().await? == 0, "key removed")?;
    Ok(())
}

async fn demo_sets(store: Arc<dyn StoreHandle>, prefix: &str) -> DemoResult {
    let set = RedisSet::new(format!("{}test_sets", prefix), store)?;
    set.delete().await?;

    ensure(set.add("111").await? == 1, "first add is new")?;
    ensure(set.add("222").await? == 1, "second add is new")?;
    let before = set.members().await?;
    ensure(set.add("111").await? == 0, "repeated add is not new")?;
    let after = set.members().await?;
    ensure(before.len() == after.len(), "repeated add keeps size")?;
    info!("[sets] all {:?}", after);

    ensure(set.contains("111").await? == 1, "contains member")?;
    ensure(set.remove("111").await? == 1, "remove member")?;
    ensure(set.contains("111").await? == 0, "member removed")?;

    info!("[sets] free {}", set.delete().await?);
    ensure(set.exists().await? == 0, "set removed")?;
    Ok(())
}

async fn demo_list(store: Arc<dyn StoreHandle>, prefix: &str) -> DemoResult {
    let list: RedisList = RedisList::new(format!("{}t_list", prefix), store)?;
    list.delete().await?;

    list.push_left(&[json!(111)]).await?;
    let len = list.push_left(&[json!(1), json!(2), json!(3), json!(4)]).await?;
    info!("[list] lpush {}", len);
    ensure(len == 5, "list length after pushes")?;

    let all = list.all().await?;
    info!("[list] all {:?}", all);
    ensure(all == vec![json!(4), json!(3), json!(2), json!(1), json!(111)], "head order")?;

    info!("[list] rpop {:?}", list.pop_right().await?);
    let timeout = Duration::from_secs(1);
    info!("[list] blpop {:?}", list.blocking_pop_left(timeout).await?);
    info!("[list] brpop {:?}", list.blocking_pop_right(timeout).await?);
    info!("[list] rpop {:?}", list.pop_right().await?);
    info!("[list] blpop {:?}", list.blocking_pop_left(timeout).await?);

    let started = tokio::time::Instant::now();
    let popped = list.blocking_pop_left(timeout).await?;
    info!("[list] blpop on empty {:?} after {:?}", popped, started.elapsed());
    ensure(popped.is_none(), "blocking pop on empty list times out")?;

    info!("[list] free {}", list.delete().await?);
    Ok(())
}

async fn demo_hash(store: Arc<dyn StoreHandle>, prefix: &str) -> DemoResult {
    let hash: RedisHash = RedisHash::new(format!("{}test_hash", prefix), store)?;
    let value = json!("minieyeTest");

    let current = hash.get("name").await?;
    info!("[hash] name {:?}", current);
    if current.is_none() {
        info!("[hash] hset {:?}", hash.set("name", &value).await?);
        ensure(hash.get("name").await? == Some(value), "hash value stored")?;
    } else {
        info!("[hash] hdel {}", hash.delete_field("name").await?);
        ensure(hash.get("name").await?.is_none(), "hash field removed")?;
    }

    ensure(hash.set("zero", &json!(0)).await?.is_none(), "falsy write is skipped")?;
    ensure(hash.get("zero").await?.is_none(), "falsy value not stored")?;

    info!("[hash] free {}", hash.delete().await?);
    ensure(hash.exists().await? == 0, "hash removed")?;
    Ok(())
}

async fn demo_zset(store: Arc<dyn StoreHandle>, prefix: &str) -> DemoResult {
    let zset = RedisZSet::new(format!("{}test_zset", prefix), store)?;
    zset.delete().await?;
    ensure(zset.size().await? == 0, "sorted set starts empty")?;

    let seed = [(100.0, "Hujia"), (80.0, "sth"), (70.0, "mfg"), (80.0, "dev")];
    ensure(zset.add(&seed).await? == 4, "seed adds four members")?;
    ensure(zset.add(&seed).await? == 0, "re-seed adds nothing")?;
    ensure(zset.add(&[(85.0, "test")]).await? == 1, "one more member")?;
    ensure(zset.size().await? == 5, "size is five")?;
    ensure(zset.count(80.0, 80.0).await? == 2, "two members at 80")?;
    ensure(zset.score("dev").await? == Some(80.0), "dev scores 80")?;

    info!("[zset] members {:?}", zset.members(0, -1).await?);
    for member in zset.range(0, -1).await? {
        info!(
            "[zset] range {} score={} position={} rank={}",
            member.name, member.score, member.position, member.rank
        );
    }
    for name in ["Hujia", "dev", "mfg"] {
        info!(
            "[zset] {} rank={:?} dense={:?}",
            name,
            zset.rank(name).await?,
            zset.dense_rank(name).await?
        );
    }
    ensure(
        zset.dense_rank("sth").await? == zset.dense_rank("dev").await?,
        "tied scores share a dense rank",
    )?;

    info!("[zset] members desc {:?}", zset.members_descending(0, -1).await?);
    for member in zset.range_descending(0, -1).await? {
        info!(
            "[zset] revrange {} score={} position={} rank={}",
            member.name, member.score, member.position, member.rank
        );
    }
    for name in ["Hujia", "dev", "mfg"] {
        info!(
            "[zset] {} revrank={:?} dense={:?}",
            name,
            zset.rank_descending(name).await?,
            zset.dense_rank_descending(name).await?
        );
    }

    info!("[zset] free {}", zset.delete().await?);
    ensure(zset.exists().await? == 0, "sorted set removed")?;
    Ok(())
}

#[tokio::main]
async fn main() -> DemoResult {
    let args = Args::parse();

    // 初始化日志
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ClientConfig::new(args.host, args.port, ClientConfig::parse_db(&args.db));
    let store: Arc<dyn StoreHandle> = Arc::new(Connection::connect(&config).await?);

    demo_keys(store.clone(), &args.prefix).await?;
    demo_list(store.clone(), &args.prefix).await?;
    demo_hash(store.clone(), &args.prefix).await?;
    demo_sets(store.clone(), &args.prefix).await?;
    demo_zset(store, &args.prefix).await?;

    info!("finished");
    Ok(())
}

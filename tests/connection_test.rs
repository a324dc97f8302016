pub mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use blue_redis::{
    ClientConfig, Connection, Error, RedisHash, RedisList, RedisSet, RedisZSet, StoreError,
    StoreHandle,
};
use serde_json::json;

use crate::common::TestServer;

async fn connect(db: i64) -> (TestServer, Arc<dyn StoreHandle>) {
    let _ = tracing_subscriber::fmt::try_init();
    let (server, addr) = TestServer::start().await;
    let config = ClientConfig::new(addr.ip().to_string(), addr.port(), db);
    let conn = Connection::connect(&config).await.unwrap();
    (server, Arc::new(conn))
}

#[tokio::test]
async fn test_select_routes_to_database() {
    let (server, store) = connect(2).await;
    let set = RedisSet::new("test_sets", store).unwrap();
    assert_eq!(set.add("111").await.unwrap(), 1);

    assert_eq!(server.database(2).scard(b"test_sets").unwrap(), 1);
    assert_eq!(server.database(0).exists(&[b"test_sets".as_slice()]), 0);
}

#[tokio::test]
async fn test_zset_scenario_over_tcp() {
    let (_server, store) = connect(0).await;
    let zset = RedisZSet::new("test_zset", store).unwrap();
    assert_eq!(zset.size().await.unwrap(), 0);

    let seed = [(100.0, "Hujia"), (80.0, "sth"), (70.0, "mfg"), (80.0, "dev")];
    assert_eq!(zset.add(&seed).await.unwrap(), 4);
    assert_eq!(zset.add(&seed).await.unwrap(), 0);
    assert_eq!(zset.add(&[(85.0, "test")]).await.unwrap(), 1);
    assert_eq!(zset.size().await.unwrap(), 5);
    assert_eq!(zset.count(80.0, 80.0).await.unwrap(), 2);
    assert_eq!(zset.score("dev").await.unwrap(), Some(80.0));
    assert_eq!(
        zset.dense_rank("sth").await.unwrap(),
        zset.dense_rank("dev").await.unwrap()
    );

    let ranked = zset.range(0, -1).await.unwrap();
    let ranks: Vec<_> = ranked.iter().map(|m| m.rank).collect();
    assert_eq!(ranks, vec![1, 2, 2, 3, 4]);
    assert_eq!(zset.rank_descending("Hujia").await.unwrap(), Some(0));
    assert_eq!(zset.count(f64::NEG_INFINITY, f64::INFINITY).await.unwrap(), 5);

    assert_eq!(zset.delete().await.unwrap(), 1);
    assert_eq!(zset.exists().await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_and_hash_over_tcp() {
    let (_server, store) = connect(0).await;

    let list: RedisList = RedisList::new("t_list", store.clone()).unwrap();
    list.push_left(&[json!(111)]).await.unwrap();
    assert_eq!(list.push_left(&[json!(1), json!({"k": [2]})]).await.unwrap(), 3);
    assert_eq!(
        list.all().await.unwrap(),
        vec![json!({"k": [2]}), json!(1), json!(111)]
    );
    assert_eq!(list.pop_right().await.unwrap(), Some(json!(111)));

    let hash: RedisHash = RedisHash::new("test_hash", store).unwrap();
    assert_eq!(hash.set("name", &json!("minieyeTest")).await.unwrap(), Some(1));
    assert_eq!(hash.set("zero", &json!(0)).await.unwrap(), None);
    assert_eq!(hash.get("zero").await.unwrap(), None);
    assert_eq!(hash.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_blocking_pop_uses_separate_link() {
    let (server, store) = connect(0).await;
    let list: RedisList<i64> = RedisList::new("jobs", store.clone()).unwrap();

    let waiter = {
        let list = list.clone();
        tokio::spawn(async move { list.blocking_pop_left(Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // 阻塞期间共享链路仍可用
    let started = Instant::now();
    assert_eq!(list.push_left(&[42]).await.unwrap(), 1);
    assert!(started.elapsed() < Duration::from_secs(1));

    assert_eq!(waiter.await.unwrap().unwrap(), Some(42));
    assert_eq!(server.accepted(), 2);
}

#[tokio::test]
async fn test_blocking_pop_times_out_over_tcp() {
    let (_server, store) = connect(0).await;
    let list: RedisList = RedisList::new("empty", store).unwrap();

    let started = Instant::now();
    let popped = list.blocking_pop_right(Duration::from_secs(1)).await.unwrap();
    let elapsed = started.elapsed();
    assert_eq!(popped, None);
    assert!(elapsed >= Duration::from_millis(900), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "returned after {:?}", elapsed);
}

#[tokio::test]
async fn test_wrong_type_is_server_error() {
    let (_server, store) = connect(0).await;
    let set = RedisSet::new("mixed", store.clone()).unwrap();
    set.add("a").await.unwrap();

    let list: RedisList = RedisList::new("mixed", store).unwrap();
    let err = list.pop_right().await.unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Server(msg)) if msg.starts_with("WRONGTYPE")));
}

#[tokio::test]
async fn test_connect_refused_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ClientConfig::new("127.0.0.1", port, 0);
    let err = Connection::connect(&config).await.err().unwrap();
    assert!(matches!(err, StoreError::Unavailable(_)));
}

//! 回环 RESP 服务端，以 `redisstore::MemoryStore` 为后端
//!
//! 只实现集合视图用到的命令，供 `Connection` 走完整的 TCP 路径

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use redis_protocol::{AsyncRespEncoder, AsyncRespParser, RespValue};
use redisstore::{MemoryStore, StoreError};
use tokio::io::split;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

#[derive(Clone, Default)]
pub struct TestServer {
    databases: Arc<Mutex<HashMap<i64, MemoryStore>>>,
    accepted: Arc<AtomicUsize>,
}

impl TestServer {
    /// 监听随机端口并在后台接受连接
    pub async fn start() -> (Self, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Self::default();
        let accept = server.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, peer)) = listener.accept().await else {
                    break;
                };
                accept.accepted.fetch_add(1, Ordering::SeqCst);
                info!("test server accepted {}", peer);
                let server = accept.clone();
                tokio::spawn(async move {
                    if let Err(e) = server.handle_client(stream).await {
                        warn!("test client {} closed: {}", peer, e);
                    }
                });
            }
        });
        (server, addr)
    }

    pub fn database(&self, db: i64) -> MemoryStore {
        self.databases.lock().entry(db).or_default().clone()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    async fn handle_client(&self, stream: TcpStream) -> Result<(), Box<dyn std::error::Error>> {
        let (reader, writer) = split(stream);
        let mut parser = AsyncRespParser::new(reader);
        let mut encoder = AsyncRespEncoder::new(writer);
        let mut db = 0;

        loop {
            let frame = parser.read_frame().await?;
            let Some(args) = arguments(frame) else {
                encoder
                    .encode(&RespValue::Error("ERR invalid command format".to_string()))
                    .await?;
                continue;
            };
            let reply = if args[0].eq_ignore_ascii_case(b"SELECT") {
                match args.get(1).and_then(|a| parse_i64(a)) {
                    Some(index) => {
                        db = index;
                        RespValue::SimpleString("OK".to_string())
                    }
                    None => RespValue::Error("ERR invalid DB index".to_string()),
                }
            } else {
                let store = self.database(db);
                match dispatch(&store, &args).await {
                    Ok(reply) => reply,
                    Err(e) => RespValue::Error(e.to_string()),
                }
            };
            encoder.encode(&reply).await?;
        }
    }
}

fn arguments(frame: RespValue) -> Option<Vec<Vec<u8>>> {
    let RespValue::Array(items) = frame else {
        return None;
    };
    let args: Vec<Vec<u8>> = items
        .into_iter()
        .map(|item| match item {
            RespValue::BulkString(bytes) => Some(bytes),
            _ => None,
        })
        .collect::<Option<_>>()?;
    (!args.is_empty()).then_some(args)
}

fn parse_i64(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

fn parse_f64(raw: &[u8]) -> Result<f64, StoreError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(StoreError::NotFloat)
}

fn int(n: impl TryInto<i64>) -> RespValue {
    RespValue::Integer(n.try_into().unwrap_or(i64::MAX))
}

fn bulk(bytes: Vec<u8>) -> RespValue {
    RespValue::BulkString(bytes)
}

fn score_text(score: f64) -> Vec<u8> {
    score.to_string().into_bytes()
}

fn arity(args: &[Vec<u8>], n: usize) -> Result<(), StoreError> {
    if args.len() < n {
        return Err(StoreError::InvalidArgument(
            "wrong number of arguments".to_string(),
        ));
    }
    Ok(())
}

fn number(raw: &[u8]) -> Result<i64, StoreError> {
    parse_i64(raw).ok_or_else(|| {
        StoreError::InvalidArgument("value is not an integer or out of range".to_string())
    })
}

async fn dispatch(store: &MemoryStore, args: &[Vec<u8>]) -> Result<RespValue, StoreError> {
    let name = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
    arity(args, 2)?;
    let key = args[1].as_slice();
    let rest = &args[2..];

    let reply = match name.as_str() {
        "DEL" => int(store.del(&[key])),
        "EXISTS" => int(store.exists(&[key])),
        "EXPIRE" => {
            arity(args, 3)?;
            int(store.expire(key, number(&rest[0])?)? as i64)
        }
        "EXPIREAT" => {
            arity(args, 3)?;
            int(store.expireat(key, number(&rest[0])?)? as i64)
        }
        "TTL" => int(store.ttl(key)),
        "PERSIST" => int(store.persist(key) as i64),
        "SADD" => int(store.sadd(key, rest.to_vec())?),
        "SREM" => {
            let members: Vec<&[u8]> = rest.iter().map(Vec::as_slice).collect();
            int(store.srem(key, &members)?)
        }
        "SMEMBERS" => RespValue::Array(store.smembers(key)?.into_iter().map(bulk).collect()),
        "SISMEMBER" => {
            arity(args, 3)?;
            int(store.sismember(key, &rest[0])? as i64)
        }
        "SCARD" => int(store.scard(key)?),
        "LPUSH" => int(store.lpush(key, rest.to_vec())?),
        "RPOP" => store.rpop(key)?.map(bulk).unwrap_or(RespValue::Null),
        "BLPOP" | "BRPOP" => {
            arity(args, 3)?;
            let seconds = parse_f64(&rest[0])?;
            let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(seconds);
            loop {
                let popped = if name == "BLPOP" {
                    store.lpop(key)?
                } else {
                    store.rpop(key)?
                };
                if let Some(value) = popped {
                    break RespValue::Array(vec![bulk(key.to_vec()), bulk(value)]);
                }
                if tokio::time::Instant::now() >= deadline {
                    break RespValue::Null;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
        "LRANGE" => {
            arity(args, 4)?;
            let items = store.lrange(key, number(&rest[0])?, number(&rest[1])?)?;
            RespValue::Array(items.into_iter().map(bulk).collect())
        }
        "LLEN" => int(store.llen(key)?),
        "HGET" => {
            arity(args, 3)?;
            store.hget(key, &rest[0])?.map(bulk).unwrap_or(RespValue::Null)
        }
        "HSET" => {
            arity(args, 4)?;
            int(store.hset(key, rest[0].clone(), rest[1].clone())? as i64)
        }
        "HDEL" => {
            let fields: Vec<&[u8]> = rest.iter().map(Vec::as_slice).collect();
            int(store.hdel(key, &fields)?)
        }
        "HGETALL" => RespValue::Array(
            store
                .hgetall(key)?
                .into_iter()
                .flat_map(|(f, v)| [bulk(f), bulk(v)])
                .collect(),
        ),
        "ZADD" => {
            let mut pairs = Vec::new();
            for chunk in rest.chunks(2) {
                let [score, member] = chunk else {
                    return Err(StoreError::InvalidArgument("syntax error".to_string()));
                };
                pairs.push((parse_f64(score)?, member.clone()));
            }
            int(store.zadd(key, pairs)?)
        }
        "ZSCORE" => {
            arity(args, 3)?;
            match store.zscore(key, &rest[0])? {
                Some(score) => bulk(score_text(score)),
                None => RespValue::Null,
            }
        }
        "ZRANK" | "ZREVRANK" => {
            arity(args, 3)?;
            match store.zrank(key, &rest[0], name == "ZREVRANK")? {
                Some(rank) => int(rank),
                None => RespValue::Null,
            }
        }
        "ZRANGE" | "ZREVRANGE" => {
            arity(args, 4)?;
            let withscores = rest
                .get(2)
                .is_some_and(|a| a.eq_ignore_ascii_case(b"WITHSCORES"));
            let pairs = store.zrange(
                key,
                number(&rest[0])?,
                number(&rest[1])?,
                name == "ZREVRANGE",
            )?;
            let mut items = Vec::new();
            for (member, score) in pairs {
                items.push(bulk(member));
                if withscores {
                    items.push(bulk(score_text(score)));
                }
            }
            RespValue::Array(items)
        }
        "ZCARD" => int(store.zcard(key)?),
        "ZCOUNT" => {
            arity(args, 4)?;
            int(store.zcount(key, parse_f64(&rest[0])?, parse_f64(&rest[1])?)?)
        }
        other => {
            return Err(StoreError::InvalidArgument(format!(
                "unknown command '{}'",
                other
            )));
        }
    };
    Ok(reply)
}

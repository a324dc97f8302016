//! 基于 RESP 的 TCP 存储句柄

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use redis_protocol::{AsyncRespEncoder, AsyncRespParser, RespValue};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf, split};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{StoreHandle, reply};
use crate::config::ClientConfig;
use crate::error::{StoreError, StoreResult};
use crate::rank::Order;

/// 阻塞命令在服务端超时之外额外等待的时间
const BLOCKING_GRACE: Duration = Duration::from_secs(2);

/// 空闲阻塞链路的保留上限
const MAX_IDLE_BLOCKING_LINKS: usize = 4;

trait Stream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Stream for T {}

type BoxStream = Box<dyn Stream>;

/// 单条链路：一次写命令，一次读回复
struct Link {
    parser: AsyncRespParser<ReadHalf<BoxStream>>,
    encoder: AsyncRespEncoder<WriteHalf<BoxStream>>,
    /// 往返未完成（出错或被取消）时为 true，此时链路上可能残留半个回复
    broken: bool,
}

impl Link {
    fn new(stream: BoxStream) -> Self {
        let (reader, writer) = split(stream);
        Self {
            parser: AsyncRespParser::new(reader),
            encoder: AsyncRespEncoder::new(writer),
            broken: false,
        }
    }

    async fn round_trip(&mut self, frame: &RespValue) -> StoreResult<RespValue> {
        self.broken = true;
        self.encoder.encode(frame).await?;
        let reply = self.parser.read_frame().await?;
        self.broken = false;
        Ok(reply)
    }
}

/// TCP 连接句柄
///
/// 普通命令在共享链路上串行收发；阻塞弹出使用独立链路，
/// 因此一个 BLPOP 不会挡住同一句柄上的其他命令
pub struct Connection {
    /// 由裸流构造时为 `None`，此时无法重连，也不支持阻塞弹出
    config: Option<ClientConfig>,
    shared: Mutex<Option<Link>>,
    idle: SyncMutex<Vec<Link>>,
}

impl Connection {
    /// 建立连接，`db != 0` 时执行 SELECT
    pub async fn connect(config: &ClientConfig) -> StoreResult<Self> {
        info!("connecting to {} ...", config.url());
        let link = Self::open_link(config).await?;
        info!("connected to {}", config.url());
        Ok(Self {
            config: Some(config.clone()),
            shared: Mutex::new(Some(link)),
            idle: SyncMutex::new(Vec::new()),
        })
    }

    /// 使用已建立的双向流（如 TLS 或测试用的内存管道）
    ///
    /// 只有一条链路，BLPOP / BRPOP 返回 `StoreError::Unsupported`
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            config: None,
            shared: Mutex::new(Some(Link::new(Box::new(stream)))),
            idle: SyncMutex::new(Vec::new()),
        }
    }

    async fn open_link(config: &ClientConfig) -> StoreResult<Link> {
        let stream = TcpStream::connect(config.address()).await?;
        stream.set_nodelay(true)?;
        let mut link = Link::new(Box::new(stream));
        if config.db != 0 {
            let frame = RespValue::command("SELECT", [config.db.to_string()]);
            reply::ok("SELECT", link.round_trip(&frame).await?)?;
        }
        Ok(link)
    }

    /// 在共享链路上执行一条命令
    async fn query(&self, frame: RespValue) -> StoreResult<RespValue> {
        let mut guard = self.shared.lock().await;
        if guard.as_ref().is_none_or(|link| link.broken) {
            let Some(config) = &self.config else {
                return Err(StoreError::Closed);
            };
            warn!("shared link to {} is unusable, reconnecting", config.url());
            *guard = None;
            *guard = Some(Self::open_link(config).await?);
        }
        let link = guard.as_mut().ok_or(StoreError::Closed)?;
        debug!(command = ?frame.command_name(), "sending command");
        link.round_trip(&frame).await
    }

    /// 在独立链路上执行阻塞命令，链路在干净的回复后放回空闲列表
    async fn query_blocking(&self, frame: RespValue, timeout: Duration) -> StoreResult<RespValue> {
        // 裸流只有一条链路，阻塞命令会挡住其他所有命令
        let Some(config) = &self.config else {
            return Err(StoreError::Unsupported(format!(
                "{} needs a connection opened with Connection::connect",
                frame.command_name().unwrap_or_default()
            )));
        };
        let pooled = self.idle.lock().pop();
        let mut link = match pooled {
            Some(link) => link,
            None => Self::open_link(config).await?,
        };

        debug!(command = ?frame.command_name(), ?timeout, "sending blocking command");
        match tokio::time::timeout(timeout + BLOCKING_GRACE, link.round_trip(&frame)).await {
            Ok(Ok(reply)) => {
                let mut idle = self.idle.lock();
                if idle.len() < MAX_IDLE_BLOCKING_LINKS {
                    idle.push(link);
                }
                Ok(reply)
            }
            Ok(Err(e)) => {
                warn!("dropping blocking link after error: {}", e);
                Err(e)
            }
            Err(_) => {
                warn!("server did not answer blocking command in time, dropping link");
                Ok(RespValue::Null)
            }
        }
    }

    async fn blocking_pop(
        &self,
        command: &'static str,
        key: &str,
        timeout: Duration,
    ) -> StoreResult<Option<(String, String)>> {
        let frame = RespValue::command(command, [key.to_string(), reply::format_timeout(timeout)]);
        reply::popped(command, self.query_blocking(frame, timeout).await?)
    }
}

fn cmd<const N: usize>(name: &str, args: [String; N]) -> RespValue {
    RespValue::command(name, args)
}

#[async_trait]
impl StoreHandle for Connection {
    async fn del(&self, key: &str) -> StoreResult<i64> {
        reply::integer("DEL", self.query(cmd("DEL", [key.into()])).await?)
    }

    async fn exists(&self, key: &str) -> StoreResult<i64> {
        reply::integer("EXISTS", self.query(cmd("EXISTS", [key.into()])).await?)
    }

    async fn expire(&self, key: &str, seconds: i64) -> StoreResult<i64> {
        let frame = cmd("EXPIRE", [key.into(), seconds.to_string()]);
        reply::integer("EXPIRE", self.query(frame).await?)
    }

    async fn expireat(&self, key: &str, timestamp: i64) -> StoreResult<i64> {
        let frame = cmd("EXPIREAT", [key.into(), timestamp.to_string()]);
        reply::integer("EXPIREAT", self.query(frame).await?)
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        reply::integer("TTL", self.query(cmd("TTL", [key.into()])).await?)
    }

    async fn persist(&self, key: &str) -> StoreResult<i64> {
        reply::integer("PERSIST", self.query(cmd("PERSIST", [key.into()])).await?)
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<i64> {
        reply::integer("SADD", self.query(cmd("SADD", [key.into(), member.into()])).await?)
    }

    async fn srem(&self, key: &str, member: &str) -> StoreResult<i64> {
        reply::integer("SREM", self.query(cmd("SREM", [key.into(), member.into()])).await?)
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        reply::strings("SMEMBERS", self.query(cmd("SMEMBERS", [key.into()])).await?)
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<i64> {
        let frame = cmd("SISMEMBER", [key.into(), member.into()]);
        reply::integer("SISMEMBER", self.query(frame).await?)
    }

    async fn scard(&self, key: &str) -> StoreResult<i64> {
        reply::integer("SCARD", self.query(cmd("SCARD", [key.into()])).await?)
    }

    async fn lpush(&self, key: &str, values: Vec<String>) -> StoreResult<i64> {
        let args = std::iter::once(key.to_string()).chain(values);
        reply::integer("LPUSH", self.query(RespValue::command("LPUSH", args)).await?)
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<String>> {
        reply::opt_string("RPOP", self.query(cmd("RPOP", [key.into()])).await?)
    }

    async fn blpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<(String, String)>> {
        self.blocking_pop("BLPOP", key, timeout).await
    }

    async fn brpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<(String, String)>> {
        self.blocking_pop("BRPOP", key, timeout).await
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let frame = cmd("LRANGE", [key.into(), start.to_string(), stop.to_string()]);
        reply::strings("LRANGE", self.query(frame).await?)
    }

    async fn llen(&self, key: &str) -> StoreResult<i64> {
        reply::integer("LLEN", self.query(cmd("LLEN", [key.into()])).await?)
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        reply::opt_string("HGET", self.query(cmd("HGET", [key.into(), field.into()])).await?)
    }

    async fn hset(&self, key: &str, field: &str, value: String) -> StoreResult<i64> {
        let frame = cmd("HSET", [key.into(), field.into(), value]);
        reply::integer("HSET", self.query(frame).await?)
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<i64> {
        reply::integer("HDEL", self.query(cmd("HDEL", [key.into(), field.into()])).await?)
    }

    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>> {
        reply::string_pairs("HGETALL", self.query(cmd("HGETALL", [key.into()])).await?)
    }

    async fn zadd(&self, key: &str, pairs: Vec<(f64, String)>) -> StoreResult<i64> {
        let mut args = Vec::with_capacity(1 + pairs.len() * 2);
        args.push(key.to_string());
        for (score, member) in pairs {
            args.push(reply::format_score(score));
            args.push(member);
        }
        reply::integer("ZADD", self.query(RespValue::command("ZADD", args)).await?)
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let frame = cmd("ZSCORE", [key.into(), member.into()]);
        reply::opt_score("ZSCORE", self.query(frame).await?)
    }

    async fn zrank(&self, key: &str, member: &str, order: Order) -> StoreResult<Option<i64>> {
        let name = match order {
            Order::Ascending => "ZRANK",
            Order::Descending => "ZREVRANK",
        };
        reply::opt_integer(name, self.query(cmd(name, [key.into(), member.into()])).await?)
    }

    async fn zrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        order: Order,
    ) -> StoreResult<Vec<String>> {
        let name = range_command(order);
        let frame = cmd(name, [key.into(), start.to_string(), stop.to_string()]);
        reply::strings(name, self.query(frame).await?)
    }

    async fn zrange_withscores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        order: Order,
    ) -> StoreResult<Vec<(String, f64)>> {
        let name = range_command(order);
        let frame = cmd(
            name,
            [key.into(), start.to_string(), stop.to_string(), "WITHSCORES".into()],
        );
        reply::scored(name, self.query(frame).await?)
    }

    async fn zcard(&self, key: &str) -> StoreResult<i64> {
        reply::integer("ZCARD", self.query(cmd("ZCARD", [key.into()])).await?)
    }

    async fn zcount(&self, key: &str, min: f64, max: f64) -> StoreResult<i64> {
        let frame = cmd(
            "ZCOUNT",
            [key.into(), reply::format_score(min), reply::format_score(max)],
        );
        reply::integer("ZCOUNT", self.query(frame).await?)
    }
}

fn range_command(order: Order) -> &'static str {
    match order {
        Order::Ascending => "ZRANGE",
        Order::Descending => "ZREVRANGE",
    }
}

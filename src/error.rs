use redis_protocol::RespError;
use thiserror::Error;

/// 顶层错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 构造参数非法（如空 key）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 存储值无法按 JSON 编解码
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// 存储句柄错误，原样传递给调用方，不做重试
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(RespError),

    /// 服务端返回的错误回复，如 WRONGTYPE
    #[error("Server error: {0}")]
    Server(String),

    #[error("Unexpected reply to {command}: {detail}")]
    UnexpectedReply { command: String, detail: String },

    #[error("Connection closed by peer")]
    Closed,

    /// 句柄无法执行该命令，如裸流连接上的阻塞弹出
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl From<RespError> for StoreError {
    fn from(e: RespError) -> Self {
        match e {
            RespError::Io(io) => StoreError::Unavailable(io),
            RespError::UnexpectedEof => StoreError::Closed,
            other => StoreError::Protocol(other),
        }
    }
}

impl From<redisstore::StoreError> for StoreError {
    fn from(e: redisstore::StoreError) -> Self {
        StoreError::Server(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

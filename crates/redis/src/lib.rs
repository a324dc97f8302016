//! Redis 协议 (RESP2) 客户端支持库
//!
//! 提供 RESP 值模型、命令帧构造以及基于 tokio 的异步编解码

mod async_encoder;
mod async_parser;

pub use async_encoder::AsyncRespEncoder;
pub use async_parser::{AsyncRespParser, DEFAULT_MAX_FRAME_SIZE};

use std::io;

/// RESP 数据类型
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// 简单字符串: +OK\r\n
    SimpleString(String),
    /// 错误: -ERR message\r\n
    Error(String),
    /// 整数: :123\r\n
    Integer(i64),
    /// 批量字符串: $5\r\nhello\r\n
    BulkString(Vec<u8>),
    /// 数组: *2\r\n$3\r\nGET\r\n$3\r\nkey\r\n
    Array(Vec<RespValue>),
    /// Null: $-1\r\n 或 *-1\r\n
    Null,
}

impl RespValue {
    /// 由命令名和参数构造请求帧（全部编码为批量字符串）
    pub fn command<I, A>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Vec<u8>>,
    {
        let mut items = vec![RespValue::BulkString(name.as_bytes().to_vec())];
        items.extend(args.into_iter().map(|a| RespValue::BulkString(a.into())));
        RespValue::Array(items)
    }

    /// 命令名（仅对请求帧有意义），用于日志
    pub fn command_name(&self) -> Option<String> {
        match self {
            RespValue::Array(items) => match items.first() {
                Some(RespValue::BulkString(name)) => {
                    Some(String::from_utf8_lossy(name).to_uppercase())
                }
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    /// 回复类型名，用于错误信息
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::SimpleString(_) => "simple-string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::BulkString(_) => "bulk-string",
            RespValue::Array(_) => "array",
            RespValue::Null => "null",
        }
    }
}

/// RESP 解析错误
#[derive(Debug, thiserror::Error)]
pub enum RespError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid RESP format: {0}")]
    InvalidFormat(String),
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Frame too large: {0} bytes (max: {1} bytes)")]
    FrameTooLarge(usize, usize),
}

//! RESP 协议异步解析器

use crate::{RespError, RespValue};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// 默认最大帧大小：512MB（与服务端 proto-max-bulk-len 一致）
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// 单个数组允许的最大元素数
const MAX_ARRAY_LEN: usize = 1024 * 1024 * 16;

/// RESP 协议异步解析器
pub struct AsyncRespParser<R: AsyncRead + Unpin> {
    reader: BufReader<R>,
    max_bytes: usize,
    /// 当前帧已读取字节数，每帧开始时清零
    frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> AsyncRespParser<R> {
    /// 创建新的异步解析器（使用默认最大帧大小）
    pub fn new(reader: R) -> Self {
        Self::with_max_bytes(reader, DEFAULT_MAX_FRAME_SIZE)
    }

    /// 创建新的异步解析器（指定最大帧大小）
    pub fn with_max_bytes(reader: R, max_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_bytes,
            frame_bytes: 0,
        }
    }

    /// 读取下一个完整的回复帧
    ///
    /// 连接在帧边界被对端关闭时返回 `UnexpectedEof`
    pub async fn read_frame(&mut self) -> Result<RespValue, RespError> {
        self.frame_bytes = 0;
        self.parse_value().await
    }

    fn account(&mut self, additional: usize) -> Result<(), RespError> {
        self.frame_bytes = self.frame_bytes.saturating_add(additional);
        if self.frame_bytes > self.max_bytes {
            Err(RespError::FrameTooLarge(self.frame_bytes, self.max_bytes))
        } else {
            Ok(())
        }
    }

    /// 读取一行（不含 CRLF）
    async fn read_line(&mut self) -> Result<String, RespError> {
        let mut line = Vec::new();
        // 单行不超过剩余帧预算，多读一个字节以便触发 FrameTooLarge
        let budget = (self.max_bytes.saturating_sub(self.frame_bytes) as u64).saturating_add(1);
        let n = (&mut self.reader)
            .take(budget)
            .read_until(b'\n', &mut line)
            .await?;
        if n == 0 {
            return Err(RespError::UnexpectedEof);
        }
        self.account(n)?;
        if !line.ends_with(b"\r\n") {
            return Err(RespError::InvalidFormat(
                "line not terminated by CRLF".to_string(),
            ));
        }
        line.truncate(line.len() - 2);
        String::from_utf8(line)
            .map_err(|_| RespError::InvalidFormat("line is not valid UTF-8".to_string()))
    }

    fn parse_len(text: &str, what: &str) -> Result<i64, RespError> {
        text.parse::<i64>()
            .map_err(|_| RespError::InvalidFormat(format!("Invalid {} length: {}", what, text)))
    }

    async fn parse_value(&mut self) -> Result<RespValue, RespError> {
        let line = self.read_line().await?;
        let mut chars = line.chars();
        let prefix = chars
            .next()
            .ok_or_else(|| RespError::InvalidFormat("Empty line".to_string()))?;
        let body = chars.as_str();

        match prefix {
            '+' => Ok(RespValue::SimpleString(body.to_string())),
            '-' => Ok(RespValue::Error(body.to_string())),
            ':' => body
                .parse::<i64>()
                .map(RespValue::Integer)
                .map_err(|_| RespError::InvalidFormat(format!("Invalid integer: {}", body))),
            '$' => {
                let len = Self::parse_len(body, "bulk string")?;
                if len == -1 {
                    return Ok(RespValue::Null);
                }
                if len < 0 {
                    return Err(RespError::InvalidFormat(format!(
                        "Invalid bulk string length: {}",
                        len
                    )));
                }
                let len = len as usize;
                self.account(len + 2)?;

                let mut buffer = vec![0u8; len + 2];
                self.reader.read_exact(&mut buffer).await?;
                if !buffer.ends_with(b"\r\n") {
                    return Err(RespError::InvalidFormat(
                        "Expected \\r\\n after bulk string".to_string(),
                    ));
                }
                buffer.truncate(len);
                Ok(RespValue::BulkString(buffer))
            }
            '*' => {
                let count = Self::parse_len(body, "array")?;
                if count == -1 {
                    return Ok(RespValue::Null);
                }
                if count < 0 {
                    return Err(RespError::InvalidFormat(format!(
                        "Invalid array length: {}",
                        count
                    )));
                }
                let count = count as usize;
                if count > MAX_ARRAY_LEN {
                    return Err(RespError::InvalidFormat(format!(
                        "Array too large: {} elements",
                        count
                    )));
                }

                let mut array = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    // 递归 future 需要装箱
                    array.push(Box::pin(self.parse_value()).await?);
                }
                Ok(RespValue::Array(array))
            }
            _ => Err(RespError::InvalidFormat(format!(
                "Unknown RESP type: {}",
                prefix
            ))),
        }
    }
}

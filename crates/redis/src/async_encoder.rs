//! RESP 协议异步编码器

use crate::RespValue;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// RESP 协议异步编码器
///
/// 每个值先完整编码到内存缓冲区，再一次性写出并 flush，
/// 保证一条命令不会与其他写入交错
pub struct AsyncRespEncoder<W: AsyncWrite + Unpin> {
    writer: BufWriter<W>,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> AsyncRespEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            buf: Vec::with_capacity(256),
        }
    }

    /// 编码 RESP 值并写入
    pub async fn encode(&mut self, value: &RespValue) -> std::io::Result<()> {
        self.buf.clear();
        encode_into(value, &mut self.buf);
        self.writer.write_all(&self.buf).await?;
        self.writer.flush().await
    }
}

/// 同步编码到缓冲区
pub(crate) fn encode_into(value: &RespValue, out: &mut Vec<u8>) {
    match value {
        RespValue::SimpleString(s) => {
            out.push(b'+');
            out.extend_from_slice(s.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        RespValue::Error(e) => {
            out.push(b'-');
            out.extend_from_slice(e.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        RespValue::Integer(i) => {
            out.extend_from_slice(format!(":{}\r\n", i).as_bytes());
        }
        RespValue::BulkString(bytes) => {
            out.extend_from_slice(format!("${}\r\n", bytes.len()).as_bytes());
            out.extend_from_slice(bytes);
            out.extend_from_slice(b"\r\n");
        }
        RespValue::Null => out.extend_from_slice(b"$-1\r\n"),
        RespValue::Array(items) => {
            out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode_into(item, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_encode_simple_string() {
        let mut writer = Vec::new();
        let mut encoder = AsyncRespEncoder::new(&mut writer);
        encoder
            .encode(&RespValue::SimpleString("OK".to_string()))
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&writer), "+OK\r\n");
    }

    #[tokio::test]
    async fn test_encode_command() {
        let mut writer = Vec::new();
        let mut encoder = AsyncRespEncoder::new(&mut writer);
        let value = RespValue::command("HGET", ["h", "name"]);
        encoder.encode(&value).await.unwrap();
        assert_eq!(
            String::from_utf8_lossy(&writer),
            "*3\r\n$4\r\nHGET\r\n$1\r\nh\r\n$4\r\nname\r\n"
        );
    }

    #[tokio::test]
    async fn test_encode_nested_array_and_null() {
        let mut writer = Vec::new();
        let mut encoder = AsyncRespEncoder::new(&mut writer);
        let value = RespValue::Array(vec![
            RespValue::Integer(-3),
            RespValue::Null,
            RespValue::Array(vec![RespValue::BulkString(b"x".to_vec())]),
        ]);
        encoder.encode(&value).await.unwrap();
        assert_eq!(
            String::from_utf8_lossy(&writer),
            "*3\r\n:-3\r\n$-1\r\n*1\r\n$1\r\nx\r\n"
        );
    }
}

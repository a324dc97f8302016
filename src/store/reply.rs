//! 回复帧到具体类型的转换

use std::time::Duration;

use redis_protocol::RespValue;

use crate::error::{StoreError, StoreResult};

fn unexpected(command: &str, detail: impl Into<String>) -> StoreError {
    StoreError::UnexpectedReply {
        command: command.to_string(),
        detail: detail.into(),
    }
}

/// 错误回复转为 `StoreError::Server`
fn checked(reply: RespValue) -> StoreResult<RespValue> {
    match reply {
        RespValue::Error(msg) => Err(StoreError::Server(msg)),
        other => Ok(other),
    }
}

fn text(command: &str, bytes: Vec<u8>) -> StoreResult<String> {
    String::from_utf8(bytes).map_err(|_| unexpected(command, "reply is not valid UTF-8"))
}

/// 分数文本转浮点，服务端用 `inf` / `-inf` 表示无穷
fn parse_score(command: &str, raw: &str) -> StoreResult<f64> {
    raw.parse::<f64>()
        .map_err(|_| unexpected(command, format!("invalid score {:?}", raw)))
}

pub(crate) fn ok(command: &str, reply: RespValue) -> StoreResult<()> {
    match checked(reply)? {
        RespValue::SimpleString(_) => Ok(()),
        other => Err(unexpected(command, format!("expected status, got {}", other.kind()))),
    }
}

pub(crate) fn integer(command: &str, reply: RespValue) -> StoreResult<i64> {
    match checked(reply)? {
        RespValue::Integer(n) => Ok(n),
        other => Err(unexpected(command, format!("expected integer, got {}", other.kind()))),
    }
}

pub(crate) fn opt_integer(command: &str, reply: RespValue) -> StoreResult<Option<i64>> {
    match checked(reply)? {
        RespValue::Null => Ok(None),
        RespValue::Integer(n) => Ok(Some(n)),
        other => Err(unexpected(command, format!("expected integer, got {}", other.kind()))),
    }
}

pub(crate) fn opt_string(command: &str, reply: RespValue) -> StoreResult<Option<String>> {
    match checked(reply)? {
        RespValue::Null => Ok(None),
        RespValue::BulkString(bytes) => text(command, bytes).map(Some),
        RespValue::SimpleString(s) => Ok(Some(s)),
        other => Err(unexpected(command, format!("expected bulk string, got {}", other.kind()))),
    }
}

pub(crate) fn opt_score(command: &str, reply: RespValue) -> StoreResult<Option<f64>> {
    match opt_string(command, reply)? {
        Some(raw) => parse_score(command, &raw).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn strings(command: &str, reply: RespValue) -> StoreResult<Vec<String>> {
    match checked(reply)? {
        RespValue::Null => Ok(Vec::new()),
        RespValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                RespValue::BulkString(bytes) => text(command, bytes),
                RespValue::SimpleString(s) => Ok(s),
                other => Err(unexpected(
                    command,
                    format!("expected bulk string element, got {}", other.kind()),
                )),
            })
            .collect(),
        other => Err(unexpected(command, format!("expected array, got {}", other.kind()))),
    }
}

/// 扁平数组 [a1, b1, a2, b2, ...] 转为二元组
pub(crate) fn string_pairs(command: &str, reply: RespValue) -> StoreResult<Vec<(String, String)>> {
    let flat = strings(command, reply)?;
    if flat.len() % 2 != 0 {
        return Err(unexpected(command, "odd number of elements in pair reply"));
    }
    let mut pairs = Vec::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
        pairs.push((a, b));
    }
    Ok(pairs)
}

pub(crate) fn scored(command: &str, reply: RespValue) -> StoreResult<Vec<(String, f64)>> {
    string_pairs(command, reply)?
        .into_iter()
        .map(|(member, raw)| -> StoreResult<(String, f64)> {
            Ok((member, parse_score(command, &raw)?))
        })
        .collect()
}

/// BLPOP / BRPOP：超时为 Null，否则为 [key, element]
pub(crate) fn popped(command: &str, reply: RespValue) -> StoreResult<Option<(String, String)>> {
    let reply = checked(reply)?;
    if reply.is_null() {
        return Ok(None);
    }
    let mut pairs = string_pairs(command, reply)?;
    if pairs.len() != 1 {
        return Err(unexpected(command, "expected [key, element]"));
    }
    Ok(pairs.pop())
}

/// 分数参数，无穷用 `+inf` / `-inf`
pub(crate) fn format_score(score: f64) -> String {
    if score == f64::INFINITY {
        "+inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        score.to_string()
    }
}

/// 阻塞超时参数，整秒时用整数形式以兼容旧版服务端
///
/// 不足一毫秒的部分向上取整，非零超时不会被写成服务端的 0（永久阻塞）
pub(crate) fn format_timeout(timeout: Duration) -> String {
    let millis = timeout.as_nanos().div_ceil(1_000_000);
    if millis % 1000 == 0 {
        (millis / 1000).to_string()
    } else {
        format!("{}.{:03}", millis / 1000, millis % 1000)
    }
}

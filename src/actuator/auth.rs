use crate::message::new_id;

/// 握手成功的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// 每个 `perform_action` 都必须携带的能力令牌
    pub token: String,
}

/// 握手被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    MissingSecret,
    BadSecret,
}

impl Refusal {
    pub fn reason(self) -> &'static str {
        match self {
            Refusal::MissingSecret => "missing secret",
            Refusal::BadSecret => "secret mismatch",
        }
    }
}

/// 校验对端出示的密钥
///
/// 空密钥视为未提供；比较耗时与内容无关
pub fn validate_secret(expected: &str, presented: Option<&str>) -> Result<Grant, Refusal> {
    let presented = match presented {
        Some(value) if !value.is_empty() => value,
        _ => return Err(Refusal::MissingSecret),
    };
    if !constant_time_eq(expected.as_bytes(), presented.as_bytes()) {
        return Err(Refusal::BadSecret);
    }
    Ok(Grant {
        token: new_id("cap"),
    })
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

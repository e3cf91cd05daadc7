use thiserror::Error;

/// Schema 错误类型
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema validation failed at `{}`: {message}", render_path(.path))]
    Validation { message: String, path: Vec<String> },
    #[error("payload is not valid JSON: {0}")]
    Malformed(String),
}

impl SchemaError {
    pub(crate) fn at(path: &[String], message: impl Into<String>) -> Self {
        SchemaError::Validation {
            message: message.into(),
            path: path.to_vec(),
        }
    }
}

/// 将路径渲染为 JSON Pointer 形式，根路径为 `/`
pub fn render_path(path: &[String]) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", path.join("/"))
    }
}

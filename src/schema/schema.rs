use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::error::SchemaError;

/// Schema 类型枚举
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SchemaKind {
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "array")]
    Array {
        items: Box<Schema>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
    },
    #[serde(rename = "object")]
    Object {
        properties: HashMap<String, Schema>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        required: Vec<String>,
        #[serde(default = "Schema::allow_additional")]
        additional: bool,
    },
    #[serde(rename = "any")]
    Any,
}

/// Schema 定义
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: SchemaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            name: None,
            kind,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    pub fn array(items: Schema) -> Self {
        Self::new(SchemaKind::Array {
            items: Box::new(items),
            min_items: None,
        })
    }

    /// 构建闭合对象：列出的字段全部必填，且不允许额外字段
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        let properties: HashMap<String, Schema> = properties
            .into_iter()
            .map(|(key, schema)| (key.into(), schema))
            .collect();
        let mut required: Vec<String> = properties.keys().cloned().collect();
        required.sort();
        Self::new(SchemaKind::Object {
            properties,
            required,
            additional: false,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 渲染为标准 JSON Schema，供 prompt 与工具声明使用
    pub fn to_json_schema(&self) -> Value {
        let mut rendered = match &self.kind {
            SchemaKind::Null => json!({ "type": "null" }),
            SchemaKind::Boolean => json!({ "type": "boolean" }),
            SchemaKind::Integer => json!({ "type": "integer" }),
            SchemaKind::Number => json!({ "type": "number" }),
            SchemaKind::String => json!({ "type": "string" }),
            SchemaKind::Array { items, min_items } => {
                let mut array = json!({ "type": "array", "items": items.to_json_schema() });
                if let Some(min) = min_items {
                    array["minItems"] = json!(min);
                }
                array
            }
            SchemaKind::Object {
                properties,
                required,
                additional,
            } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(key, schema)| (key.clone(), schema.to_json_schema()))
                    .collect();
                json!({
                    "type": "object",
                    "properties": props,
                    "required": required,
                    "additionalProperties": additional,
                })
            }
            SchemaKind::Any => json!({}),
        };
        if let Some(description) = &self.description {
            rendered["description"] = json!(description);
        }
        rendered
    }

    fn allow_additional() -> bool {
        true
    }
}

/// 节点使用的结构校验约定
///
/// 引擎只要求 schema 判断值是否合法，并在构建 prompt 时描述自身
pub trait PayloadSchema: Send + Sync {
    fn validate(&self, value: &Value) -> Result<(), SchemaError>;

    fn describe(&self) -> Value;
}

impl PayloadSchema for Schema {
    fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        super::validation::validate_value(self, value, &mut Vec::new())
    }

    fn describe(&self) -> Value {
        self.to_json_schema()
    }
}

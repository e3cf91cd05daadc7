use serde_json::Value;

use super::error::SchemaError;
use super::schema::{Schema, SchemaKind};

/// 验证值是否符合 Schema
///
/// 遇到第一个不匹配即返回，错误中带有出错位置的路径。
pub fn validate_value(
    schema: &Schema,
    value: &Value,
    path: &mut Vec<String>,
) -> std::result::Result<(), SchemaError> {
    match &schema.kind {
        SchemaKind::Null => expect(value.is_null(), "expected null", path),
        SchemaKind::Boolean => expect(value.is_boolean(), "expected boolean", path),
        SchemaKind::Integer => expect(
            value.is_i64() || value.is_u64(),
            "expected integer",
            path,
        ),
        SchemaKind::Number => expect(value.is_number(), "expected number", path),
        SchemaKind::String => expect(value.is_string(), "expected string", path),
        SchemaKind::Array { items, min_items } => {
            let array = value
                .as_array()
                .ok_or_else(|| SchemaError::at(path, "expected array"))?;
            if let Some(min) = min_items {
                if array.len() < *min {
                    return Err(SchemaError::at(
                        path,
                        format!("expected at least {min} items, found {}", array.len()),
                    ));
                }
            }
            for (idx, element) in array.iter().enumerate() {
                path.push(idx.to_string());
                validate_value(items, element, path)?;
                path.pop();
            }
            Ok(())
        }
        SchemaKind::Object {
            properties,
            required,
            additional,
        } => {
            let object = value
                .as_object()
                .ok_or_else(|| SchemaError::at(path, "expected object"))?;

            if let Some(missing) = required.iter().find(|key| !object.contains_key(*key)) {
                path.push(missing.clone());
                let err = SchemaError::at(path, format!("missing required property `{missing}`"));
                path.pop();
                return Err(err);
            }

            for (key, val) in object {
                path.push(key.clone());
                match properties.get(key) {
                    Some(sub_schema) => validate_value(sub_schema, val, path)?,
                    None if !additional => {
                        let err = SchemaError::at(path, format!("unexpected property `{key}`"));
                        path.pop();
                        return Err(err);
                    }
                    None => {}
                }
                path.pop();
            }
            Ok(())
        }
        SchemaKind::Any => Ok(()),
    }
}

fn expect(ok: bool, message: &str, path: &[String]) -> Result<(), SchemaError> {
    if ok {
        Ok(())
    } else {
        Err(SchemaError::at(path, message))
    }
}

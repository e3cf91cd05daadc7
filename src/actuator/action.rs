use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;

/// 滚轮每一格对应的像素数
pub const SCROLL_STEP_PX: f64 = 100.0;

/// 一个桌面动作，由模型请求并在通道上传输
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ComputerAction {
    /// 移动指针到 (x, y) 并左键单击
    Click { x: u32, y: u32 },
    /// 按像素距离滚动；`y` 为正向下，`x` 为正向右
    Scroll {
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
    },
    Type { text: String },
    Key { key: String },
    Screenshot,
}

impl ComputerAction {
    pub fn describe(&self) -> String {
        match self {
            ComputerAction::Click { x, y } => format!("click at ({x}, {y})"),
            ComputerAction::Scroll { x, y } => format!("scroll by ({x}, {y})"),
            ComputerAction::Type { text } => format!("type {text:?}"),
            ComputerAction::Key { key } => format!("press {key}"),
            ComputerAction::Screenshot => "screenshot".to_string(),
        }
    }

    /// 声明给模型的工具输入 JSON Schema
    pub fn tool_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["click", "scroll", "type", "key", "screenshot"],
                },
                "x": { "type": "integer", "description": "click: pointer x; scroll: horizontal pixels" },
                "y": { "type": "integer", "description": "click: pointer y; scroll: vertical pixels, positive is down" },
                "text": { "type": "string", "description": "text to type" },
                "key": { "type": "string", "description": "key to press, e.g. Enter" },
            },
            "required": ["action"],
        })
    }
}

/// 将像素滚动距离换算为滚轮格数（四舍五入）
pub fn scroll_steps(px: i32) -> i32 {
    (f64::from(px) / SCROLL_STEP_PX).round() as i32
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Success { screengrab: String },
    Error { reason: String },
}

/// 执行一个桌面动作并返回截图
///
/// 动作失败返回 `Ok(ActionOutcome::Error)`；`Err` 只用于通道本身的故障
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn perform(&self, action: &ComputerAction) -> Result<ActionOutcome>;
}

pub type DynActionExecutor = Arc<dyn ActionExecutor>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_are_tagged_by_action() {
        let action: ComputerAction =
            serde_json::from_value(json!({ "action": "scroll", "x": 0, "y": 250 })).unwrap();
        assert_eq!(action, ComputerAction::Scroll { x: 0, y: 250 });

        let shot: ComputerAction = serde_json::from_value(json!({ "action": "screenshot" })).unwrap();
        assert_eq!(shot, ComputerAction::Screenshot);

        let value = serde_json::to_value(ComputerAction::Click { x: 3, y: 4 }).unwrap();
        assert_eq!(value, json!({ "action": "click", "x": 3, "y": 4 }));
    }

    #[test]
    fn scroll_distance_rounds_to_steps() {
        assert_eq!(scroll_steps(250), 3);
        assert_eq!(scroll_steps(240), 2);
        assert_eq!(scroll_steps(-100), -1);
        assert_eq!(scroll_steps(0), 0);
    }
}

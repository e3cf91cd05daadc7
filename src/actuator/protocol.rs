use serde::{Deserialize, Serialize};

use super::action::{ActionOutcome, ComputerAction};
use crate::error::{ProbeFlowError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionResult {
    Success,
    Error,
}

/// actuator 通道上的一个 JSON 帧
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Handshake {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret: Option<String>,
    },
    HandshakeAck {
        accepted: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    PerformAction {
        #[serde(rename = "actionId")]
        action_id: String,
        token: String,
        action: ComputerAction,
    },
    ActionAck {
        #[serde(rename = "actionId")]
        action_id: String,
        token: String,
        result: ActionResult,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        screengrab: Option<String>,
        #[serde(
            rename = "errorReason",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        error_reason: Option<String>,
    },
}

impl Frame {
    pub fn accepted(token: impl Into<String>) -> Self {
        Frame::HandshakeAck {
            accepted: true,
            token: Some(token.into()),
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Frame::HandshakeAck {
            accepted: false,
            token: None,
            reason: Some(reason.into()),
        }
    }

    pub fn ack_success(action_id: String, token: String, screengrab: String) -> Self {
        Frame::ActionAck {
            action_id,
            token,
            result: ActionResult::Success,
            screengrab: Some(screengrab),
            error_reason: None,
        }
    }

    /// 失败的 ack 在能截图时仍然附带截图
    pub fn ack_error(
        action_id: String,
        token: String,
        reason: impl Into<String>,
        screengrab: Option<String>,
    ) -> Self {
        Frame::ActionAck {
            action_id,
            token,
            result: ActionResult::Error,
            screengrab,
            error_reason: Some(reason.into()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Handshake { .. } => "handshake",
            Frame::HandshakeAck { .. } => "handshake_ack",
            Frame::PerformAction { .. } => "perform_action",
            Frame::ActionAck { .. } => "action_ack",
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ProbeFlowError::Protocol(format!("undecodable frame: {e}")))
    }

    /// 将 `action_ack` 转换为交给模型的结果
    pub fn into_outcome(self) -> Result<ActionOutcome> {
        match self {
            Frame::ActionAck {
                result: ActionResult::Success,
                screengrab: Some(screengrab),
                ..
            } => Ok(ActionOutcome::Success { screengrab }),
            Frame::ActionAck {
                result: ActionResult::Success,
                screengrab: None,
                action_id,
                ..
            } => Err(ProbeFlowError::Protocol(format!(
                "success ack for `{action_id}` carries no screenshot"
            ))),
            Frame::ActionAck {
                result: ActionResult::Error,
                error_reason,
                ..
            } => Ok(ActionOutcome::Error {
                reason: error_reason.unwrap_or_else(|| "action failed".to_string()),
            }),
            other => Err(ProbeFlowError::Protocol(format!(
                "expected action_ack, got {}",
                other.kind()
            ))),
        }
    }
}

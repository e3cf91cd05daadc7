use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::action::{ActionExecutor, ActionOutcome, ComputerAction};
use super::protocol::Frame;
use crate::error::{ProbeFlowError, Result};
use crate::message::new_id;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Channel {
    socket: Socket,
    token: String,
}

/// actuator 通道的客户端
///
/// 第一次执行动作时才建立连接，同一时间只有一个请求在途。
/// 任何出错的连接都会被丢弃，下一个动作重新连接。
pub struct RemoteActuator {
    url: String,
    secret: String,
    channel: Mutex<Option<Channel>>,
}

impl RemoteActuator {
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret: secret.into(),
            channel: Mutex::new(None),
        }
    }

    /// 立即连接并完成认证，密钥错误会在这里直接暴露
    pub async fn connect(url: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        let actuator = Self::new(url, secret);
        let channel = actuator.open().await?;
        *actuator.channel.lock().await = Some(channel);
        Ok(actuator)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn open(&self) -> Result<Channel> {
        let (mut socket, _) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        let hello = Frame::Handshake {
            secret: Some(self.secret.clone()),
        };
        socket.send(WsMessage::Text(hello.encode()?.into())).await?;

        match next_frame(&mut socket).await? {
            Frame::HandshakeAck {
                accepted: true,
                token: Some(token),
                ..
            } => {
                info!(url = %self.url, "connected to actuator");
                Ok(Channel { socket, token })
            }
            Frame::HandshakeAck { reason, .. } => Err(ProbeFlowError::AuthRejected(
                reason.unwrap_or_else(|| "no reason given".to_string()),
            )),
            other => Err(ProbeFlowError::Protocol(format!(
                "expected handshake_ack, got {}",
                other.kind()
            ))),
        }
    }

    async fn round_trip(channel: &mut Channel, action: &ComputerAction) -> Result<ActionOutcome> {
        let action_id = new_id("act");
        let request = Frame::PerformAction {
            action_id: action_id.clone(),
            token: channel.token.clone(),
            action: action.clone(),
        };
        channel
            .socket
            .send(WsMessage::Text(request.encode()?.into()))
            .await?;

        loop {
            let frame = next_frame(&mut channel.socket).await?;
            let acked = match &frame {
                Frame::ActionAck { action_id, .. } => action_id.clone(),
                other => {
                    return Err(ProbeFlowError::Protocol(format!(
                        "expected action_ack, got {}",
                        other.kind()
                    )))
                }
            };
            if acked == action_id {
                return frame.into_outcome();
            }
            warn!(expected = %action_id, got = %acked, "discarding stale ack");
        }
    }
}

#[async_trait]
impl ActionExecutor for RemoteActuator {
    async fn perform(&self, action: &ComputerAction) -> Result<ActionOutcome> {
        let mut slot = self.channel.lock().await;
        if slot.is_none() {
            *slot = Some(self.open().await?);
        }
        let Some(channel) = slot.as_mut() else {
            return Err(ProbeFlowError::Actuator("channel not open".to_string()));
        };

        debug!(action = %action.describe(), "sending action");
        let outcome = Self::round_trip(channel, action).await;
        if let Err(err) = &outcome {
            warn!(error = %err, "dropping actuator channel");
            *slot = None;
        }
        outcome
    }
}

/// 读取下一个数据帧，顺带回应 ping
async fn next_frame(socket: &mut Socket) -> Result<Frame> {
    while let Some(message) = socket.next().await {
        match message? {
            WsMessage::Text(text) => return Frame::decode(&text),
            WsMessage::Ping(data) => socket.send(WsMessage::Pong(data)).await?,
            WsMessage::Close(_) => break,
            _ => {}
        }
    }
    Err(ProbeFlowError::Actuator("actuator closed the channel".to_string()))
}

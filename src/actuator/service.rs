use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use super::action::{scroll_steps, ActionExecutor, ActionOutcome, ComputerAction};
use super::auth::validate_secret;
use super::desktop::Desktop;
use super::protocol::Frame;
use crate::error::{ProbeFlowError, Result};
use crate::screenshot::ScreenshotCodec;

/// 一次本地动作的产出：可能的失败原因与随后的截图
#[derive(Debug)]
struct Performed {
    error: Option<String>,
    screengrab: Option<String>,
}

/// actuator 通道的服务端
///
/// 同一时间只在桌面上执行一个动作，执行后总是重新截图
pub struct ActionService {
    secret: String,
    desktop: Arc<dyn Desktop>,
    codec: Arc<ScreenshotCodec>,
    busy: tokio::sync::Mutex<()>,
}

impl ActionService {
    pub fn new(
        secret: impl Into<String>,
        desktop: Arc<dyn Desktop>,
        codec: ScreenshotCodec,
    ) -> Self {
        Self {
            secret: secret.into(),
            desktop,
            codec: Arc::new(codec),
            busy: tokio::sync::Mutex::new(()),
        }
    }

    /// 持续接受连接，直到监听失败
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        info!(addr = ?listener.local_addr().ok(), "actuator listening");
        loop {
            let (stream, peer) = listener.accept().await?;
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => {
                        if let Err(e) = service.serve_connection(ws).await {
                            warn!(peer = %peer, error = %e, "actuator connection ended with error");
                        }
                    }
                    Err(e) => warn!(peer = %peer, error = %e, "websocket upgrade failed"),
                }
            });
        }
    }

    /// 先完成握手，再按顺序应答 `perform_action` 帧
    pub async fn serve_connection<S>(&self, mut ws: WebSocketStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut token: Option<String> = None;

        while let Some(message) = ws.next().await {
            let text = match message? {
                WsMessage::Text(text) => text,
                WsMessage::Ping(data) => {
                    ws.send(WsMessage::Pong(data)).await?;
                    continue;
                }
                WsMessage::Close(_) => break,
                _ => continue,
            };

            let frame = match Frame::decode(&text) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "dropping undecodable frame");
                    continue;
                }
            };

            let reply = match frame {
                Frame::Handshake { secret } if token.is_none() => {
                    match validate_secret(&self.secret, secret.as_deref()) {
                        Ok(grant) => {
                            info!("actuator handshake accepted");
                            token = Some(grant.token.clone());
                            Frame::accepted(grant.token)
                        }
                        Err(refusal) => {
                            warn!(reason = refusal.reason(), "actuator handshake rejected");
                            reject(&mut ws, refusal.reason()).await?;
                            return Ok(());
                        }
                    }
                }
                other if token.is_none() => {
                    warn!(frame = other.kind(), "frame before handshake");
                    reject(&mut ws, "handshake required").await?;
                    return Ok(());
                }
                Frame::PerformAction {
                    action_id,
                    token: presented,
                    action,
                } => {
                    if token.as_deref() != Some(presented.as_str()) {
                        warn!(action_id = %action_id, "action with invalid capability token");
                        Frame::ack_error(action_id, presented, "invalid capability token", None)
                    } else {
                        let performed = self.perform_locally(&action).await;
                        match (performed.error, performed.screengrab) {
                            (None, Some(shot)) => Frame::ack_success(action_id, presented, shot),
                            (None, None) => {
                                Frame::ack_error(action_id, presented, "no screenshot", None)
                            }
                            (Some(reason), shot) => {
                                Frame::ack_error(action_id, presented, reason, shot)
                            }
                        }
                    }
                }
                other => {
                    warn!(frame = other.kind(), "unexpected frame ignored");
                    continue;
                }
            };

            ws.send(WsMessage::Text(reply.encode()?.into())).await?;
        }
        debug!("actuator connection closed");
        Ok(())
    }

    async fn perform_locally(&self, action: &ComputerAction) -> Performed {
        let _guard = self.busy.lock().await;
        let desktop = Arc::clone(&self.desktop);
        let codec = Arc::clone(&self.codec);
        let action = action.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let applied = apply(desktop.as_ref(), &action);
            let shot = desktop
                .capture()
                .and_then(|capture| codec.encode(&capture));
            (action, applied, shot)
        })
        .await;

        let (action, applied, shot) = match joined {
            Ok(parts) => parts,
            Err(e) => {
                error!(error = %e, "desktop task panicked");
                return Performed {
                    error: Some(format!("desktop task failed: {e}")),
                    screengrab: None,
                };
            }
        };

        let mut error = applied.err().map(|e| e.to_string());
        let screengrab = match shot {
            Ok(encoded) => {
                debug!(action = %action.describe(), bytes = encoded.bytes, quality = encoded.quality, "action performed");
                Some(encoded.base64)
            }
            Err(e) => {
                warn!(error = %e, "screenshot failed");
                if error.is_none() {
                    error = Some(format!("screenshot failed: {e}"));
                }
                None
            }
        };
        Performed { error, screengrab }
    }
}

async fn reject<S>(ws: &mut WebSocketStream<S>, reason: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    ws.send(WsMessage::Text(Frame::rejected(reason).encode()?.into()))
        .await?;
    ws.close(None).await?;
    Ok(())
}

fn apply(desktop: &dyn Desktop, action: &ComputerAction) -> Result<()> {
    match action {
        ComputerAction::Click { x, y } => desktop.click(*x, *y),
        ComputerAction::Scroll { x, y } => desktop.scroll(scroll_steps(*x), scroll_steps(*y)),
        ComputerAction::Type { text } => desktop.type_text(text),
        ComputerAction::Key { key } => desktop.press_key(key),
        ComputerAction::Screenshot => Ok(()),
    }
}

/// 进程内执行，不经过通道
#[async_trait]
impl ActionExecutor for ActionService {
    async fn perform(&self, action: &ComputerAction) -> Result<ActionOutcome> {
        let performed = self.perform_locally(action).await;
        match (performed.error, performed.screengrab) {
            (None, Some(screengrab)) => Ok(ActionOutcome::Success { screengrab }),
            (Some(reason), _) => Ok(ActionOutcome::Error { reason }),
            (None, None) => Err(ProbeFlowError::Actuator("no screenshot produced".to_string())),
        }
    }
}

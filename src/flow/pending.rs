use tokio::sync::oneshot;

use crate::error::{ProbeFlowError, Result};

/// 节点 `run()` 唯一的待完成结果
///
/// 节点离开 `idle` 时建立，只会完成一次：要么是最终结果，要么是导致失败的错误
pub struct PendingCompletion<T> {
    slot: Option<oneshot::Sender<Result<T>>>,
}

impl<T> Default for PendingCompletion<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> PendingCompletion<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self) -> oneshot::Receiver<Result<T>> {
        debug_assert!(self.slot.is_none(), "completion armed twice");
        let (tx, rx) = oneshot::channel();
        self.slot = Some(tx);
        rx
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    /// 没有等待者时返回 `false`
    pub fn finalize(&mut self, value: T) -> bool {
        self.settle(Ok(value))
    }

    pub fn abort(&mut self, err: ProbeFlowError) -> bool {
        self.settle(Err(err))
    }

    fn settle(&mut self, outcome: Result<T>) -> bool {
        match self.slot.take() {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

/// 等待 [`PendingCompletion::arm`] 返回的接收端
pub async fn settled<T>(rx: oneshot::Receiver<Result<T>>, node: &str) -> Result<T> {
    rx.await
        .map_err(|_| ProbeFlowError::NodeAborted(node.to_string()))?
}

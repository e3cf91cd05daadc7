use serde::{Deserialize, Serialize};

use crate::actuator::ComputerAction;

/// 探索过程中到达的一个界面状态
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowGraphNode {
    pub id: usize,
    /// 到达此状态的动作描述
    pub entry_action: String,
    pub action: ComputerAction,
    /// 此状态的 base64 截图，按时间先后排列
    pub screenshots: Vec<String>,
    /// 从此状态出发到达的状态 id
    pub edges: Vec<usize>,
}

/// 计算机操作过程中发现的状态有向图
///
/// 每个动作增长一次；外观相同的状态不合并，也不检查环。
/// 当前状态随图一起序列化，恢复后的图可以继续记录。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowGraphNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current: Option<usize>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功动作的结果
    ///
    /// 纯截图动作把截图追加到当前状态；其他动作创建新状态并从当前状态连边
    pub fn record(&mut self, action: &ComputerAction, screenshot: String) -> usize {
        if let (ComputerAction::Screenshot, Some(current)) = (action, self.current) {
            self.nodes[current].screenshots.push(screenshot);
            return current;
        }

        let id = self.nodes.len();
        if let Some(current) = self.current {
            self.nodes[current].edges.push(id);
        }
        self.nodes.push(FlowGraphNode {
            id,
            entry_action: action.describe(),
            action: action.clone(),
            screenshots: vec![screenshot],
            edges: Vec::new(),
        });
        self.current = Some(id);
        id
    }

    pub fn root(&self) -> Option<&FlowGraphNode> {
        self.nodes.first()
    }

    pub fn current(&self) -> Option<&FlowGraphNode> {
        self.current.and_then(|id| self.nodes.get(id))
    }

    pub fn node(&self, id: usize) -> Option<&FlowGraphNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

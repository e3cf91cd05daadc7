pub mod announce;
pub mod computer_use;
pub mod constants;
pub mod gathering;
pub mod graph;
pub mod node;
pub mod pending;
pub mod prompt;

pub use announce::AnnouncementNode;
pub use computer_use::ComputerUseNode;
pub use gathering::{
    AssetGenerationNode, Assets, Collection, ContextGatheringNode, Contexts, GatheringNode,
};
pub use graph::{FlowGraph, FlowGraphNode};
pub use node::{NodeMeta, NodeState, WorkflowNode};
pub use pending::PendingCompletion;
pub use prompt::PromptBuilder;

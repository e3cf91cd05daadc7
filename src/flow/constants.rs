/// 流程相关的常量定义
///
/// 统一管理 prompt 模板与工具名称等字符串常量

/// 计算机操作工具
pub mod computer {
    /// 模型调用桌面动作时使用的工具名
    pub const TOOL_NAME: &str = "computer";

    /// 默认的最大模型轮数
    pub const DEFAULT_ITERATION_CAP: u32 = 20;
}

/// 指令块模板常量
pub mod prompt {
    pub const PAYLOAD_TEMPLATE: &str = "When you have structured results, send them in a `{tag}` block whose content is a JSON string matching this schema: {schema}. You may send several such blocks over the conversation; each one is added to what was already collected.";

    pub const ASK_USER: &str =
        "Use an `output_to_user` block for anything the user should read or answer.";

    pub const STOP_TEMPLATE: &str = "When this step is complete, send a `workflow_instruction` block whose content is exactly {\"stop\": true, \"stopReason\": \"<why>\"} as the last block of your reply.";

    pub const COMPUTER_TEMPLATE: &str = "Explore the product through the `{tool}` tool. Each call performs one desktop action and returns a fresh screenshot. Use at most one tool call per reply.";
}

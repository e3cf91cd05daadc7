use serde_json::Value;

use crate::flow::constants::prompt as prompt_consts;
use crate::message::ContentBlock;

/// Prompt 构建服务
///
/// 生成节点在 `run()` 时追加到日志中的指令块
pub struct PromptBuilder;

impl PromptBuilder {
    /// 信息收集类节点的指令
    ///
    /// 依次包含：阶段 prompt、数据块格式说明、提问方式、停止条件编码
    pub fn gathering(prompt: &str, tag: &str, envelope: &Value) -> Vec<ContentBlock> {
        let payload = prompt_consts::PAYLOAD_TEMPLATE
            .replace("{tag}", tag)
            .replace("{schema}", &envelope.to_string());
        let mut blocks = Self::stage_prompt(prompt);
        blocks.push(ContentBlock::instruction(payload));
        blocks.push(ContentBlock::instruction(prompt_consts::ASK_USER));
        blocks.push(ContentBlock::instruction(prompt_consts::STOP_TEMPLATE));
        blocks
    }

    /// 计算机操作节点的指令
    pub fn computer_use(prompt: &str, tool_name: &str) -> Vec<ContentBlock> {
        let mut blocks = Self::stage_prompt(prompt);
        blocks.push(ContentBlock::instruction(
            prompt_consts::COMPUTER_TEMPLATE.replace("{tool}", tool_name),
        ));
        blocks.push(ContentBlock::instruction(prompt_consts::STOP_TEMPLATE));
        blocks
    }

    fn stage_prompt(prompt: &str) -> Vec<ContentBlock> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![ContentBlock::instruction(trimmed)]
        }
    }
}

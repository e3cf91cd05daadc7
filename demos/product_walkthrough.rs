//! 产品探索 agent 示例
//!
//! 使用脚本化模型与进程内的无头桌面，演示完整的阶段序列：
//! 开场白 -> 目标 -> 产品信息 -> 指标 -> 界面探索

use std::sync::Arc;

use probeflow::utils::LoggingConfig;
use probeflow::{
    product_agent, ActionService, ContentBlock, EngineConfig, HeadlessDesktop, Message,
    RecordingSink, ScreenshotCodec, ScriptedModelClient,
};
use serde_json::json;

fn computer(id: &str, input: serde_json::Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: "computer".to_string(),
        input,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    // 加载配置，模型与 actuator 在本示例中由本地替身代替
    let config = EngineConfig::from_path("configs/probeflow.json")?;

    let model = ScriptedModelClient::with_replies([
        Message::assistant(vec![ContentBlock::output(
            "What would you like to learn about your product?",
        )]),
        Message::assistant(vec![
            ContentBlock::context_payload(&json!({
                "contexts": [{ "description": "find out why trial users do not convert" }]
            }))?,
            ContentBlock::stop("objective captured"),
        ]),
        Message::assistant(vec![
            ContentBlock::context_payload(&json!({
                "contexts": [
                    { "description": "project management tool for small agencies" },
                    { "description": "14 day free trial, card required at the end" }
                ]
            }))?,
            ContentBlock::stop("enough product context"),
        ]),
        Message::assistant(vec![
            ContentBlock::asset_payload(&json!({
                "assets": [
                    { "name": "trial_conversion", "description": "share of trials that become paid" },
                    { "name": "first_project", "description": "trials creating a project on day one" }
                ]
            }))?,
            ContentBlock::stop("metrics agreed"),
        ]),
        Message::assistant(vec![computer("t1", json!({ "action": "screenshot" }))]),
        Message::assistant(vec![computer("t2", json!({ "action": "click", "x": 640, "y": 400 }))]),
        Message::assistant(vec![computer("t3", json!({ "action": "scroll", "x": 0, "y": 400 }))]),
        Message::assistant(vec![ContentBlock::stop("main flows visited")]),
    ]);

    let desktop = Arc::new(HeadlessDesktop::default());
    let executor = Arc::new(ActionService::new(
        "local",
        desktop.clone(),
        ScreenshotCodec::new(config.codec.clone()),
    ));
    let sink = Arc::new(RecordingSink::default());

    let agent = Arc::new(product_agent(
        &config,
        Arc::new(model.clone()),
        executor,
        sink.clone(),
    ));
    agent.on_output(|text| println!("agent> {text}"));

    let run = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.run_agent_workflow().await })
    };

    // 等待 agent 提问后回答
    while agent.active_stage().as_deref() != Some("objective")
        || agent.stage_state("objective") != Some(probeflow::NodeState::WaitingOnUser)
    {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    println!("user> Why do so few trials convert?");
    agent.ingest_user_input("Why do so few trials convert?").await;

    run.await??;

    println!("\nObjectives:");
    for objective in sink.objectives.lock().iter() {
        println!("  - {}", objective.description);
    }
    println!("Product facts:");
    for fact in sink.product_facts.lock().iter() {
        println!("  - {}", fact.description);
    }
    println!("Metrics:");
    for metric in sink.metrics.lock().iter() {
        println!("  - {}: {}", metric.name, metric.description);
    }
    if let Some(graph) = sink.exploration.lock().as_ref() {
        println!("Exploration: {} states", graph.len());
        for node in &graph.nodes {
            println!(
                "  [{}] {} ({} screenshots) -> {:?}",
                node.id,
                node.entry_action,
                node.screenshots.len(),
                node.edges
            );
        }
    }
    println!("Desktop events: {:?}", desktop.events());
    println!("Model calls: {}", model.calls());
    Ok(())
}

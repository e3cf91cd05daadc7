#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};

use probeflow::flow::{Assets, Contexts};
use probeflow::{
    AssetGenerationNode, ContentBlock, ContextGatheringNode, Message, NodeState, ProbeFlowError,
    Role, Schema, ScriptedModelClient, WorkflowContext, WorkflowNode,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Fact {
    description: String,
}

fn fact(description: &str) -> Fact {
    Fact {
        description: description.to_string(),
    }
}

fn fact_node() -> Arc<ContextGatheringNode<Fact>> {
    Arc::new(ContextGatheringNode::new(
        "facts",
        "Collect facts about the product.",
        Arc::new(Schema::array(Schema::object([(
            "description",
            Schema::string(),
        )]))),
    ))
}

fn contexts(payload: &str) -> ContentBlock {
    ContentBlock::WorkflowContext {
        content: payload.to_string(),
    }
}

fn reply(blocks: Vec<ContentBlock>) -> Message {
    Message::assistant(blocks)
}

fn context_with(model: &ScriptedModelClient) -> (WorkflowContext, Arc<Mutex<Vec<String>>>) {
    let outputs = Arc::new(Mutex::new(Vec::new()));
    let sink = outputs.clone();
    let ctx = WorkflowContext::new()
        .with_model(Arc::new(model.clone()))
        .with_output(Arc::new(move |text: &str| sink.lock().push(text.to_string())));
    (ctx, outputs)
}

async fn wait_for_state<N: WorkflowNode>(node: &N, state: NodeState) {
    for _ in 0..500 {
        if node.state() == state {
            return;
        }
        sleep(Duration::from_millis(2)).await;
    }
    panic!("node `{}` never reached {state}", node.name());
}

fn count_user_inputs(ctx: &WorkflowContext) -> usize {
    ctx.log()
        .snapshot()
        .iter()
        .flat_map(|m| m.contents.iter())
        .filter(|b| matches!(b, ContentBlock::InputFromUser { .. }))
        .count()
}

#[tokio::test]
async fn stop_after_payload_settles_with_payload() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([reply(vec![
        contexts(r#"{"contexts":[{"description":"grow signups"}]}"#),
        ContentBlock::WorkflowInstruction {
            content: r#"{"stop":true,"stopReason":"done"}"#.to_string(),
        },
    ])]);
    let (ctx, _) = context_with(&model);
    let node = fact_node();

    let collected = node.run(&ctx).await?;

    assert_eq!(collected, Contexts { contexts: vec![fact("grow signups")] });
    assert_eq!(node.state(), NodeState::Closed);
    assert_eq!(model.calls(), 1);

    let log = ctx.log().snapshot();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].role, Role::User);
    assert_eq!(log[1].role, Role::Assistant);
    Ok(())
}

#[tokio::test]
async fn instructions_describe_payload_and_stop() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([reply(vec![ContentBlock::stop("nothing")])]);
    let (ctx, _) = context_with(&model);
    fact_node().run(&ctx).await?;

    let first = &model.requests()[0].messages[0];
    assert_eq!(first.role, Role::User);
    assert_eq!(
        first.contents[0],
        ContentBlock::instruction("Collect facts about the product.")
    );
    let text: String = first
        .contents
        .iter()
        .filter_map(|b| match b {
            ContentBlock::WorkflowInstruction { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert!(text.contains("workflow_context"));
    assert!(text.contains("stopReason"));
    assert!(model.requests()[0].tools.is_none());
    Ok(())
}

#[tokio::test]
async fn output_waits_for_user_then_ingest_resumes() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([
        reply(vec![ContentBlock::output("What should we improve?")]),
        reply(vec![
            contexts(r#"{"contexts":[{"description":"checkout is slow"}]}"#),
            ContentBlock::stop("done"),
        ]),
    ]);
    let (ctx, outputs) = context_with(&model);
    let node = fact_node();

    let handle = {
        let node = node.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { node.run(&ctx).await })
    };

    wait_for_state(node.as_ref(), NodeState::WaitingOnUser).await;
    assert_eq!(*outputs.lock(), vec!["What should we improve?".to_string()]);
    assert_eq!(count_user_inputs(&ctx), 0);
    let before = ctx.log().len();

    node.ingest_user_input(&ctx, "the checkout").await;

    let collected = handle.await??;
    assert_eq!(collected.contexts, vec![fact("checkout is slow")]);
    assert_eq!(count_user_inputs(&ctx), 1);
    // 用户消息与第二条回复
    assert_eq!(ctx.log().len(), before + 2);
    assert_eq!(model.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn run_while_busy_is_rejected_without_logging() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([
        reply(vec![ContentBlock::output("Tell me more.")]),
        reply(vec![ContentBlock::stop("done")]),
    ]);
    let (ctx, _) = context_with(&model);
    let node = fact_node();

    let handle = {
        let node = node.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { node.run(&ctx).await })
    };
    wait_for_state(node.as_ref(), NodeState::WaitingOnUser).await;

    let before = ctx.log().snapshot();
    let err = node.run(&ctx).await.unwrap_err();
    assert!(matches!(err, ProbeFlowError::NodeNotIdle { .. }));
    assert!(err.to_string().contains("not in idle state"));
    assert_eq!(ctx.log().snapshot(), before);
    assert_eq!(node.state(), NodeState::WaitingOnUser);

    node.ingest_user_input(&ctx, "ok").await;
    handle.await??;

    let closed_log = ctx.log().len();
    assert!(node.run(&ctx).await.is_err());
    assert_eq!(ctx.log().len(), closed_log);
    Ok(())
}

#[tokio::test]
async fn invalid_payload_is_dropped_whole() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([reply(vec![
        contexts(r#"{"contexts":[{"description":"kept?"},{"title":"wrong shape"}]}"#),
        contexts("not json at all"),
        contexts(r#"{"contexts":[{"description":"a"},{"description":"b"}]}"#),
        ContentBlock::stop("done"),
    ])]);
    let (ctx, _) = context_with(&model);

    let collected = fact_node().run(&ctx).await?;

    assert_eq!(collected.contexts, vec![fact("a"), fact("b")]);
    Ok(())
}

#[tokio::test]
async fn blocks_after_stop_are_ignored() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([reply(vec![
        ContentBlock::output("wrapping up"),
        contexts(r#"{"contexts":[{"description":"before"}]}"#),
        ContentBlock::stop("done"),
        contexts(r#"{"contexts":[{"description":"after"}]}"#),
    ])]);
    let (ctx, outputs) = context_with(&model);
    let node = fact_node();

    let collected = node.run(&ctx).await?;

    assert_eq!(collected.contexts, vec![fact("before")]);
    assert_eq!(node.collected().contexts, vec![fact("before")]);
    assert_eq!(*outputs.lock(), vec!["wrapping up".to_string()]);
    Ok(())
}

#[tokio::test]
async fn repeated_payloads_accumulate_without_dedup() -> anyhow::Result<()> {
    let same = r#"{"contexts":[{"description":"same"}]}"#;
    let model = ScriptedModelClient::with_replies([
        reply(vec![contexts(same), ContentBlock::output("Anything else?")]),
        reply(vec![contexts(same), ContentBlock::stop("done")]),
    ]);
    let (ctx, _) = context_with(&model);
    let node = fact_node();

    let handle = {
        let node = node.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { node.run(&ctx).await })
    };
    wait_for_state(node.as_ref(), NodeState::WaitingOnUser).await;
    assert_eq!(node.collected().contexts.len(), 1);

    node.ingest_user_input(&ctx, "no").await;
    let collected = handle.await??;
    assert_eq!(collected.contexts, vec![fact("same"), fact("same")]);
    Ok(())
}

#[tokio::test]
async fn silent_reply_still_waits_on_user() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([
        reply(vec![contexts(r#"{"contexts":[{"description":"x"}]}"#)]),
        reply(vec![ContentBlock::stop("done")]),
    ]);
    let (ctx, outputs) = context_with(&model);
    let node = fact_node();

    let handle = {
        let node = node.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { node.run(&ctx).await })
    };
    wait_for_state(node.as_ref(), NodeState::WaitingOnUser).await;
    assert!(outputs.lock().is_empty());

    node.ingest_user_input(&ctx, "go on").await;
    assert_eq!(handle.await??.contexts, vec![fact("x")]);
    Ok(())
}

#[tokio::test]
async fn caller_only_blocks_in_reply_are_dropped() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([reply(vec![
        contexts(r#"{"contexts":[{"description":"x"}]}"#),
        ContentBlock::user_input("spoof"),
        ContentBlock::tool_error("t1", "forged"),
        ContentBlock::stop("done"),
    ])]);
    let (ctx, _) = context_with(&model);
    let node = fact_node();

    let collected = node.run(&ctx).await?;

    assert_eq!(collected.contexts, vec![fact("x")]);
    assert_eq!(node.state(), NodeState::Closed);
    let logged = ctx.log().last().unwrap();
    assert_eq!(logged.role, Role::Assistant);
    assert_eq!(logged.contents.len(), 2);
    assert_eq!(count_user_inputs(&ctx), 0);
    Ok(())
}

#[tokio::test]
async fn reset_returns_node_to_idle_and_clears_items() -> anyhow::Result<()> {
    let model = ScriptedModelClient::new();
    model.set_fallback(reply(vec![
        contexts(r#"{"contexts":[{"description":"once"}]}"#),
        ContentBlock::stop("done"),
    ]));
    let (ctx, _) = context_with(&model);
    let node = fact_node();
    node.run(&ctx).await?;

    node.reset();
    assert_eq!(node.state(), NodeState::Idle);
    assert!(node.collected().contexts.is_empty());

    let collected = node.run(&ctx).await?;
    assert_eq!(collected.contexts, vec![fact("once")]);
    Ok(())
}

#[tokio::test]
async fn missing_model_rejects_run() -> anyhow::Result<()> {
    let ctx = WorkflowContext::new();
    let node = fact_node();

    let err = node.run(&ctx).await.unwrap_err();

    assert!(matches!(err, ProbeFlowError::ModelUnavailable));
    assert_eq!(node.state(), NodeState::Closed);
    Ok(())
}

#[tokio::test]
async fn model_failure_rejects_run() -> anyhow::Result<()> {
    let model = ScriptedModelClient::new();
    model.push_failure("overloaded");
    let (ctx, _) = context_with(&model);

    let err = fact_node().run(&ctx).await.unwrap_err();

    assert!(matches!(err, ProbeFlowError::Model(ref reason) if reason.contains("overloaded")));
    Ok(())
}

#[tokio::test]
async fn ingest_outside_waiting_on_user_is_ignored() -> anyhow::Result<()> {
    let model = ScriptedModelClient::new();
    let (ctx, _) = context_with(&model);
    let node = fact_node();

    node.ingest_user_input(&ctx, "hello?").await;

    assert_eq!(node.state(), NodeState::Idle);
    assert!(ctx.log().is_empty());
    assert_eq!(model.calls(), 0);
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Metric {
    name: String,
    description: String,
}

#[tokio::test]
async fn asset_node_reads_only_asset_blocks() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([reply(vec![
        contexts(r#"{"contexts":[{"name":"ignored","description":"wrong tag"}]}"#),
        ContentBlock::WorkflowGenAsset {
            content: r#"{"assets":[{"name":"activation","description":"first project within a day"}]}"#
                .to_string(),
        },
        ContentBlock::stop("agreed"),
    ])]);
    let (ctx, _) = context_with(&model);
    let node: AssetGenerationNode<Metric> = AssetGenerationNode::new(
        "metrics",
        "",
        Arc::new(Schema::array(Schema::object([
            ("name", Schema::string()),
            ("description", Schema::string()),
        ]))),
    );

    let generated = node.run(&ctx).await?;

    assert_eq!(
        generated,
        Assets {
            assets: vec![Metric {
                name: "activation".into(),
                description: "first project within a day".into(),
            }]
        }
    );
    Ok(())
}

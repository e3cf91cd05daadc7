#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tokio::time::{sleep, Duration};

use probeflow::actuator::DesktopEvent;
use probeflow::persona::{
    Metric, Objective, ProductFact, EXPLORATION_STAGE, INTRO_STAGE, METRICS_STAGE,
    OBJECTIVE_STAGE, PRODUCT_FACTS_STAGE,
};
use probeflow::{
    product_agent, ActionService, Agent, AnnouncementNode, ContentBlock, ContextGatheringNode,
    EngineConfig, HeadlessDesktop, Message, NodeState, ProbeFlowError, RecordingSink, Schema,
    ScreenshotCodec, ScriptedModelClient,
};

async fn wait_for_stage(agent: &Agent, stage: &str, state: NodeState) {
    for _ in 0..500 {
        if agent.active_stage().as_deref() == Some(stage) && agent.stage_state(stage) == Some(state)
        {
            return;
        }
        sleep(Duration::from_millis(2)).await;
    }
    panic!("stage `{stage}` never reached {state}");
}

fn assistant(blocks: Vec<ContentBlock>) -> Message {
    Message::assistant(blocks)
}

#[tokio::test]
async fn product_agent_runs_every_stage_in_order() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([
        // 目标阶段
        assistant(vec![ContentBlock::output("What do you want to learn?")]),
        assistant(vec![
            ContentBlock::context_payload(&json!({ "contexts": [{ "description": "grow signups" }] }))?,
            ContentBlock::stop("objective captured"),
        ]),
        // 产品信息阶段
        assistant(vec![
            ContentBlock::context_payload(&json!({ "contexts": [{ "description": "B2B analytics tool" }] }))?,
            ContentBlock::stop("facts captured"),
        ]),
        // 指标阶段
        assistant(vec![
            ContentBlock::asset_payload(&json!({
                "assets": [{ "name": "signup_rate", "description": "visitors who sign up" }]
            }))?,
            ContentBlock::stop("metrics agreed"),
        ]),
        // 界面探索阶段
        assistant(vec![ContentBlock::ToolUse {
            id: "t1".into(),
            name: "computer".into(),
            input: json!({ "action": "scroll", "x": 0, "y": 250 }),
        }]),
        assistant(vec![ContentBlock::stop("explored")]),
    ]);
    let desktop = Arc::new(HeadlessDesktop::new(64, 48));
    let service = Arc::new(ActionService::new(
        "local",
        desktop.clone(),
        ScreenshotCodec::default(),
    ));
    let sink = Arc::new(RecordingSink::default());
    let config = EngineConfig {
        intro: "Welcome!".into(),
        ..EngineConfig::default()
    };

    let agent = Arc::new(product_agent(
        &config,
        Arc::new(model.clone()),
        service,
        sink.clone(),
    ));
    let outputs = Arc::new(Mutex::new(Vec::new()));
    {
        let outputs = outputs.clone();
        agent.on_output(move |text| outputs.lock().push(text.to_string()));
    }

    let run = {
        let agent = agent.clone();
        tokio::spawn(async move { agent.run_agent_workflow().await })
    };
    wait_for_stage(&agent, OBJECTIVE_STAGE, NodeState::WaitingOnUser).await;
    assert_eq!(agent.stage_state(INTRO_STAGE), Some(NodeState::Closed));
    assert_eq!(agent.stage_state(PRODUCT_FACTS_STAGE), Some(NodeState::Idle));

    agent.ingest_user_input("more signups").await;
    run.await??;

    assert_eq!(
        *outputs.lock(),
        vec!["Welcome!".to_string(), "What do you want to learn?".to_string()]
    );
    assert_eq!(
        *sink.objectives.lock(),
        vec![Objective {
            description: "grow signups".into()
        }]
    );
    assert_eq!(
        *sink.product_facts.lock(),
        vec![ProductFact {
            description: "B2B analytics tool".into()
        }]
    );
    assert_eq!(
        *sink.metrics.lock(),
        vec![Metric {
            name: "signup_rate".into(),
            description: "visitors who sign up".into()
        }]
    );
    let graph = sink.exploration.lock().clone().unwrap();
    assert_eq!(graph.len(), 1);
    assert_eq!(
        desktop.events(),
        vec![DesktopEvent::Scroll { dx: 0, dy: 3 }, DesktopEvent::Capture]
    );

    assert_eq!(model.calls(), 6);
    assert_eq!(agent.active_stage(), None);
    assert_eq!(agent.stage_state(EXPLORATION_STAGE), Some(NodeState::Closed));
    assert_eq!(
        agent.lineage(METRICS_STAGE).unwrap().parent.as_deref(),
        Some(PRODUCT_FACTS_STAGE)
    );
    Ok(())
}

#[tokio::test]
async fn stages_share_one_log() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([
        assistant(vec![ContentBlock::stop("first done")]),
        assistant(vec![ContentBlock::stop("second done")]),
    ]);
    let schema = || Arc::new(Schema::array(Schema::object([("description", Schema::string())])));
    let agent = Agent::builder("pair")
        .model(Arc::new(model.clone()))
        .stage(AnnouncementNode::new("hello", "hi"), |_| {})
        .stage(
            ContextGatheringNode::<Objective>::new("first", "", schema()),
            |_| {},
        )
        .stage(
            ContextGatheringNode::<Objective>::new("second", "", schema()),
            |_| {},
        )
        .build();

    agent.run_agent_workflow().await?;

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    // 开场白与第一阶段的指令
    assert_eq!(requests[0].messages.len(), 2);
    // 再加上第一阶段的回复与第二阶段的指令
    assert_eq!(requests[1].messages.len(), 4);
    Ok(())
}

#[tokio::test]
async fn failing_stage_stops_the_chain() -> anyhow::Result<()> {
    let schema = Arc::new(Schema::array(Schema::object([("description", Schema::string())])));
    let delivered = Arc::new(Mutex::new(0));
    let counter = delivered.clone();
    let agent = Agent::builder("no-model")
        .stage(
            ContextGatheringNode::<Objective>::new("first", "", schema.clone()),
            move |_| *counter.lock() += 1,
        )
        .stage(
            ContextGatheringNode::<Objective>::new("second", "", schema),
            |_| {},
        )
        .build();

    let err = agent.run_agent_workflow().await.unwrap_err();

    assert!(matches!(err, ProbeFlowError::ModelUnavailable));
    assert_eq!(*delivered.lock(), 0);
    assert_eq!(agent.stage_state("first"), Some(NodeState::Closed));
    assert_eq!(agent.stage_state("second"), Some(NodeState::Idle));
    Ok(())
}

#[tokio::test]
async fn concurrent_run_is_rejected() -> anyhow::Result<()> {
    let model = ScriptedModelClient::with_replies([
        assistant(vec![ContentBlock::output("Question?")]),
        assistant(vec![ContentBlock::stop("done")]),
    ]);
    let agent = Arc::new(
        Agent::builder("busy")
            .model(Arc::new(model))
            .stage(
                ContextGatheringNode::<Objective>::new(
                    "ask",
                    "",
                    Arc::new(Schema::array(Schema::object([("description", Schema::string())]))),
                ),
                |_| {},
            )
            .build(),
    );

    let run = {
        let agent = agent.clone();
        tokio::spawn(async move { agent.run_agent_workflow().await })
    };
    wait_for_stage(&agent, "ask", NodeState::WaitingOnUser).await;

    let err = agent.run_agent_workflow().await.unwrap_err();
    assert!(matches!(err, ProbeFlowError::AgentBusy(ref name) if name == "busy"));

    agent.ingest_user_input("answer").await;
    run.await??;
    Ok(())
}

#[tokio::test]
async fn input_without_a_run_is_ignored() -> anyhow::Result<()> {
    let agent = Agent::builder("idle")
        .stage(AnnouncementNode::new("hello", "hi"), |_| {})
        .build();

    agent.ingest_user_input("anyone?").await;

    assert_eq!(agent.active_stage(), None);
    assert_eq!(agent.stage_state("hello"), Some(NodeState::Idle));
    Ok(())
}

#[tokio::test]
async fn agent_runs_again_with_fresh_state() -> anyhow::Result<()> {
    let model = ScriptedModelClient::new();
    model.set_fallback(assistant(vec![
        ContentBlock::context_payload(&json!({ "contexts": [{ "description": "again" }] }))?,
        ContentBlock::stop("done"),
    ]));
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let counts = delivered.clone();
    let agent = Agent::builder("twice")
        .model(Arc::new(model.clone()))
        .stage(AnnouncementNode::new("hello", "hi"), |_| {})
        .stage(
            ContextGatheringNode::<Objective>::new("ask", "", Arc::new(Objective::schema())),
            move |collected| counts.lock().push(collected.contexts.len()),
        )
        .build();

    agent.run_agent_workflow().await?;
    agent.run_agent_workflow().await?;

    // 每次运行只交付本次收集的条目
    assert_eq!(*delivered.lock(), vec![1, 1]);
    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    // 每次运行都是新的日志：开场白与指令
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[1].messages.len(), 2);
    assert_eq!(agent.stage_state("ask"), Some(NodeState::Closed));
    Ok(())
}

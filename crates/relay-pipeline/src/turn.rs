use std::time::Duration;
use tracing::{debug, info};

use relay_config::RelayConfig;
use relay_core::{
    Message, RetrievalCandidate, RetrievalOutcome, Result, Role, TurnContext, TurnOutput,
};
use relay_llm::ProviderRegistry;
use relay_retrieval::{SourceSet, sources_from_config};
use relay_tools::ToolRegistry;

use crate::handler::{match_handler, render_prompt};
use crate::intent::classify;
use crate::profile::build_profile;
use crate::resolve::{Stage, resolve_stage_model};
use crate::tool_loop::{LoopParams, run_tool_loop};
use crate::topic::detect_topic;

/// Run one full turn through the pipeline.
///
/// Stages execute strictly in order, each a pure function of its inputs plus
/// capability calls. Business-logic degradations (malformed classifier
/// output, no evidence, tool failures) never error; only a missing handler
/// match with no default, or a provider failure inside the generation loop,
/// reaches the caller. `cfg` is the caller's immutable snapshot for this
/// turn — a concurrent hot-reload must not affect a turn in flight.
pub async fn process_turn(
    ctx: &TurnContext,
    cfg: &RelayConfig,
    providers: &ProviderRegistry,
    stores: &SourceSet,
    tools: &ToolRegistry,
) -> Result<TurnOutput> {
    let llm_timeout = Duration::from_secs(cfg.pipeline.llm_timeout_secs);

    // 1. Topic continuity
    let topic_model = resolve_stage_model(Stage::Topic, cfg);
    let topic = detect_topic(
        providers,
        topic_model.as_ref(),
        &ctx.user_message,
        &ctx.previous_messages,
        ctx.declared_topic.as_deref(),
        &cfg.pipeline,
        llm_timeout,
    )
    .await;

    // 2. Evidence retrieval
    let sources = sources_from_config(&cfg.retrieval);
    let outcome = stores
        .collect(&ctx.user_message, &sources, &ctx.selected_sources)
        .await;

    // 3. Intent classification
    let intent_model = resolve_stage_model(Stage::Intent, cfg);
    let intent = classify(
        providers,
        intent_model.as_ref(),
        &topic.topic,
        &outcome,
        &sources,
        &cfg.intents,
        llm_timeout,
    )
    .await;

    // 4. Profile + 5. Handler matching
    let profile = build_profile(&topic, &outcome, &intent);
    let handler = match_handler(&profile, &cfg.handlers)?;
    info!(
        handler = %handler.id,
        intent = %profile.intent_label,
        evidence = ?profile.evidence_category,
        "handler matched"
    );

    // 6. Generation with the bounded tool loop
    let evidence: &[RetrievalCandidate] = match &outcome {
        RetrievalOutcome::Matched { evidence, .. } => evidence,
        _ => &intent.evidence,
    };
    let rendered = render_prompt(&handler.prompt, &ctx.user_message, &topic.topic, evidence);
    debug!(evidence_len = evidence.len(), "rendered handler prompt");

    let mut messages: Vec<Message> = ctx
        .previous_messages
        .iter()
        .map(|e| Message::text(e.role, e.text.clone()))
        .collect();
    messages.push(Message::text(Role::User, rendered));

    let loop_outcome = run_tool_loop(
        providers,
        tools,
        LoopParams {
            provider_id: &handler.provider,
            model: &handler.model,
            system: handler.system_prompt.clone(),
            messages,
            tools_enabled: handler.tools_enabled,
            max_iterations: handler
                .max_tool_iterations
                .unwrap_or(cfg.pipeline.max_tool_iterations),
            temperature: handler.temperature,
            max_tokens: handler.max_tokens,
            llm_timeout,
            tool_timeout: Duration::from_secs(cfg.pipeline.tool_timeout_secs),
        },
    )
    .await?;

    Ok(TurnOutput {
        content: loop_outcome.content,
        topic,
        matched_handler_id: handler.id.clone(),
        tool_calls: loop_outcome.tool_calls,
        max_iterations_reached: loop_outcome.max_iterations_reached,
    })
}

use relay_config::{RelayConfig, StageConfig};

/// Fully resolved model settings for a classification stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageModel {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&StageConfig> for StageModel {
    fn from(cfg: &StageConfig) -> Self {
        Self {
            provider: cfg.provider.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        }
    }
}

/// Which classification stage is asking for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Topic,
    Intent,
}

/// Cascading configuration lookup: the stage's own config first, then the
/// intent stage's, then the model of the first default handler. Evaluated as
/// an ordered list of resolvers until one yields a result, so classification
/// "just works" once any one model is configured.
pub fn resolve_stage_model(stage: Stage, cfg: &RelayConfig) -> Option<StageModel> {
    let from_own_stage = |c: &RelayConfig| match stage {
        Stage::Topic => c.llm.topic.as_ref().map(StageModel::from),
        Stage::Intent => None, // handled by the shared intent resolver below
    };
    let from_intent_stage = |c: &RelayConfig| c.llm.intent.as_ref().map(StageModel::from);
    let from_default_handler = |c: &RelayConfig| {
        c.handlers.iter().find(|h| h.is_default()).map(|h| StageModel {
            provider: h.provider.clone(),
            model: h.model.clone(),
            // Classification always runs low-creativity regardless of what
            // the borrowed handler generates with.
            temperature: 0.0,
            max_tokens: 256,
        })
    };

    let resolvers: [&dyn Fn(&RelayConfig) -> Option<StageModel>; 3] =
        [&from_own_stage, &from_intent_stage, &from_default_handler];
    resolvers.iter().find_map(|r| r(cfg))
}

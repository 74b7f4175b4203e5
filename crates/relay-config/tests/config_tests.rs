#[cfg(test)]
mod tests {
    use relay_config::ConfigLoader;
    use relay_config::schema::*;
    use std::io::Write;

    // ── Default tests ──────────────────────────────────────────

    #[test]
    fn test_pipeline_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.pipeline.history_window, 6);
        assert_eq!(config.pipeline.topic_max_chars, 120);
        assert_eq!(config.pipeline.max_tool_iterations, 8);
        assert_eq!(config.pipeline.tool_timeout_secs, 30);
    }

    #[test]
    fn test_retrieval_defaults() {
        let config = RetrievalConfig::default();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.lower_threshold, 0.3);
        assert_eq!(config.upper_threshold, 0.6);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen, "127.0.0.1:5007");
        assert!(config.cors);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "pretty");
    }

    #[test]
    fn test_source_collection_falls_back_to_id() {
        let source = SourceConfig {
            id: "billing_docs".into(),
            ..Default::default()
        };
        assert_eq!(source.collection_name(), "billing_docs");

        let source = SourceConfig {
            id: "billing_docs".into(),
            collection: "billing_v2".into(),
            ..Default::default()
        };
        assert_eq!(source.collection_name(), "billing_v2");
    }

    // ── TOML parsing tests ─────────────────────────────────────

    #[test]
    fn test_partial_toml_applies_defaults() {
        let toml_str = r#"
[pipeline]
max_tool_iterations = 4

[server]
listen = "0.0.0.0:8080"
"#;
        let config: RelayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pipeline.max_tool_iterations, 4);
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        // Defaults should fill in
        assert_eq!(config.pipeline.history_window, 6);
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn test_full_config_parses() {
        let toml_str = r#"
[llm.providers.main]
kind = "openai"
base_url = "http://127.0.0.1:11434/v1"

[llm.topic]
provider = "main"
model = "qwen3:4b"

[retrieval.stores.default]
url = "http://127.0.0.1:5006"

[[retrieval.sources]]
id = "billing"
description = "Billing and invoicing documentation"
lower_threshold = 0.25
upper_threshold = 0.55

[[intents]]
label = "smalltalk"
description = "Greetings and chit-chat"

[[handlers]]
id = "billing_answers"
provider = "main"
model = "qwen3:4b"
prompt = "Context:\n{{evidence}}\n\nQuestion: {{message}}"
tools_enabled = true

[handlers.match]
source = "billing"
evidence = "any"

[[handlers]]
id = "fallback"
provider = "main"
model = "qwen3:4b"
prompt = "{{message}}"
"#;
        let config: RelayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.handlers.len(), 2);
        assert_eq!(config.handlers[0].id, "billing_answers");
        let rule = config.handlers[0].match_rule.as_ref().unwrap();
        assert_eq!(rule.source.as_deref(), Some("billing"));
        assert_eq!(rule.evidence, Some(EvidenceRule::Any));
        assert!(config.handlers[1].is_default());
        assert_eq!(config.retrieval.sources[0].lower_threshold, Some(0.25));
        assert_eq!(config.intents[0].label, "smalltalk");
        assert!(config.validate().is_ok());
    }

    // ── Validation tests ───────────────────────────────────────

    fn base_config() -> RelayConfig {
        toml::from_str(
            r#"
[llm.providers.main]
kind = "openai"

[[handlers]]
id = "fallback"
provider = "main"
model = "m"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_ok_no_warnings() {
        let config = base_config();
        assert!(config.validate().unwrap().is_empty());
    }

    #[test]
    fn test_validate_unknown_provider_fails() {
        let mut config = base_config();
        config.handlers[0].provider = "missing".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_multiple_defaults_warns() {
        let mut config = base_config();
        let mut second = config.handlers[0].clone();
        second.id = "also_default".into();
        config.handlers.push(second);
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("also_default"));
    }

    #[test]
    fn test_validate_no_default_warns() {
        let mut config = base_config();
        config.handlers[0].match_rule = Some(MatchRule {
            intent: Some("billing".into()),
            ..Default::default()
        });
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.contains("no default handler")));
    }

    #[test]
    fn test_validate_inverted_thresholds_fail() {
        let mut config = base_config();
        config
            .retrieval
            .stores
            .insert("default".into(), StoreConfig::default());
        config.retrieval.sources.push(SourceConfig {
            id: "bad".into(),
            lower_threshold: Some(0.8),
            upper_threshold: Some(0.2),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_store_fails() {
        let mut config = base_config();
        config.retrieval.sources.push(SourceConfig {
            id: "orphan".into(),
            store: "nowhere".into(),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    // ── Loader tests ───────────────────────────────────────────

    #[test]
    fn test_loader_reads_file_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[server]\nlisten = \"127.0.0.1:4000\"").unwrap();
        drop(f);

        let loader = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(loader.snapshot().server.listen, "127.0.0.1:4000");

        std::fs::write(&path, "[server]\nlisten = \"127.0.0.1:4001\"\n").unwrap();
        loader.reload().unwrap();
        assert_eq!(loader.snapshot().server.listen, "127.0.0.1:4001");
    }

    #[test]
    fn test_loader_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        let loader = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(loader.snapshot().server.listen, "127.0.0.1:5007");
    }

    #[test]
    fn test_loader_invalid_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "not [valid toml").unwrap();
        assert!(ConfigLoader::load(Some(&path)).is_err());
    }

    #[test]
    fn test_snapshot_is_isolated_from_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[pipeline]\nmax_tool_iterations = 3\n").unwrap();

        let loader = ConfigLoader::load(Some(&path)).unwrap();
        let snapshot = loader.snapshot();
        std::fs::write(&path, "[pipeline]\nmax_tool_iterations = 9\n").unwrap();
        loader.reload().unwrap();

        // The earlier snapshot must not observe the reload.
        assert_eq!(snapshot.pipeline.max_tool_iterations, 3);
        assert_eq!(loader.snapshot().pipeline.max_tool_iterations, 9);
    }
}

use relay_config::{HandlerConfig, MatchRule};
use relay_core::{Profile, RelayError, Result, RetrievalCandidate};

/// Evaluate handlers in list order and return the first whose rule matches.
/// A handler without a rule matches unconditionally — the terminal fallback.
/// No match and no default is a configuration error, surfaced to the caller.
pub fn match_handler<'a>(
    profile: &Profile,
    handlers: &'a [HandlerConfig],
) -> Result<&'a HandlerConfig> {
    for handler in handlers {
        match &handler.match_rule {
            None => return Ok(handler),
            Some(rule) => {
                if rule_matches(rule, profile) {
                    return Ok(handler);
                }
            }
        }
    }
    Err(RelayError::Config(
        "no response handler matched and no default handler is configured".into(),
    ))
}

/// Conjunctive match across the fields the rule specifies; absent fields are
/// "don't care".
fn rule_matches(rule: &MatchRule, profile: &Profile) -> bool {
    if let Some(ref source) = rule.source
        && profile.intent_label != *source
    {
        return false;
    }
    if let Some(ref fragment) = rule.source_contains
        && !profile.intent_label.contains(fragment.as_str())
    {
        return false;
    }
    if let Some(ref intent) = rule.intent
        && profile.intent_label != *intent
    {
        return false;
    }
    if let Some(evidence) = rule.evidence
        && !evidence.accepts(profile.evidence_category)
    {
        return false;
    }
    if let Some(required) = rule.requires_reasoning
        && profile.reasoned != required
    {
        return false;
    }
    true
}

/// Render a handler's prompt template. Evidence renders closest-first as a
/// blank-line-separated block; an evidence-free turn gets an empty block.
pub fn render_prompt(
    template: &str,
    message: &str,
    topic: &str,
    evidence: &[RetrievalCandidate],
) -> String {
    let evidence_block = evidence
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    template
        .replace("{{message}}", message)
        .replace("{{topic}}", topic)
        .replace("{{evidence}}", &evidence_block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_config::EvidenceRule;
    use relay_core::EvidenceCategory;

    fn profile(intent: &str, category: EvidenceCategory) -> Profile {
        Profile {
            topic: "topic".into(),
            intent_label: intent.to_string(),
            has_evidence: category != EvidenceCategory::None,
            evidence_category: category,
            reasoned: false,
        }
    }

    fn handler(id: &str, rule: Option<MatchRule>) -> HandlerConfig {
        HandlerConfig {
            id: id.to_string(),
            match_rule: rule,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_match_wins() {
        let handlers = vec![
            handler(
                "billing",
                Some(MatchRule {
                    intent: Some("billing".into()),
                    ..Default::default()
                }),
            ),
            handler(
                "billing_again",
                Some(MatchRule {
                    intent: Some("billing".into()),
                    ..Default::default()
                }),
            ),
            handler("default", None),
        ];
        let p = profile("billing", EvidenceCategory::None);
        assert_eq!(match_handler(&p, &handlers).unwrap().id, "billing");
    }

    #[test]
    fn test_unmatched_profile_falls_through_to_default() {
        let handlers = vec![
            handler(
                "billing",
                Some(MatchRule {
                    intent: Some("billing".into()),
                    ..Default::default()
                }),
            ),
            handler("default", None),
        ];
        let p = profile("other", EvidenceCategory::None);
        assert_eq!(match_handler(&p, &handlers).unwrap().id, "default");
    }

    #[test]
    fn test_no_default_is_config_error() {
        let handlers = vec![handler(
            "billing",
            Some(MatchRule {
                intent: Some("billing".into()),
                ..Default::default()
            }),
        )];
        let p = profile("other", EvidenceCategory::None);
        assert!(matches!(
            match_handler(&p, &handlers),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn test_conjunctive_rule_requires_all_fields() {
        let rule = MatchRule {
            source_contains: Some("docs".into()),
            evidence: Some(EvidenceRule::Match),
            ..Default::default()
        };
        assert!(rule_matches(&rule, &profile("billing_docs", EvidenceCategory::Match)));
        assert!(!rule_matches(&rule, &profile("billing_docs", EvidenceCategory::Partial)));
        assert!(!rule_matches(&rule, &profile("smalltalk", EvidenceCategory::Match)));
    }

    #[test]
    fn test_evidence_any_accepts_everything() {
        let rule = MatchRule {
            evidence: Some(EvidenceRule::Any),
            ..Default::default()
        };
        for category in [
            EvidenceCategory::Match,
            EvidenceCategory::Partial,
            EvidenceCategory::None,
        ] {
            assert!(rule_matches(&rule, &profile("x", category)));
        }
    }

    #[test]
    fn test_requires_reasoning_flag() {
        let rule = MatchRule {
            requires_reasoning: Some(true),
            ..Default::default()
        };
        let mut p = profile("x", EvidenceCategory::None);
        assert!(!rule_matches(&rule, &p));
        p.reasoned = true;
        assert!(rule_matches(&rule, &p));
    }

    #[test]
    fn test_render_prompt_placeholders() {
        let evidence = vec![
            RetrievalCandidate {
                source_id: "docs".into(),
                text: "first doc".into(),
                distance: 0.1,
                metadata: Default::default(),
            },
            RetrievalCandidate {
                source_id: "docs".into(),
                text: "second doc".into(),
                distance: 0.2,
                metadata: Default::default(),
            },
        ];
        let rendered = render_prompt(
            "Topic: {{topic}}\nContext:\n{{evidence}}\n\nQ: {{message}}",
            "how do refunds work?",
            "refunds",
            &evidence,
        );
        assert!(rendered.contains("Topic: refunds"));
        assert!(rendered.contains("first doc\n\nsecond doc"));
        assert!(rendered.contains("Q: how do refunds work?"));
    }

    #[test]
    fn test_render_prompt_empty_evidence() {
        let rendered = render_prompt("Context: {{evidence}} Q: {{message}}", "hi", "t", &[]);
        assert_eq!(rendered, "Context:  Q: hi");
    }
}

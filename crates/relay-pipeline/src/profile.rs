use relay_core::{IntentResult, Profile, RetrievalOutcome, TopicResult, normalize_topic};

/// Fold topic, retrieval outcome, and intent into the flat matching record.
/// Only the handler matcher reads this.
pub fn build_profile(
    topic: &TopicResult,
    outcome: &RetrievalOutcome,
    intent: &IntentResult,
) -> Profile {
    let has_evidence = match outcome {
        RetrievalOutcome::Matched { evidence, .. } => !evidence.is_empty(),
        _ => !intent.evidence.is_empty(),
    };

    Profile {
        topic: normalize_topic(&topic.topic),
        intent_label: intent.label.clone(),
        has_evidence,
        evidence_category: outcome.evidence_category(),
        reasoned: intent.reasoned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{EvidenceCategory, RetrievalCandidate, TopicStatus};

    fn topic(label: &str) -> TopicResult {
        TopicResult {
            topic: label.to_string(),
            status: TopicStatus::Continuation,
            parent_topic: None,
        }
    }

    fn candidate(source: &str) -> RetrievalCandidate {
        RetrievalCandidate {
            source_id: source.to_string(),
            text: "doc".into(),
            distance: 0.2,
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_profile_from_matched_outcome() {
        let outcome = RetrievalOutcome::Matched {
            source_id: "docs".into(),
            evidence: vec![candidate("docs")],
        };
        let intent = IntentResult {
            label: "docs".into(),
            evidence: vec![],
            reasoned: false,
        };
        let profile = build_profile(&topic("  Billing   Help "), &outcome, &intent);
        assert_eq!(profile.topic, "billing help");
        assert_eq!(profile.intent_label, "docs");
        assert!(profile.has_evidence);
        assert_eq!(profile.evidence_category, EvidenceCategory::Match);
        assert!(!profile.reasoned);
    }

    #[test]
    fn test_profile_no_evidence_without_intent_attachment() {
        let intent = IntentResult {
            label: "other".into(),
            evidence: vec![],
            reasoned: true,
        };
        let profile = build_profile(&topic("x"), &RetrievalOutcome::NoEvidence, &intent);
        assert!(!profile.has_evidence);
        assert_eq!(profile.evidence_category, EvidenceCategory::None);
        assert!(profile.reasoned);
    }

    #[test]
    fn test_profile_partial_with_reattached_evidence() {
        let outcome = RetrievalOutcome::Candidates(vec![relay_core::SourceCandidates {
            source_id: "docs".into(),
            best_distance: 0.45,
            evidence: vec![candidate("docs")],
        }]);
        let intent = IntentResult {
            label: "docs".into(),
            evidence: vec![candidate("docs")],
            reasoned: true,
        };
        let profile = build_profile(&topic("x"), &outcome, &intent);
        assert!(profile.has_evidence);
        assert_eq!(profile.evidence_category, EvidenceCategory::Partial);
    }
}

//! End-to-end flows across decoding, folding, gating and reconciliation.

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    use crate::client::StageBackend;
    use crate::controller::{ReportGenerator, StageRunController, StageSnapshot, StageTab};
    use crate::core::{AgentStatus, StageResult, StageStatus};
    use crate::errors::{GateError, StagerunError};
    use crate::events::{decode_event_stream, names, CollectingEventSink, StageRunEvent};
    use crate::gate::ApproveOutcome;
    use crate::markdown::{group_blocks, to_plain_text, Block};
    use crate::reducer::{replay, start_draft};
    use crate::testing::{
        assert_agent_status, assert_override, assert_stage_status, assert_unique_agents,
        completed_result, two_agent_stream, ScriptedBackend, StreamScript, SAMPLE_REPORT,
    };

    const PROJECT: &str = "proj-42";

    async fn decode_all(script: StreamScript) -> Vec<StageRunEvent> {
        let backend = ScriptedBackend::new();
        backend.push_stream(script);
        let bytes = backend.open_stage_stream(PROJECT, 1).await.unwrap();
        decode_event_stream(bytes)
            .map(|event| event.expect("scripted stream has no transport errors"))
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_draft_after_stream_matches_expected_shape() {
        let events = decode_all(StreamScript::body(two_agent_stream(PROJECT, 1))).await;
        assert_eq!(events.len(), 8);

        let (draft, finished) = replay(start_draft(None, PROJECT, 1), &events);
        assert!(finished);
        assert_stage_status(&draft, StageStatus::Running);
        assert_unique_agents(&draft);
        assert_agent_status(&draft, "a1", AgentStatus::Complete);
        assert_agent_status(&draft, "a2", AgentStatus::Error);
        assert_eq!(draft.output("a1").unwrap().claims.len(), 1);
        assert_eq!(draft.output("a2").unwrap().error.as_deref(), Some("timeout"));
        assert_eq!(draft.conflict_report, completed_result(PROJECT, 1).conflict_report);
    }

    #[tokio::test]
    async fn test_chunk_boundaries_do_not_change_the_draft() {
        let body = two_agent_stream(PROJECT, 1);
        let whole = decode_all(StreamScript::body(body.clone())).await;
        let (expected, _) = replay(start_draft(None, PROJECT, 1), &whole);

        for size in 1..=97 {
            let events = decode_all(StreamScript::split_every(&body, size)).await;
            assert_eq!(events, whole, "chunk size {size}");
            let (draft, finished) = replay(start_draft(None, PROJECT, 1), &events);
            assert!(finished);
            assert_eq!(draft, expected, "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn test_controller_run_is_independent_of_chunking() {
        let body = two_agent_stream(PROJECT, 1);
        for size in [1, 2, 3, 7, 64, body.len()] {
            let backend = Arc::new(ScriptedBackend::new());
            backend.push_stream(
                StreamScript::split_every(&body, size).persisting(completed_result(PROJECT, 1)),
            );
            let sink = Arc::new(CollectingEventSink::new());
            let backend_dyn: Arc<dyn StageBackend> = backend.clone();
            let controller =
                StageRunController::new(backend_dyn, PROJECT, 1).with_sink(sink.clone());

            let summary = controller.run().await.unwrap();
            assert_eq!(summary.events, 8, "chunk size {size}");
            assert_eq!(summary.result, Some(completed_result(PROJECT, 1)));
            assert_eq!(sink.notices_of_type(names::RUN_EVENT).len(), 7);
        }
    }

    /// Run, review, approve stage one, then land on a fresh stage two.
    #[tokio::test]
    async fn test_run_approve_and_advance() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_stream(
            StreamScript::body(two_agent_stream(PROJECT, 1))
                .persisting(completed_result(PROJECT, 1)),
        );
        let backend_dyn: Arc<dyn StageBackend> = backend.clone();
        let controller = StageRunController::new(backend_dyn, PROJECT, 1);

        assert_eq!(controller.load().await.unwrap(), None);
        let err = controller.approve().await.unwrap_err();
        assert!(matches!(err, StagerunError::Gate(GateError::ApproveNotAllowed { .. })));
        assert_eq!(backend.call_count(), 1);

        controller.run().await.unwrap();
        let snapshot = controller.snapshot();
        assert!(snapshot.can_approve());
        assert_eq!(snapshot.tab, StageTab::Debate);

        assert_eq!(controller.approve().await.unwrap(), ApproveOutcome::Advance(2));
        assert_eq!(controller.snapshot(), StageSnapshot::new(PROJECT, 2));
        assert_stage_status(&backend.result(PROJECT, 1).unwrap(), StageStatus::Approved);

        assert_eq!(controller.load().await.unwrap(), None);
        assert!(controller.snapshot().can_run());
        assert!(!controller.snapshot().can_approve());
    }

    /// An override is stored beside the agent outputs without a status change.
    #[tokio::test]
    async fn test_override_after_run() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_stream(
            StreamScript::body(two_agent_stream(PROJECT, 1))
                .persisting(completed_result(PROJECT, 1)),
        );
        let backend_dyn: Arc<dyn StageBackend> = backend.clone();
        let controller = StageRunController::new(backend_dyn, PROJECT, 1);
        controller.run().await.unwrap();

        let err = controller.save_override("  ", "").await.unwrap_err();
        assert!(err.is_local_rejection());

        let saved: StageResult = controller
            .save_override("My synthesis", "")
            .await
            .unwrap()
            .unwrap();
        assert_override(&saved, "My synthesis");
        assert_stage_status(&saved, StageStatus::Complete);
        assert_eq!(saved.agent_outputs, completed_result(PROJECT, 1).agent_outputs);
        assert!(controller.snapshot().can_approve());
    }

    #[tokio::test]
    async fn test_report_renders_every_block_kind() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_report(SAMPLE_REPORT);
        let backend_dyn: Arc<dyn StageBackend> = backend.clone();
        let generator = ReportGenerator::new(backend_dyn, PROJECT);

        let report = generator.generate().await.unwrap();
        let kinds: Vec<&str> = report.blocks.iter().map(Block::kind).collect();
        let expected = [
            "heading",
            "bullet",
            "numbered",
            "blockquote",
            "horizontal_rule",
            "paragraph",
        ];
        for kind in expected {
            assert!(kinds.contains(&kind), "missing {kind}");
        }
        assert_eq!(group_blocks(&report.blocks).len(), 7);

        let text = to_plain_text(&report.blocks);
        assert!(text.starts_with("Research Report\n"));
        assert!(text.contains("  - Onboarding is the main source of churn"));
        assert!(text.contains("  1. Redesign the first-run flow"));
    }
}

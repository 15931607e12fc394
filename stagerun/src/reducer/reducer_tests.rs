//! Tests for the stage run reducer.

#[cfg(test)]
mod tests {
    use crate::core::{
        AgentOutput, AgentStatus, Claim, ConflictReport, StageResult, StageStatus,
        UNKNOWN_AGENT_ERROR,
    };
    use crate::events::StageRunEvent;
    use crate::reducer::{reduce, replay, start_draft, RunEffect, RunPhase};
    use pretty_assertions::assert_eq;

    fn start(id: &str, name: &str) -> StageRunEvent {
        StageRunEvent::AgentStart {
            agent_id: id.into(),
            agent_name: name.into(),
        }
    }

    fn complete(id: &str, content: &str) -> StageRunEvent {
        StageRunEvent::AgentComplete {
            agent_id: id.into(),
            agent_name: None,
            content: Some(content.into()),
            claims: Some(vec![Claim {
                text: format!("{id} claim"),
                evidence: "source doc".into(),
                confidence: 0.8,
                source: "interview".into(),
            }]),
        }
    }

    fn error(id: &str, message: Option<&str>) -> StageRunEvent {
        StageRunEvent::AgentError {
            agent_id: id.into(),
            agent_name: None,
            error: message.map(str::to_string),
        }
    }

    fn report() -> ConflictReport {
        ConflictReport {
            stage: 1,
            synthesis: "Both agents agree on scope.".into(),
            unresolved_tensions: vec!["Budget".into()],
            ..ConflictReport::default()
        }
    }

    fn stage_complete() -> StageRunEvent {
        StageRunEvent::StageComplete {
            status: Some("complete".into()),
            stage_result_id: Some("sr-1".into()),
            message: None,
        }
    }

    fn scenario_a() -> Vec<StageRunEvent> {
        vec![
            start("a1", "Analyst"),
            start("a2", "Skeptic"),
            complete("a1", "Findings from a1"),
            error("a2", Some("timeout")),
            StageRunEvent::ConflictStart,
            StageRunEvent::ConflictComplete { report: Some(report()) },
            stage_complete(),
        ]
    }

    #[test]
    fn test_start_draft_fresh() {
        let draft = start_draft(None, "p1", 3);
        assert_eq!(draft.status, StageStatus::Running);
        assert_eq!(draft.project_id, "p1");
        assert_eq!(draft.stage_number, 3);
        assert!(draft.agent_outputs.is_empty());
        assert!(draft.conflict_report.is_none());
    }

    #[test]
    fn test_start_draft_keeps_prior_outputs() {
        let mut prior = StageResult::pending("p1", 1);
        prior.status = StageStatus::Complete;
        prior.agent_outputs.push(AgentOutput::running("a1", "Analyst"));
        prior.human_override = Some("kept".into());

        let draft = start_draft(Some(&prior), "p1", 1);
        assert_eq!(draft.status, StageStatus::Running);
        assert_eq!(draft.agent_outputs, prior.agent_outputs);
        assert_eq!(draft.human_override.as_deref(), Some("kept"));
    }

    #[test]
    fn test_scenario_a() {
        let (draft, finished) = replay(start_draft(None, "p1", 1), &scenario_a());

        assert!(finished);
        assert_eq!(draft.status, StageStatus::Running);
        assert_eq!(draft.agent_outputs.len(), 2);

        let a1 = draft.output("a1").unwrap();
        assert_eq!(a1.status, AgentStatus::Complete);
        assert_eq!(a1.content, "Findings from a1");
        assert_eq!(a1.claims.len(), 1);
        assert_eq!(a1.agent_name, "Analyst");

        let a2 = draft.output("a2").unwrap();
        assert_eq!(a2.status, AgentStatus::Error);
        assert_eq!(a2.error.as_deref(), Some("timeout"));

        assert_eq!(draft.conflict_report, Some(report()));
    }

    #[test]
    fn test_replay_is_deterministic() {
        let events = scenario_a();
        let (first, _) = replay(start_draft(None, "p1", 1), &events);
        let (second, _) = replay(start_draft(None, "p1", 1), &events);
        assert_eq!(first, second);
    }

    #[test]
    fn test_effects_per_event() {
        let mut draft = start_draft(None, "p1", 1);
        let mut effects = Vec::new();
        for event in &scenario_a() {
            let step = reduce(draft, event);
            draft = step.draft;
            effects.push(step.effect);
        }

        assert_eq!(
            effects,
            vec![
                Some(RunEffect::Phase(RunPhase::AgentsRunning)),
                Some(RunEffect::Phase(RunPhase::AgentsRunning)),
                None,
                None,
                Some(RunEffect::Phase(RunPhase::AnalyzingConflicts)),
                Some(RunEffect::FocusDebate),
                Some(RunEffect::Finish {
                    status: Some("complete".into()),
                    stage_result_id: Some("sr-1".into()),
                    message: None,
                }),
            ]
        );
    }

    #[test]
    fn test_stage_complete_does_not_mutate_draft() {
        let (draft, _) = replay(start_draft(None, "p1", 1), &scenario_a()[..6]);
        let step = reduce(draft.clone(), &stage_complete());
        assert_eq!(step.draft, draft);
    }

    #[test]
    fn test_replay_stops_at_terminal_event() {
        let mut events = scenario_a();
        events.push(start("late", "Late"));
        let (draft, finished) = replay(start_draft(None, "p1", 1), &events);
        assert!(finished);
        assert!(draft.output("late").is_none());
    }

    #[test]
    fn test_replay_without_terminal_event() {
        let (_, finished) = replay(start_draft(None, "p1", 1), &scenario_a()[..4]);
        assert!(!finished);
    }

    #[test]
    fn test_duplicate_start_is_idempotent() {
        let events = vec![start("a1", "Analyst"), start("a1", "Renamed")];
        let (draft, _) = replay(start_draft(None, "p1", 1), &events);
        assert_eq!(draft.agent_outputs.len(), 1);
        assert_eq!(draft.agent_outputs[0].agent_name, "Analyst");
    }

    #[test]
    fn test_start_after_complete_keeps_terminal_output() {
        let events = vec![start("a1", "Analyst"), complete("a1", "done"), start("a1", "Analyst")];
        let (draft, _) = replay(start_draft(None, "p1", 1), &events);
        assert_eq!(draft.agent_outputs.len(), 1);
        assert_eq!(draft.agent_outputs[0].status, AgentStatus::Complete);
        assert_eq!(draft.agent_outputs[0].content, "done");
    }

    #[test]
    fn test_duplicate_complete_is_absorbed() {
        let once = vec![start("a1", "Analyst"), complete("a1", "done")];
        let twice = vec![start("a1", "Analyst"), complete("a1", "done"), complete("a1", "done")];
        let (a, _) = replay(start_draft(None, "p1", 1), &once);
        let (b, _) = replay(start_draft(None, "p1", 1), &twice);
        assert_eq!(a, b);
    }

    #[test]
    fn test_complete_without_start_synthesizes_output() {
        let event = StageRunEvent::AgentComplete {
            agent_id: "ghost".into(),
            agent_name: Some("Ghost Writer".into()),
            content: Some("text".into()),
            claims: None,
        };
        let draft = reduce(start_draft(None, "p1", 2), &event).draft;

        let output = draft.output("ghost").unwrap();
        assert_eq!(output.agent_name, "Ghost Writer");
        assert_eq!(output.status, AgentStatus::Complete);
        assert_eq!(output.content, "text");
        assert_eq!(output.stage, 2);
        assert_eq!(output.project_id, "p1");
    }

    #[test]
    fn test_synthesized_name_falls_back_to_id() {
        let draft = reduce(start_draft(None, "p1", 1), &error("a9", None)).draft;
        let output = draft.output("a9").unwrap();
        assert_eq!(output.agent_name, "a9");
        assert_eq!(output.error.as_deref(), Some(UNKNOWN_AGENT_ERROR));
    }

    #[test]
    fn test_empty_error_message_defaults() {
        let draft = reduce(start_draft(None, "p1", 1), &error("a1", Some(""))).draft;
        assert_eq!(draft.output("a1").unwrap().error.as_deref(), Some("Unknown error"));
    }

    #[test]
    fn test_complete_without_content_keeps_existing() {
        let mut prior = StageResult::pending("p1", 1);
        let mut output = AgentOutput::running("a1", "Analyst");
        output.content = "earlier".into();
        prior.agent_outputs.push(output);

        let event = StageRunEvent::AgentComplete {
            agent_id: "a1".into(),
            agent_name: None,
            content: None,
            claims: None,
        };
        let draft = reduce(start_draft(Some(&prior), "p1", 1), &event).draft;
        let output = draft.output("a1").unwrap();
        assert_eq!(output.content, "earlier");
        assert_eq!(output.status, AgentStatus::Complete);
    }

    #[test]
    fn test_error_isolated_to_one_agent() {
        let events = vec![
            start("a1", "A"),
            start("a2", "B"),
            error("a1", Some("boom")),
            complete("a2", "ok"),
        ];
        let (draft, _) = replay(start_draft(None, "p1", 1), &events);
        assert!(draft.output("a1").unwrap().is_error());
        assert_eq!(draft.output("a2").unwrap().status, AgentStatus::Complete);
        assert!(draft.output("a2").unwrap().error.is_none());
    }

    #[test]
    fn test_conflict_complete_without_report_keeps_draft_report() {
        let mut prior = StageResult::pending("p1", 1);
        prior.conflict_report = Some(report());

        let step = reduce(
            start_draft(Some(&prior), "p1", 1),
            &StageRunEvent::ConflictComplete { report: None },
        );
        assert_eq!(step.draft.conflict_report, Some(report()));
        assert_eq!(step.effect, Some(RunEffect::FocusDebate));
    }

    #[test]
    fn test_run_without_conflict_step_is_valid() {
        let events = vec![start("a1", "Solo"), complete("a1", "alone"), stage_complete()];
        let (draft, finished) = replay(start_draft(None, "p1", 1), &events);
        assert!(finished);
        assert!(draft.conflict_report.is_none());
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(RunPhase::default(), RunPhase::Idle);
        assert_eq!(RunPhase::AnalyzingConflicts.to_string(), "analyzing_conflicts");
    }
}

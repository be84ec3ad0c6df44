//! Property-based tests for first-meaningful resolution and job state
//! invariants.
//!
//! Properties cover every candidate kind the merger knows about, report
//! assembly independence from insertion order, and the job state machine.

use proptest::prelude::*;
use serde_json::Value;

use tide_audit::dispatch::JobState;
use tide_audit::merge::{first_meaningful, Candidates, Resolved};
use tide_audit::payload::{build, ResultSet};
use tide_audit::types::{AuditDetails, AuditResult, CodeInfo, Job};

// ─── Arbitrary Strategies ───────────────────────────────────────────────────

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-z0-9-]{1,12}"]
}

fn arb_i64() -> impl Strategy<Value = i64> {
    prop_oneof![Just(0_i64), any::<i64>()]
}

fn arb_f64() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0_f64), -1.0e9..1.0e9_f64]
}

fn arb_code_info() -> impl Strategy<Value = CodeInfo> {
    prop_oneof![Just(String::new()), "(plugin|theme)"].prop_map(CodeInfo::new)
}

fn arb_job_state() -> impl Strategy<Value = JobState> {
    prop::sample::select(vec![
        JobState::Queued,
        JobState::Running,
        JobState::Collecting,
        JobState::Reporting,
        JobState::Delivered,
        JobState::Failed,
    ])
}

// ─── Property Tests: Merger ─────────────────────────────────────────────────

proptest! {
    /// Text resolves to the first non-empty element, or empty text.
    #[test]
    fn text_resolves_to_first_non_empty(values in prop::collection::vec(arb_text(), 1..8)) {
        let expected = values
            .iter()
            .find(|v| !v.is_empty())
            .cloned()
            .unwrap_or_default();
        prop_assert_eq!(first_meaningful(&values), Some(expected));
    }

    /// Integers resolve to the first non-zero element, or zero.
    #[test]
    fn i64_resolves_to_first_non_zero(values in prop::collection::vec(arb_i64(), 1..8)) {
        let expected = values.iter().copied().find(|v| *v != 0).unwrap_or(0);
        prop_assert_eq!(first_meaningful(&values), Some(expected));
    }

    /// 32-bit integers behave like 64-bit ones.
    #[test]
    fn i32_resolves_to_first_non_zero(values in prop::collection::vec(prop_oneof![Just(0_i32), any::<i32>()], 1..8)) {
        let expected = values.iter().copied().find(|v| *v != 0).unwrap_or(0);
        prop_assert_eq!(
            Candidates::Int32(values).resolve(),
            Some(Resolved::Int32(expected))
        );
    }

    /// Floats resolve to the first non-zero element, or zero.
    #[test]
    fn f64_resolves_to_first_non_zero(values in prop::collection::vec(arb_f64(), 1..8)) {
        let expected = values.iter().copied().find(|v| *v != 0.0).unwrap_or(0.0);
        prop_assert_eq!(first_meaningful(&values), Some(expected));
    }

    /// Code info resolves to the first identified candidate, or absent.
    #[test]
    fn code_info_resolves_to_first_identified(values in prop::collection::vec(arb_code_info(), 0..6)) {
        let expected = values.iter().find(|c| !c.kind.is_empty()).cloned();
        prop_assert_eq!(first_meaningful(&values), expected);
    }

    /// Opaque values always resolve to the first candidate.
    #[test]
    fn other_resolves_to_first(values in prop::collection::vec(any::<i64>(), 1..6)) {
        let values: Vec<Value> = values.into_iter().map(Value::from).collect();
        prop_assert_eq!(
            Candidates::Other(values.clone()).resolve(),
            Some(Resolved::Other(values[0].clone()))
        );
    }

    /// Resolution never mutates its input.
    #[test]
    fn resolution_leaves_input_untouched(values in prop::collection::vec(arb_text(), 0..8)) {
        let candidates = Candidates::Text(values.clone());
        let _ = candidates.resolve();
        prop_assert_eq!(candidates, Candidates::Text(values));
    }
}

// ─── Property Tests: Report Assembly ────────────────────────────────────────

proptest! {
    /// Report bytes do not depend on the order results were inserted.
    #[test]
    fn build_is_independent_of_insertion_order(
        ids in prop::collection::btree_set("[a-z_]{1,10}", 1..6),
        seed in any::<u64>(),
    ) {
        let ids: Vec<String> = ids.into_iter().collect();
        let mut shuffled = ids.clone();
        // Seed-derived rotation, reversed on even seeds.
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        if seed % 2 == 0 {
            shuffled.reverse();
        }

        let fill = |order: &[String]| {
            let mut results = ResultSet::new();
            results.set_code_info(CodeInfo::new("plugin"));
            results.set_checksum("abcdefg");
            for id in order {
                let details = AuditDetails::new("mock", format!("{id}.json"), "mock");
                results.insert_report(id.clone(), AuditResult::new(details.clone(), details));
            }
            results
        };

        let job = Job::new("project-one", "abcdefg");
        let first = build(&job, &fill(&ids)).unwrap();
        let second = build(&job, &fill(&shuffled)).unwrap();
        prop_assert_eq!(first, second);
    }
}

// ─── Property Tests: Job State Machine ──────────────────────────────────────

proptest! {
    /// Terminal states reject every transition.
    #[test]
    fn terminal_states_reject_all_transitions(
        from in prop::sample::select(vec![JobState::Delivered, JobState::Failed]),
        to in arb_job_state(),
    ) {
        prop_assert!(!from.can_transition_to(to));
    }

    /// Every non-terminal state may fail.
    #[test]
    fn non_terminal_states_can_fail(state in arb_job_state()) {
        prop_assert_eq!(state.can_transition_to(JobState::Failed), !state.is_terminal());
    }

    /// No state transitions to itself.
    #[test]
    fn no_self_transitions(state in arb_job_state()) {
        prop_assert!(!state.can_transition_to(state));
    }
}

use std::time::Duration;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use wordbomb::behavior::BehaviorFlags;
use wordbomb::config::{HumanizationConfig, SelectionMode};
use wordbomb::estimator::Breakdown;
use wordbomb::executor::{ExecutionOutcome, Executor, RoundIo};
use wordbomb::model::{PlanKind, PlanStep, RoundPlan, StepKind};
use wordbomb::positions::Point;
use wordbomb::sim::{ChatEvent, RecordingSleeper, ScriptedTurns, SimChat};

const CHATBOX: Point = Point::new(838, 953);

fn plan(steps: Vec<PlanStep>) -> RoundPlan {
    RoundPlan {
        fragment: "cas".to_string(),
        mode: SelectionMode::Any,
        kind: PlanKind::Normal,
        word: Some("casa".to_string()),
        top: Vec::new(),
        proposed: BehaviorFlags::none(),
        flags: BehaviorFlags::none(),
        think_after_three: false,
        numbers: false,
        estimate_s: 0.0,
        breakdown: Breakdown::default(),
        steps,
    }
}

fn submit(text: &str) -> PlanStep {
    PlanStep::Submit {
        text: text.to_string(),
        think_ms: None,
        numbers: false,
        estimated_s: 0.0,
    }
}

struct Harness {
    chat: SimChat,
    turns: ScriptedTurns,
    sleeper: RecordingSleeper,
}

impl Harness {
    fn new(turns: ScriptedTurns) -> Self {
        Self {
            chat: SimChat::new(),
            turns,
            sleeper: RecordingSleeper::new(),
        }
    }

    fn run(&mut self, humanize: HumanizationConfig, plan: &RoundPlan) -> ExecutionOutcome {
        let executor = Executor::new(humanize, 100, CHATBOX);
        let mut injector = self.chat.clone();
        let mut turns = self.turns.clone();
        let mut sleeper = self.sleeper.clone();
        let mut io = RoundIo {
            injector: &mut injector,
            turns: &mut turns,
            sleeper: &mut sleeper,
        };
        let mut rng = StdRng::seed_from_u64(12);
        executor
            .execute(plan, &mut io, &mut rng)
            .expect("sim collaborators never fail")
    }
}

#[test]
fn exactly_one_turn_check_per_enter() {
    let mut h = Harness::new(ScriptedTurns::always());

    let outcome = h.run(HumanizationConfig::disabled(), &plan(vec![submit("casa")]));

    assert_eq!(outcome, ExecutionOutcome::Completed);
    assert_eq!(h.chat.submitted(), vec!["casa"]);
    assert_eq!(h.turns.checks(), 1);
    assert_eq!(h.chat.events().first(), Some(&ChatEvent::Focus(CHATBOX)));
    assert!(h.sleeper.contains(Duration::from_millis(100)));
}

#[test]
fn filler_is_typed_then_erased_before_the_word() {
    let mut h = Harness::new(ScriptedTurns::always());
    let steps = vec![
        PlanStep::Filler {
            text: "pera pera".to_string(),
            estimated_s: 0.0,
        },
        PlanStep::Rehearsal {
            text: "ca...".to_string(),
            estimated_s: 0.0,
        },
        submit("casa"),
    ];

    let outcome = h.run(HumanizationConfig::disabled(), &plan(steps));

    assert!(outcome.is_completed());
    assert_eq!(h.chat.submitted(), vec!["casa"]);
    assert_eq!(h.turns.checks(), 1);
    let select_alls = h
        .chat
        .events()
        .iter()
        .filter(|e| **e == ChatEvent::SelectAll)
        .count();
    assert_eq!(select_alls, 2);
}

#[test]
fn lost_turn_leaves_the_text_in_place() {
    let mut h = Harness::new(ScriptedTurns::new([false], true));

    let outcome = h.run(HumanizationConfig::disabled(), &plan(vec![submit("casa")]));

    assert_eq!(
        outcome,
        ExecutionOutcome::TurnLost {
            step: StepKind::Submit
        }
    );
    assert!(h.chat.submitted().is_empty());
    assert_eq!(h.chat.buffer(), "casa");
    assert_eq!(h.chat.enter_count(), 0);
    assert_eq!(h.turns.checks(), 1);
}

#[test]
fn wrong_then_correct_checks_before_each_enter() {
    let step = PlanStep::WrongThenCorrect {
        wrong: "cosa".to_string(),
        correct: "casa".to_string(),
        numbers: false,
        estimated_s: 0.0,
    };

    let mut h = Harness::new(ScriptedTurns::always());
    assert!(h
        .run(HumanizationConfig::disabled(), &plan(vec![step.clone()]))
        .is_completed());
    assert_eq!(h.chat.submitted(), vec!["cosa", "casa"]);
    assert_eq!(h.turns.checks(), 2);

    let mut h = Harness::new(ScriptedTurns::new([true, false], true));
    assert_eq!(
        h.run(HumanizationConfig::disabled(), &plan(vec![step.clone()])),
        ExecutionOutcome::TurnLost {
            step: StepKind::Correction
        }
    );
    assert_eq!(h.chat.submitted(), vec!["cosa"]);
    assert_eq!(h.chat.buffer(), "casa");

    let mut h = Harness::new(ScriptedTurns::new([false], true));
    assert_eq!(
        h.run(HumanizationConfig::disabled(), &plan(vec![step])),
        ExecutionOutcome::TurnLost {
            step: StepKind::WrongThenCorrect
        }
    );
    assert_eq!(h.turns.checks(), 1);
}

#[test]
fn lost_miss_reports_the_wrong_word_step() {
    let mut h = Harness::new(ScriptedTurns::new([false], true));
    let step = PlanStep::WrongWord {
        text: "casx".to_string(),
        numbers: false,
        estimated_s: 0.0,
    };

    assert_eq!(
        h.run(HumanizationConfig::disabled(), &plan(vec![step])),
        ExecutionOutcome::TurnLost {
            step: StepKind::WrongWord
        }
    );
}

#[test]
fn think_pause_happens_once() {
    let mut h = Harness::new(ScriptedTurns::always());
    let step = PlanStep::Submit {
        text: "casamento".to_string(),
        think_ms: Some(450),
        numbers: false,
        estimated_s: 0.0,
    };

    h.run(HumanizationConfig::disabled(), &plan(vec![step]));

    assert!(h.sleeper.contains(Duration::from_millis(450)));
    assert_eq!(h.chat.submitted(), vec!["casamento"]);
}

#[test]
fn typos_are_corrected_and_digits_only_add_noise() {
    let humanize = HumanizationConfig {
        error_chance: 0.5,
        ..HumanizationConfig::disabled()
    };
    let step = PlanStep::Submit {
        text: "casamento".to_string(),
        think_ms: None,
        numbers: true,
        estimated_s: 0.0,
    };
    let mut h = Harness::new(ScriptedTurns::always());

    h.run(humanize, &plan(vec![step]));

    let submitted = h.chat.submitted();
    assert_eq!(submitted.len(), 1);
    let letters: String = submitted[0].chars().filter(|c| !c.is_ascii_digit()).collect();
    assert_eq!(letters, "casamento");
    assert!(h.chat.events().contains(&ChatEvent::Backspace));
}

#[test]
fn quick_submission_types_without_humanization() {
    let mut h = Harness::new(ScriptedTurns::always());
    let step = PlanStep::QuickSubmit {
        text: "nem sei essa".to_string(),
        estimated_s: 0.0,
    };

    let humanize = HumanizationConfig {
        error_chance: 1.0,
        ..HumanizationConfig::disabled()
    };
    assert!(h.run(humanize, &plan(vec![step])).is_completed());

    assert_eq!(h.chat.submitted(), vec!["nem sei essa"]);
    assert!(!h.chat.events().contains(&ChatEvent::Backspace));
    assert!(h.sleeper.total() < Duration::from_millis(100));
}

use wordbomb::config::{HumanizationConfig, SpeedProfile};
use wordbomb::estimator::{
    RoundProposal, RoundTimeEstimator, TerminalProposal, TypingBlock, FAST_ERASE_S, KEYPRESS_S,
    NUMBER_INSERT_CHANCE,
};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn plain() -> HumanizationConfig {
    HumanizationConfig {
        letter_delay_ms: 10,
        ..HumanizationConfig::disabled()
    }
}

#[test]
fn speed_profiles_scale_the_base_delay() {
    let with_profile = |speed_profile| {
        RoundTimeEstimator::new(
            0,
            HumanizationConfig {
                speed_profile,
                max_extra_jitter_s: 0.004,
                ..plain()
            },
        )
        .per_char_delay_s()
    };

    assert!(close(with_profile(SpeedProfile::Fast), 0.010 * 0.6 + 0.002));
    assert!(close(with_profile(SpeedProfile::Random), 0.010 + 0.002));
    assert!(close(with_profile(SpeedProfile::Gradual), 0.010 * 0.8 + 0.002));
    assert!(close(with_profile(SpeedProfile::None), 0.010 + 0.002));
}

#[test]
fn plain_block_is_focus_plus_characters() {
    let est = RoundTimeEstimator::new(200, plain());
    let t = est.typing_block_s(TypingBlock::draft(5));
    assert!(close(t, 0.2 + 5.0 * (0.010 + KEYPRESS_S)), "{t}");
}

#[test]
fn submission_adds_average_hesitation() {
    let est = RoundTimeEstimator::new(
        0,
        HumanizationConfig {
            enter_hesitation_min_s: 0.1,
            enter_hesitation_max_s: 0.3,
            ..plain()
        },
    );
    let draft = est.typing_block_s(TypingBlock::draft(4));
    let submit = est.typing_block_s(TypingBlock::submission(4, false));
    assert!(close(submit - draft, 0.2));
}

#[test]
fn micro_pauses_mistakes_and_numbers_add_up() {
    let base = RoundTimeEstimator::new(0, plain());
    let est = RoundTimeEstimator::new(
        0,
        HumanizationConfig {
            pause_every: 4,
            pause_min_s: 0.02,
            pause_max_s: 0.04,
            error_chance: 0.1,
            ..plain()
        },
    );

    let chars = 9;
    let extra = est.typing_block_s(TypingBlock::submission(chars, true))
        - base.typing_block_s(TypingBlock::submission(chars, false));

    let pauses = 2.0 * 0.03;
    let mistakes = 9.0 * 0.1 * (KEYPRESS_S + 0.010 + 0.02);
    let numbers = NUMBER_INSERT_CHANCE * 9.0 * KEYPRESS_S;
    assert!(close(extra, pauses + mistakes + numbers), "{extra}");
}

#[test]
fn think_pause_needs_three_letters() {
    let est = RoundTimeEstimator::new(0, plain());
    let with = |chars| {
        est.typing_block_s(TypingBlock::submission(chars, false).with_think(Some(500)))
            - est.typing_block_s(TypingBlock::submission(chars, false))
    };
    assert!(close(with(3), 0.5));
    assert!(close(with(2), 0.0));
}

#[test]
fn composite_estimate_has_exactly_one_terminal_part() {
    let est = RoundTimeEstimator::new(100, plain());
    let draft = |n| est.typing_block_s(TypingBlock::draft(n)) + FAST_ERASE_S;
    let submit = |n| est.typing_block_s(TypingBlock::submission(n, false));

    let normal = est.estimate(&RoundProposal {
        filler_chars: Some(10),
        rehearsal_chars: Some(5),
        terminal: TerminalProposal::Normal {
            chars: 9,
            think_ms: None,
        },
        numbers: false,
    });
    assert!(close(normal.filler_s, draft(10)));
    assert!(close(normal.rehearsal_s, draft(5)));
    assert!(close(normal.typing_s, submit(9)));
    assert_eq!(normal.wrong_word_s, 0.0);
    assert_eq!(normal.wrong_then_correct_s, 0.0);
    assert!(close(normal.total(), draft(10) + draft(5) + submit(9)));

    let miss = est.estimate(&RoundProposal {
        filler_chars: None,
        rehearsal_chars: None,
        terminal: TerminalProposal::DeliberateWrongWord { chars: 9 },
        numbers: false,
    });
    assert!(close(miss.total(), submit(9)));
    assert_eq!(miss.typing_s, 0.0);

    let twice = est.estimate(&RoundProposal {
        filler_chars: None,
        rehearsal_chars: None,
        terminal: TerminalProposal::WrongThenCorrect {
            wrong_chars: 9,
            correct_chars: 9,
        },
        numbers: false,
    });
    assert!(close(twice.total(), 2.0 * submit(9)));
    assert_eq!(twice.describe(), format!("wrong-then-correct={:.2}s", twice.total()));
}

#[test]
fn quick_submission_is_cheaper_than_humanized_typing() {
    let est = RoundTimeEstimator::new(200, HumanizationConfig::default());
    assert!(
        RoundTimeEstimator::quick_submission_s(9)
            < est.typing_block_s(TypingBlock::submission(9, false))
    );
}

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use wordbomb::config::SelectionMode;
use wordbomb::dictionary::Dictionary;
use wordbomb::selector::{Selector, UsageState, ALPHABET_COMPLETION_THRESHOLD};

fn selector(show_top: usize) -> Selector {
    Selector {
        penalize_repeats: true,
        repeat_penalty: 0.85,
        show_top,
    }
}

fn draw_counts(
    sel: &Selector,
    candidates: &[&str],
    fragment: &str,
    usage: &UsageState,
    draws: usize,
) -> HashMap<String, usize> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut counts = HashMap::new();
    for _ in 0..draws {
        let word = sel
            .choose(candidates, SelectionMode::Long, fragment, usage, &mut rng)
            .expect("candidates are not empty");
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }
    counts
}

#[test]
fn long_mode_prefers_longer_and_short_mode_shorter() {
    let sel = selector(5);
    let usage = UsageState::new(5);
    let words = ["ab", "abc", "abcd", "abcdefgh"];

    for pair in words.windows(2) {
        let (short, long) = (pair[0], pair[1]);
        assert!(
            sel.score(long, SelectionMode::Long, "zz", &usage)
                >= sel.score(short, SelectionMode::Long, "zz", &usage)
        );
        assert!(
            sel.score(short, SelectionMode::Short, "zz", &usage)
                >= sel.score(long, SelectionMode::Short, "zz", &usage)
        );
    }
}

#[test]
fn any_mode_is_flat_apart_from_prefix_bonus() {
    let sel = selector(5);
    let usage = UsageState::new(5);

    assert_eq!(sel.score("gato", SelectionMode::Any, "zz", &usage), 1.0);
    assert_eq!(sel.score("casamento", SelectionMode::Any, "zz", &usage), 1.0);
    assert_eq!(sel.score("casa", SelectionMode::Any, "cas", &usage), 1.25);
}

#[test]
fn prior_use_always_lowers_the_score() {
    let sel = selector(5);
    let fresh = UsageState::new(0);

    for k in 1..6 {
        let mut used = UsageState::new(0);
        for _ in 0..k {
            sel.register_use(&mut used, "casa", SelectionMode::Long);
        }
        assert_eq!(used.frequency("casa"), k);
        assert!(
            sel.score("casa", SelectionMode::Long, "cas", &used)
                < sel.score("casa", SelectionMode::Long, "cas", &fresh)
        );
    }
}

#[test]
fn recent_words_get_halved() {
    let sel = Selector {
        penalize_repeats: true,
        repeat_penalty: 1.0,
        show_top: 5,
    };
    let mut usage = UsageState::new(3);
    sel.register_use(&mut usage, "casa", SelectionMode::Any);

    assert_eq!(sel.score("casa", SelectionMode::Any, "zz", &usage), 0.5);
}

#[test]
fn disabling_the_penalty_ignores_history() {
    let sel = Selector {
        penalize_repeats: false,
        repeat_penalty: 0.85,
        show_top: 5,
    };
    let mut usage = UsageState::new(3);
    sel.register_use(&mut usage, "casa", SelectionMode::Any);

    assert_eq!(sel.score("casa", SelectionMode::Any, "zz", &usage), 1.0);
}

#[test]
fn alphabet_cycle_completes_once_per_full_coverage() {
    let sel = selector(5);
    let mut usage = UsageState::new(5);

    // 23 counted letters spread over a handful of words; y, k and w never count.
    let cycle = ["abcdef", "ghijlm", "nopqrs", "tuvxz", "kwy"];
    for round in 1..=3u32 {
        for (i, word) in cycle.iter().enumerate() {
            sel.register_use(&mut usage, word, SelectionMode::Alphabet);
            assert!(!usage.used_letters().contains(&'k'));
            assert!(!usage.used_letters().contains(&'w'));
            assert!(!usage.used_letters().contains(&'y'));
            if i == 3 {
                assert_eq!(usage.alphabet_completions(), round);
                assert!(usage.used_letters().is_empty());
            } else if i < 3 {
                assert_eq!(usage.alphabet_completions(), round - 1);
            }
        }
    }
    assert_eq!(ALPHABET_COMPLETION_THRESHOLD, 23);
}

#[test]
fn accented_letters_never_stand_in_for_missing_ones() {
    let sel = selector(5);
    let mut usage = UsageState::new(5);

    for word in ["abcdefghij", "lmnopqrstu", "ãçé"] {
        sel.register_use(&mut usage, word, SelectionMode::Alphabet);
    }
    assert_eq!(usage.alphabet_completions(), 0);
    assert_eq!(usage.used_letters().len(), 20);
    assert!(usage.used_letters().iter().all(|c| c.is_ascii_lowercase()));

    sel.register_use(&mut usage, "vôo", SelectionMode::Alphabet);
    assert_eq!(usage.alphabet_completions(), 0);
    sel.register_use(&mut usage, "xíz", SelectionMode::Alphabet);
    assert_eq!(usage.alphabet_completions(), 1);
    assert!(usage.used_letters().is_empty());
}

#[test]
fn other_modes_leave_the_alphabet_cycle_alone() {
    let sel = selector(5);
    let mut usage = UsageState::new(5);
    sel.register_use(&mut usage, "casa", SelectionMode::Long);
    assert!(usage.used_letters().is_empty());
}

#[test]
fn recent_window_is_bounded_and_fifo() {
    let sel = selector(5);
    let mut usage = UsageState::new(3);

    for word in ["a", "b", "c", "d", "e"] {
        sel.register_use(&mut usage, word, SelectionMode::Any);
        assert!(usage.recent_words().count() <= 3);
    }

    assert_eq!(usage.recent_words().collect::<Vec<_>>(), vec!["c", "d", "e"]);
    assert!(!usage.is_recent("a"));
    assert_eq!(usage.frequency("a"), 1);
}

#[test]
fn choose_returns_none_without_candidates() {
    let sel = selector(5);
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(
        sel.choose(&[], SelectionMode::Any, "x", &UsageState::new(5), &mut rng),
        None
    );
}

#[test]
fn choice_is_limited_to_top_n() {
    let sel = selector(1);
    let usage = UsageState::new(5);
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..50 {
        let word = sel
            .choose(&["casa", "casamento", "caso"], SelectionMode::Long, "cas", &usage, &mut rng)
            .unwrap();
        assert_eq!(word, "casamento");
    }
}

#[test]
fn zero_show_top_still_offers_one_word() {
    let sel = selector(0);
    let usage = UsageState::new(5);
    assert_eq!(sel.top(&["casa", "caso"], SelectionMode::Any, "zz", &usage).len(), 1);
}

#[test]
fn longest_word_dominates_the_draw() {
    let dict = Dictionary::from_words(["casa", "caso", "casamento", "gato"]);
    let candidates = dict.filter("cas");
    assert_eq!(candidates, vec!["casa", "caso", "casamento"]);

    let sel = selector(3);
    let usage = UsageState::new(5);
    let top = sel.top(&candidates, SelectionMode::Long, "cas", &usage);
    assert_eq!(top[0].word, "casamento");

    let counts = draw_counts(&sel, &candidates, "cas", &usage, 10_000);
    let casamento = counts.get("casamento").copied().unwrap_or(0);
    let casa = counts.get("casa").copied().unwrap_or(0);
    let caso = counts.get("caso").copied().unwrap_or(0);

    // Expected share is 9 / 17.
    assert!(casamento > casa && casamento > caso, "{counts:?}");
    assert!((4_800..5_800).contains(&casamento), "{counts:?}");
}

#[test]
fn heavy_use_drops_the_long_word_below_a_fresh_one() {
    let sel = selector(3);
    // No recent window so only the frequency penalty applies.
    let mut usage = UsageState::new(0);
    for _ in 0..5 {
        sel.register_use(&mut usage, "casamento", SelectionMode::Long);
    }

    let casamento = sel.score("casamento", SelectionMode::Long, "cas", &usage);
    let casa = sel.score("casa", SelectionMode::Long, "cas", &usage);
    assert!(casamento < casa, "casamento {casamento} vs casa {casa}");

    let top = sel.top(&["casa", "caso", "casamento"], SelectionMode::Long, "cas", &usage);
    assert_eq!(top[0].word, "casa");
}

#[test]
fn alphabet_mode_rewards_new_letters() {
    let sel = selector(5);
    let usage = UsageState::new(5).with_used_letters(['a', 's', 'c', 'o']);

    let gato = sel.score("gato", SelectionMode::Alphabet, "", &usage);
    let pele = sel.score("pele", SelectionMode::Alphabet, "", &usage);

    assert!(pele > gato, "pele {pele} vs gato {gato}");
    assert!((pele - 3.2).abs() < 1e-9);

    let top = sel.top(&["gato", "pele"], SelectionMode::Alphabet, "", &usage);
    assert_eq!(top[0].word, "pele");
}

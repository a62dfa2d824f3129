use crate::model::{PlanKind, PlanStep, RoundPlan};

#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    /// Index into `RoundPlan::steps`, or `None` for the round header.
    pub step_index: Option<usize>,
    pub line: String,
}

fn kind_label(kind: PlanKind) -> &'static str {
    match kind {
        PlanKind::Normal => "normal",
        PlanKind::FastPath => "fast path",
        PlanKind::Fallback => "fallback",
    }
}

/// Comma-separated behaviors drawn for the round, or `none`.
pub fn flags_label(plan: &RoundPlan) -> String {
    let mut flags = plan.proposed.labels();
    if plan.think_after_three {
        flags.push("think3");
    }
    if plan.numbers {
        flags.push("numbers");
    }
    if flags.is_empty() {
        "none".to_string()
    } else {
        flags.join(", ")
    }
}

/// One console line for a step.
pub fn step_trace_line(step: &PlanStep) -> String {
    let est = step.estimated_s();
    match step {
        PlanStep::Filler { text, .. } => {
            format!("Filler \"{}\" then erase (~{est:.2}s)", escape_for_log(text))
        }
        PlanStep::Rehearsal { text, .. } => {
            format!("Rehearse \"{}\" then erase (~{est:.2}s)", escape_for_log(text))
        }
        PlanStep::WrongWord { text, .. } => {
            format!("Miss \"{}\" (~{est:.2}s)", escape_for_log(text))
        }
        PlanStep::WrongThenCorrect { wrong, correct, .. } => format!(
            "Replace \"{}\" -> \"{}\" (~{est:.2}s)",
            escape_for_log(wrong),
            escape_for_log(correct)
        ),
        PlanStep::Submit { text, think_ms, .. } => match think_ms {
            Some(ms) => format!(
                "Typing \"{}\" with a {ms} ms pause after three letters (~{est:.2}s)",
                escape_for_log(text)
            ),
            None => format!("Typing \"{}\" (~{est:.2}s)", escape_for_log(text)),
        },
        PlanStep::QuickSubmit { text, .. } => {
            format!("Typing \"{}\" quickly (~{est:.2}s)", escape_for_log(text))
        }
    }
}

/// Header line plus one line per step, in execution order.
pub fn plan_console_trace(plan: &RoundPlan) -> Vec<TraceEvent> {
    let word = plan.word.as_deref().unwrap_or("-");
    let mut events = vec![TraceEvent {
        step_index: None,
        line: format!(
            "Round \"{}\" -> {word} [{}] ~{:.2}s | flags: {} | breakdown: {}",
            escape_for_log(&plan.fragment),
            kind_label(plan.kind),
            plan.estimate_s,
            flags_label(plan),
            plan.breakdown.describe()
        ),
    }];

    events.extend(plan.steps.iter().enumerate().map(|(idx, step)| TraceEvent {
        step_index: Some(idx),
        line: step_trace_line(step),
    }));
    events
}

pub fn print_trace_line(line: &str) {
    const RESET: &str = "\x1b[0m";
    const TYPING: &str = "\x1b[34m";
    const REPLACE: &str = "\x1b[33m";
    const DRAFT: &str = "\x1b[2m";

    if let Some(rest) = line.strip_prefix("Typing") {
        eprintln!("{TYPING}Typing{RESET}{rest}");
    } else if let Some(rest) = line.strip_prefix("Replace") {
        eprintln!("{REPLACE}Replace{RESET}{rest}");
    } else if line.starts_with("Filler") || line.starts_with("Rehearse") {
        eprintln!("{DRAFT}{line}{RESET}");
    } else {
        eprintln!("{line}");
    }
}

fn escape_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

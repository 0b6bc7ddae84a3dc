use regex_lite::Regex;
use std::sync::LazyLock;

const MIN_BODY_CHARS: usize = 50;
const LONG_BODY_CHARS: usize = 200;
const SIGNALS_REQUIRED: usize = 2;

const EXPECTATION_KEYWORDS: &[&str] = &[
    "expected",
    "should",
    "actual",
    "steps to reproduce",
    "acceptance criteria",
];

static STEP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"(?m)^\s*(\d+[.)]|[-*+])\s+\S") {
        Ok(regex) => regex,
        Err(err) => panic!("invalid step regex: {err}"),
    }
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequirementSignals {
    pub has_steps: bool,
    pub has_code_block: bool,
    pub has_expectations: bool,
    pub is_long: bool,
    pub meets_minimum_length: bool,
}

impl RequirementSignals {
    pub fn count(&self) -> usize {
        [
            self.has_steps,
            self.has_code_block,
            self.has_expectations,
            self.is_long,
        ]
        .into_iter()
        .filter(|signal| *signal)
        .count()
    }

    pub fn is_clear(&self) -> bool {
        self.meets_minimum_length && self.count() >= SIGNALS_REQUIRED
    }
}

pub fn requirement_signals(body: &str) -> RequirementSignals {
    let length = body.trim().chars().count();
    let lowered = body.to_lowercase();
    RequirementSignals {
        has_steps: STEP_LINE.is_match(body),
        has_code_block: body.contains("```"),
        has_expectations: EXPECTATION_KEYWORDS
            .iter()
            .any(|keyword| lowered.contains(keyword)),
        is_long: length > LONG_BODY_CHARS,
        meets_minimum_length: length >= MIN_BODY_CHARS,
    }
}

pub fn has_clear_requirements(body: &str) -> bool {
    requirement_signals(body).is_clear()
}

//! Free-text oracle answers to [`Decision`]s.
//!
//! Classification is a keyword scan with fixed precedence: the long marker is
//! checked first, then the short marker, otherwise the answer is a hold. Levels
//! are the first 4-6 digit number following the label on the same line.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::DecisionMode;
use crate::oracle::Language;
use crate::oracle::decision::{Action, Decision};

struct Lexicon {
    long: Regex,
    short: Regex,
    support: Regex,
    resistance: Regex,
}

impl Lexicon {
    fn new(long: &str, short: &str, support: &str, resistance: &str) -> Self {
        let re = |p: &str| Regex::new(p).expect("static pattern");
        Self {
            long: re(long),
            short: re(short),
            support: re(support),
            resistance: re(resistance),
        }
    }
}

const ZH_SUPPORT: &str = r"支撐.*?([0-9]{4,6})";
const ZH_RESISTANCE: &str = r"壓力.*?([0-9]{4,6})";
const EN_SUPPORT: &str = r"(?i)support.*?([0-9]{4,6})";
const EN_RESISTANCE: &str = r"(?i)resistance.*?([0-9]{4,6})";

static ZH_BAR: Lazy<Lexicon> =
    Lazy::new(|| Lexicon::new("買入", "賣出", ZH_SUPPORT, ZH_RESISTANCE));
static ZH_PLAN: Lazy<Lexicon> =
    Lazy::new(|| Lexicon::new("偏多", "偏空", ZH_SUPPORT, ZH_RESISTANCE));
static EN_BAR: Lazy<Lexicon> =
    Lazy::new(|| Lexicon::new(r"(?i)\bbuy\b", r"(?i)\bsell\b", EN_SUPPORT, EN_RESISTANCE));
static EN_PLAN: Lazy<Lexicon> =
    Lazy::new(|| Lexicon::new(r"(?i)\bbullish\b", r"(?i)\bbearish\b", EN_SUPPORT, EN_RESISTANCE));

fn lexicon(mode: DecisionMode, language: Language) -> &'static Lexicon {
    match (language, mode) {
        (Language::ZhTw, DecisionMode::PerBar) => &ZH_BAR,
        (Language::ZhTw, DecisionMode::SessionPlan) => &ZH_PLAN,
        (Language::En, DecisionMode::PerBar) => &EN_BAR,
        (Language::En, DecisionMode::SessionPlan) => &EN_PLAN,
    }
}

fn level(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Never fails: text without markers is a hold with no levels.
pub fn parse_decision(text: &str, mode: DecisionMode, language: Language) -> Decision {
    let lex = lexicon(mode, language);
    let action = if lex.long.is_match(text) {
        Action::Long
    } else if lex.short.is_match(text) {
        Action::Short
    } else {
        Action::Hold
    };
    Decision {
        action,
        support: level(&lex.support, text),
        resistance: level(&lex.resistance, text),
        rationale: text.trim().to_string(),
    }
}

//! Decision to intent.

use crate::account::{AccountState, Intent};
use crate::context::DecisionMode;
use crate::oracle::{Action, Decision};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyRules {
    pub mode: DecisionMode,
    pub allow_short: bool,
    /// Fractional band around a plan level inside which entries trigger.
    pub entry_tolerance: f64,
}

impl StrategyRules {
    /// Per-bar: long enters, short exits an open long. Session plan: enter long
    /// just above or below support, short just around resistance, only while flat.
    pub fn intent_for(
        &self,
        decision: Option<&Decision>,
        state: &AccountState,
        price: f64,
    ) -> Intent {
        let Some(d) = decision else {
            return Intent::Hold;
        };
        match self.mode {
            DecisionMode::PerBar => match d.action {
                Action::Long if state.is_flat() => Intent::EnterLong,
                Action::Short if state.is_long() => Intent::Exit,
                _ => Intent::Hold,
            },
            DecisionMode::SessionPlan => {
                if !state.is_flat() {
                    return Intent::Hold;
                }
                let eps = self.entry_tolerance;
                match (d.action, d.support, d.resistance) {
                    (Action::Long, Some(support), _) if price < support * (1.0 + eps) => {
                        Intent::EnterLong
                    }
                    (Action::Short, _, Some(resistance))
                        if self.allow_short && price > resistance * (1.0 - eps) =>
                    {
                        Intent::EnterShort
                    }
                    _ => Intent::Hold,
                }
            }
        }
    }
}

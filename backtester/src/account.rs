//! Single-position account state machine.
//!
//! [`apply`] is pure: it takes the current [`AccountState`] by reference and returns
//! the next state plus the trade it produced, if any. The engine owns the only
//! live state and the trade log.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::InvalidPriceError;

/// How capital and equity relate while a position is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquityConvention {
    /// The whole stake is in the position: equity is `position * price` and an exit
    /// turns the position back into capital. Long only.
    #[default]
    FullReinvestment,
    /// Capital is held aside and PnL accrues to it: equity is
    /// `capital + position * (price - entry)`.
    Margin,
}

/// What the strategy asks the account to do on this bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    EnterLong,
    EnterShort,
    Exit,
    ForceClose,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    EnterLong,
    EnterShort,
    Exit,
    ForcedClose,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EnterLong => "ENTER LONG",
            Self::EnterShort => "ENTER SHORT",
            Self::Exit => "EXIT",
            Self::ForcedClose => "FORCED CLOSE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: TradeAction,
    pub price: f64,
    /// Signed position size the trade opened or closed.
    pub quantity: f64,
    /// Realised PnL for closing trades.
    pub pnl: Option<f64>,
    pub rationale: String,
}

/// Capital, signed position and entry price. `entry_price` is set exactly when
/// `position != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    capital: f64,
    position: f64,
    entry_price: Option<f64>,
}

impl AccountState {
    pub fn flat(capital: f64) -> Self {
        Self {
            capital,
            position: 0.0,
            entry_price: None,
        }
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.entry_price
    }

    pub fn is_flat(&self) -> bool {
        self.entry_price.is_none()
    }

    pub fn is_long(&self) -> bool {
        self.position > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.position < 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: AccountState,
    pub trade: Option<TradeLogEntry>,
}

impl Transition {
    fn unchanged(state: &AccountState) -> Self {
        Self {
            state: *state,
            trade: None,
        }
    }
}

fn check_price(price: f64, timestamp: DateTime<Utc>) -> Result<f64, InvalidPriceError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(InvalidPriceError { price, timestamp })
    }
}

/// Applies `intent` at `price`.
///
/// Intents that would not change the state (hold, entering while positioned,
/// exiting while flat) return the state unchanged without looking at the price.
/// `EnterShort` is a no-op under [`EquityConvention::FullReinvestment`], and no
/// entry is taken without positive capital.
pub fn apply(
    state: &AccountState,
    intent: Intent,
    price: f64,
    timestamp: DateTime<Utc>,
    rationale: &str,
    convention: EquityConvention,
) -> Result<Transition, InvalidPriceError> {
    let trade = |action, price, quantity, pnl| TradeLogEntry {
        timestamp,
        action,
        price,
        quantity,
        pnl,
        rationale: rationale.to_string(),
    };

    match (intent, state.entry_price) {
        (Intent::EnterLong, None) if state.capital > 0.0 => {
            let price = check_price(price, timestamp)?;
            let quantity = state.capital / price;
            Ok(Transition {
                state: AccountState {
                    capital: state.capital,
                    position: quantity,
                    entry_price: Some(price),
                },
                trade: Some(trade(TradeAction::EnterLong, price, quantity, None)),
            })
        }
        (Intent::EnterShort, None)
            if convention == EquityConvention::Margin && state.capital > 0.0 =>
        {
            let price = check_price(price, timestamp)?;
            let quantity = -state.capital / price;
            Ok(Transition {
                state: AccountState {
                    capital: state.capital,
                    position: quantity,
                    entry_price: Some(price),
                },
                trade: Some(trade(TradeAction::EnterShort, price, quantity, None)),
            })
        }
        (Intent::Exit | Intent::ForceClose, Some(entry)) => {
            let price = check_price(price, timestamp)?;
            let pnl = state.position * (price - entry);
            let capital = match convention {
                EquityConvention::FullReinvestment => state.position * price,
                EquityConvention::Margin => state.capital + pnl,
            };
            let action = if intent == Intent::Exit {
                TradeAction::Exit
            } else {
                TradeAction::ForcedClose
            };
            Ok(Transition {
                state: AccountState::flat(capital),
                trade: Some(trade(action, price, state.position, Some(pnl))),
            })
        }
        _ => Ok(Transition::unchanged(state)),
    }
}

/// Equity at `price`. A flat account is worth its capital whatever the price.
pub fn mark_to_market(
    state: &AccountState,
    price: f64,
    timestamp: DateTime<Utc>,
    convention: EquityConvention,
) -> Result<f64, InvalidPriceError> {
    let Some(entry) = state.entry_price else {
        return Ok(state.capital);
    };
    let price = check_price(price, timestamp)?;
    Ok(match convention {
        EquityConvention::FullReinvestment => state.position * price,
        EquityConvention::Margin => state.capital + state.position * (price - entry),
    })
}

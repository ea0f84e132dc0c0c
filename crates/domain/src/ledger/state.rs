//! Cart/order lifecycle.

use serde::{Deserialize, Serialize};

/// Lifecycle of a cart becoming an order.
///
/// ```text
/// Open ──checkout──► Placed
/// ```
///
/// The transition is one-way: a placed order is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// A cart; items can still change.
    #[default]
    Open,

    /// A placed order (terminal state).
    Placed,
}

impl OrderState {
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderState::Open)
    }

    pub fn can_place(&self) -> bool {
        matches!(self, OrderState::Open)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Placed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Open => "Open",
            OrderState::Placed => "Placed",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

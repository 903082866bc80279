use std::fmt;
use std::str::FromStr;

use common::OrderStatus;

use crate::error::{OrderError, Result};

/// Rule deciding which status changes `update_status` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any of the known statuses may follow any other.
    #[default]
    Permissive,

    /// Only lifecycle edges: Pending → Processing → Shipped → Delivered,
    /// and any non-terminal status → Cancelled.
    Lifecycle,
}

impl TransitionPolicy {
    /// Returns true if moving from `from` to `to` is allowed.
    pub fn allows(&self, from: OrderStatus, to: OrderStatus) -> bool {
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Lifecycle => from.can_transition_to(to),
        }
    }

    /// Like `allows`, but returns `InvalidTransition` on refusal.
    pub fn check(&self, from: OrderStatus, to: OrderStatus) -> Result<()> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition { from, to })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionPolicy::Permissive => "permissive",
            TransitionPolicy::Lifecycle => "lifecycle",
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "lifecycle" => Ok(TransitionPolicy::Lifecycle),
            other => Err(format!("unknown transition policy: {other}")),
        }
    }
}

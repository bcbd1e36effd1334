//! Errors surfaced by protected calls.

use crate::resilience::state::State;

/// A call was rejected without running the protected work.
///
/// Raised in `open`, `forced_open`, and in `half_open` once every probe
/// permit is taken. Callers are expected to fall back or back off.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circuit breaker '{name}' is {state} and does not permit further calls")]
pub struct BreakerOpen {
    pub name: String,
    pub state: State,
}

/// Error returned by [`CircuitBreaker::call`](crate::resilience::CircuitBreaker::call).
#[derive(Debug, thiserror::Error)]
pub enum CallError<E> {
    /// The breaker rejected the call.
    #[error(transparent)]
    NotPermitted(#[from] BreakerOpen),

    /// The protected work ran and failed. Already recorded as a failure.
    #[error("{0}")]
    Failed(E),
}

impl<E> CallError<E> {
    pub fn is_not_permitted(&self) -> bool {
        matches!(self, CallError::NotPermitted(_))
    }

    /// The work's own error, if the work ran.
    pub fn into_failure(self) -> Option<E> {
        match self {
            CallError::Failed(e) => Some(e),
            CallError::NotPermitted(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let open = BreakerOpen {
            name: "payments".into(),
            state: State::ForcedOpen,
        };
        assert_eq!(
            open.to_string(),
            "circuit breaker 'payments' is forced_open and does not permit further calls"
        );

        let err: CallError<std::io::Error> = open.into();
        assert!(err.is_not_permitted());
        assert!(err.into_failure().is_none());

        let failed: CallError<&str> = CallError::Failed("boom");
        assert_eq!(failed.to_string(), "boom");
    }
}

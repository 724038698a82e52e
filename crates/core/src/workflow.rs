//! Terminal-guarded state machines.
//!
//! Both the customer review and the clarification lifecycle are expressed as
//! a [`Workflow`]: a set of states, a set of commands, and a transition table.
//! [`transition`] is the only place the terminal guard is applied.

use std::fmt;

use crate::error::WorkflowError;

pub trait Workflow {
    type State: Copy + Eq + fmt::Debug + fmt::Display;
    type Command: Copy + Eq + fmt::Debug + fmt::Display;

    /// Used in error messages.
    const NAME: &'static str;

    fn is_terminal(state: Self::State) -> bool;

    /// Transition table. `None` means the command is not valid from `state`.
    fn next(state: Self::State, command: Self::Command) -> Option<Self::State>;
}

/// Apply `command` to `state`.
///
/// Terminal states reject every command with `AlreadyFinalized`, carrying the
/// recorded state so callers can show the original outcome.
pub fn transition<W: Workflow>(
    state: W::State,
    command: W::Command,
) -> Result<W::State, WorkflowError> {
    if W::is_terminal(state) {
        return Err(WorkflowError::AlreadyFinalized {
            outcome: state.to_string(),
        });
    }
    W::next(state, command).ok_or_else(|| WorkflowError::InvalidTransition {
        workflow: W::NAME,
        from: state.to_string(),
        command: command.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Door {
        Closed,
        Open,
        Welded,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Push {
        Open,
        Weld,
    }

    impl fmt::Display for Door {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl fmt::Display for Push {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    struct DoorFlow;

    impl Workflow for DoorFlow {
        type State = Door;
        type Command = Push;
        const NAME: &'static str = "door";

        fn is_terminal(state: Door) -> bool {
            state == Door::Welded
        }

        fn next(state: Door, command: Push) -> Option<Door> {
            match (state, command) {
                (Door::Closed, Push::Open) => Some(Door::Open),
                (_, Push::Weld) => Some(Door::Welded),
                _ => None,
            }
        }
    }

    #[test]
    fn table_drives_non_terminal_states() {
        assert_eq!(transition::<DoorFlow>(Door::Closed, Push::Open), Ok(Door::Open));
        assert_eq!(transition::<DoorFlow>(Door::Open, Push::Weld), Ok(Door::Welded));
    }

    #[test]
    fn terminal_guard_precedes_the_table() {
        let err = transition::<DoorFlow>(Door::Welded, Push::Weld).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::AlreadyFinalized {
                outcome: "Welded".to_string()
            }
        );
    }

    #[test]
    fn missing_table_entry_is_invalid_transition() {
        let err = transition::<DoorFlow>(Door::Open, Push::Open).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
    }
}

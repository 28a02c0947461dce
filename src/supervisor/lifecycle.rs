use crate::error::{Error, Result};
use crate::supervisor::{RunId, SupervisorState};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Maximum number of transitions kept in memory.
const HISTORY_LIMIT: usize = 1000;

/// One supervisor state transition
#[derive(Debug, Clone)]
pub struct Transition {
    /// Supervisor run that made the transition
    pub run_id: RunId,
    /// Server name
    pub name: String,
    /// State entered
    pub state: SupervisorState,
    /// Wall-clock time of the transition
    pub timestamp: SystemTime,
    /// Transition details
    pub details: Option<String>,
}

/// Records supervisor transitions and writes each one to the log.
///
/// The log output goes to the supervisor's own stdout and log file, which is
/// what makes a post-mortem possible after the management tool has exited.
/// The in-memory history serves callers embedding the supervisor.
#[derive(Debug, Default)]
pub struct TransitionLog {
    transitions: Arc<Mutex<VecDeque<Transition>>>,
}

impl TransitionLog {
    /// Create an empty transition log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition
    pub fn record(
        &self,
        run_id: RunId,
        name: &str,
        state: SupervisorState,
        details: Option<String>,
    ) -> Result<()> {
        match (&details, state) {
            (Some(details), SupervisorState::Disabled | SupervisorState::SetupFailed) => {
                tracing::error!(%run_id, server = name, %state, "{}", details)
            }
            (Some(details), SupervisorState::ExitedCrash) => {
                tracing::warn!(%run_id, server = name, %state, "{}", details)
            }
            (Some(details), _) => tracing::info!(%run_id, server = name, %state, "{}", details),
            (None, _) => tracing::info!(%run_id, server = name, %state, "State changed"),
        }

        let mut transitions = self
            .transitions
            .lock()
            .map_err(|_| Error::Other("Failed to lock transition log".to_string()))?;

        if transitions.len() == HISTORY_LIMIT {
            transitions.pop_front();
        }
        transitions.push_back(Transition {
            run_id,
            name: name.to_string(),
            state,
            timestamp: SystemTime::now(),
            details,
        });

        Ok(())
    }

    /// Most recent state, if any transition was recorded
    pub fn current(&self) -> Result<Option<SupervisorState>> {
        let transitions = self
            .transitions
            .lock()
            .map_err(|_| Error::Other("Failed to lock transition log".to_string()))?;

        Ok(transitions.back().map(|t| t.state))
    }

    /// Recorded transitions, oldest first
    pub fn transitions(&self) -> Result<Vec<Transition>> {
        let transitions = self
            .transitions
            .lock()
            .map_err(|_| Error::Other("Failed to lock transition log".to_string()))?;

        Ok(transitions.iter().cloned().collect())
    }

    /// Sequence of recorded states, oldest first
    pub fn states(&self) -> Result<Vec<SupervisorState>> {
        Ok(self.transitions()?.into_iter().map(|t| t.state).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_order_and_current() {
        let log = TransitionLog::new();
        let run_id = RunId::new();

        assert_eq!(log.current().unwrap(), None);

        log.record(run_id, "survival", SupervisorState::Starting, None)
            .unwrap();
        log.record(
            run_id,
            "survival",
            SupervisorState::Running,
            Some("pid 42".to_string()),
        )
        .unwrap();

        assert_eq!(
            log.states().unwrap(),
            vec![SupervisorState::Starting, SupervisorState::Running]
        );
        assert_eq!(log.current().unwrap(), Some(SupervisorState::Running));
        assert_eq!(
            log.transitions().unwrap()[1].details.as_deref(),
            Some("pid 42")
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let log = TransitionLog::new();
        let run_id = RunId::new();

        for i in 0..HISTORY_LIMIT + 5 {
            log.record(run_id, "survival", SupervisorState::Starting, Some(i.to_string()))
                .unwrap();
        }

        let transitions = log.transitions().unwrap();
        assert_eq!(transitions.len(), HISTORY_LIMIT);
        // Oldest entries are dropped first.
        assert_eq!(transitions[0].details.as_deref(), Some("5"));
        assert_eq!(
            transitions[HISTORY_LIMIT - 1].details,
            Some((HISTORY_LIMIT + 4).to_string())
        );
    }
}

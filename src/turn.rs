use anyhow::Result;
use tokio::task::JoinHandle;

/// Phases of a single turn's round trip. `Succeeded` and `Failed` are
/// resting states; the next submission moves back through `Sending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    Sending,
    Succeeded,
    Failed,
}

/// Everything a turn captured at submit time. History and the
/// first-exchange flag are read before the user message is appended, so
/// the payload and the rename decision are not affected by the optimistic
/// append.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub conversation: u64,
    pub input: String,
    pub history: Vec<(String, String)>,
    pub first_exchange: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Reply(String),
    Error(String),
}

/// Tracks the one outstanding round trip. The spawned task is polled from
/// the tick handler; `try_finish` is the single resume point and yields
/// each turn's outcome exactly once.
pub struct TurnCycle {
    phase: TurnPhase,
    pending: Option<(TurnRequest, JoinHandle<Result<String>>)>,
}

impl TurnCycle {
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::default(),
            pending: None,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// True while a round trip is outstanding.
    pub fn in_flight(&self) -> bool {
        self.phase == TurnPhase::Sending
    }

    /// Starts tracking a spawned round trip. Callers guard with
    /// `in_flight` before spawning.
    pub fn begin(&mut self, request: TurnRequest, task: JoinHandle<Result<String>>) {
        self.phase = TurnPhase::Sending;
        self.pending = Some((request, task));
    }

    /// Returns the outstanding turn's request and outcome once its task has
    /// finished, or None while it is still running (or none is pending).
    pub async fn try_finish(&mut self) -> Option<(TurnRequest, TurnOutcome)> {
        if !self
            .pending
            .as_ref()
            .is_some_and(|(_, task)| task.is_finished())
        {
            return None;
        }

        let (request, task) = self.pending.take()?;
        let outcome = match task.await {
            Ok(Ok(reply)) => {
                self.phase = TurnPhase::Succeeded;
                TurnOutcome::Reply(reply)
            }
            Ok(Err(err)) => {
                self.phase = TurnPhase::Failed;
                TurnOutcome::Error(err.to_string())
            }
            // The task itself died (panic or abort)
            Err(err) => {
                self.phase = TurnPhase::Failed;
                TurnOutcome::Error(err.to_string())
            }
        };

        Some((request, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn request() -> TurnRequest {
        TurnRequest {
            conversation: 7,
            input: "hello".to_string(),
            history: Vec::new(),
            first_exchange: true,
        }
    }

    async fn wait_for_finish(cycle: &mut TurnCycle) -> (TurnRequest, TurnOutcome) {
        loop {
            if let Some(done) = cycle.try_finish().await {
                return done;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_begin_marks_sending() {
        let mut cycle = TurnCycle::new();
        assert_eq!(cycle.phase(), TurnPhase::Idle);

        let task = tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok(String::new())
        });
        cycle.begin(request(), task);

        assert!(cycle.in_flight());
        assert_eq!(cycle.phase(), TurnPhase::Sending);
        assert!(cycle.try_finish().await.is_none());
    }

    #[tokio::test]
    async fn test_success_yields_reply_once() {
        let mut cycle = TurnCycle::new();
        cycle.begin(request(), tokio::spawn(async { Ok("done".to_string()) }));

        let (finished, outcome) = wait_for_finish(&mut cycle).await;

        assert_eq!(outcome, TurnOutcome::Reply("done".to_string()));
        assert_eq!(finished.conversation, 7);
        assert!(finished.first_exchange);
        assert_eq!(cycle.phase(), TurnPhase::Succeeded);
        assert!(!cycle.in_flight());
        assert!(cycle.try_finish().await.is_none());
    }

    #[tokio::test]
    async fn test_task_error_marks_failed() {
        let mut cycle = TurnCycle::new();
        cycle.begin(request(), tokio::spawn(async { Err(anyhow!("boom")) }));

        let (_, outcome) = wait_for_finish(&mut cycle).await;

        assert!(matches!(outcome, TurnOutcome::Error(msg) if msg.contains("boom")));
        assert_eq!(cycle.phase(), TurnPhase::Failed);
        assert!(!cycle.in_flight());
    }

    #[tokio::test]
    async fn test_next_begin_moves_back_to_sending() {
        let mut cycle = TurnCycle::new();
        cycle.begin(request(), tokio::spawn(async { Err(anyhow!("boom")) }));
        wait_for_finish(&mut cycle).await;

        cycle.begin(request(), tokio::spawn(async { Ok("ok".to_string()) }));

        assert_eq!(cycle.phase(), TurnPhase::Sending);
    }
}

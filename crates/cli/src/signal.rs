use engine_core::report::RetrievalOutcome;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels the running retrieval on SIGINT or SIGTERM.
///
/// The strategies check the token between round-trips, so a signal ends the
/// traversal with the rows read so far and a resume point instead of killing
/// the process mid-page.
#[derive(Clone)]
pub struct RetrievalInterrupt {
    token: CancellationToken,
    signalled: Arc<AtomicBool>,
}

impl RetrievalInterrupt {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            signalled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawns the watcher. It exits quietly once the token is cancelled by
    /// anything other than a signal.
    pub fn watch(&self) {
        let token = self.token.clone();
        let signalled = self.signalled.clone();

        tokio::spawn(async move {
            let sigint = async {
                if let Err(err) = signal::ctrl_c().await {
                    warn!("Ctrl+C will not stop the retrieval: {err}");
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let sigterm = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(err) => {
                        warn!("SIGTERM will not stop the retrieval: {err}");
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let sigterm = std::future::pending::<()>();

            let name = tokio::select! {
                _ = sigint => "SIGINT",
                _ = sigterm => "SIGTERM",
                _ = token.cancelled() => return,
            };
            info!("{name} received, finishing the page in flight");
            signalled.store(true, Ordering::SeqCst);
            token.cancel();
        });
    }

    pub fn signalled(&self) -> bool {
        self.signalled.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Process exit status of a `docsift` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Failed = 1,
    /// Rows were written but the traversal stopped before the last page.
    Partial = 2,
    /// As `Partial`, stopped by a signal.
    Interrupted = 130,
}

impl ExitCode {
    pub fn for_outcome(outcome: &RetrievalOutcome, signalled: bool) -> Self {
        match outcome {
            RetrievalOutcome::Complete => ExitCode::Success,
            RetrievalOutcome::Cancelled { .. } if signalled => ExitCode::Interrupted,
            RetrievalOutcome::Cancelled { .. } | RetrievalOutcome::Interrupted { .. } => {
                ExitCode::Partial
            }
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::pagination::cursor::Cursor;

    #[test]
    fn outcome_maps_to_exit_code() {
        let cancelled = RetrievalOutcome::Cancelled {
            resume: Cursor::None,
            dangling_scroll: None,
        };
        let interrupted = RetrievalOutcome::Interrupted {
            error: "reset".into(),
            resume: Cursor::None,
            dangling_scroll: None,
        };

        assert_eq!(ExitCode::for_outcome(&RetrievalOutcome::Complete, true), ExitCode::Success);
        assert_eq!(ExitCode::for_outcome(&cancelled, true), ExitCode::Interrupted);
        assert_eq!(ExitCode::for_outcome(&cancelled, false), ExitCode::Partial);
        assert_eq!(ExitCode::for_outcome(&interrupted, true), ExitCode::Partial);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[tokio::test]
    async fn watcher_stays_quiet_when_cancelled_elsewhere() {
        let interrupt = RetrievalInterrupt::new(CancellationToken::new());
        interrupt.watch();
        interrupt.token().cancel();
        tokio::task::yield_now().await;

        assert!(!interrupt.signalled());
        assert!(interrupt.token().is_cancelled());
    }
}

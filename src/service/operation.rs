//! # Operation Handles
//!
//! One command in flight. The reply callback is shared between the normal
//! completion path and the abort path, and whichever answers first wins.
//!
//! State machine:
//!
//! ```text
//! Pending ──attach──▶ Running ──batch delivers──▶ Finished
//!    │                   │
//!    │ cancel / expire   │ cancel / expire: batch sealed with defaults
//!    ▼                   ▼
//! Cancelled / Expired   Finished
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::errors::{CommandError, CommandResult};
use crate::engine::{BatchControl, SealReason};

/// Final answer of a command
pub type Reply<T> = Box<dyn FnOnce(CommandResult<T>) + Send + 'static>;

/// Single-use reply slot
pub(crate) struct Responder<T> {
    reply: Mutex<Option<Reply<T>>>,
}

impl<T> Responder<T> {
    pub(crate) fn new(reply: Reply<T>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Some(reply)),
        })
    }

    /// Answer the caller. `false` if an answer was already given.
    pub(crate) fn respond(&self, result: CommandResult<T>) -> bool {
        let reply = self
            .reply
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match reply {
            Some(reply) => {
                reply(result);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
enum OperationState {
    /// Waiting on authorization or enumeration
    Pending,
    Running(BatchControl),
    Cancelled,
    Expired,
    Finished,
}

impl OperationState {
    fn as_str(&self) -> &'static str {
        match self {
            OperationState::Pending => "pending",
            OperationState::Running(_) => "running",
            OperationState::Cancelled => "cancelled",
            OperationState::Expired => "expired",
            OperationState::Finished => "finished",
        }
    }
}

type Abort = Box<dyn Fn(CommandError) + Send + Sync + 'static>;

struct OperationInner {
    command: &'static str,
    state: Mutex<OperationState>,
    abort: Abort,
}

/// Caller-side control over one command
#[derive(Clone)]
pub struct OperationHandle {
    inner: Arc<OperationInner>,
}

impl OperationHandle {
    pub(crate) fn new<T: Send + 'static>(
        command: &'static str,
        responder: Arc<Responder<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(OperationInner {
                command,
                state: Mutex::new(OperationState::Pending),
                abort: Box::new(move |error| {
                    responder.respond(Err(error));
                }),
            }),
        }
    }

    pub fn command(&self) -> &'static str {
        self.inner.command
    }

    /// Current state name, for diagnostics
    pub fn state(&self) -> &'static str {
        self.lock().as_str()
    }

    pub fn is_finished(&self) -> bool {
        matches!(*self.lock(), OperationState::Finished)
    }

    /// Cancel the command.
    ///
    /// Before the batch starts the command fails with `CANCELLED` and no
    /// batch is started. While the batch runs it is sealed with whatever it
    /// holds. Returns `false` once the command has already answered.
    pub fn cancel(&self) -> bool {
        self.interrupt(OperationState::Cancelled, SealReason::Cancelled, CommandError::cancelled)
    }

    /// Deadline expiry; same rules as [`cancel`](Self::cancel) with
    /// `TIMEOUT` instead of `CANCELLED`.
    pub fn expire(&self) -> bool {
        self.interrupt(
            OperationState::Expired,
            SealReason::DeadlineExpired,
            CommandError::timeout,
        )
    }

    fn interrupt(
        &self,
        aborted: OperationState,
        reason: SealReason,
        error: fn() -> CommandError,
    ) -> bool {
        let mut state = self.lock();
        let current = state.clone();
        match current {
            OperationState::Pending => {
                *state = aborted;
                drop(state);
                (self.inner.abort)(error());
                true
            }
            OperationState::Running(control) => {
                drop(state);
                control.seal(reason)
            }
            _ => false,
        }
    }

    /// Whether the command may still start work
    pub(crate) fn is_pending(&self) -> bool {
        matches!(*self.lock(), OperationState::Pending)
    }

    /// Record the running batch. A cancel or expiry that raced the batch
    /// start seals it straight away.
    pub(crate) fn attach(&self, control: BatchControl) {
        let mut state = self.lock();
        let current = state.clone();
        match current {
            OperationState::Pending => *state = OperationState::Running(control),
            OperationState::Cancelled => {
                drop(state);
                control.cancel();
            }
            OperationState::Expired => {
                drop(state);
                control.seal(SealReason::DeadlineExpired);
            }
            OperationState::Running(_) | OperationState::Finished => {}
        }
    }

    /// The command answered
    pub(crate) fn finish(&self) {
        let mut state = self.lock();
        if !matches!(*state, OperationState::Cancelled | OperationState::Expired) {
            *state = OperationState::Finished;
        }
    }

    fn lock(&self) -> MutexGuard<'_, OperationState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandle")
            .field("command", &self.inner.command)
            .field("state", &self.state())
            .finish()
    }
}

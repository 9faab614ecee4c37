//! Single-slot command channel between the driver and the parallelizer.
//!
//! Holds at most one [`Command`]: `send` waits until the slot is empty, `recv` takes the
//! command out of the slot. Unlike `tokio::sync::mpsc`, the pending command can be peeked
//! at without consuming it, which lets running jobs notice an upcoming `StopAll` early.
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use thiserror::Error;
use tokio::sync::Notify;

use mcx_model::{Command, CommandKind};

/// Returned when the parallelizer side is gone; gives the command back.
#[derive(Debug, Error)]
#[error("command channel closed")]
pub struct CommandSendError(pub Command);

struct Slot {
    cmd: Mutex<Option<Command>>,
    filled: Notify,
    drained: Notify,
    sender_alive: AtomicBool,
    receiver_alive: AtomicBool,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, Option<Command>> {
        // An `Option` cannot be observed half-written.
        self.cmd.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a connected sender/receiver pair.
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    let slot = Arc::new(Slot {
        cmd: Mutex::new(None),
        filled: Notify::new(),
        drained: Notify::new(),
        sender_alive: AtomicBool::new(true),
        receiver_alive: AtomicBool::new(true),
    });
    (
        CommandSender {
            slot: Arc::clone(&slot),
        },
        CommandReceiver { slot },
    )
}

/// Driver end of the channel.
pub struct CommandSender {
    slot: Arc<Slot>,
}

impl CommandSender {
    /// Put `cmd` into the slot, waiting for the previous command to be consumed first.
    pub async fn send(&self, cmd: Command) -> Result<(), CommandSendError> {
        loop {
            if !self.slot.receiver_alive.load(Ordering::Acquire) {
                return Err(CommandSendError(cmd));
            }
            {
                let mut slot = self.slot.lock();
                if slot.is_none() {
                    *slot = Some(cmd);
                    drop(slot);
                    self.slot.filled.notify_one();
                    return Ok(());
                }
            }
            self.slot.drained.notified().await;
        }
    }

    /// `true` while a command sits in the slot unconsumed.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl Drop for CommandSender {
    fn drop(&mut self) {
        self.slot.sender_alive.store(false, Ordering::Release);
        self.slot.filled.notify_one();
    }
}

/// Parallelizer end of the channel.
pub struct CommandReceiver {
    slot: Arc<Slot>,
}

impl CommandReceiver {
    /// Take the next command, waiting for one to arrive.
    ///
    /// Returns `None` once the sender is dropped and the slot is empty. Cancel safe.
    pub async fn recv(&mut self) -> Option<Command> {
        loop {
            // Read liveness before the slot: a command sent right before the sender
            // was dropped is still delivered.
            let closed = !self.slot.sender_alive.load(Ordering::Acquire);
            let taken = self.slot.lock().take();
            if let Some(cmd) = taken {
                self.slot.drained.notify_one();
                return Some(cmd);
            }
            if closed {
                return None;
            }
            self.slot.filled.notified().await;
        }
    }

    /// Non-consuming view of the slot.
    pub fn peek(&self) -> CommandPeek {
        CommandPeek {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl Drop for CommandReceiver {
    fn drop(&mut self) {
        self.slot.receiver_alive.store(false, Ordering::Release);
        self.slot.drained.notify_one();
    }
}

/// Read-only handle for looking at the pending command.
///
/// The answer may be stale by the time it is used; callers treat it as a hint.
#[derive(Clone)]
pub struct CommandPeek {
    slot: Arc<Slot>,
}

impl CommandPeek {
    /// Kind of the command waiting in the slot, if any.
    pub fn kind(&self) -> Option<CommandKind> {
        self.slot.lock().as_ref().map(Command::kind)
    }

    /// `true` if the next command the parallelizer will consume is `StopAll`.
    pub fn stop_pending(&self) -> bool {
        self.kind() == Some(CommandKind::StopAll)
    }
}

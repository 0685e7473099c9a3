//! Request correlation and per-call timeout supervision.
//!
//! The backend echoes only the command name, so the correlation key is the
//! command. At most one call per command can be matched at a time:
//!
//! - Each registration gets a private ticket and a oneshot channel.
//! - `routes` maps a command to the ticket that an inbound response for
//!   that command will settle.
//! - Under [`DuplicatePolicy::Replace`] a second registration takes the
//!   route. The earlier ticket stays in `entries` as an orphan: no response
//!   can reach it, but its own timeout or a connection close still settles
//!   it.
//! - Under [`DuplicatePolicy::Reject`] a second registration fails with
//!   [`RpcError::AlreadyPending`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use qcr_core::{Command, ResponseEnvelope};
use qcr_settings::DuplicatePolicy;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::RpcError;
use crate::transport::InboundHandler;

/// What a pending call eventually receives.
pub type Settlement = Result<ResponseEnvelope, RpcError>;

/// Identifies one registration, distinct even between calls for the same
/// command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Ticket(u64);

struct Pending {
    command: Command,
    tx: oneshot::Sender<Settlement>,
}

#[derive(Default)]
struct Table {
    entries: HashMap<Ticket, Pending>,
    routes: HashMap<Command, Ticket>,
    next_ticket: u64,
}

impl Table {
    fn remove(&mut self, ticket: Ticket) -> Option<Pending> {
        let pending = self.entries.remove(&ticket)?;
        if self.routes.get(&pending.command) == Some(&ticket) {
            let _ = self.routes.remove(&pending.command);
        }
        Some(pending)
    }
}

/// Tracks in-flight calls and settles them from inbound frames.
pub struct Correlator {
    table: Mutex<Table>,
    policy: DuplicatePolicy,
}

impl Correlator {
    /// Create an empty correlator.
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            policy,
        }
    }

    /// Register a call for `command` that will time out after `timeout`.
    ///
    /// The returned [`PendingCall`] deregisters itself when dropped.
    pub fn register(
        self: &Arc<Self>,
        command: Command,
        timeout: Duration,
    ) -> Result<PendingCall, RpcError> {
        let (tx, rx) = oneshot::channel();
        let ticket = {
            let mut table = self.table.lock();
            if let Some(&previous) = table.routes.get(&command) {
                match self.policy {
                    DuplicatePolicy::Reject => return Err(RpcError::AlreadyPending { command }),
                    DuplicatePolicy::Replace => warn!(
                        %command,
                        orphaned = previous.0,
                        "replacing pending call; the earlier call can no longer be correlated"
                    ),
                }
            }
            table.next_ticket += 1;
            let ticket = Ticket(table.next_ticket);
            let _ = table.entries.insert(ticket, Pending { command, tx });
            let _ = table.routes.insert(command, ticket);
            ticket
        };
        Ok(PendingCall {
            correlator: Arc::clone(self),
            ticket,
            command,
            timeout,
            rx,
        })
    }

    /// Settle the call routed for `response.command`.
    ///
    /// Returns `false` when no call is waiting for that command; the
    /// response is then dropped.
    pub fn correlate(&self, response: ResponseEnvelope) -> bool {
        let Some(command) = Command::from_wire(&response.command) else {
            warn!(command = %response.command, "response for unknown command, dropping");
            return false;
        };
        let pending = {
            let mut table = self.table.lock();
            match table.routes.get(&command).copied() {
                Some(ticket) => table.remove(ticket),
                None => None,
            }
        };
        let Some(pending) = pending else {
            warn!(%command, "no pending request for command, dropping response");
            return false;
        };

        let settlement = if response.success {
            debug!(%command, "response correlated");
            Ok(response)
        } else {
            let message = response.failure_message().to_owned();
            debug!(%command, %message, "command failed");
            Err(RpcError::CommandFailed { command, message })
        };
        // The receiver is gone only if the caller was dropped mid-flight.
        let _ = pending.tx.send(settlement);
        true
    }

    /// Parse a raw text frame and correlate it.
    ///
    /// Malformed frames cannot be attributed to any call and are logged
    /// and dropped.
    pub fn handle_frame(&self, frame: &str) -> bool {
        match ResponseEnvelope::parse(frame) {
            Ok(response) => self.correlate(response),
            Err(e) => {
                let err = RpcError::MalformedResponse { reason: e.reason };
                warn!(error = %err, "dropping inbound frame");
                false
            }
        }
    }

    /// Settle every pending call, orphans included, with the error built by
    /// `reason`. Returns how many calls were settled.
    pub fn fail_all(&self, reason: impl Fn(Command) -> RpcError) -> usize {
        let drained: Vec<Pending> = {
            let mut table = self.table.lock();
            table.routes.clear();
            table.entries.drain().map(|(_, p)| p).collect()
        };
        let count = drained.len();
        for pending in drained {
            let _ = pending.tx.send(Err(reason(pending.command)));
        }
        count
    }

    /// Remove a registration without settling it. Returns `true` if it was
    /// still registered.
    fn remove(&self, ticket: Ticket) -> bool {
        self.table.lock().remove(ticket).is_some()
    }

    /// Number of registered calls, orphans included.
    pub fn pending_count(&self) -> usize {
        self.table.lock().entries.len()
    }

    /// Number of registered calls that no response can reach.
    pub fn orphaned_count(&self) -> usize {
        let table = self.table.lock();
        table.entries.len() - table.routes.len()
    }

    /// Whether an inbound response for `command` would settle a call.
    pub fn is_routed(&self, command: Command) -> bool {
        self.table.lock().routes.contains_key(&command)
    }
}

impl InboundHandler for Correlator {
    fn on_message(&self, frame: &str) {
        let _ = self.handle_frame(frame);
    }

    fn on_close(&self) {
        let abandoned = self.fail_all(|command| RpcError::ConnectionClosed { command });
        if abandoned > 0 {
            info!(abandoned, "failed pending calls on connection close");
        }
    }
}

/// A registered call awaiting its settlement.
pub struct PendingCall {
    correlator: Arc<Correlator>,
    ticket: Ticket,
    command: Command,
    timeout: Duration,
    rx: oneshot::Receiver<Settlement>,
}

impl PendingCall {
    /// The command this call is waiting on.
    pub fn command(&self) -> Command {
        self.command
    }

    /// Wait for the response, the timeout, or the connection closing,
    /// whichever comes first.
    ///
    /// On timeout the call's own registration is removed, so a late
    /// response for the command is dropped rather than matched.
    pub async fn settle(mut self) -> Settlement {
        match tokio::time::timeout(self.timeout, &mut self.rx).await {
            Ok(Ok(settlement)) => settlement,
            Ok(Err(_)) => Err(RpcError::ConnectionClosed {
                command: self.command,
            }),
            Err(_) => {
                if self.correlator.remove(self.ticket) {
                    let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                    warn!(command = %self.command, timeout_ms, "timed out waiting for response");
                    Err(RpcError::Timeout {
                        command: self.command,
                        timeout_ms,
                    })
                } else {
                    // Settled in the same instant the deadline fired.
                    self.rx.try_recv().unwrap_or(Err(RpcError::ConnectionClosed {
                        command: self.command,
                    }))
                }
            }
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        // No-op once settled; otherwise keeps abandoned futures from
        // leaving entries behind.
        let _ = self.correlator.remove(self.ticket);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

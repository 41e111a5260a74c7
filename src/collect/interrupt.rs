//! Forwarding of Ctrl+C to traced children.
//!
//! The OS-level handler is installed at most once per process and only ever
//! touches an [`InterruptRelay`]. Each child is attached to the relay for
//! exactly its own lifetime through a [`RelayGuard`], so nothing outlives a
//! single `collect` call except the (then idle) handler. Overlapping
//! `collect` calls each keep their own attachment.

use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

static GLOBAL_RELAY: OnceLock<InterruptRelay> = OnceLock::new();

#[derive(Debug, Default)]
struct Attachments {
    next_token: u64,
    /// (token, pid) in attach order
    children: Vec<(u64, u32)>,
}

/// Routes an interrupt to every attached child, once per attachment
#[derive(Debug, Clone, Default)]
pub struct InterruptRelay {
    slots: Arc<Mutex<Attachments>>,
}

impl InterruptRelay {
    /// A relay not wired to any OS signal; interrupts arrive via [`interrupt`](Self::interrupt)
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide relay, installing the Ctrl+C handler on first use
    pub fn global() -> &'static InterruptRelay {
        GLOBAL_RELAY.get_or_init(|| {
            let relay = InterruptRelay::new();
            let handler_relay = relay.clone();
            // Another library may already own the handler (e.g. test harnesses)
            if let Err(e) = ctrlc::set_handler(move || {
                handler_relay.interrupt();
            }) {
                warn!(
                    "Cannot install Ctrl+C handler, interrupts will not be forwarded: {}",
                    e
                );
            }
            relay
        })
    }

    /// Attach a child pid until the returned guard is dropped
    pub fn attach(&self, pid: u32) -> RelayGuard<'_> {
        let mut slots = self.lock();
        let token = slots.next_token;
        slots.next_token += 1;
        slots.children.push((token, pid));
        debug!("Forwarding interrupts to pid {}", pid);
        RelayGuard { relay: self, token }
    }

    /// Forward an interrupt to every attached child.
    ///
    /// Returns `true` when at least one child was attached. The attachments
    /// are consumed, so later interrupts are ignored until the next `attach`.
    pub fn interrupt(&self) -> bool {
        let children = std::mem::take(&mut self.lock().children);
        if children.is_empty() {
            debug!("Interrupt received with no attached child");
            return false;
        }
        for (_, pid) in children {
            debug!("Forwarding SIGINT to pid {}", pid);
            forward_interrupt(pid);
        }
        true
    }

    /// Pids still waiting for an interrupt, in attach order
    pub fn attached(&self) -> Vec<u32> {
        self.lock().children.iter().map(|&(_, pid)| pid).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Attachments> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Detaches its own child from the relay on drop
#[must_use = "the child is detached as soon as the guard is dropped"]
pub struct RelayGuard<'a> {
    relay: &'a InterruptRelay,
    token: u64,
}

impl Drop for RelayGuard<'_> {
    fn drop(&mut self) {
        self.relay
            .lock()
            .children
            .retain(|&(token, _)| token != self.token);
    }
}

#[cfg(unix)]
fn forward_interrupt(pid: u32) {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
    if ret != 0 {
        warn!(
            "Failed to forward SIGINT to pid {}: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
}

// Console Ctrl+C already reaches every process attached to the console.
#[cfg(not(unix))]
fn forward_interrupt(pid: u32) {
    debug!("Ctrl+C is delivered to pid {} by the console", pid);
}

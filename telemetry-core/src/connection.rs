// Connection lifecycle tracking and reconnect backoff.
// Invariants: retry_count resets on open and never exceeds the ceiling; Stopped is absorbing.

use std::time::Duration;

use serde::Serialize;

use crate::model::Liveness;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub ceiling: u32,
}

impl ReconnectPolicy {
    pub const DEFAULT_BASE: Duration = Duration::from_millis(500);
    pub const DEFAULT_CEILING: u32 = 6;

    pub fn new(base: Duration, ceiling: u32) -> Self {
        Self { base, ceiling }
    }

    // base * 2^min(retry_count, ceiling), saturating.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.min(self.ceiling);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor)
    }

    pub fn max_delay(&self) -> Duration {
        self.delay_for(self.ceiling)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE, Self::DEFAULT_CEILING)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: ConnectionPhase,
    pub to: ConnectionPhase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub phase: ConnectionPhase,
    pub liveness: Liveness,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_ms: Option<u64>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            liveness: Liveness::Offline,
            retry_count: 0,
            next_retry_ms: None,
        }
    }
}

// Decides transitions and delays; the caller owns the transport and the timer.
#[derive(Clone, Debug)]
pub struct ConnectionTracker {
    policy: ReconnectPolicy,
    phase: ConnectionPhase,
    retry_count: u32,
    pending_retry: Option<Duration>,
}

impl ConnectionTracker {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            phase: ConnectionPhase::Disconnected,
            retry_count: 0,
            pending_retry: None,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn pending_retry(&self) -> Option<Duration> {
        self.pending_retry
    }

    pub fn liveness(&self) -> Liveness {
        if self.phase == ConnectionPhase::Connected {
            Liveness::Online
        } else {
            Liveness::Offline
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == ConnectionPhase::Stopped
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            phase: self.phase,
            liveness: self.liveness(),
            retry_count: self.retry_count,
            next_retry_ms: self.pending_retry.map(|delay| delay.as_millis() as u64),
        }
    }

    pub fn enable(&mut self) -> Option<PhaseTransition> {
        match self.phase {
            ConnectionPhase::Disconnected => Some(self.move_to(ConnectionPhase::Connecting)),
            _ => None,
        }
    }

    pub fn on_open(&mut self) -> Option<PhaseTransition> {
        match self.phase {
            ConnectionPhase::Connecting => {
                self.retry_count = 0;
                Some(self.move_to(ConnectionPhase::Connected))
            }
            _ => None,
        }
    }

    // Transport closed or failed before opening.
    pub fn on_closed(&mut self) -> Option<Duration> {
        match self.phase {
            ConnectionPhase::Connecting | ConnectionPhase::Connected => {
                let delay = self.policy.delay_for(self.retry_count);
                self.retry_count = self.retry_count.saturating_add(1).min(self.policy.ceiling);
                self.pending_retry = Some(delay);
                self.move_to(ConnectionPhase::Reconnecting);
                Some(delay)
            }
            _ => None,
        }
    }

    pub fn on_retry_elapsed(&mut self) -> Option<PhaseTransition> {
        match self.phase {
            ConnectionPhase::Reconnecting => {
                self.pending_retry = None;
                Some(self.move_to(ConnectionPhase::Connecting))
            }
            _ => None,
        }
    }

    pub fn disable(&mut self) -> Option<PhaseTransition> {
        if self.phase == ConnectionPhase::Stopped {
            return None;
        }
        self.pending_retry = None;
        Some(self.move_to(ConnectionPhase::Stopped))
    }

    fn move_to(&mut self, next: ConnectionPhase) -> PhaseTransition {
        let transition = PhaseTransition {
            from: self.phase,
            to: next,
        };
        self.phase = next;
        transition
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

// ── Write convergence ──
//
// The service may accept a configuration write and apply it later. After
// a write that is not acknowledged as applied, the target is re-fetched on
// a fixed interval until every submitted field reads back with the value
// that was sent, or the deadline passes. Only submitted fields are
// compared; side effects on other fields are not checked.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use skydrop_api::models::{ControllerData, ControllerPatch, WriteAck, ZoneData, ZonePatch};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::config::ConvergencePolicy;
use crate::error::CoreError;

/// A set of configuration fields that can be checked against a snapshot.
pub trait ConfigPatch: Serialize + fmt::Debug + Sync {
    type Snapshot;

    /// Names of submitted fields whose snapshot value differs.
    fn pending_fields(&self, snapshot: &Self::Snapshot) -> Vec<&'static str>;
}

impl ConfigPatch for ControllerPatch {
    type Snapshot = ControllerData;

    fn pending_fields(&self, snapshot: &ControllerData) -> Vec<&'static str> {
        let mut pending = Vec::new();
        if self.on.is_some() && self.on != snapshot.on {
            pending.push("on");
        }
        if self.name.is_some() && self.name != snapshot.name {
            pending.push("name");
        }
        pending
    }
}

impl ConfigPatch for ZonePatch {
    type Snapshot = ZoneData;

    fn pending_fields(&self, snapshot: &ZoneData) -> Vec<&'static str> {
        let mut pending = Vec::new();
        if self.on.is_some() && self.on != snapshot.on {
            pending.push("on");
        }
        if self.duration.is_some() && self.duration != snapshot.duration {
            pending.push("duration");
        }
        pending
    }
}

/// A remote resource with a configuration endpoint and a re-fetchable snapshot.
pub(crate) trait ConfigTarget {
    type Patch: ConfigPatch;

    /// Human-readable identity for logs and errors.
    fn describe(&self) -> String;

    /// Issue the configuration write.
    async fn submit(&self, patch: &Self::Patch) -> Result<WriteAck, CoreError>;

    /// Re-fetch the full snapshot the patch is compared against.
    async fn reload(&mut self) -> Result<(), CoreError>;

    /// Submitted fields not yet visible in the current snapshot.
    fn pending(&self, patch: &Self::Patch) -> Vec<&'static str>;
}

/// Outcome of a configuration write.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Convergence {
    /// The write response itself reported success; no polling happened.
    Acknowledged,
    /// Every submitted field read back after `polls` re-fetches.
    Converged { polls: u32 },
    /// The deadline passed with fields still differing. The write may
    /// have partially applied; snapshots hold the last observation.
    TimedOut {
        target: String,
        polls: u32,
        pending: Vec<&'static str>,
        timeout: Duration,
    },
}

impl Convergence {
    /// `true` unless the write went unconfirmed within the budget.
    pub fn is_confirmed(&self) -> bool {
        !matches!(self, Self::TimedOut { .. })
    }

    /// Number of re-fetches performed.
    pub fn polls(&self) -> u32 {
        match self {
            Self::Acknowledged => 0,
            Self::Converged { polls } | Self::TimedOut { polls, .. } => *polls,
        }
    }

    /// Turn a timeout into [`CoreError::NotConverged`].
    pub fn into_result(self) -> Result<Self, CoreError> {
        match self {
            Self::TimedOut {
                target,
                pending,
                timeout,
                ..
            } => Err(CoreError::NotConverged {
                target,
                pending,
                timeout,
            }),
            other => Ok(other),
        }
    }
}

/// Write `patch` to `target` and wait for it to read back.
///
/// The deadline is fixed before the write. Each iteration sleeps one poll
/// interval, reloads, and compares; a new iteration starts only while the
/// deadline has not passed, so the worst case is `timeout + poll_interval`
/// plus one request. Transport errors from the write or any reload
/// propagate immediately.
pub(crate) async fn apply<T: ConfigTarget>(
    target: &mut T,
    patch: &T::Patch,
    policy: ConvergencePolicy,
) -> Result<Convergence, CoreError> {
    let deadline = Instant::now() + policy.timeout;

    let ack = target.submit(patch).await?;
    if ack.is_applied() {
        debug!(resource = %target.describe(), ?patch, "write applied immediately");
        return Ok(Convergence::Acknowledged);
    }

    let mut polls = 0u32;
    while Instant::now() < deadline {
        sleep(policy.poll_interval).await;
        target.reload().await?;
        polls += 1;

        if target.pending(patch).is_empty() {
            debug!(resource = %target.describe(), ?patch, polls, "write converged");
            return Ok(Convergence::Converged { polls });
        }
    }

    let pending = target.pending(patch);
    let described = target.describe();
    warn!(
        resource = %described,
        fields = ?patch,
        timeout_secs = policy.timeout.as_secs_f64(),
        ?pending,
        polls,
        "configuration write not confirmed before timeout"
    );

    Ok(Convergence::TimedOut {
        target: described,
        polls,
        pending,
        timeout: policy.timeout,
    })
}

//! Rotation policy evaluation.
//!
//! A key is stale when its current version was created strictly before
//! `now - ROTATION_WINDOW_DAYS`. Both sides are absolute UTC instants.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Maximum age of a key version before it is reported.
pub const ROTATION_WINDOW_DAYS: i64 = 180;

/// The oldest creation time that is still compliant at `now`.
pub fn rotation_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(ROTATION_WINDOW_DAYS)
}

/// `true` iff `version_created_at < now - 180 days`.
pub fn is_stale(version_created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    version_created_at < rotation_cutoff(now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Compliance {
    Compliant,
    Stale,
}

/// Classification of one key version, with its age in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub compliance: Compliance,
    pub age_days: i64,
}

pub fn evaluate(version_created_at: DateTime<Utc>, now: DateTime<Utc>) -> Evaluation {
    let compliance = if is_stale(version_created_at, now) {
        Compliance::Stale
    } else {
        Compliance::Compliant
    };
    Evaluation {
        compliance,
        age_days: now.signed_duration_since(version_created_at).num_days(),
    }
}

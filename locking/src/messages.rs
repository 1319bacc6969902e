use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Lease;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "lowercase")]
pub enum LockRequest {
    CheckLock(LockQuery),
    ObtainLock(LockQuery),
}

impl network::WireRequest for LockRequest {
    const KINDS: &'static [&'static str] = &["checklock", "obtainlock"];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockQuery {
    pub docname: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "lowercase")]
pub enum LockResponse {
    Unlocked(UnlockedReply),
    LockOwned(LeaseReply),
    Locked(LeaseReply),
    LockGranted(LeaseReply),
    LockRegranted(LeaseReply),
    Error(network::ErrorReply),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedReply {
    pub docname: String,
}

/// Wire view of a lease. `clientId` is the holder, which for `locked` is
/// not the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaseReply {
    pub docname: String,
    pub client_id: String,
    pub granted_at: DateTime<Utc>,
    pub timeout_ms: u64,
}

impl LeaseReply {
    pub fn new(docname: impl Into<String>, lease: &Lease) -> Self {
        Self {
            docname: docname.into(),
            client_id: lease.owner.clone(),
            granted_at: lease.granted_at,
            timeout_ms: lease.timeout.num_milliseconds().max(0) as u64,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.granted_at + chrono::Duration::milliseconds(self.timeout_ms as i64)
    }
}

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Time-bounded exclusive grant on one file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub owner: String,
    pub granted_at: DateTime<Utc>,
    pub timeout: Duration,
}

impl Lease {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.granted_at + self.timeout
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    Unlocked,
    /// The caller holds the live lease.
    Owned(Lease),
    /// Another client holds the live lease.
    Locked(Lease),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Granted(Lease),
    /// The caller already held the lease; it now runs from `now`.
    Regranted(Lease),
    Locked(Lease),
}

/// Lease per file name. Expired leases are evicted lazily by whichever
/// call touches the name next; there is no sweeper and no release.
#[derive(Debug)]
pub struct LeaseTable {
    leases: HashMap<String, Lease>,
    timeout: Duration,
}

impl LeaseTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            leases: HashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn check(&mut self, docname: &str, client_id: &str, now: DateTime<Utc>) -> LockStatus {
        match self.live_lease(docname, now) {
            None => LockStatus::Unlocked,
            Some(lease) if lease.owner == client_id => LockStatus::Owned(lease),
            Some(lease) => LockStatus::Locked(lease),
        }
    }

    pub fn obtain(&mut self, docname: &str, client_id: &str, now: DateTime<Utc>) -> Acquisition {
        let fresh = Lease {
            owner: client_id.to_string(),
            granted_at: now,
            timeout: self.timeout,
        };

        match self.live_lease(docname, now) {
            Some(lease) if lease.owner != client_id => Acquisition::Locked(lease),
            Some(_) => {
                self.leases.insert(docname.to_string(), fresh.clone());
                tracing::debug!("Lease on {} extended for {}", docname, client_id);
                Acquisition::Regranted(fresh)
            }
            None => {
                self.leases.insert(docname.to_string(), fresh.clone());
                tracing::debug!("Lease on {} granted to {}", docname, client_id);
                Acquisition::Granted(fresh)
            }
        }
    }

    /// Number of entries in the table, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    /// Evicts an expired lease on `docname` and returns the live one, if any.
    fn live_lease(&mut self, docname: &str, now: DateTime<Utc>) -> Option<Lease> {
        let lease = self.leases.get(docname)?.clone();
        if lease.is_live(now) {
            return Some(lease);
        }

        tracing::info!(
            "Lease on {} held by {} expired at {}",
            docname,
            lease.owner,
            lease.expires_at()
        );
        self.leases.remove(docname);
        None
    }
}

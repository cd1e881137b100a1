//! Single-flight registry for spreadsheet import runs
//!
//! Guards against two concurrent process requests for the same spreadsheet
//! id double-creating contacts. Claims are released automatically via an
//! RAII guard, so a panicking or erroring run can never leave its id
//! claimed forever.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use uuid::Uuid;

/// Global registry singleton
pub static ACTIVE_RUNS: Lazy<ActiveRunRegistry> = Lazy::new(ActiveRunRegistry::default);

/// RAII guard holding one spreadsheet id claimed. Dropping it releases the
/// claim.
pub struct RunGuard {
    spreadsheet_id: Uuid,
    registry: ActiveRunRegistry,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.release(&self.spreadsheet_id);
    }
}

/// Thread-safe set of spreadsheet ids with an import run in flight.
#[derive(Clone, Default)]
pub struct ActiveRunRegistry {
    runs: Arc<Mutex<HashSet<Uuid>>>,
}

impl ActiveRunRegistry {
    /// Claim a spreadsheet id for processing. Returns `None` when a run for
    /// the id is already active; the caller must reject the request, not
    /// queue it.
    pub fn claim(&self, spreadsheet_id: Uuid) -> Option<RunGuard> {
        let mut runs = self.runs.lock();
        if !runs.insert(spreadsheet_id) {
            return None;
        }
        Some(RunGuard {
            spreadsheet_id,
            registry: self.clone(),
        })
    }

    fn release(&self, spreadsheet_id: &Uuid) {
        self.runs.lock().remove(spreadsheet_id);
    }

    #[cfg(test)]
    fn contains(&self, spreadsheet_id: &Uuid) -> bool {
        self.runs.lock().contains(spreadsheet_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_then_second_claim_rejected() {
        let registry = ActiveRunRegistry::default();
        let id = Uuid::new_v4();

        let guard = registry.claim(id);
        assert!(guard.is_some());
        assert!(registry.claim(id).is_none());

        drop(guard);
        assert!(registry.claim(id).is_some());
    }

    #[test]
    fn test_guard_drop_releases_claim() {
        let registry = ActiveRunRegistry::default();
        let id = Uuid::new_v4();
        {
            let _guard = registry.claim(id).unwrap();
            assert!(registry.contains(&id));
        }
        assert!(!registry.contains(&id));
    }

    #[test]
    fn test_different_ids_run_in_parallel() {
        let registry = ActiveRunRegistry::default();
        let first = registry.claim(Uuid::new_v4());
        let second = registry.claim(Uuid::new_v4());
        assert!(first.is_some() && second.is_some());
    }
}

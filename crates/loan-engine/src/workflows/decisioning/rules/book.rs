use std::sync::{Arc, PoisonError, RwLock};

use super::RuleSet;

/// Shared holder for the compiled rule set.
///
/// Evaluations take an `Arc` snapshot and never observe a partially updated set; writers build
/// a complete replacement and swap it in under the write lock.
#[derive(Debug, Default)]
pub struct RuleBook {
    current: RwLock<Arc<RuleSet>>,
}

impl RuleBook {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rules)),
        }
    }

    pub fn snapshot(&self) -> Arc<RuleSet> {
        // The guarded value is only ever replaced wholesale, so a poisoned lock still holds a
        // consistent set.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a new rule set, returning the one it replaced.
    pub fn replace(&self, rules: RuleSet) -> Arc<RuleSet> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(rules))
    }
}

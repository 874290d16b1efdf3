//! Eviction planning for memory optimization.
//!
//! Priority-weighted LRU: candidates are ordered by `(priority ascending,
//! stored_at ascending)` — lowest-priority, oldest first — and evicted from
//! the front of that ordering until usage drops to the target. A protected
//! floor of the highest-ranked entries is never evicted, so the currently
//! active high-priority data survives even when it is old.
//!
//! Planning is pure; the coordinator applies the plan to both tiers.

/// Which tier a candidate lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Memory,
    Persistent,
}

/// One evictable entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionCandidate {
    /// Persisted key form (also parseable back into a `CacheKey`).
    pub storage_key: String,
    pub tier: Tier,
    pub priority: u8,
    pub stored_at_ms: u64,
    pub size_bytes: u64,
}

/// Result of one planning pass.
#[derive(Debug, Clone, Default)]
pub struct EvictionPlan {
    pub victims: Vec<EvictionCandidate>,
    pub bytes_freed: u64,
}

/// Choose which entries to evict so that `used_bytes` drops to
/// `target_bytes`, keeping at least `protected_floor` of the most valuable
/// entries regardless.
pub fn plan_eviction(
    mut candidates: Vec<EvictionCandidate>,
    used_bytes: u64,
    target_bytes: u64,
    protected_floor: usize,
) -> EvictionPlan {
    if used_bytes <= target_bytes || candidates.is_empty() {
        return EvictionPlan::default();
    }

    // Lowest priority, oldest first; the protected floor sits at the back.
    candidates.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(a.stored_at_ms.cmp(&b.stored_at_ms))
    });

    let evictable = candidates.len().saturating_sub(protected_floor);
    let mut plan = EvictionPlan::default();
    let mut remaining = used_bytes;

    for candidate in candidates.into_iter().take(evictable) {
        if remaining <= target_bytes {
            break;
        }
        remaining = remaining.saturating_sub(candidate.size_bytes);
        plan.bytes_freed += candidate.size_bytes;
        plan.victims.push(candidate);
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(key: &str, priority: u8, stored_at_ms: u64, size: u64) -> EvictionCandidate {
        EvictionCandidate {
            storage_key: key.to_string(),
            tier: Tier::Memory,
            priority,
            stored_at_ms,
            size_bytes: size,
        }
    }

    #[test]
    fn no_eviction_when_under_target() {
        let plan = plan_eviction(vec![candidate("a", 1, 0, 100)], 100, 200, 0);
        assert!(plan.victims.is_empty());
    }

    #[test]
    fn low_priority_evicted_before_newer_high_priority() {
        // A is low priority and older, B is high priority and newer;
        // freeing one entry's worth must evict A regardless of recency.
        let a = candidate("a", 1, 1_000, 100);
        let b = candidate("b", 5, 2_000, 100);
        let plan = plan_eviction(vec![b.clone(), a.clone()], 200, 100, 0);

        assert_eq!(plan.victims, vec![a]);
    }

    #[test]
    fn low_priority_evicted_even_when_more_recent() {
        let old_high = candidate("high", 8, 1_000, 100);
        let new_low = candidate("low", 1, 9_000, 100);
        let plan = plan_eviction(vec![old_high.clone(), new_low.clone()], 200, 100, 0);

        assert_eq!(plan.victims, vec![new_low]);
    }

    #[test]
    fn same_priority_falls_back_to_oldest_first() {
        let older = candidate("older", 3, 100, 50);
        let newer = candidate("newer", 3, 200, 50);
        let plan = plan_eviction(vec![newer.clone(), older.clone()], 100, 60, 0);

        assert_eq!(plan.victims, vec![older]);
    }

    #[test]
    fn evicts_until_target_reached() {
        let candidates = vec![
            candidate("a", 1, 1, 100),
            candidate("b", 2, 2, 100),
            candidate("c", 3, 3, 100),
        ];
        let plan = plan_eviction(candidates, 300, 100, 0);

        assert_eq!(plan.victims.len(), 2);
        assert_eq!(plan.bytes_freed, 200);
    }

    #[test]
    fn protected_floor_survives_even_under_pressure() {
        let candidates = vec![
            candidate("a", 1, 1, 100),
            candidate("b", 2, 2, 100),
            candidate("c", 9, 3, 100),
        ];
        // Target of zero would normally evict everything; the floor keeps
        // the top-ranked entry.
        let plan = plan_eviction(candidates, 300, 0, 1);

        assert_eq!(plan.victims.len(), 2);
        assert!(plan.victims.iter().all(|v| v.storage_key != "c"));
    }

    #[test]
    fn floor_larger_than_population_evicts_nothing() {
        let plan = plan_eviction(vec![candidate("a", 1, 1, 100)], 100, 0, 10);
        assert!(plan.victims.is_empty());
    }
}

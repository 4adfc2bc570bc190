//! Plan cache: Moka LRU keyed by record type, policies and column list.
//! Together with the type registry this is everything the scanner memoizes.

use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use moka::sync::Cache;
use rowscan_api::mapping::{ColumnPlan, TypeMap};
use rowscan_api::record::Record;

use crate::bind::bind;
use crate::config::{ColumnPolicy, TagPolicy};
use crate::error::ScanError;
use crate::registry::TypeRegistry;

/// Same record type and same ordered column names give the same plan.
/// Policies are part of the key since they change the binding.
type PlanKey = (TypeId, TagPolicy, ColumnPolicy, Vec<String>);

/// In-memory column plan cache (TinyLFU admission, bounded).
pub struct PlanCache {
    inner: Cache<PlanKey, Arc<ColumnPlan>>,
}

impl PlanCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    /// Cached plan for `columns`, binding on a miss. Binding failures are
    /// not cached. Two threads missing on the same key both bind and store
    /// equal plans.
    pub fn get_or_bind<T: Record>(
        &self,
        type_map: &TypeMap,
        columns: &[String],
        tags: TagPolicy,
        policy: ColumnPolicy,
    ) -> Result<Arc<ColumnPlan>, ScanError> {
        let key = (TypeId::of::<T>(), tags, policy, columns.to_vec());
        if let Some(plan) = self.inner.get(&key) {
            return Ok(plan);
        }

        let plan = Arc::new(bind(type_map, columns, policy)?);
        tracing::debug!(
            record = %plan.type_name(),
            columns = plan.width(),
            bound = plan.bindings().len(),
            "built column plan"
        );
        self.inner.insert(key, Arc::clone(&plan));
        Ok(plan)
    }

    /// Number of cached plans, after applying pending maintenance.
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Reflected types plus bound plans, shared by scanners.
#[derive(Default)]
pub struct ScanCache {
    types: TypeRegistry,
    plans: PlanCache,
}

static GLOBAL: OnceLock<Arc<ScanCache>> = OnceLock::new();

impl ScanCache {
    pub fn new(plan_capacity: u64) -> Self {
        Self {
            types: TypeRegistry::new(),
            plans: PlanCache::new(plan_capacity),
        }
    }

    /// The process-wide cache. Its plan capacity is fixed by the first call.
    pub fn global(plan_capacity: u64) -> Arc<ScanCache> {
        Arc::clone(GLOBAL.get_or_init(|| {
            tracing::debug!(plan_capacity, "initialising global scan cache");
            Arc::new(ScanCache::new(plan_capacity))
        }))
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn plans(&self) -> &PlanCache {
        &self.plans
    }
}

impl std::fmt::Debug for ScanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCache")
            .field("types", &self.types.len())
            .field("plans", &self.plans.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowscan_api::Record;

    #[derive(Debug, Default, Record)]
    struct Beer {
        id: i64,
        name: String,
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plans_are_shared_per_column_list() {
        let cache = ScanCache::new(16);
        let map = cache.types().get_or_reflect::<Beer>(TagPolicy::FieldName).unwrap();
        let cols = columns(&["id", "name"]);

        let a = cache
            .plans()
            .get_or_bind::<Beer>(&map, &cols, TagPolicy::FieldName, ColumnPolicy::Strict)
            .unwrap();
        let b = cache
            .plans()
            .get_or_bind::<Beer>(&map, &cols, TagPolicy::FieldName, ColumnPolicy::Strict)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let reordered = cache
            .plans()
            .get_or_bind::<Beer>(&map, &columns(&["name", "id"]), TagPolicy::FieldName, ColumnPolicy::Strict)
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &reordered));
        assert_eq!(cache.plans().entry_count(), 2);
    }

    #[test]
    fn binding_errors_are_not_cached() {
        let cache = ScanCache::new(16);
        let map = cache.types().get_or_reflect::<Beer>(TagPolicy::FieldName).unwrap();
        let cols = columns(&["id", "abv"]);
        assert!(cache
            .plans()
            .get_or_bind::<Beer>(&map, &cols, TagPolicy::FieldName, ColumnPolicy::Strict)
            .is_err());
        assert_eq!(cache.plans().entry_count(), 0);

        let lenient = cache
            .plans()
            .get_or_bind::<Beer>(&map, &cols, TagPolicy::FieldName, ColumnPolicy::Lenient)
            .unwrap();
        assert_eq!(lenient.skipped().collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn global_cache_is_a_singleton() {
        assert!(Arc::ptr_eq(&ScanCache::global(8), &ScanCache::global(64)));
    }
}

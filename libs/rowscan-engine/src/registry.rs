use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rowscan_api::mapping::TypeMap;
use rowscan_api::record::Record;

use crate::config::TagPolicy;
use crate::error::ScanError;
use crate::reflect::reflect;

type TypeKey = (TypeId, TagPolicy);

/// Process-wide store of reflected record types.
///
/// A type is reflected at most once per tag policy and never evicted.
/// Concurrent first requests may both reflect; the first insert wins and
/// every caller gets the same `Arc`.
#[derive(Default)]
pub struct TypeRegistry {
    maps: RwLock<HashMap<TypeKey, Arc<TypeMap>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached map of `T`, reflecting it on first use. Reflection failures
    /// are not cached.
    pub fn get_or_reflect<T: Record>(&self, policy: TagPolicy) -> Result<Arc<TypeMap>, ScanError> {
        let key = (TypeId::of::<T>(), policy);
        if let Some(map) = self.read().get(&key) {
            return Ok(Arc::clone(map));
        }

        let map = Arc::new(reflect::<T>(policy)?);
        tracing::debug!(
            record = %map.type_name(),
            fields = map.len(),
            policy = ?policy,
            "reflected record type"
        );
        Ok(Arc::clone(self.write().entry(key).or_insert(map)))
    }

    pub fn get<T: Record>(&self, policy: TagPolicy) -> Option<Arc<TypeMap>> {
        self.read().get(&(TypeId::of::<T>(), policy)).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeKey, Arc<TypeMap>>> {
        match self.maps.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("type registry read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeKey, Arc<TypeMap>>> {
        match self.maps.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("type registry write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry").field("types", &self.len()).finish()
    }
}

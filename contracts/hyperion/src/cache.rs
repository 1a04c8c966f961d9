//! A write-back overlay over a parent [`Storage`].
//!
//! Writes land in an ordered overlay (`None` marks a deletion) and only reach
//! the parent on [`CacheStorage::commit`]. Dropping the cache discards them.

use std::collections::BTreeMap;
use std::ops::Bound;

use cosmwasm_std::{DepsMut, Order, QuerierWrapper, Record, Storage};

pub struct CacheStorage<'a> {
    parent: &'a mut dyn Storage,
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStorage<'a> {
    pub fn new(parent: &'a mut dyn Storage) -> Self {
        Self {
            parent,
            overlay: BTreeMap::new(),
        }
    }

    /// Flushes pending writes to the parent.
    pub fn commit(self) {
        let CacheStorage { parent, overlay } = self;
        for (key, value) in overlay {
            match value {
                Some(value) => parent.set(&key, &value),
                None => parent.remove(&key),
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.overlay.is_empty()
    }
}

impl Storage for CacheStorage<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.overlay.get(key) {
            Some(value) => value.clone(),
            None => self.parent.get(key),
        }
    }

    fn range<'b>(
        &'b self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Box<dyn Iterator<Item = Record> + 'b> {
        if let (Some(s), Some(e)) = (start, end) {
            if s >= e {
                return Box::new(std::iter::empty());
            }
        }
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .parent
            .range(start, end, Order::Ascending)
            .collect();
        let bounds = (
            start.map_or(Bound::Unbounded, |s| Bound::Included(s.to_vec())),
            end.map_or(Bound::Unbounded, |e| Bound::Excluded(e.to_vec())),
        );
        for (key, value) in self.overlay.range(bounds) {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        match order {
            Order::Ascending => Box::new(merged.into_iter()),
            Order::Descending => Box::new(merged.into_iter().rev()),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.overlay.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn remove(&mut self, key: &[u8]) {
        self.overlay.insert(key.to_vec(), None);
    }
}

/// Runs `f` against a cached view of `storage`, committing only when it
/// succeeds.
pub fn with_storage_cache<T, E>(
    storage: &mut dyn Storage,
    f: impl FnOnce(&mut dyn Storage) -> Result<T, E>,
) -> Result<T, E> {
    let mut cache = CacheStorage::new(storage);
    let result = f(&mut cache);
    if result.is_ok() {
        cache.commit();
    }
    result
}

/// Runs `f` against a cached view of `deps`, committing only when it succeeds.
pub fn with_cache<T, E>(
    deps: &mut DepsMut,
    f: impl FnOnce(&mut DepsMut) -> Result<T, E>,
) -> Result<T, E> {
    let mut cache = CacheStorage::new(&mut *deps.storage);
    let result = {
        let mut cached = DepsMut {
            storage: &mut cache,
            api: deps.api,
            querier: QuerierWrapper::new(&*deps.querier),
        };
        f(&mut cached)
    };
    if result.is_ok() {
        cache.commit();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::testing::{mock_dependencies, MockStorage};
    use cosmwasm_std::StdError;
    use cw_storage_plus::Map;

    const NUMBERS: Map<u64, String> = Map::new("numbers");

    fn keys(storage: &dyn Storage, order: Order) -> Vec<u64> {
        NUMBERS
            .keys(storage, None, None, order)
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn reads_see_pending_writes() {
        let mut store = MockStorage::new();
        NUMBERS.save(&mut store, 1, &"one".into()).unwrap();

        let mut cache = CacheStorage::new(&mut store);
        NUMBERS.save(&mut cache, 2, &"two".into()).unwrap();
        NUMBERS.remove(&mut cache, 1);
        assert_eq!(NUMBERS.may_load(&cache, 1).unwrap(), None);
        assert_eq!(NUMBERS.load(&cache, 2).unwrap(), "two");
        assert!(cache.is_dirty());
    }

    #[test]
    fn range_merges_overlay_in_order() {
        let mut store = MockStorage::new();
        for n in [1u64, 3, 5] {
            NUMBERS.save(&mut store, n, &n.to_string()).unwrap();
        }
        let mut cache = CacheStorage::new(&mut store);
        NUMBERS.save(&mut cache, 4, &"4".into()).unwrap();
        NUMBERS.save(&mut cache, 0, &"0".into()).unwrap();
        NUMBERS.remove(&mut cache, 3);

        assert_eq!(keys(&cache, Order::Ascending), vec![0, 1, 4, 5]);
        assert_eq!(keys(&cache, Order::Descending), vec![5, 4, 1, 0]);
    }

    #[test]
    fn drop_discards_and_commit_flushes() {
        let mut store = MockStorage::new();
        NUMBERS.save(&mut store, 1, &"one".into()).unwrap();

        {
            let mut cache = CacheStorage::new(&mut store);
            NUMBERS.remove(&mut cache, 1);
            NUMBERS.save(&mut cache, 2, &"two".into()).unwrap();
        }
        assert_eq!(keys(&store, Order::Ascending), vec![1]);

        let mut cache = CacheStorage::new(&mut store);
        NUMBERS.remove(&mut cache, 1);
        NUMBERS.save(&mut cache, 2, &"two".into()).unwrap();
        cache.commit();
        assert_eq!(keys(&store, Order::Ascending), vec![2]);
    }

    #[test]
    fn nested_caches() {
        let mut store = MockStorage::new();
        let mut outer = CacheStorage::new(&mut store);
        NUMBERS.save(&mut outer, 1, &"one".into()).unwrap();
        {
            let mut inner = CacheStorage::new(&mut outer);
            NUMBERS.save(&mut inner, 2, &"two".into()).unwrap();
        }
        {
            let mut inner = CacheStorage::new(&mut outer);
            NUMBERS.save(&mut inner, 3, &"three".into()).unwrap();
            inner.commit();
        }
        outer.commit();
        assert_eq!(keys(&store, Order::Ascending), vec![1, 3]);
    }

    #[test]
    fn with_cache_commits_only_on_success() {
        let mut deps = mock_dependencies();
        let mut deps_mut = deps.as_mut();

        let failed: Result<(), StdError> = with_cache(&mut deps_mut, |cached| {
            NUMBERS.save(cached.storage, 1, &"one".into())?;
            Err(StdError::generic_err("boom"))
        });
        assert!(failed.is_err());
        assert_eq!(NUMBERS.may_load(deps_mut.storage, 1).unwrap(), None);

        with_cache(&mut deps_mut, |cached| {
            NUMBERS.save(cached.storage, 1, &"one".into())
        })
        .unwrap();
        assert_eq!(NUMBERS.load(deps_mut.storage, 1).unwrap(), "one");
    }
}

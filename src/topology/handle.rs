use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STORE: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a topology store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StoreId(u64);

impl StoreId {
    pub(crate) fn fresh() -> Self {
        Self(NEXT_STORE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Arena key qualified by the store that issued it.
///
/// Keys from different stores can collide, so identity checks compare both halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Handle<K> {
    pub(crate) store: StoreId,
    pub(crate) key: K,
}

impl<K: Copy + PartialEq> Handle<K> {
    pub(crate) fn new(store: StoreId, key: K) -> Self {
        Self { store, key }
    }

    pub(crate) fn is(&self, store: StoreId, key: K) -> bool {
        self.store == store && self.key == key
    }
}

//! Cached SII category data, keyed so two slaves of the same make/revision don't repeat a full
//! EEPROM walk.
//!
//! EEPROM reads go through the same `0x0502`-`0x050f` register protocol `eeprom::Eeprom` drives,
//! at well under a millisecond per word on real hardware but still two orders of magnitude slower
//! than a PDO exchange; caching by `(vendor, product, revision)` means a rack of ten identical
//! drives scans the catalog data once instead of ten times.

use crate::eeprom::types::{FmmuUsage, Pdo, SyncManager};
use crate::slave::SlaveIdentity;

/// Key identifying one EEPROM image. Serial number is deliberately excluded: two units of the
/// same vendor/product/revision carry the same catalog data (general/sync manager/PDO
/// categories), only string table indices for serial-specific text would differ, and this cache
/// never stores those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SiiCacheKey {
    pub vendor_id: u32,
    pub product_code: u32,
    pub revision: u32,
}

impl SiiCacheKey {
    pub fn from_identity(identity: &SlaveIdentity) -> Self {
        Self {
            vendor_id: identity.vendor_id,
            product_code: identity.product_code,
            revision: identity.revision,
        }
    }
}

/// Catalog data cached per-key: sync managers, FMMU usage hints, and PDO mapping tables.
#[derive(Debug, Clone, Default)]
pub struct SiiCacheEntry {
    pub sync_managers: heapless::Vec<SyncManager, 8>,
    pub fmmus: heapless::Vec<FmmuUsage, 16>,
    pub rxpdos: heapless::Vec<Pdo, 16>,
    pub txpdos: heapless::Vec<Pdo, 16>,
}

/// Fixed-size cache of [`SiiCacheEntry`] by [`SiiCacheKey`]. A miss just means the next scan reads
/// that slave's EEPROM again; a full cache evicts nothing and further misses fall back to reading
/// the EEPROM every scan, so there's no correctness hazard in sizing this too small.
#[derive(Default)]
pub struct SiiCache {
    entries: heapless::Vec<(SiiCacheKey, SiiCacheEntry), 32>,
}

impl SiiCache {
    pub fn get(&self, key: &SiiCacheKey) -> Option<&SiiCacheEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or replace the cached entry for `key`. Returns `false` without inserting if the
    /// cache is full and `key` isn't already present.
    pub fn insert(&mut self, key: SiiCacheKey, entry: SiiCacheEntry) -> bool {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = entry;
            return true;
        }

        self.entries.push((key, entry)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u32) -> SiiCacheKey {
        SiiCacheKey {
            vendor_id: n,
            product_code: n,
            revision: n,
        }
    }

    #[test]
    fn miss_then_hit() {
        let mut cache = SiiCache::default();
        assert!(cache.get(&key(1)).is_none());

        cache.insert(key(1), SiiCacheEntry::default());
        assert!(cache.get(&key(1)).is_some());
    }

    #[test]
    fn reinsert_replaces_entry() {
        let mut cache = SiiCache::default();
        cache.insert(key(1), SiiCacheEntry::default());

        let mut entry = SiiCacheEntry::default();
        let _ = entry.fmmus.push(FmmuUsage::Outputs);
        cache.insert(key(1), entry);

        assert_eq!(cache.get(&key(1)).unwrap().fmmus.len(), 1);
    }
}

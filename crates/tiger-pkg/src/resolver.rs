//! Cross-package reference resolution.
//!
//! A [`ResolutionSession`] is bound to the package whose payloads are being
//! decoded. References into the same package index it directly; anything else
//! is loaded once through a [`PackageProvider`] and cached for the session.
//!
//! Each external package id owns a load slot. The map lock is only held to
//! find or insert a slot, so cached lookups never wait on a load in progress
//! and loads of different ids run side by side.

use std::hash::BuildHasherDefault;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHasher;

use crate::entry::Entry;
use crate::package::Package;
use crate::reference::ReferenceHash;
use crate::{Error, Result};

type FxHashMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// A package loaded at most once; `None` until a load succeeds.
type LoadSlot = Arc<Mutex<Option<Arc<Package>>>>;

/// Supplies packages by id.
pub trait PackageProvider: Send + Sync {
    fn lookup(&self, package_id: u16) -> Result<Arc<Package>>;
}

impl<F> PackageProvider for F
where
    F: Fn(u16) -> Result<Arc<Package>> + Send + Sync,
{
    fn lookup(&self, package_id: u16) -> Result<Arc<Package>> {
        self(package_id)
    }
}

/// A provider over packages already held in memory.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    packages: FxHashMap<u16, Arc<Package>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package under its own id, replacing any previous one.
    pub fn insert(&mut self, package: Arc<Package>) {
        self.packages.insert(package.id(), package);
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageProvider for MemoryProvider {
    fn lookup(&self, package_id: u16) -> Result<Arc<Package>> {
        self.packages
            .get(&package_id)
            .cloned()
            .ok_or(Error::UnknownPackage(package_id))
    }
}

/// The target of a resolved reference.
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub package: Arc<Package>,
    pub index: usize,
}

impl ResolvedEntry {
    pub fn entry(&self) -> &Entry {
        // index was bounds-checked by the session
        &self.package.entries()[self.index]
    }
}

/// Resolves references on behalf of one home package.
pub struct ResolutionSession<P> {
    home: Arc<Package>,
    provider: P,
    cache: RwLock<FxHashMap<u16, LoadSlot>>,
}

impl<P: PackageProvider> ResolutionSession<P> {
    pub fn new(home: Arc<Package>, provider: P) -> Self {
        Self {
            home,
            provider,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    #[inline]
    pub fn home(&self) -> &Arc<Package> {
        &self.home
    }

    fn slot(&self, package_id: u16) -> LoadSlot {
        if let Some(slot) = self.cache.read().get(&package_id) {
            return Arc::clone(slot);
        }
        Arc::clone(self.cache.write().entry(package_id).or_default())
    }

    /// Fetch a package by id, loading it through the provider on first use.
    pub fn package(&self, package_id: u16) -> Result<Arc<Package>> {
        if package_id == self.home.id() {
            return Ok(Arc::clone(&self.home));
        }

        let slot = self.slot(package_id);
        let mut loaded = slot.lock();
        if let Some(package) = loaded.as_ref() {
            return Ok(Arc::clone(package));
        }

        let package = self.provider.lookup(package_id)?;
        if package.id() != package_id {
            log::warn!(
                "provider returned package {:#06x} when asked for {:#06x}",
                package.id(),
                package_id
            );
            return Err(Error::UnknownPackage(package_id));
        }
        log::debug!(
            "loaded package {:#06x} ({} entries) for references from {:#06x}",
            package_id,
            package.entry_count(),
            self.home.id()
        );
        *loaded = Some(Arc::clone(&package));
        Ok(package)
    }

    /// Resolve a reference to its package and entry index.
    pub fn resolve(&self, reference: ReferenceHash) -> Result<ResolvedEntry> {
        let package = self.package(reference.package_id())?;
        let index = reference.entry_index() as usize;
        let count = package.entry_count();
        if index >= count {
            return Err(Error::EntryIndexOutOfRange {
                package_id: reference.package_id(),
                index,
                count,
            });
        }
        Ok(ResolvedEntry { package, index })
    }

    /// Number of external packages loaded so far.
    pub fn cached_packages(&self) -> usize {
        self.cache
            .read()
            .values()
            .filter(|slot| slot.lock().is_some())
            .count()
    }
}

impl<P: PackageProvider> std::fmt::Debug for ResolutionSession<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionSession")
            .field("home", &self.home.id())
            .field("cached", &self.cached_packages())
            .finish_non_exhaustive()
    }
}

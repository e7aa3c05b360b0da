//! Program-wide symbol index with radix tree
//!
//! Provides [`ProgramIndex`], the read-only view of every declaration in the
//! program that rules resolve references against. Only the driver writes to
//! it, between units, by replacing one unit's symbols at a time.

use crate::symbol::{IndexedSymbol, Namespace};
use dashmap::DashMap;
use hkfix_source::{QualifiedName, UnitId};
use parking_lot::RwLock;
use radix_trie::{Trie, TrieCommon};

/// Program index keyed by qualified name
///
/// We use radix_trie for exact lookups by qualified name.
///
/// A trie key holds every symbol with that name: a trait and its companion
/// object share a key. The reverse index `by_unit` remembers which keys a
/// unit contributed so that a rewritten unit can be swapped in atomically.
#[derive(Debug)]
pub struct ProgramIndex {
    /// Trie mapping `a/b/Foo` -> symbols named `a.b.Foo`
    trie: RwLock<Trie<String, Vec<IndexedSymbol>>>,

    /// Reverse index: unit -> (package, keys it registered)
    by_unit: DashMap<UnitId, UnitEntry>,

    /// Known packages -> number of registered units declaring them
    packages: DashMap<QualifiedName, usize>,
}

#[derive(Debug, Clone)]
struct UnitEntry {
    package: QualifiedName,
    keys: Vec<String>,
}

fn trie_key(name: &QualifiedName) -> String {
    name.join("/")
}

impl ProgramIndex {
    /// Create empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            trie: RwLock::new(Trie::new()),
            by_unit: DashMap::new(),
            packages: DashMap::new(),
        }
    }

    /// Register (or replace) the symbols declared by one unit
    ///
    /// Any symbols the unit registered before are removed first. Two symbols
    /// of the same unit may share a name; the engine reports those as
    /// ambiguous later.
    ///
    /// # Errors
    /// Returns [`IndexError::DuplicateSymbol`] if another unit already
    /// declares a symbol with the same name in the same namespace. The index
    /// is left unchanged in that case.
    pub fn register_unit(
        &self,
        unit: &UnitId,
        package: QualifiedName,
        symbols: Vec<IndexedSymbol>,
    ) -> Result<usize, IndexError> {
        let mut trie = self.trie.write();

        for symbol in &symbols {
            let key = trie_key(symbol.name());
            let Some(existing) = trie.get(&key) else {
                continue;
            };
            let namespace = symbol.kind().namespace();
            if let Some(other) = existing
                .iter()
                .find(|e| e.unit() != unit && e.kind().namespace() == namespace)
            {
                return Err(IndexError::DuplicateSymbol {
                    name: symbol.name().clone(),
                    namespace,
                    existing: other.unit().clone(),
                });
            }
        }

        Self::remove_locked(&mut trie, &self.by_unit, &self.packages, unit);

        let count = symbols.len();
        let mut keys = Vec::with_capacity(count);
        for symbol in symbols {
            let key = trie_key(symbol.name());
            if let Some(entries) = trie.get_mut(&key) {
                entries.push(symbol);
            } else {
                trie.insert(key.clone(), vec![symbol]);
            }
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        *self.packages.entry(package.clone()).or_insert(0) += 1;
        self.by_unit.insert(unit.clone(), UnitEntry { package, keys });

        Ok(count)
    }

    /// Drop every symbol `unit` registered before
    fn remove_locked(
        trie: &mut Trie<String, Vec<IndexedSymbol>>,
        by_unit: &DashMap<UnitId, UnitEntry>,
        packages: &DashMap<QualifiedName, usize>,
        unit: &UnitId,
    ) {
        let Some((_, entry)) = by_unit.remove(unit) else {
            return;
        };

        for key in &entry.keys {
            let now_empty = match trie.get_mut(key) {
                Some(symbols) => {
                    symbols.retain(|s| s.unit() != unit);
                    symbols.is_empty()
                }
                None => false,
            };
            if now_empty {
                trie.remove(key);
            }
        }

        let drop_package = match packages.get_mut(&entry.package) {
            Some(mut count) => {
                *count -= 1;
                *count == 0
            }
            None => false,
        };
        if drop_package {
            packages.remove(&entry.package);
        }
    }

    /// All symbols with exactly this qualified name
    #[must_use]
    pub fn lookup(&self, name: &QualifiedName) -> Vec<IndexedSymbol> {
        self.trie
            .read()
            .get(&trie_key(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Symbols with this name in one namespace
    #[must_use]
    pub fn lookup_in(&self, name: &QualifiedName, namespace: Namespace) -> Vec<IndexedSymbol> {
        self.lookup(name)
            .into_iter()
            .filter(|s| s.kind().namespace() == namespace)
            .collect()
    }

    /// Check if any registered unit declares this package
    #[inline]
    #[must_use]
    pub fn has_package(&self, package: &QualifiedName) -> bool {
        self.packages.contains_key(package)
    }

    /// Get total symbol count
    #[must_use]
    pub fn len(&self) -> usize {
        self.trie.read().values().map(Vec::len).sum()
    }

    /// Check if index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProgramIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Index errors
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Another unit already declares this name in the same namespace
    #[error("duplicate symbol {name} ({namespace:?}), already declared in {existing}")]
    DuplicateSymbol {
        name: QualifiedName,
        namespace: Namespace,
        existing: UnitId,
    },
}

//! In-memory symbol graph.
//!
//! Holds the symbol table, the per-file ownership records and three derived
//! indices (reverse dependencies, inheritance, implementation). Every
//! mutation is per file: a file's previous contribution is retracted from
//! all maps before its new symbols are inserted.

use std::collections::{BTreeSet, HashMap};

use crate::index::{CodeIndex, IndexStats, SymbolDef};

type Buckets = HashMap<String, BTreeSet<String>>;

#[derive(Debug, Default)]
pub struct GraphStore {
    symbols: HashMap<String, SymbolDef>,
    files: HashMap<String, Vec<String>>,
    reverse_deps: Buckets,
    inheritance: Buckets,
    implementations: Buckets,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes one symbol from the table and from every bucket it was
    /// inserted into. The symbol's own parent/interfaces/dependencies name
    /// exactly those buckets. The owning file record is left to the caller.
    fn retract_symbol(&mut self, fqn: &str) -> Option<SymbolDef> {
        let symbol = self.symbols.remove(fqn)?;

        for dependency in &symbol.dependencies {
            detach(&mut self.reverse_deps, dependency, fqn);
        }
        if let Some(parent) = &symbol.parent_type {
            detach(&mut self.inheritance, parent, fqn);
        }
        for interface in &symbol.interfaces {
            detach(&mut self.implementations, interface, fqn);
        }

        Some(symbol)
    }

    fn retract_file(&mut self, file_path: &str) -> usize {
        let Some(owned) = self.files.remove(file_path) else {
            return 0;
        };

        let mut retracted = 0;
        for fqn in &owned {
            // A later file may have taken the fqn over; only drop our own copy.
            let owned_here = self
                .symbols
                .get(fqn)
                .is_some_and(|s| s.source_path == file_path);
            if owned_here && self.retract_symbol(fqn).is_some() {
                retracted += 1;
            }
        }
        retracted
    }

    fn insert_symbol(&mut self, file_path: &str, symbol: SymbolDef) {
        let fqn = symbol.fqn.clone();

        if let Some(previous) = self.retract_symbol(&fqn) {
            if previous.source_path != file_path {
                tracing::debug!(
                    "{} moves from {} to {}",
                    fqn,
                    previous.source_path,
                    file_path
                );
                if let Some(owned) = self.files.get_mut(&previous.source_path) {
                    owned.retain(|f| f != &fqn);
                }
            }
        }

        for dependency in &symbol.dependencies {
            attach(&mut self.reverse_deps, dependency, &fqn);
        }
        if let Some(parent) = &symbol.parent_type {
            attach(&mut self.inheritance, parent, &fqn);
        }
        for interface in &symbol.interfaces {
            attach(&mut self.implementations, interface, &fqn);
        }

        let owned = self.files.entry(file_path.to_string()).or_default();
        if !owned.contains(&fqn) {
            owned.push(fqn.clone());
        }
        self.symbols.insert(fqn, symbol);
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn contains_file(&self, file_path: &str) -> bool {
        self.files.contains_key(file_path)
    }

    /// Ordered fqns owned by `file_path`.
    pub fn file_record(&self, file_path: &str) -> Option<&[String]> {
        self.files.get(file_path).map(|v| v.as_slice())
    }

    /// Fqns that declared a dependency on `name`, sorted.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        sorted(self.reverse_deps.get(name))
    }
}

impl CodeIndex for GraphStore {
    fn clear(&mut self) {
        self.symbols.clear();
        self.files.clear();
        self.reverse_deps.clear();
        self.inheritance.clear();
        self.implementations.clear();
    }

    fn update_file(&mut self, file_path: &str, symbols: Vec<SymbolDef>) {
        let retracted = self.retract_file(file_path);
        let inserted = symbols.len();

        self.files.entry(file_path.to_string()).or_default();
        for mut symbol in symbols {
            symbol.source_path = file_path.to_string();
            self.insert_symbol(file_path, symbol);
        }

        tracing::debug!(
            "Updated {}: -{} +{} symbols",
            file_path,
            retracted,
            inserted
        );
    }

    fn remove_file(&mut self, file_path: &str) {
        let retracted = self.retract_file(file_path);
        if retracted > 0 {
            tracing::debug!("Removed {}: -{} symbols", file_path, retracted);
        }
    }

    fn get_symbol(&self, fqn: &str) -> Option<&SymbolDef> {
        self.symbols.get(fqn)
    }

    fn search(&self, fragment: &str, limit: usize) -> Vec<SymbolDef> {
        let needle = fragment.to_lowercase();
        let mut matches: Vec<&SymbolDef> = self
            .symbols
            .values()
            .filter(|s| s.fqn.to_lowercase().contains(&needle))
            .collect();

        matches.sort_by(|a, b| a.fqn.cmp(&b.fqn));
        matches.into_iter().take(limit).cloned().collect()
    }

    fn get_file_symbols(&self, file_path: &str) -> Vec<SymbolDef> {
        self.files
            .get(file_path)
            .map(|owned| {
                owned
                    .iter()
                    .filter_map(|fqn| self.symbols.get(fqn))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn usages_of(&self, fqn: &str) -> Vec<String> {
        let paths: BTreeSet<String> = self
            .reverse_deps
            .get(fqn)
            .into_iter()
            .flatten()
            .filter_map(|dependent| self.symbols.get(dependent))
            .map(|s| s.source_path.clone())
            .collect();
        paths.into_iter().collect()
    }

    fn inheritors_of(&self, fqn: &str) -> Vec<String> {
        sorted(self.inheritance.get(fqn))
    }

    fn implementors_of(&self, fqn: &str) -> Vec<String> {
        sorted(self.implementations.get(fqn))
    }

    fn get_stats(&self) -> IndexStats {
        IndexStats {
            nodes: self.symbols.len(),
            files: self.files.len(),
            edges: self.reverse_deps.values().map(|b| b.len()).sum(),
        }
    }
}

fn attach(buckets: &mut Buckets, key: &str, fqn: &str) {
    buckets
        .entry(key.to_string())
        .or_default()
        .insert(fqn.to_string());
}

fn detach(buckets: &mut Buckets, key: &str, fqn: &str) {
    if let Some(bucket) = buckets.get_mut(key) {
        bucket.remove(fqn);
        if bucket.is_empty() {
            buckets.remove(key);
        }
    }
}

fn sorted(bucket: Option<&BTreeSet<String>>) -> Vec<String> {
    bucket
        .map(|b| b.iter().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Member, MemberKind, SymbolKind};

    fn class(fqn: &str, path: &str) -> SymbolDef {
        SymbolDef::new(fqn, SymbolKind::Class, path)
    }

    fn sample_store() -> GraphStore {
        let mut store = GraphStore::new();
        store.update_file(
            "/p/Base.php",
            vec![class("App\\Base", "/p/Base.php"), class("App\\Helper", "/p/Base.php")],
        );
        store.update_file(
            "/p/Foo.php",
            vec![class("App\\Foo", "/p/Foo.php")
                .with_parent("App\\Base")
                .with_interface("App\\Contract")
                .with_dependency("App\\Helper")],
        );
        store
    }

    #[test]
    fn test_get_returns_inserted_symbol() {
        let mut store = GraphStore::new();
        let symbol = class("App\\Foo", "/p/Foo.php")
            .with_parent("App\\Bar")
            .with_member(Member::new("run", MemberKind::Method));
        store.update_file("/p/Foo.php", vec![symbol.clone()]);

        assert_eq!(store.get_symbol("App\\Foo"), Some(&symbol));
        assert_eq!(store.get_symbol("App\\Missing"), None);
    }

    #[test]
    fn test_source_path_follows_owning_file() {
        let mut store = GraphStore::new();
        store.update_file("/p/Real.php", vec![class("App\\Foo", "elsewhere.php")]);
        assert_eq!(store.get_symbol("App\\Foo").unwrap().source_path, "/p/Real.php");
    }

    #[test]
    fn test_derived_indices() {
        let store = sample_store();

        assert_eq!(store.inheritors_of("App\\Base"), vec!["App\\Foo".to_string()]);
        assert_eq!(store.implementors_of("App\\Contract"), vec!["App\\Foo".to_string()]);
        assert_eq!(store.usages_of("App\\Helper"), vec!["/p/Foo.php".to_string()]);
        assert_eq!(store.usages_of("App\\Base"), vec!["/p/Foo.php".to_string()]);
        assert!(store.usages_of("App\\Foo").is_empty());
    }

    #[test]
    fn test_update_is_idempotent() {
        let symbols = vec![class("App\\Foo", "/p/Foo.php")
            .with_parent("App\\Base")
            .with_interface("App\\Contract")];

        let mut once = GraphStore::new();
        once.update_file("/p/Foo.php", symbols.clone());

        let mut twice = GraphStore::new();
        twice.update_file("/p/Foo.php", symbols.clone());
        twice.update_file("/p/Foo.php", symbols);

        assert_eq!(once.get_stats(), twice.get_stats());
        assert_eq!(once.symbols, twice.symbols);
        assert_eq!(once.files, twice.files);
        assert_eq!(once.reverse_deps, twice.reverse_deps);
        assert_eq!(once.inheritance, twice.inheritance);
        assert_eq!(once.implementations, twice.implementations);
    }

    #[test]
    fn test_update_replaces_previous_contribution() {
        let mut store = sample_store();
        store.update_file(
            "/p/Foo.php",
            vec![class("App\\Foo2", "/p/Foo.php").with_parent("App\\Other")],
        );

        assert!(store.get_symbol("App\\Foo").is_none());
        assert!(store.inheritors_of("App\\Base").is_empty());
        assert!(store.implementors_of("App\\Contract").is_empty());
        assert!(store.usages_of("App\\Helper").is_empty());
        assert_eq!(store.inheritors_of("App\\Other"), vec!["App\\Foo2".to_string()]);
        assert_eq!(store.file_record("/p/Foo.php").unwrap(), ["App\\Foo2".to_string()]);
    }

    #[test]
    fn test_remove_file_retracts_backward_entries() {
        let mut store = sample_store();
        store.remove_file("/p/Foo.php");

        assert!(store.get_symbol("App\\Foo").is_none());
        assert!(store.usages_of("App\\Helper").is_empty());
        assert!(store.inheritors_of("App\\Base").is_empty());
        assert!(store.implementors_of("App\\Contract").is_empty());
        assert!(store.dependents_of("App\\Base").is_empty());
        assert!(!store.contains_file("/p/Foo.php"));
        assert_eq!(store.get_stats().edges, 0);
    }

    #[test]
    fn test_remove_keeps_buckets_keyed_by_removed_symbol() {
        let mut store = sample_store();
        store.remove_file("/p/Base.php");

        // Foo still names App\Base as parent, the key survives its declaration.
        assert_eq!(store.inheritors_of("App\\Base"), vec!["App\\Foo".to_string()]);
        assert_eq!(store.usages_of("App\\Helper"), vec!["/p/Foo.php".to_string()]);
        assert!(store.get_symbol("App\\Base").is_none());
    }

    #[test]
    fn test_remove_unknown_file_is_noop() {
        let mut store = sample_store();
        let before = store.get_stats();
        store.remove_file("/p/Nope.php");
        store.remove_file("/p/Nope.php");
        assert_eq!(before, store.get_stats());
    }

    #[test]
    fn test_fqn_moves_between_files() {
        let mut store = GraphStore::new();
        store.update_file("/a.php", vec![class("App\\Dup", "/a.php").with_parent("App\\A")]);
        store.update_file("/b.php", vec![class("App\\Dup", "/b.php").with_parent("App\\B")]);

        assert_eq!(store.get_symbol("App\\Dup").unwrap().source_path, "/b.php");
        assert!(store.inheritors_of("App\\A").is_empty());
        assert_eq!(store.file_record("/a.php").unwrap().len(), 0);

        // Removing the former owner must not retract the new definition.
        store.remove_file("/a.php");
        assert!(store.get_symbol("App\\Dup").is_some());
        assert_eq!(store.inheritors_of("App\\B"), vec!["App\\Dup".to_string()]);
    }

    #[test]
    fn test_same_short_name_in_different_namespaces() {
        let mut store = GraphStore::new();
        store.update_file("/one/User.php", vec![class("One\\User", "/one/User.php")]);
        store.update_file("/two/User.php", vec![class("Two\\User", "/two/User.php")]);

        assert_eq!(store.symbol_count(), 2);
        let hits: Vec<String> = store.search("user", 10).into_iter().map(|s| s.fqn).collect();
        assert_eq!(hits, vec!["One\\User".to_string(), "Two\\User".to_string()]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_capped() {
        let mut store = GraphStore::new();
        let symbols = (0..10)
            .map(|i| class(&format!("App\\Service{}", i), "/s.php"))
            .collect();
        store.update_file("/s.php", symbols);

        assert_eq!(store.search("SERVICE", 100).len(), 10);
        assert_eq!(store.search("service", 3).len(), 3);
        assert!(store.search("nothing", 3).is_empty());
    }

    #[test]
    fn test_stats_and_clear() {
        let mut store = sample_store();
        let stats = store.get_stats();
        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.files, 2);
        // Foo -> Base, Contract, Helper
        assert_eq!(stats.edges, 3);

        store.clear();
        assert_eq!(store.get_stats(), IndexStats::default());
        assert!(store.get_file_symbols("/p/Foo.php").is_empty());
    }

    #[test]
    fn test_file_symbols_keep_declaration_order() {
        let store = sample_store();
        let names: Vec<String> = store
            .get_file_symbols("/p/Base.php")
            .into_iter()
            .map(|s| s.fqn)
            .collect();
        assert_eq!(names, vec!["App\\Base".to_string(), "App\\Helper".to_string()]);
    }

    #[test]
    fn test_empty_update_keeps_file_record() {
        let mut store = sample_store();
        store.update_file("/p/Foo.php", Vec::new());
        assert!(store.contains_file("/p/Foo.php"));
        assert!(store.get_file_symbols("/p/Foo.php").is_empty());
        assert_eq!(store.get_stats().edges, 0);
    }
}

pub mod graph;
pub mod models;

pub use graph::GraphStore;
pub use models::*;

/// Read/write surface of the symbol graph.
///
/// Writers take `&mut self`: the store does no locking of its own, callers
/// serialize mutation (see `IndexCoordinator`).
pub trait CodeIndex: Send + Sync {
    fn clear(&mut self);
    fn update_file(&mut self, file_path: &str, symbols: Vec<SymbolDef>);
    fn remove_file(&mut self, file_path: &str);

    fn get_symbol(&self, fqn: &str) -> Option<&SymbolDef>;
    /// Case-insensitive substring search over fqns, sorted and capped at `limit`.
    fn search(&self, fragment: &str, limit: usize) -> Vec<SymbolDef>;
    fn get_file_symbols(&self, file_path: &str) -> Vec<SymbolDef>;
    /// Source paths of every symbol that depends on `fqn`.
    fn usages_of(&self, fqn: &str) -> Vec<String>;
    /// Direct children of `fqn`.
    fn inheritors_of(&self, fqn: &str) -> Vec<String>;
    /// Direct implementors of `fqn`.
    fn implementors_of(&self, fqn: &str) -> Vec<String>;
    fn get_stats(&self) -> IndexStats;
}

pub mod coordinator;
pub mod extractor;
pub mod parser;
pub mod progress;
pub mod resolver;
pub mod syntax;
pub mod walker;
pub mod watcher;

pub use coordinator::{IndexCoordinator, InitializeSummary, Phase};
pub use extractor::{ExtractionResult, SymbolExtractor};
pub use parser::Parser;
pub use progress::{IndexingProgress, ProgressSnapshot};
pub use resolver::{parse_use_directive, resolve, ImportClause, ImportTable, NameResolver};
pub use syntax::{SyntaxKind, SyntaxNode, SyntaxTree};
pub use walker::{FileWalker, IgnoreRules, PathFilter, RootScan};
pub use watcher::{FileEvent, RootWatcher};

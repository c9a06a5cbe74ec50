pub mod config;
pub mod error;
pub mod index;
pub mod indexer;

pub use config::{IndexerConfig, CONFIG_FILENAME};
pub use error::{IndexerError, Result};
pub use index::{
    CodeIndex, GraphStore, IndexStats, InheritanceInfo, Member, MemberKind, SymbolDef, SymbolKind,
    SymbolSummary, Visibility,
};
pub use indexer::{
    ExtractionResult, FileEvent, FileWalker, IgnoreRules, IndexCoordinator, InitializeSummary,
    NameResolver, Parser, PathFilter, Phase, ProgressSnapshot, RootScan, RootWatcher,
    SymbolExtractor,
};

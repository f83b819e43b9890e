//! Layered translation engine.
//!
//! Translation entries live at two scopes: system defaults (no team) and team
//! overrides. Everything in this module is built around that split.
//!
//! # Architecture
//!
//! - `entry`: The persisted data model and query filters
//! - `store`: The `EntryStore` persistence contract and an in-memory store
//! - `registry`: Configured locales and the locale fallback chain
//! - `validator`: Write-time checks (key path shape, required locale)
//! - `resolver`: Team -> system -> key path resolution
//! - `tree`: Nested locale trees <-> flat key paths
//! - `corpus`: Reading and writing `<locale>.json` files
//! - `importer`: Full import, merge import and bulk add from locale files
//! - `sync`: Writing system entries back into the locale files
//! - `overrides`: Reporting views over team overrides
//! - `cache`: Per-(team, locale) client cache
//! - `metrics`: Process-wide counters
//!
//! # Example
//!
//! ```rust,ignore
//! use layered_translations::i18n::{MemoryStore, NewEntry, Resolver, Source, values};
//!
//! let store = MemoryStore::new();
//! store.insert(NewEntry::system("buttons.save", values([("en", "Save")]))).await?;
//! store.insert(NewEntry::team("T1", "buttons.save", values([("en", "Store")]))).await?;
//!
//! let resolution = Resolver::new(&store).resolve(Some("T1"), "ui", "buttons.save", "en").await?;
//! assert_eq!(resolution.source, Source::Team);
//! ```

mod cache;
mod corpus;
mod entry;
mod importer;
mod metrics;
mod overrides;
mod registry;
mod resolver;
mod store;
mod sync;
mod tree;
mod validator;

pub use cache::{CacheKey, TranslationCache, TranslationSource};
pub use corpus::LocaleCorpus;
pub use entry::{
    category_for, non_empty_value, values, EntryFilter, EntryPatch, LocaleValues, NewEntry, Scope,
    ScopeFilter, TranslationEntry, DEFAULT_NAMESPACE,
};
pub use importer::{
    BatchReport, BulkAddReport, CorpusImporter, Interrupt, ItemFailure, DEFAULT_CHUNK_SIZE,
};
pub use metrics::{MetricsReport, TranslationMetrics};
pub use overrides::{OverrideCount, OverrideRegistry, TeamOverride};
pub use registry::{LocaleConfig, LocaleRegistry};
pub use resolver::{pick, resolve_listing, Resolution, ResolvedTranslation, Resolver, Source};
pub use store::{EntryStore, MemoryStore};
pub(crate) use store::new_entry_id;
pub use sync::{CorpusExporter, SyncReport};
pub use tree::{
    flatten, flatten_all, get_path, merge_flat, set_path, unflatten, FlatEntries, FlatTree,
};
pub use validator::{EntryValidator, ValidationReport};

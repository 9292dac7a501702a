pub mod cli;
pub mod collection;
pub mod compiler_set;
pub mod error;
pub mod family;
pub mod filter;
pub mod hint;
pub mod probe;
pub mod registry;
pub mod schema;
pub mod store;
pub mod utils;

pub use cli::run;
pub use collection::{CompilerSetCollection, DiscoveryOptions, DiscoveryReport};
pub use compiler_set::CompilerSet;
pub use store::{FileStore, MemoryStore, SettingsStore};

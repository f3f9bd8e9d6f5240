//! Persistent cache of transformed sources
//!
//! Maps each source file to a rewritten copy under the cache directory so
//! repeated loads can skip the transformation.
//!
//! # State file
//!
//! All records live in a single JSON file, `_file.path.cache.json`, in the
//! cache directory. Paths are stored as placeholder tokens:
//!
//! | Base | Resolved against |
//! |------|------------------|
//! | `cache_dir` | configured cache directory |
//! | `root_dir` | configured root directory |
//! | `absolute` | nothing, stored verbatim |

pub mod record;
pub mod store;

pub use record::{content_hash, CacheRecord, PathBase, PortablePath};
pub use store::{CacheStore, CACHE_STATE_FILE};

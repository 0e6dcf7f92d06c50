/*!
 * Translation caching.
 *
 * - `key`: deterministic namespaced cache keys
 * - `local`: process-local L1 tier and the clock abstraction
 * - `remote`: shared L2 tier trait, compression codec and in-memory backend
 * - `redis_tier`: Redis L2 backend
 * - `tiered`: the composed two-tier cache
 */

pub mod key;
pub mod local;
pub mod redis_tier;
pub mod remote;
pub mod tiered;

pub use key::{CacheKey, KeyNamespace};
pub use local::{Clock, LocalTier, ManualClock, SystemClock};
pub use redis_tier::RedisTier;
pub use remote::{CacheResult, MemoryRemoteTier, RemoteTier};
pub use tiered::{CacheTtls, TwoTierCache};

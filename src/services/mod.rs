// Service exports
pub mod cache;
pub mod postgres;
pub mod supabase;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use postgres::{MatchRun, PostgresClient, PostgresError};
pub use supabase::{BloodRequestRecord, SupabaseClient, SupabaseError, SupabaseTables};

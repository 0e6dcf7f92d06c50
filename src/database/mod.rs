/*!
 * Durable storage of finalized translations.
 *
 * This module provides SQLite-based persistence for translation records,
 * exact-match lookup for record reuse, and change notifications consumed by
 * cache invalidation.
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{NewTranslation, RecordEvent, TranslationRecord};
pub use repository::{RecordListener, Repository, TranslationStore};

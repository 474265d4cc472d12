mod entities;
pub mod sqlite;


use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
pub use entities::{
    BookSummary, LibraryBookEntity, PlanEntity, SubscriptionEntity, UsageCounter, UserEntity,
};
use mockall::automock;
use teloxide::types::ChatId;
use thiserror::Error;

use crate::settings::Settings;

/// Errors returned by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Query or connection failure.
    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
    /// Schema migration failure.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    /// A stored value could not be decoded.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),
}

/// Result of a storage call.
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent state of the bot.
#[automock]
#[async_trait]
pub trait BotStorage: Send + Sync {
    /// Add a user if unknown and refresh their names. Returns true for a new user.
    async fn add_user(
        &self,
        user_id: ChatId,
        username: Option<String>,
        first_name: String,
    ) -> StorageResult<bool>;

    /// A user by chat id.
    async fn get_user(&self, user_id: ChatId) -> StorageResult<Option<UserEntity>>;

    /// Case-insensitive lookup without the leading `@`.
    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<UserEntity>>;

    /// Ids of every known user.
    async fn all_user_ids(&self) -> StorageResult<Vec<ChatId>>;

    /// Mark a book generation as running or finished for a user.
    async fn set_book_processing(&self, user_id: ChatId, processing: bool) -> StorageResult<()>;

    /// Clear the processing flag of every user. Returns the number of users affected.
    async fn clear_book_processing(&self) -> StorageResult<u64>;

    /// Record the books ordered on `date`.
    async fn set_daily_books(
        &self,
        user_id: ChatId,
        count: u32,
        date: NaiveDate,
    ) -> StorageResult<()>;

    /// Record the chat messages sent in the current window.
    async fn set_chat_usage(
        &self,
        user_id: ChatId,
        count: u32,
        reset_at: Option<DateTime<Utc>>,
    ) -> StorageResult<()>;

    /// Store a subscription period.
    async fn add_subscription(
        &self,
        user_id: ChatId,
        plan_name: &str,
        price: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> StorageResult<()>;

    /// All subscriptions of a user, latest end date first.
    async fn get_subscriptions(&self, user_id: ChatId) -> StorageResult<Vec<SubscriptionEntity>>;

    /// Remove every subscription of a user. Returns the number of rows removed.
    async fn delete_subscriptions(&self, user_id: ChatId) -> StorageResult<u64>;

    /// Users with a subscription active on `today`.
    async fn active_subscriber_ids(&self, today: NaiveDate) -> StorageResult<Vec<ChatId>>;

    /// Users without a subscription active on `today`.
    async fn inactive_user_ids(&self, today: NaiveDate) -> StorageResult<Vec<ChatId>>;

    /// Returns false when a plan with the same name exists.
    async fn add_plan(&self, name: &str, price: i64) -> StorageResult<bool>;

    /// Returns false when the plan does not exist.
    async fn remove_plan(&self, plan_id: i64) -> StorageResult<bool>;

    /// Plans in the order they were added.
    async fn get_plans(&self) -> StorageResult<Vec<PlanEntity>>;

    /// A plan by id.
    async fn get_plan(&self, plan_id: i64) -> StorageResult<Option<PlanEntity>>;

    /// Store a generated book. Titles are unique per user.
    async fn add_book(&self, user_id: ChatId, title: &str, content: &str) -> StorageResult<i64>;

    /// Books of a user in the order they were written.
    async fn get_library(&self, user_id: ChatId) -> StorageResult<Vec<BookSummary>>;

    /// A book with its text, if it belongs to the user.
    async fn get_book(
        &self,
        user_id: ChatId,
        book_id: i64,
    ) -> StorageResult<Option<LibraryBookEntity>>;

    /// Returns false when the user has no such book.
    async fn remove_book(&self, user_id: ChatId, book_id: i64) -> StorageResult<bool>;

    /// Stored settings, or the defaults when none were saved.
    async fn load_settings(&self) -> StorageResult<Settings>;

    /// Replace the stored settings.
    async fn save_settings(&self, settings: &Settings) -> StorageResult<()>;

    /// Add one to a global counter.
    async fn increment_usage(&self, counter: UsageCounter) -> StorageResult<()>;

    /// Current value of a global counter.
    async fn get_usage(&self, counter: UsageCounter) -> StorageResult<i64>;
}

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    Pool, Sqlite, migrate, query, query_as, query_scalar,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use teloxide::types::ChatId;
use tracing::debug;

use super::{
    BookSummary, BotStorage, LibraryBookEntity, PlanEntity, StorageError, StorageResult,
    SubscriptionEntity, UsageCounter, UserEntity,
};
use crate::settings::Settings;

const USER_COLUMNS: &str = "id, username, first_name, is_book_processing, daily_book_count, \
                            last_book_date, chat_message_count, chat_reset_at, created_at";

/// SQLite implementation of [`BotStorage`](super::BotStorage).
pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

impl SqliteStorage {
    /// Open the database, creating it if missing, and run migrations.
    pub async fn new(database_url: &str) -> StorageResult<Self> {
        debug!("Connecting to SQLite database: {}", database_url);
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database sees its own empty database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool =
            SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;

        migrate!("./migrations").run(&pool).await?;
        debug!("SQLite database migrated");

        Ok(Self { pool })
    }

    async fn ids(&self, sql: &str, today: Option<NaiveDate>) -> StorageResult<Vec<ChatId>> {
        let mut q = query_scalar::<_, i64>(sql);
        if let Some(today) = today {
            q = q.bind(today);
        }
        let ids = q.fetch_all(&self.pool).await?;
        Ok(ids.into_iter().map(ChatId).collect())
    }
}

#[async_trait]
impl BotStorage for SqliteStorage {
    async fn add_user(
        &self,
        user_id: ChatId,
        username: Option<String>,
        first_name: String,
    ) -> StorageResult<bool> {
        debug!("Adding user {} to SQLite", user_id);

        let inserted = query(
            "INSERT OR IGNORE INTO users (id, username, first_name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id.0)
        .bind(&username)
        .bind(&first_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected()
            > 0;

        if !inserted {
            query("UPDATE users SET username = ?, first_name = ? WHERE id = ?")
                .bind(&username)
                .bind(&first_name)
                .bind(user_id.0)
                .execute(&self.pool)
                .await?;
        }

        Ok(inserted)
    }

    async fn get_user(&self, user_id: ChatId) -> StorageResult<Option<UserEntity>> {
        let user = query_as::<_, UserEntity>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<UserEntity>> {
        debug!("Looking up user by username: {}", username);
        let user = query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE LIMIT 1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn all_user_ids(&self) -> StorageResult<Vec<ChatId>> {
        self.ids("SELECT id FROM users ORDER BY id", None).await
    }

    async fn set_book_processing(&self, user_id: ChatId, processing: bool) -> StorageResult<()> {
        debug!("Setting book processing for {} to {}", user_id, processing);
        query("UPDATE users SET is_book_processing = ? WHERE id = ?")
            .bind(processing)
            .bind(user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_book_processing(&self) -> StorageResult<u64> {
        let result = query("UPDATE users SET is_book_processing = 0 WHERE is_book_processing = 1")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_daily_books(
        &self,
        user_id: ChatId,
        count: u32,
        date: NaiveDate,
    ) -> StorageResult<()> {
        query("UPDATE users SET daily_book_count = ?, last_book_date = ? WHERE id = ?")
            .bind(i64::from(count))
            .bind(date)
            .bind(user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_chat_usage(
        &self,
        user_id: ChatId,
        count: u32,
        reset_at: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        query("UPDATE users SET chat_message_count = ?, chat_reset_at = ? WHERE id = ?")
            .bind(i64::from(count))
            .bind(reset_at)
            .bind(user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_subscription(
        &self,
        user_id: ChatId,
        plan_name: &str,
        price: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> StorageResult<()> {
        debug!("Adding subscription '{}' for {} until {}", plan_name, user_id, end_date);
        query(
            "INSERT INTO subscriptions (user_id, plan_name, price, start_date, end_date) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id.0)
        .bind(plan_name)
        .bind(price)
        .bind(start_date)
        .bind(end_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_subscriptions(&self, user_id: ChatId) -> StorageResult<Vec<SubscriptionEntity>> {
        let subscriptions = query_as::<_, SubscriptionEntity>(
            "SELECT id, user_id, plan_name, price, start_date, end_date FROM subscriptions \
             WHERE user_id = ? ORDER BY end_date DESC, id DESC",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(subscriptions)
    }

    async fn delete_subscriptions(&self, user_id: ChatId) -> StorageResult<u64> {
        debug!("Deleting subscriptions of {}", user_id);
        let result = query("DELETE FROM subscriptions WHERE user_id = ?")
            .bind(user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn active_subscriber_ids(&self, today: NaiveDate) -> StorageResult<Vec<ChatId>> {
        self.ids(
            "SELECT DISTINCT user_id FROM subscriptions WHERE end_date >= ? ORDER BY user_id",
            Some(today),
        )
        .await
    }

    async fn inactive_user_ids(&self, today: NaiveDate) -> StorageResult<Vec<ChatId>> {
        self.ids(
            "SELECT id FROM users WHERE id NOT IN \
             (SELECT user_id FROM subscriptions WHERE end_date >= ?) ORDER BY id",
            Some(today),
        )
        .await
    }

    async fn add_plan(&self, name: &str, price: i64) -> StorageResult<bool> {
        debug!("Adding plan '{}' priced {}", name, price);
        let result = query("INSERT OR IGNORE INTO plans (name, price) VALUES (?, ?)")
            .bind(name)
            .bind(price)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_plan(&self, plan_id: i64) -> StorageResult<bool> {
        let result = query("DELETE FROM plans WHERE id = ?").bind(plan_id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_plans(&self) -> StorageResult<Vec<PlanEntity>> {
        let plans = query_as::<_, PlanEntity>("SELECT id, name, price FROM plans ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(plans)
    }

    async fn get_plan(&self, plan_id: i64) -> StorageResult<Option<PlanEntity>> {
        let plan = query_as::<_, PlanEntity>("SELECT id, name, price FROM plans WHERE id = ?")
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(plan)
    }

    async fn add_book(&self, user_id: ChatId, title: &str, content: &str) -> StorageResult<i64> {
        debug!("Adding book '{}' to the library of {}", title, user_id);
        let result = query(
            "INSERT INTO library_books (user_id, title, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id.0)
        .bind(title)
        .bind(content)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get_library(&self, user_id: ChatId) -> StorageResult<Vec<BookSummary>> {
        let books = query_as::<_, BookSummary>(
            "SELECT id, title, created_at FROM library_books WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn get_book(
        &self,
        user_id: ChatId,
        book_id: i64,
    ) -> StorageResult<Option<LibraryBookEntity>> {
        let book = query_as::<_, LibraryBookEntity>(
            "SELECT id, user_id, title, content, created_at FROM library_books \
             WHERE user_id = ? AND id = ?",
        )
        .bind(user_id.0)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn remove_book(&self, user_id: ChatId, book_id: i64) -> StorageResult<bool> {
        debug!("Removing book {} from the library of {}", book_id, user_id);
        let result = query("DELETE FROM library_books WHERE user_id = ? AND id = ?")
            .bind(user_id.0)
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn load_settings(&self) -> StorageResult<Settings> {
        let data = query_scalar::<_, String>("SELECT data FROM settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        match data {
            Some(data) => serde_json::from_str(&data).map_err(|e| {
                StorageError::DataIntegrityError(format!("Stored settings are invalid: {e}"))
            }),
            None => Ok(Settings::default()),
        }
    }

    async fn save_settings(&self, settings: &Settings) -> StorageResult<()> {
        debug!("Saving settings: {:?}", settings);
        let data = serde_json::to_string(settings).map_err(|e| {
            StorageError::DataIntegrityError(format!("Failed to serialize settings: {e}"))
        })?;
        query("INSERT OR REPLACE INTO settings (id, data) VALUES (1, ?)")
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_usage(&self, counter: UsageCounter) -> StorageResult<()> {
        query(
            "INSERT INTO usage_counters (name, value) VALUES (?, 1) \
             ON CONFLICT(name) DO UPDATE SET value = value + 1",
        )
        .bind(counter.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_usage(&self, counter: UsageCounter) -> StorageResult<i64> {
        let value = query_scalar::<_, i64>("SELECT value FROM usage_counters WHERE name = ?")
            .bind(counter.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.unwrap_or(0))
    }
}

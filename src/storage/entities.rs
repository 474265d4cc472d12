use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use teloxide::types::ChatId;

/// A bot user, keyed by their private chat id.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserEntity {
    /// Telegram user id, equal to the private chat id.
    pub id: i64,
    /// Telegram username without `@`.
    pub username: Option<String>,
    /// First name at the last contact.
    pub first_name: String,
    /// A book generation is running.
    pub is_book_processing: bool,
    /// Books ordered on `last_book_date`.
    pub daily_book_count: i64,
    /// Day of the last book order.
    pub last_book_date: Option<NaiveDate>,
    /// Chat messages in the current window.
    pub chat_message_count: i64,
    /// End of the current chat window.
    pub chat_reset_at: Option<DateTime<Utc>>,
    /// First contact.
    pub created_at: DateTime<Utc>,
}

impl UserEntity {
    /// Telegram chat of the user.
    pub fn chat_id(&self) -> ChatId {
        ChatId(self.id)
    }

    /// Name to show in the admin panel.
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(username) => format!("@{username}"),
            None if !self.first_name.is_empty() => self.first_name.clone(),
            None => self.id.to_string(),
        }
    }
}

/// A paid or gifted subscription period.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SubscriptionEntity {
    /// Row id.
    pub id: i64,
    /// Subscriber.
    pub user_id: i64,
    /// Name of the plan at purchase time.
    pub plan_name: String,
    /// Price paid, in rubles.
    pub price: i64,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day.
    pub end_date: NaiveDate,
}

impl SubscriptionEntity {
    /// A subscription is active through its end date.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.end_date >= today
    }
}

/// A subscription plan offered for sale.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PlanEntity {
    /// Row id.
    pub id: i64,
    /// Unique plan name.
    pub name: String,
    /// Price in rubles.
    pub price: i64,
}

/// A library entry without its text.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct BookSummary {
    /// Row id.
    pub id: i64,
    /// Book title.
    pub title: String,
    /// When the book was stored.
    pub created_at: DateTime<Utc>,
}

/// A stored book with its text.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LibraryBookEntity {
    /// Row id.
    pub id: i64,
    /// Owner.
    pub user_id: i64,
    /// Book title.
    pub title: String,
    /// Full text.
    pub content: String,
    /// When the book was stored.
    pub created_at: DateTime<Utc>,
}

/// Global usage counters shown in the statistics screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageCounter {
    /// Book searches started.
    BookSearches,
    /// Chat messages answered.
    ChatMessages,
}

impl UsageCounter {
    /// Key in the usage table.
    pub fn as_str(self) -> &'static str {
        match self {
            UsageCounter::BookSearches => "book_searches",
            UsageCounter::ChatMessages => "chat_messages",
        }
    }
}

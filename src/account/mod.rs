#[cfg(test)]
mod tests;

use std::{collections::HashSet, ops::RangeInclusive, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use mockall::automock;
use serde::{Deserialize, Serialize};
use teloxide::types::ChatId;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    settings::{SettingKey, Settings},
    storage::{
        BookSummary, BotStorage, LibraryBookEntity, PlanEntity, StorageError, SubscriptionEntity,
        UsageCounter, UserEntity,
    },
};

/// Errors from the account service.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The storage layer failed.
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    /// No user with this id.
    #[error("User {0} not found")]
    UserNotFound(ChatId),
    /// The user already has a subscription ending on this date.
    #[error("Subscription is active until {0}")]
    AlreadySubscribed(NaiveDate),
    /// The user already has a book being generated.
    #[error("A book is already being generated")]
    BookInProgress,
    /// A value was rejected.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

type Result<T> = std::result::Result<T, AccountError>;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;

    /// Current date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Clock backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A user's subscription as shown to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// A subscription covers today.
    Active(SubscriptionEntity),
    /// The most recent subscription has ended.
    Expired(SubscriptionEntity),
    /// The user never subscribed.
    None,
}

/// What a user may order right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookAccess {
    /// Page counts the user may order.
    pub page_range: RangeInclusive<u32>,
    /// Books allowed per day.
    pub daily_limit: u32,
    /// Books created today.
    pub used_today: u32,
    /// The user has an active subscription.
    pub subscribed: bool,
    /// Free tier limits apply.
    pub limited: bool,
    /// A book of this user is being generated.
    pub in_progress: bool,
}

impl BookAccess {
    /// The daily book limit is used up.
    pub fn limit_reached(&self) -> bool {
        self.used_today >= self.daily_limit
    }
}

/// Outcome of counting one chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAccess {
    /// The message may be sent to the LLM.
    Allowed,
    /// The free tier limit is used up until `reset_at`.
    LimitReached {
        /// Limit that was reached.
        limit: u32,
        /// When the counter is reset.
        reset_at: DateTime<Utc>,
        /// Time left until `reset_at`.
        wait: Duration,
    },
}

/// Chat messages used by a free tier user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatQuota {
    /// Messages sent since the last reset, capped at `limit`.
    pub used: u32,
    /// Messages allowed before the cooldown starts.
    pub limit: u32,
}

/// Counters shown on the admin statistics screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Registered users.
    pub total_users: usize,
    /// Users with an active subscription.
    pub subscribed_users: usize,
    /// Users without an active subscription.
    pub unsubscribed_users: usize,
    /// Book generations started.
    pub book_searches: i64,
    /// Chat messages sent to the LLM.
    pub chat_messages: i64,
}

/// Everything the admin panel shows about one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// The user record.
    pub user: UserEntity,
    /// Books in the user's library.
    pub books_created: usize,
    /// Current subscription state.
    pub subscription: SubscriptionStatus,
}

/// Recipients of a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    /// Every registered user.
    #[serde(rename = "all")]
    All,
    /// Users with an active subscription.
    #[serde(rename = "sub")]
    Subscribed,
    /// Users without an active subscription.
    #[serde(rename = "unsub")]
    Unsubscribed,
}

/// Account rules on top of the storage.
#[automock]
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Adds the user if unknown. Returns true for a new user.
    async fn register_user(
        &self,
        user_id: ChatId,
        username: Option<String>,
        first_name: String,
    ) -> Result<bool>;
    /// Looks up a user by id.
    async fn get_user(&self, user_id: ChatId) -> Result<Option<UserEntity>>;

    /// Subscription covering today, if any.
    async fn active_subscription(&self, user_id: ChatId) -> Result<Option<SubscriptionEntity>>;
    /// Latest subscription of the user and whether it is still active.
    async fn subscription_status(&self, user_id: ChatId) -> Result<SubscriptionStatus>;
    /// Refuses users with an active subscription and clears expired ones.
    async fn prepare_purchase(&self, user_id: ChatId) -> Result<()>;
    /// Returns the end date of the new subscription. An active subscription is
    /// extended instead of overlapped.
    async fn activate_subscription(
        &self,
        user_id: ChatId,
        plan_name: &str,
        price: i64,
        days: u32,
    ) -> Result<NaiveDate>;
    /// Gives a free subscription to a user without an active one.
    async fn gift_subscription(
        &self,
        recipient: ChatId,
        plan_name: &str,
        days: u32,
    ) -> Result<NaiveDate>;

    /// Resets a stale daily counter and returns what the user may order.
    async fn book_access(&self, user_id: ChatId) -> Result<BookAccess>;
    /// Marks the user as processing a book. Fails with `BookInProgress` if they already are.
    async fn begin_book(&self, user_id: ChatId) -> Result<()>;
    /// Stores the book under a title unique in the user's library and returns that title.
    async fn complete_book(&self, user_id: ChatId, title: &str, content: &str) -> Result<String>;
    /// Clears the processing flag after a failed generation.
    async fn abort_book(&self, user_id: ChatId) -> Result<()>;

    /// Current chat usage, or `None` when the limit does not apply to the user.
    async fn chat_quota(&self, user_id: ChatId) -> Result<Option<ChatQuota>>;
    /// Counts one chat message, or refuses it when the free tier limit is reached.
    async fn register_chat_message(&self, user_id: ChatId) -> Result<ChatAccess>;

    /// Plans offered for sale.
    async fn list_plans(&self) -> Result<Vec<PlanEntity>>;
    /// A plan by id.
    async fn get_plan(&self, plan_id: i64) -> Result<Option<PlanEntity>>;
    /// Adds a plan. Returns false when the name is taken.
    async fn add_plan(&self, name: &str, price: i64) -> Result<bool>;
    /// Removes a plan. Returns false when it did not exist.
    async fn remove_plan(&self, plan_id: i64) -> Result<bool>;

    /// Titles in the user's library.
    async fn library(&self, user_id: ChatId) -> Result<Vec<BookSummary>>;
    /// A book of the user's library.
    async fn book(&self, user_id: ChatId, book_id: i64) -> Result<Option<LibraryBookEntity>>;
    /// Deletes a book of the user's library.
    async fn remove_book(&self, user_id: ChatId, book_id: i64) -> Result<bool>;

    /// Current runtime settings.
    async fn settings(&self) -> Result<Settings>;
    /// Validates and stores one numeric setting.
    async fn update_setting(&self, key: SettingKey, value: u32) -> Result<Settings>;
    /// Returns the new state of the check.
    async fn toggle_book_check(&self) -> Result<bool>;
    /// Returns the new state of the check.
    async fn toggle_chat_check(&self) -> Result<bool>;

    /// Counters for the admin panel.
    async fn statistics(&self) -> Result<Statistics>;
    /// Finds a user by numeric id or username.
    async fn find_user(&self, query: &str) -> Result<Option<UserProfile>>;
    /// User ids a broadcast goes to.
    async fn audience(&self, audience: Audience) -> Result<Vec<ChatId>>;
}

/// `AccountService` backed by `BotStorage`.
pub struct DefaultAccountService {
    storage: Arc<dyn BotStorage>,
    clock: Arc<dyn Clock>,
}

impl DefaultAccountService {
    /// Creates a new `DefaultAccountService`.
    pub fn new(storage: Arc<dyn BotStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    async fn require_user(&self, user_id: ChatId) -> Result<UserEntity> {
        self.storage.get_user(user_id).await?.ok_or(AccountError::UserNotFound(user_id))
    }

    /// Books created today, treating a stale date as zero.
    fn books_today(&self, user: &UserEntity) -> u32 {
        if user.last_book_date == Some(self.clock.today()) {
            u32::try_from(user.daily_book_count).unwrap_or(0)
        } else {
            0
        }
    }

    /// Settings when the chat limit applies to the user.
    async fn chat_limit_settings(&self, user_id: ChatId) -> Result<Option<Settings>> {
        let settings = self.storage.load_settings().await?;
        if !settings.chat_subscription_check || self.active_subscription(user_id).await?.is_some() {
            return Ok(None);
        }
        Ok(Some(settings))
    }

    /// Messages counted since the last reset and the pending reset time.
    fn chat_usage(&self, user: &UserEntity) -> (u32, Option<DateTime<Utc>>) {
        match user.chat_reset_at {
            Some(at) if self.clock.now() >= at => (0, None),
            reset_at => (u32::try_from(user.chat_message_count).unwrap_or(0), reset_at),
        }
    }

    async fn add_days_subscription(
        &self,
        user_id: ChatId,
        plan_name: &str,
        price: i64,
        start: NaiveDate,
        days: u32,
    ) -> Result<NaiveDate> {
        let end = start
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| AccountError::InvalidValue(format!("{days} days")))?;
        self.storage.add_subscription(user_id, plan_name, price, start, end).await?;
        Ok(end)
    }
}

fn cooldown_end(now: DateTime<Utc>, hours: u32) -> Result<DateTime<Utc>> {
    Duration::try_hours(i64::from(hours))
        .and_then(|cooldown| now.checked_add_signed(cooldown))
        .ok_or_else(|| AccountError::InvalidValue(format!("chat cooldown of {hours} hours")))
}

fn unique_title(title: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(title) {
        return title.to_string();
    }
    (2..)
        .map(|suffix| format!("{title}_{suffix}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| title.to_string())
}

#[async_trait]
impl AccountService for DefaultAccountService {
    async fn register_user(
        &self,
        user_id: ChatId,
        username: Option<String>,
        first_name: String,
    ) -> Result<bool> {
        let created = self.storage.add_user(user_id, username, first_name).await?;
        if created {
            info!("Registered new user {user_id}");
        }
        Ok(created)
    }

    async fn get_user(&self, user_id: ChatId) -> Result<Option<UserEntity>> {
        self.storage.get_user(user_id).await.map_err(AccountError::from)
    }

    async fn active_subscription(&self, user_id: ChatId) -> Result<Option<SubscriptionEntity>> {
        let today = self.clock.today();
        let subscriptions = self.storage.get_subscriptions(user_id).await?;
        Ok(subscriptions.into_iter().find(|s| s.is_active(today)))
    }

    async fn subscription_status(&self, user_id: ChatId) -> Result<SubscriptionStatus> {
        let today = self.clock.today();
        let latest = self.storage.get_subscriptions(user_id).await?.into_iter().max_by_key(|s| s.end_date);

        Ok(match latest {
            Some(s) if s.is_active(today) => SubscriptionStatus::Active(s),
            Some(s) => SubscriptionStatus::Expired(s),
            None => SubscriptionStatus::None,
        })
    }

    async fn prepare_purchase(&self, user_id: ChatId) -> Result<()> {
        if let Some(active) = self.active_subscription(user_id).await? {
            return Err(AccountError::AlreadySubscribed(active.end_date));
        }
        let removed = self.storage.delete_subscriptions(user_id).await?;
        debug!("Removed {removed} expired subscriptions of {user_id}");
        Ok(())
    }

    async fn activate_subscription(
        &self,
        user_id: ChatId,
        plan_name: &str,
        price: i64,
        days: u32,
    ) -> Result<NaiveDate> {
        let start = match self.active_subscription(user_id).await? {
            Some(active) => active.end_date,
            None => self.clock.today(),
        };
        let end = self.add_days_subscription(user_id, plan_name, price, start, days).await?;
        info!("Activated subscription '{plan_name}' for {user_id} until {end}");
        Ok(end)
    }

    async fn gift_subscription(
        &self,
        recipient: ChatId,
        plan_name: &str,
        days: u32,
    ) -> Result<NaiveDate> {
        if days == 0 {
            return Err(AccountError::InvalidValue("days must be positive".to_string()));
        }
        self.require_user(recipient).await?;
        self.prepare_purchase(recipient).await?;

        let today = self.clock.today();
        let end = self.add_days_subscription(recipient, plan_name, 0, today, days).await?;
        info!("Gifted subscription '{plan_name}' to {recipient} until {end}");
        Ok(end)
    }

    async fn book_access(&self, user_id: ChatId) -> Result<BookAccess> {
        let user = self.require_user(user_id).await?;
        let today = self.clock.today();
        if user.last_book_date != Some(today) {
            self.storage.set_daily_books(user_id, 0, today).await?;
        }

        let settings = self.storage.load_settings().await?;
        let subscribed = self.active_subscription(user_id).await?.is_some();
        let limited = settings.book_subscription_check && !subscribed;

        Ok(BookAccess {
            page_range: settings.page_range(limited),
            daily_limit: settings.daily_book_limit(limited),
            used_today: self.books_today(&user),
            subscribed,
            limited,
            in_progress: user.is_book_processing,
        })
    }

    async fn begin_book(&self, user_id: ChatId) -> Result<()> {
        let user = self.require_user(user_id).await?;
        if user.is_book_processing {
            return Err(AccountError::BookInProgress);
        }
        self.storage.set_book_processing(user_id, true).await?;
        self.storage.increment_usage(UsageCounter::BookSearches).await?;
        Ok(())
    }

    async fn complete_book(&self, user_id: ChatId, title: &str, content: &str) -> Result<String> {
        let user = self.require_user(user_id).await?;
        let taken: HashSet<String> =
            self.storage.get_library(user_id).await?.into_iter().map(|b| b.title).collect();
        let title = unique_title(title, &taken);

        self.storage.add_book(user_id, &title, content).await?;
        self.storage.set_daily_books(user_id, self.books_today(&user) + 1, self.clock.today()).await?;
        self.storage.set_book_processing(user_id, false).await?;

        info!("Stored book '{title}' for {user_id}");
        Ok(title)
    }

    async fn abort_book(&self, user_id: ChatId) -> Result<()> {
        self.storage.set_book_processing(user_id, false).await.map_err(AccountError::from)
    }

    async fn chat_quota(&self, user_id: ChatId) -> Result<Option<ChatQuota>> {
        let Some(settings) = self.chat_limit_settings(user_id).await? else {
            return Ok(None);
        };
        let user = self.require_user(user_id).await?;
        let (used, _) = self.chat_usage(&user);
        let limit = settings.chat_message_limit;
        Ok(Some(ChatQuota { used: used.min(limit), limit }))
    }

    async fn register_chat_message(&self, user_id: ChatId) -> Result<ChatAccess> {
        if let Some(settings) = self.chat_limit_settings(user_id).await? {
            let user = self.require_user(user_id).await?;
            let now = self.clock.now();
            let (count, reset_at) = self.chat_usage(&user);
            let limit = settings.chat_message_limit;

            if count >= limit {
                let reset_at = match reset_at {
                    Some(at) => at,
                    None => cooldown_end(now, settings.chat_cooldown_hours)?,
                };
                self.storage.set_chat_usage(user_id, count, Some(reset_at)).await?;
                debug!("Chat limit reached for {user_id} until {reset_at}");
                return Ok(ChatAccess::LimitReached { limit, reset_at, wait: reset_at - now });
            }

            self.storage.set_chat_usage(user_id, count + 1, reset_at).await?;
        }

        self.storage.increment_usage(UsageCounter::ChatMessages).await?;
        Ok(ChatAccess::Allowed)
    }

    async fn list_plans(&self) -> Result<Vec<PlanEntity>> {
        self.storage.get_plans().await.map_err(AccountError::from)
    }

    async fn get_plan(&self, plan_id: i64) -> Result<Option<PlanEntity>> {
        self.storage.get_plan(plan_id).await.map_err(AccountError::from)
    }

    async fn add_plan(&self, name: &str, price: i64) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AccountError::InvalidValue("plan name is empty".to_string()));
        }
        if price <= 0 {
            return Err(AccountError::InvalidValue("price must be positive".to_string()));
        }
        self.storage.add_plan(name, price).await.map_err(AccountError::from)
    }

    async fn remove_plan(&self, plan_id: i64) -> Result<bool> {
        self.storage.remove_plan(plan_id).await.map_err(AccountError::from)
    }

    async fn library(&self, user_id: ChatId) -> Result<Vec<BookSummary>> {
        self.storage.get_library(user_id).await.map_err(AccountError::from)
    }

    async fn book(&self, user_id: ChatId, book_id: i64) -> Result<Option<LibraryBookEntity>> {
        self.storage.get_book(user_id, book_id).await.map_err(AccountError::from)
    }

    async fn remove_book(&self, user_id: ChatId, book_id: i64) -> Result<bool> {
        self.storage.remove_book(user_id, book_id).await.map_err(AccountError::from)
    }

    async fn settings(&self) -> Result<Settings> {
        self.storage.load_settings().await.map_err(AccountError::from)
    }

    async fn update_setting(&self, key: SettingKey, value: u32) -> Result<Settings> {
        if value < key.min_value() || value > key.max_value() {
            return Err(AccountError::InvalidValue(format!(
                "{} must be between {} and {}",
                key.label(),
                key.min_value(),
                key.max_value()
            )));
        }
        let mut settings = self.storage.load_settings().await?;
        key.set(&mut settings, value);
        self.storage.save_settings(&settings).await?;
        info!("Setting {key:?} changed to {value}");
        Ok(settings)
    }

    async fn toggle_book_check(&self) -> Result<bool> {
        let mut settings = self.storage.load_settings().await?;
        settings.book_subscription_check = !settings.book_subscription_check;
        self.storage.save_settings(&settings).await?;
        Ok(settings.book_subscription_check)
    }

    async fn toggle_chat_check(&self) -> Result<bool> {
        let mut settings = self.storage.load_settings().await?;
        settings.chat_subscription_check = !settings.chat_subscription_check;
        self.storage.save_settings(&settings).await?;
        Ok(settings.chat_subscription_check)
    }

    async fn statistics(&self) -> Result<Statistics> {
        let today = self.clock.today();
        Ok(Statistics {
            total_users: self.storage.all_user_ids().await?.len(),
            subscribed_users: self.storage.active_subscriber_ids(today).await?.len(),
            unsubscribed_users: self.storage.inactive_user_ids(today).await?.len(),
            book_searches: self.storage.get_usage(UsageCounter::BookSearches).await?,
            chat_messages: self.storage.get_usage(UsageCounter::ChatMessages).await?,
        })
    }

    async fn find_user(&self, query: &str) -> Result<Option<UserProfile>> {
        let query = query.trim();
        let user = match query.parse::<i64>() {
            Ok(id) => self.storage.get_user(ChatId(id)).await?,
            Err(_) => self.storage.find_user_by_username(query.trim_start_matches('@')).await?,
        };
        let Some(user) = user else {
            return Ok(None);
        };

        let books_created = self.storage.get_library(user.chat_id()).await?.len();
        let subscription = self.subscription_status(user.chat_id()).await?;
        Ok(Some(UserProfile { user, books_created, subscription }))
    }

    async fn audience(&self, audience: Audience) -> Result<Vec<ChatId>> {
        let today = self.clock.today();
        let ids = match audience {
            Audience::All => self.storage.all_user_ids().await?,
            Audience::Subscribed => self.storage.active_subscriber_ids(today).await?,
            Audience::Unsubscribed => self.storage.inactive_user_ids(today).await?,
        };
        Ok(ids)
    }
}

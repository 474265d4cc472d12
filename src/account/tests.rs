use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use teloxide::types::ChatId;

use super::*;
use crate::storage::{MockBotStorage, sqlite::SqliteStorage};

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn service_at(now: DateTime<Utc>) -> (DefaultAccountService, Arc<SqliteStorage>) {
    let storage = Arc::new(SqliteStorage::new("sqlite::memory:").await.unwrap());
    storage.add_user(ChatId(1), Some("alice".to_string()), "Alice".to_string()).await.unwrap();
    storage.add_user(ChatId(2), Some("bob".to_string()), "Bob".to_string()).await.unwrap();
    let service = DefaultAccountService::new(storage.clone(), Arc::new(FixedClock(now)));
    (service, storage)
}

#[tokio::test]
async fn test_register_user() {
    // Arrange
    let mut mock_storage = MockBotStorage::new();
    mock_storage.expect_add_user().times(1).returning(|_, _, _| Ok(true));
    let service = DefaultAccountService::new(Arc::new(mock_storage), Arc::new(SystemClock));

    // Act
    let result = service.register_user(ChatId(1), None, "Alice".to_string()).await;

    // Assert
    assert!(result.unwrap());
}

#[tokio::test]
async fn test_book_access_free_tier() {
    let (service, _) = service_at(noon(2025, 5, 1)).await;

    let access = service.book_access(ChatId(1)).await.unwrap();

    assert_eq!(access.page_range, 5..=20);
    assert_eq!(access.daily_limit, 1);
    assert_eq!(access.used_today, 0);
    assert!(access.limited);
    assert!(!access.subscribed);
    assert!(!access.limit_reached());
}

#[tokio::test]
async fn test_book_access_with_subscription() {
    let (service, _) = service_at(noon(2025, 5, 1)).await;
    service.activate_subscription(ChatId(1), "Month", 299, 30).await.unwrap();

    let access = service.book_access(ChatId(1)).await.unwrap();

    assert_eq!(access.page_range, 5..=50);
    assert_eq!(access.daily_limit, 10);
    assert!(access.subscribed);
    assert!(!access.limited);
}

#[tokio::test]
async fn test_book_access_check_disabled() {
    let (service, _) = service_at(noon(2025, 5, 1)).await;
    assert!(!service.toggle_book_check().await.unwrap());

    let access = service.book_access(ChatId(1)).await.unwrap();

    assert_eq!(access.page_range, 5..=50);
    assert_eq!(access.daily_limit, 10);
    assert!(!access.limited);
}

#[tokio::test]
async fn test_daily_count_resets_on_new_day() {
    let (service, storage) = service_at(noon(2025, 5, 2)).await;
    storage.set_daily_books(ChatId(1), 1, date(2025, 5, 1)).await.unwrap();

    let access = service.book_access(ChatId(1)).await.unwrap();
    assert_eq!(access.used_today, 0);

    let user = storage.get_user(ChatId(1)).await.unwrap().unwrap();
    assert_eq!(user.daily_book_count, 0);
    assert_eq!(user.last_book_date, Some(date(2025, 5, 2)));
}

#[tokio::test]
async fn test_book_lifecycle() {
    let (service, storage) = service_at(noon(2025, 5, 1)).await;

    service.begin_book(ChatId(1)).await.unwrap();
    assert!(matches!(service.begin_book(ChatId(1)).await, Err(AccountError::BookInProgress)));
    assert!(service.book_access(ChatId(1)).await.unwrap().in_progress);

    let title = service.complete_book(ChatId(1), "Dune", "text").await.unwrap();
    assert_eq!(title, "Dune");

    let access = service.book_access(ChatId(1)).await.unwrap();
    assert!(!access.in_progress);
    assert_eq!(access.used_today, 1);
    assert!(access.limit_reached());
    assert_eq!(storage.get_usage(UsageCounter::BookSearches).await.unwrap(), 1);
}

#[tokio::test]
async fn test_complete_book_makes_title_unique() {
    let (service, _) = service_at(noon(2025, 5, 1)).await;

    let first = service.complete_book(ChatId(1), "Dune", "a").await.unwrap();
    let second = service.complete_book(ChatId(1), "Dune", "b").await.unwrap();
    let third = service.complete_book(ChatId(1), "Dune", "c").await.unwrap();
    let other_user = service.complete_book(ChatId(2), "Dune", "d").await.unwrap();

    assert_eq!((first.as_str(), second.as_str(), third.as_str()), ("Dune", "Dune_2", "Dune_3"));
    assert_eq!(other_user, "Dune");
    assert_eq!(service.library(ChatId(1)).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_abort_book_clears_flag() {
    let (service, _) = service_at(noon(2025, 5, 1)).await;

    service.begin_book(ChatId(1)).await.unwrap();
    service.abort_book(ChatId(1)).await.unwrap();

    let access = service.book_access(ChatId(1)).await.unwrap();
    assert!(!access.in_progress);
    assert_eq!(access.used_today, 0);
}

#[tokio::test]
async fn test_subscription_status() {
    let (service, storage) = service_at(noon(2025, 5, 1)).await;

    assert_eq!(service.subscription_status(ChatId(1)).await.unwrap(), SubscriptionStatus::None);

    storage.add_subscription(ChatId(1), "Week", 99, date(2025, 4, 1), date(2025, 4, 8)).await.unwrap();
    assert!(matches!(
        service.subscription_status(ChatId(1)).await.unwrap(),
        SubscriptionStatus::Expired(s) if s.plan_name == "Week"
    ));

    let end = service.activate_subscription(ChatId(1), "Month", 299, 30).await.unwrap();
    assert_eq!(end, date(2025, 5, 31));
    assert!(matches!(
        service.subscription_status(ChatId(1)).await.unwrap(),
        SubscriptionStatus::Active(s) if s.end_date == end
    ));
}

#[tokio::test]
async fn test_second_payment_extends_subscription() {
    let (service, storage) = service_at(noon(2025, 5, 1)).await;

    let first = service.activate_subscription(ChatId(1), "Month", 299, 30).await.unwrap();
    let second = service.activate_subscription(ChatId(1), "Month", 299, 30).await.unwrap();

    assert_eq!(first, date(2025, 5, 31));
    assert_eq!(second, date(2025, 6, 30));
    let subscriptions = storage.get_subscriptions(ChatId(1)).await.unwrap();
    assert_eq!(subscriptions.len(), 2);
    assert_eq!(subscriptions[0].start_date, first);
    assert!(matches!(
        service.subscription_status(ChatId(1)).await.unwrap(),
        SubscriptionStatus::Active(s) if s.end_date == second
    ));
}

#[tokio::test]
async fn test_prepare_purchase() {
    let (service, storage) = service_at(noon(2025, 5, 1)).await;
    storage.add_subscription(ChatId(1), "Week", 99, date(2025, 4, 1), date(2025, 4, 8)).await.unwrap();

    service.prepare_purchase(ChatId(1)).await.unwrap();
    assert!(storage.get_subscriptions(ChatId(1)).await.unwrap().is_empty());

    service.activate_subscription(ChatId(1), "Month", 299, 30).await.unwrap();
    assert!(matches!(
        service.prepare_purchase(ChatId(1)).await,
        Err(AccountError::AlreadySubscribed(end)) if end == date(2025, 5, 31)
    ));
}

#[tokio::test]
async fn test_gift_subscription() {
    let (service, storage) = service_at(noon(2025, 5, 1)).await;

    let end = service.gift_subscription(ChatId(2), "Gift", 7).await.unwrap();
    assert_eq!(end, date(2025, 5, 8));
    assert_eq!(storage.get_subscriptions(ChatId(2)).await.unwrap()[0].price, 0);

    assert!(matches!(
        service.gift_subscription(ChatId(2), "Gift", 7).await,
        Err(AccountError::AlreadySubscribed(_))
    ));
    assert!(matches!(
        service.gift_subscription(ChatId(99), "Gift", 7).await,
        Err(AccountError::UserNotFound(ChatId(99)))
    ));
}

#[tokio::test]
async fn test_chat_limit_and_reset() {
    let now = noon(2025, 5, 1);
    let (service, storage) = service_at(now).await;

    for _ in 0..10 {
        assert_eq!(service.register_chat_message(ChatId(1)).await.unwrap(), ChatAccess::Allowed);
    }
    let reset_at = now + Duration::hours(1);
    let limit_reached = ChatAccess::LimitReached { limit: 10, reset_at, wait: Duration::hours(1) };
    assert_eq!(service.register_chat_message(ChatId(1)).await.unwrap(), limit_reached);
    // The reset time does not move while the user keeps writing.
    assert_eq!(service.register_chat_message(ChatId(1)).await.unwrap(), limit_reached);

    let later = DefaultAccountService::new(storage.clone(), Arc::new(FixedClock(reset_at)));
    assert_eq!(later.register_chat_message(ChatId(1)).await.unwrap(), ChatAccess::Allowed);

    let user = storage.get_user(ChatId(1)).await.unwrap().unwrap();
    assert_eq!(user.chat_message_count, 1);
    assert_eq!(user.chat_reset_at, None);
}

#[tokio::test]
async fn test_chat_quota_follows_clock() {
    let now = noon(2025, 5, 1);
    let (service, storage) = service_at(now).await;
    assert_eq!(
        service.chat_quota(ChatId(1)).await.unwrap(),
        Some(ChatQuota { used: 0, limit: 10 })
    );

    storage.set_chat_usage(ChatId(1), 10, Some(now + Duration::minutes(30))).await.unwrap();
    assert_eq!(
        service.chat_quota(ChatId(1)).await.unwrap(),
        Some(ChatQuota { used: 10, limit: 10 })
    );

    let later = DefaultAccountService::new(
        storage.clone(),
        Arc::new(FixedClock(now + Duration::minutes(31))),
    );
    assert_eq!(
        later.chat_quota(ChatId(1)).await.unwrap(),
        Some(ChatQuota { used: 0, limit: 10 })
    );

    service.activate_subscription(ChatId(1), "Month", 299, 30).await.unwrap();
    assert_eq!(service.chat_quota(ChatId(1)).await.unwrap(), None);
}

#[tokio::test]
async fn test_oversized_cooldown_is_rejected() {
    let (service, storage) = service_at(noon(2025, 5, 1)).await;

    assert!(matches!(
        service.update_setting(SettingKey::ChatCooldownHours, u32::MAX).await,
        Err(AccountError::InvalidValue(_))
    ));
    assert!(service.update_setting(SettingKey::ChatCooldownHours, 24 * 365).await.is_ok());
    assert!(matches!(
        service.update_setting(SettingKey::ChatCooldownHours, 24 * 365 + 1).await,
        Err(AccountError::InvalidValue(_))
    ));

    // A cooldown saved before the cap existed is refused instead of overflowing the date.
    let settings =
        Settings { chat_message_limit: 1, chat_cooldown_hours: u32::MAX, ..Settings::default() };
    storage.save_settings(&settings).await.unwrap();

    assert_eq!(service.register_chat_message(ChatId(1)).await.unwrap(), ChatAccess::Allowed);
    assert!(matches!(
        service.register_chat_message(ChatId(1)).await,
        Err(AccountError::InvalidValue(_))
    ));
}

#[tokio::test]
async fn test_chat_unlimited_for_subscribers() {
    let (service, storage) = service_at(noon(2025, 5, 1)).await;
    service.activate_subscription(ChatId(1), "Month", 299, 30).await.unwrap();

    for _ in 0..15 {
        assert_eq!(service.register_chat_message(ChatId(1)).await.unwrap(), ChatAccess::Allowed);
    }
    assert_eq!(storage.get_usage(UsageCounter::ChatMessages).await.unwrap(), 15);
}

#[tokio::test]
async fn test_plans_validation() {
    let (service, _) = service_at(noon(2025, 5, 1)).await;

    assert!(service.add_plan("Month", 299).await.unwrap());
    assert!(!service.add_plan("Month", 299).await.unwrap());
    assert!(matches!(service.add_plan("Free", 0).await, Err(AccountError::InvalidValue(_))));
    assert!(matches!(service.add_plan("  ", 10).await, Err(AccountError::InvalidValue(_))));

    let plans = service.list_plans().await.unwrap();
    assert_eq!(plans.len(), 1);
    assert!(service.remove_plan(plans[0].id).await.unwrap());
}

#[tokio::test]
async fn test_update_setting() {
    let (service, _) = service_at(noon(2025, 5, 1)).await;

    let settings = service.update_setting(SettingKey::MaxPagesFree, 30).await.unwrap();
    assert_eq!(settings.max_pages_free, 30);
    assert_eq!(service.settings().await.unwrap().max_pages_free, 30);

    assert!(matches!(
        service.update_setting(SettingKey::BooksPerDayFree, 0).await,
        Err(AccountError::InvalidValue(_))
    ));
    assert!(matches!(
        service.update_setting(SettingKey::MaxPagesFree, 51).await,
        Err(AccountError::InvalidValue(_))
    ));
}

#[tokio::test]
async fn test_statistics_and_audience() {
    let (service, _) = service_at(noon(2025, 5, 1)).await;
    service.activate_subscription(ChatId(2), "Month", 299, 30).await.unwrap();
    service.begin_book(ChatId(1)).await.unwrap();

    let stats = service.statistics().await.unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.subscribed_users, 1);
    assert_eq!(stats.unsubscribed_users, 1);
    assert_eq!(stats.book_searches, 1);

    assert_eq!(service.audience(Audience::All).await.unwrap(), vec![ChatId(1), ChatId(2)]);
    assert_eq!(service.audience(Audience::Subscribed).await.unwrap(), vec![ChatId(2)]);
    assert_eq!(service.audience(Audience::Unsubscribed).await.unwrap(), vec![ChatId(1)]);
}

#[tokio::test]
async fn test_find_user() {
    let (service, _) = service_at(noon(2025, 5, 1)).await;
    service.complete_book(ChatId(2), "Dune", "text").await.unwrap();

    let by_id = service.find_user("2").await.unwrap().unwrap();
    assert_eq!(by_id.user.id, 2);
    assert_eq!(by_id.books_created, 1);
    assert_eq!(by_id.subscription, SubscriptionStatus::None);

    let by_name = service.find_user("@Alice").await.unwrap().unwrap();
    assert_eq!(by_name.user.id, 1);

    assert!(service.find_user("nobody").await.unwrap().is_none());
}

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Smallest book that can be ordered.
pub const MIN_PAGES: u32 = 5;
/// Largest book that can be ordered with a subscription.
pub const MAX_PAGES: u32 = 50;
/// Longest chat cooldown an admin can set, one year.
pub const MAX_COOLDOWN_HOURS: u32 = 24 * 365;

/// Runtime settings editable from the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Chat requires a subscription beyond the free quota.
    pub chat_subscription_check: bool,
    /// Book search applies the free tier limits to users without a subscription.
    pub book_subscription_check: bool,
    /// Free chat messages per cooldown window.
    pub chat_message_limit: u32,
    /// Length of the chat cooldown window.
    pub chat_cooldown_hours: u32,
    /// Daily book limit without a subscription.
    pub books_per_day_free: u32,
    /// Daily book limit with a subscription.
    pub books_per_day_subscribed: u32,
    /// Largest book without a subscription.
    pub max_pages_free: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chat_subscription_check: true,
            book_subscription_check: true,
            chat_message_limit: 10,
            chat_cooldown_hours: 1,
            books_per_day_free: 1,
            books_per_day_subscribed: 10,
            max_pages_free: 20,
        }
    }
}

/// Numeric settings an admin can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKey {
    /// Messages a free user can send before the cooldown.
    #[serde(rename = "cml")]
    ChatMessageLimit,
    /// Hours until the chat quota resets.
    #[serde(rename = "cch")]
    ChatCooldownHours,
    /// Books per day without a subscription.
    #[serde(rename = "bpf")]
    BooksPerDayFree,
    /// Books per day with a subscription.
    #[serde(rename = "bps")]
    BooksPerDaySubscribed,
    /// Page limit without a subscription.
    #[serde(rename = "mpf")]
    MaxPagesFree,
}

impl SettingKey {
    /// Current value of this setting.
    pub fn get(self, settings: &Settings) -> u32 {
        match self {
            SettingKey::ChatMessageLimit => settings.chat_message_limit,
            SettingKey::ChatCooldownHours => settings.chat_cooldown_hours,
            SettingKey::BooksPerDayFree => settings.books_per_day_free,
            SettingKey::BooksPerDaySubscribed => settings.books_per_day_subscribed,
            SettingKey::MaxPagesFree => settings.max_pages_free,
        }
    }

    /// Overwrites this setting. The value is not checked against the bounds.
    pub fn set(self, settings: &mut Settings, value: u32) {
        let field = match self {
            SettingKey::ChatMessageLimit => &mut settings.chat_message_limit,
            SettingKey::ChatCooldownHours => &mut settings.chat_cooldown_hours,
            SettingKey::BooksPerDayFree => &mut settings.books_per_day_free,
            SettingKey::BooksPerDaySubscribed => &mut settings.books_per_day_subscribed,
            SettingKey::MaxPagesFree => &mut settings.max_pages_free,
        };
        *field = value;
    }

    /// Smallest accepted value.
    pub fn min_value(self) -> u32 {
        match self {
            SettingKey::MaxPagesFree => MIN_PAGES,
            _ => 1,
        }
    }

    /// Largest accepted value.
    pub fn max_value(self) -> u32 {
        match self {
            SettingKey::MaxPagesFree => MAX_PAGES,
            SettingKey::ChatCooldownHours => MAX_COOLDOWN_HOURS,
            _ => u32::MAX,
        }
    }

    /// Admin panel label.
    pub fn label(self) -> &'static str {
        match self {
            SettingKey::ChatMessageLimit => "Лимит сообщений в чате (без подписки)",
            SettingKey::ChatCooldownHours => "Время ожидания сброса лимита чата (часы)",
            SettingKey::BooksPerDayFree => "Лимит книг в день (без подписки)",
            SettingKey::BooksPerDaySubscribed => "Лимит книг в день (с подпиской)",
            SettingKey::MaxPagesFree => "Макс. кол-во страниц (без подписки)",
        }
    }
}

impl Settings {
    /// Page range available to a user.
    pub fn page_range(&self, free_tier: bool) -> RangeInclusive<u32> {
        if free_tier { MIN_PAGES..=self.max_pages_free.max(MIN_PAGES) } else { MIN_PAGES..=MAX_PAGES }
    }

    /// Books a user may order per day.
    pub fn daily_book_limit(&self, free_tier: bool) -> u32 {
        if free_tier { self.books_per_day_free } else { self.books_per_day_subscribed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert!(settings.chat_subscription_check);
        assert!(settings.book_subscription_check);
        assert_eq!(settings.chat_message_limit, 10);
        assert_eq!(settings.chat_cooldown_hours, 1);
        assert_eq!(settings.books_per_day_free, 1);
        assert_eq!(settings.books_per_day_subscribed, 10);
        assert_eq!(settings.max_pages_free, 20);
    }

    #[test]
    fn test_setting_key_get_set() {
        let mut settings = Settings::default();

        SettingKey::BooksPerDaySubscribed.set(&mut settings, 3);
        SettingKey::MaxPagesFree.set(&mut settings, 30);

        assert_eq!(SettingKey::BooksPerDaySubscribed.get(&settings), 3);
        assert_eq!(settings.max_pages_free, 30);
    }

    #[test]
    fn test_page_range() {
        let settings = Settings::default();

        assert_eq!(settings.page_range(true), 5..=20);
        assert_eq!(settings.page_range(false), 5..=50);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"max_pages_free": 12}"#).unwrap();

        assert_eq!(settings.max_pages_free, 12);
        assert_eq!(settings.books_per_day_free, 1);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(SettingKey::MaxPagesFree.min_value(), MIN_PAGES);
        assert_eq!(SettingKey::MaxPagesFree.max_value(), MAX_PAGES);
        assert_eq!(SettingKey::ChatCooldownHours.max_value(), MAX_COOLDOWN_HOURS);
        assert_eq!(SettingKey::ChatMessageLimit.max_value(), u32::MAX);
    }
}


use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use mockall::automock;
use teloxide::{
    types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup},
    utils::html,
};
use thiserror::Error;
use url::Url;

use crate::{
    account::{AccountError, AccountService, Audience},
    messaging::{MessagingError, MessagingService, Screen},
};

/// Errors from admin notifications. Parse errors are shown to the admin as is.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Only buttons were given.
    #[error("Текст уведомления не может быть пустым.")]
    EmptyBody,
    /// A button line has no label or link.
    #[error("Ошибка в формате кнопки: {0}\nПроверьте, что формат правильный (Текст|Ссылка).")]
    InvalidButton(String),
    /// A button link is not an http URL.
    #[error("Неправильная ссылка в строке: {0}\nУбедитесь, что ссылка начинается с 'http'.")]
    InvalidLink(String),
    /// Recipients could not be loaded.
    #[error("Failed to load recipients: {0}")]
    Account(#[from] AccountError),
    /// The message could not be sent.
    #[error("Failed to deliver notification: {0}")]
    Messaging(#[from] MessagingError),
}

type Result<T> = std::result::Result<T, NotificationError>;

/// A message written by an admin, with optional link buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    /// Escaped and sent as the message text.
    pub body: String,
    /// `(label, link)` pairs, one button per row.
    pub buttons: Vec<(String, Url)>,
}

impl Broadcast {
    /// The broadcast as a message.
    pub fn screen(&self) -> Screen {
        let text = html::escape(&self.body);
        if self.buttons.is_empty() {
            return Screen::plain(text);
        }

        let rows = self
            .buttons
            .iter()
            .map(|(label, link)| vec![InlineKeyboardButton::url(label.clone(), link.clone())]);
        Screen::new(text, InlineKeyboardMarkup::new(rows))
    }
}

/// Parses admin input. Lines shaped like `Label|https://…` become buttons,
/// everything else is the body.
pub fn parse_broadcast(text: &str) -> Result<Broadcast> {
    let mut body = Vec::new();
    let mut buttons = Vec::new();

    for line in text.lines() {
        let Some((label, link)) = line.split_once('|') else {
            body.push(line);
            continue;
        };

        let (label, link) = (label.trim(), link.trim());
        if label.is_empty() || link.is_empty() {
            return Err(NotificationError::InvalidButton(line.to_string()));
        }
        if !link.starts_with("http") {
            return Err(NotificationError::InvalidLink(line.to_string()));
        }
        let link = Url::parse(link).map_err(|_| NotificationError::InvalidLink(line.to_string()))?;
        buttons.push((label.to_string(), link));
    }

    let body = body.join("\n").trim().to_string();
    if body.is_empty() {
        return Err(NotificationError::EmptyBody);
    }

    Ok(Broadcast { body, buttons })
}

/// Outcome of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Messages sent.
    pub delivered: usize,
    /// Messages Telegram refused.
    pub failed: usize,
}

/// Sends admin messages to users.
#[automock]
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends the broadcast to every user in the audience. Delivery failures
    /// are counted, not returned.
    async fn broadcast(&self, audience: Audience, broadcast: &Broadcast) -> Result<BroadcastReport>;

    /// Sends the broadcast to one chat.
    async fn send_direct(&self, recipient: ChatId, broadcast: &Broadcast) -> Result<()>;
}

/// `NotificationService` over the messaging service.
pub struct Notifier {
    account: Arc<dyn AccountService>,
    messaging_service: Arc<dyn MessagingService>,
    // The maximum number of messages in flight.
    max_concurrency: usize,
}

impl Notifier {
    /// Creates a new `Notifier`. At least one message is kept in flight.
    pub fn new(
        account: Arc<dyn AccountService>,
        messaging_service: Arc<dyn MessagingService>,
        max_concurrency: usize,
    ) -> Self {
        Self { account, messaging_service, max_concurrency: max_concurrency.max(1) }
    }
}

#[async_trait]
impl NotificationService for Notifier {
    async fn broadcast(&self, audience: Audience, broadcast: &Broadcast) -> Result<BroadcastReport> {
        let recipients = self.account.audience(audience).await?;
        tracing::info!("Broadcasting to {} users ({audience:?})", recipients.len());

        let screen = broadcast.screen();
        let tasks = recipients.into_iter().map(|chat_id| {
            let screen = screen.clone();
            async move { (chat_id, self.messaging_service.send_screen(chat_id, screen).await) }
        });

        let mut buffered_tasks = stream::iter(tasks).buffer_unordered(self.max_concurrency);
        let mut report = BroadcastReport::default();

        while let Some((chat_id, result)) = buffered_tasks.next().await {
            match result {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!("Failed to notify {chat_id}: {e}");
                    report.failed += 1;
                }
            }
        }

        tracing::info!("Broadcast finished: {report:?}");
        Ok(report)
    }

    async fn send_direct(&self, recipient: ChatId, broadcast: &Broadcast) -> Result<()> {
        self.messaging_service.send_screen(recipient, broadcast.screen()).await?;
        tracing::debug!("Sent direct notification to {recipient}");
        Ok(())
    }
}

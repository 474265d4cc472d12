pub(crate) mod keyboards;
pub(crate) mod screens;
mod utils;


use async_trait::async_trait;
use mockall::automock;
use teloxide::{
    ApiError, RequestError,
    prelude::*,
    types::{ChatId, InlineKeyboardMarkup, InputFile, MessageId, ParseMode},
    utils::html,
};
use thiserror::Error;
pub use utils::format_date;

use crate::bot_handler::BotHandlerError;

/// Errors from sending messages.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The Telegram request failed.
    #[error("Teloxide API request failed: {0}")]
    TeloxideRequest(#[from] teloxide::RequestError),
}

type Result<T> = std::result::Result<T, MessagingError>;

/// HTML text with an optional inline keyboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    /// HTML text.
    pub text: String,
    /// Buttons under the text.
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Screen {
    /// A screen with buttons.
    pub fn new(text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Self {
        Self { text: text.into(), keyboard: Some(keyboard) }
    }

    /// A screen without buttons.
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), keyboard: None }
    }
}

/// Trait for sending messages to the user.
#[automock]
#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Sends a new message rendered from the screen.
    async fn send_screen(&self, chat_id: ChatId, screen: Screen) -> Result<MessageId>;

    /// Replaces an existing message with the screen. Editing a message to
    /// identical content is not an error.
    async fn edit_screen(&self, chat_id: ChatId, message_id: MessageId, screen: Screen)
    -> Result<()>;

    /// Sends unformatted text, e.g. LLM replies or progress updates.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageId>;

    /// Replaces the text of an unformatted message.
    async fn edit_text(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()>;

    /// Clears the spinner on a pressed button. An empty `text` shows no toast.
    async fn answer_callback_query(&self, query_id: &str, text: &str) -> Result<()>;

    /// Sends a file with the given name and caption.
    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: String,
        content: Vec<u8>,
        caption: String,
    ) -> Result<()>;

    /// Sends an error message to the provided chat.
    async fn send_error_msg(&self, chat_id: ChatId, error: BotHandlerError) -> Result<()>;
}

/// Telegram messaging service.
pub struct TelegramMessagingService {
    bot: Bot,
}

impl TelegramMessagingService {
    /// Creates a new `TelegramMessagingService`.
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn ignore_not_modified(result: std::result::Result<(), RequestError>) -> Result<()> {
    match result {
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        other => other.map_err(MessagingError::TeloxideRequest),
    }
}

#[async_trait]
impl MessagingService for TelegramMessagingService {
    async fn send_screen(&self, chat_id: ChatId, screen: Screen) -> Result<MessageId> {
        let mut request = self.bot.send_message(chat_id, screen.text).parse_mode(ParseMode::Html);
        if let Some(keyboard) = screen.keyboard {
            request = request.reply_markup(keyboard);
        }

        request.await.map(|msg| msg.id).map_err(MessagingError::TeloxideRequest)
    }

    async fn edit_screen(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        screen: Screen,
    ) -> Result<()> {
        let mut request = self
            .bot
            .edit_message_text(chat_id, message_id, screen.text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = screen.keyboard {
            request = request.reply_markup(keyboard);
        }

        ignore_not_modified(request.await.map(|_| ()))
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageId> {
        self.bot
            .send_message(chat_id, text)
            .await
            .map(|msg| msg.id)
            .map_err(MessagingError::TeloxideRequest)
    }

    async fn edit_text(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()> {
        ignore_not_modified(
            self.bot.edit_message_text(chat_id, message_id, text).await.map(|_| ()),
        )
    }

    async fn answer_callback_query(&self, query_id: &str, text: &str) -> Result<()> {
        let mut request = self.bot.answer_callback_query(query_id);
        if !text.is_empty() {
            request = request.text(text);
        }

        request.await.map(|_| ()).map_err(MessagingError::TeloxideRequest)
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: String,
        content: Vec<u8>,
        caption: String,
    ) -> Result<()> {
        self.bot
            .send_document(chat_id, InputFile::memory(content).file_name(file_name))
            .caption(caption)
            .await
            .map(|_| ())
            .map_err(MessagingError::TeloxideRequest)
    }

    async fn send_error_msg(&self, chat_id: ChatId, error: BotHandlerError) -> Result<()> {
        let text = format!("⚠️ {}", html::escape(&error.user_message()));
        self.send_screen(chat_id, Screen::new(text, keyboards::BACK_TO_MENU.clone()))
            .await
            .map(|_| ())
    }
}

mod callback_actions;
mod callbacks;
mod commands;
#[cfg(test)]
mod test_helpers;

use std::{collections::HashSet, sync::Arc};

pub(crate) use callback_actions::CallbackAction;
use serde::{Deserialize, Serialize};
use teloxide::{
    dispatching::dialogue::{Dialogue, SqliteStorage, SqliteStorageError, serializer::Json},
    prelude::*,
    types::Message,
    utils::command::BotCommands,
};
use thiserror::Error;

use crate::{
    account::{AccountError, AccountService, Audience},
    generation::{AddonSet, BookLanguage, BookOutline, BookService, BookServiceError},
    llm::{ChatMessage, LlmClient, LlmError},
    messaging::{MessagingError, MessagingService, Screen, screens},
    notifications::{NotificationError, NotificationService},
    payments::{PaymentError, PaymentGateway, PaymentTracker},
    settings::SettingKey,
};

/// Commands the bot understands.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    /// Registers the user and opens the main menu.
    #[command(description = "Запустить бота и открыть главное меню.")]
    Start,
    /// Opens the main menu.
    #[command(description = "Вернуться в главное меню.")]
    Menu,
    /// Shows the help text.
    #[command(description = "Показать справку.")]
    Help,
}

/// Persistent storage for dialogue state, shared with the bot database.
pub type DialogueStorage = SqliteStorage<Json>;

/// Dialogue of one chat.
pub type BotDialogue = Dialogue<CommandState, DialogueStorage>;

/// What the bot expects from the user's next text message.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub enum CommandState {
    /// No reply is expected.
    #[default]
    None,

    // Book search
    /// Picking extras for the book.
    ChoosingAddons {
        /// Language the book is written in.
        language: BookLanguage,
        /// Extras chosen so far.
        addons: AddonSet,
    },
    /// Waiting for the book title.
    AwaitingBookTitle {
        /// Language the book is written in.
        language: BookLanguage,
        /// Extras chosen so far.
        addons: AddonSet,
    },
    /// Waiting for the page count of a found book.
    AwaitingPageCount {
        /// Language the book is written in.
        language: BookLanguage,
        /// Extras chosen so far.
        addons: AddonSet,
        /// Outline the LLM returned for the title.
        outline: BookOutline,
    },

    /// Every text message goes to the LLM.
    ChattingWithAi {
        /// Recent messages, oldest first.
        history: Vec<ChatMessage>,
    },

    // Admin panel
    /// Waiting for a user id or username.
    AwaitingUserSearch,
    /// Waiting for the broadcast text.
    AwaitingBroadcast {
        /// Who receives the broadcast.
        audience: Audience,
    },
    /// Waiting for the id of a direct message recipient.
    AwaitingDirectRecipient,
    /// Waiting for the direct message text.
    AwaitingDirectMessage {
        /// Chat that receives the message.
        recipient: ChatId,
    },
    /// Waiting for a new setting value.
    AwaitingSettingValue {
        /// Setting being edited.
        key: SettingKey,
    },
    /// Waiting for the name of a new plan.
    AwaitingPlanName,
    /// Waiting for the price of a new plan.
    AwaitingPlanPrice {
        /// Name of the new plan.
        name: String,
    },
    /// Waiting for the gift recipient.
    AwaitingGiftRecipient {
        /// Plan the gift is named after.
        plan_name: String,
    },
    /// Waiting for the length of the gift.
    AwaitingGiftDays {
        /// Plan the gift is named after.
        plan_name: String,
        /// Chat that receives the message.
        recipient: ChatId,
    },
}

impl CommandState {
    /// States entered from the admin panel.
    pub fn is_admin_only(&self) -> bool {
        use CommandState::*;
        matches!(
            self,
            AwaitingUserSearch
                | AwaitingBroadcast { .. }
                | AwaitingDirectRecipient
                | AwaitingDirectMessage { .. }
                | AwaitingSettingValue { .. }
                | AwaitingPlanName
                | AwaitingPlanPrice { .. }
                | AwaitingGiftRecipient { .. }
                | AwaitingGiftDays { .. }
        )
    }
}

/// Errors raised while handling an update.
#[derive(Debug, Error)]
pub enum BotHandlerError {
    /// The user sent something unusable. The message is shown to them.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reading or writing the dialogue failed.
    #[error("Failed to update dialogue: {0}")]
    DialogueError(#[source] SqliteStorageError<serde_json::Error>),

    /// The account service failed.
    #[error("Account error: {0}")]
    AccountError(#[from] AccountError),

    /// Book generation failed.
    #[error("Book generation error: {0}")]
    BookError(#[from] BookServiceError),

    /// The LLM request failed.
    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    /// The payment gateway failed.
    #[error("Payment error: {0}")]
    PaymentError(#[from] PaymentError),

    /// A broadcast or direct message failed.
    #[error("Notification error: {0}")]
    NotificationError(#[from] NotificationError),

    /// Telegram refused a message.
    #[error("Failed to send message: {0}")]
    SendError(#[from] MessagingError),
}

impl BotHandlerError {
    /// Text shown to the user. Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            BotHandlerError::InvalidInput(message) => message.clone(),
            BotHandlerError::AccountError(AccountError::BookInProgress) => {
                "Книга уже создаётся. Пожалуйста, дождитесь её завершения.".to_string()
            }
            _ => "Произошла ошибка. Пожалуйста, попробуйте позже.".to_string(),
        }
    }
}

/// Result of a handler.
pub type BotHandlerResult<T> = Result<T, BotHandlerError>;

/// Services the handler talks to.
pub struct BotServices {
    /// Telegram messaging.
    pub messaging: Arc<dyn MessagingService>,
    /// Users, quotas and subscriptions.
    pub account: Arc<dyn AccountService>,
    /// Outline lookup and book generation.
    pub books: Arc<dyn BookService>,
    /// Chat completions for the AI chat.
    pub llm: Arc<dyn LlmClient>,
    /// Payment gateway.
    pub payments: Arc<dyn PaymentGateway>,
    /// Background payment tracking.
    pub payment_tracker: Arc<dyn PaymentTracker>,
    /// Broadcasts and direct messages.
    pub notifications: Arc<dyn NotificationService>,
}

/// Routes updates to the command, callback and reply handlers.
pub struct BotHandler {
    messaging_service: Arc<dyn MessagingService>,
    account_service: Arc<dyn AccountService>,
    book_service: Arc<dyn BookService>,
    llm: Arc<dyn LlmClient>,
    payment_gateway: Arc<dyn PaymentGateway>,
    payment_tracker: Arc<dyn PaymentTracker>,
    notification_service: Arc<dyn NotificationService>,
    admins: HashSet<ChatId>,
    subscription_days: u32,
}

/// Data shared by every handler of a single update.
pub(crate) struct Context<'a> {
    pub handler: &'a BotHandler,
    pub message: &'a Message,
    pub dialogue: &'a BotDialogue,
    /// Set when the update is a button press.
    pub query: Option<&'a CallbackQuery>,
}

impl Context<'_> {
    pub fn chat_id(&self) -> ChatId {
        self.message.chat.id
    }

    /// Name to greet the user with. Button presses carry the user, while
    /// the message they belong to was sent by the bot.
    pub fn first_name(&self) -> String {
        match (self.query, self.message.from.as_ref()) {
            (Some(query), _) => query.from.first_name.clone(),
            (None, Some(user)) => user.first_name.clone(),
            (None, None) => self.message.chat.first_name().unwrap_or_default().to_string(),
        }
    }

    pub fn username(&self) -> Option<String> {
        match (self.query, self.message.from.as_ref()) {
            (Some(query), _) => query.from.username.clone(),
            (None, Some(user)) => user.username.clone(),
            (None, None) => self.message.chat.username().map(str::to_string),
        }
    }

    /// Edits the pressed message, or sends a new one when replying to text.
    pub async fn show(&self, screen: Screen) -> BotHandlerResult<()> {
        let messaging = &self.handler.messaging_service;
        if self.query.is_some() {
            messaging.edit_screen(self.chat_id(), self.message.id, screen).await?;
        } else {
            messaging.send_screen(self.chat_id(), screen).await?;
        }
        Ok(())
    }

    /// Always sends a new message.
    pub async fn reply(&self, screen: Screen) -> BotHandlerResult<()> {
        self.handler.messaging_service.send_screen(self.chat_id(), screen).await?;
        Ok(())
    }

    pub async fn state(&self) -> BotHandlerResult<CommandState> {
        let state = self.dialogue.get().await.map_err(BotHandlerError::DialogueError)?;
        Ok(state.unwrap_or_default())
    }

    pub async fn set_state(&self, state: CommandState) -> BotHandlerResult<()> {
        self.dialogue.update(state).await.map_err(BotHandlerError::DialogueError)
    }

    pub async fn reset_state(&self) -> BotHandlerResult<()> {
        self.set_state(CommandState::None).await
    }
}

impl BotHandler {
    /// Creates a new `BotHandler` instance.
    pub fn new(services: BotServices, admins: HashSet<ChatId>, subscription_days: u32) -> Self {
        Self {
            messaging_service: services.messaging,
            account_service: services.account,
            book_service: services.books,
            llm: services.llm,
            payment_gateway: services.payments,
            payment_tracker: services.payment_tracker,
            notification_service: services.notifications,
            admins,
            subscription_days,
        }
    }

    /// Whether the chat may open the admin panel.
    pub fn is_admin(&self, chat_id: ChatId) -> bool {
        self.admins.contains(&chat_id)
    }

    /// Dispatches the incoming command to the appropriate handler.
    pub async fn handle_commands(
        &self,
        msg: &Message,
        cmd: Command,
        dialogue: BotDialogue,
    ) -> BotHandlerResult<()> {
        let ctx = Context { handler: self, message: msg, dialogue: &dialogue, query: None };

        let result = match cmd {
            Command::Start => commands::start::handle(ctx).await,
            Command::Menu => commands::menu::handle(ctx).await,
            Command::Help => commands::help::handle(ctx).await,
        };

        self.report_error(msg.chat.id, result).await
    }

    /// Handles a button press.
    pub async fn handle_callback_query(
        &self,
        query: &CallbackQuery,
        dialogue: BotDialogue,
    ) -> BotHandlerResult<()> {
        let Some(message) = query.message.as_ref().and_then(|m| m.regular_message()) else {
            self.messaging_service.answer_callback_query(&query.id, "").await?;
            return Ok(());
        };
        let chat_id = message.chat.id;

        let action = match query.data.as_deref().map(serde_json::from_str::<CallbackAction>) {
            Some(Ok(action)) => action,
            other => {
                tracing::warn!(
                    "Ignoring callback from {chat_id} with data {:?}: {other:?}",
                    query.data
                );
                self.messaging_service.answer_callback_query(&query.id, "").await?;
                return Ok(());
            }
        };

        if action.is_admin_only() && !self.is_admin(chat_id) {
            tracing::warn!("User {chat_id} tried to use admin action {action:?}");
            self.messaging_service
                .answer_callback_query(&query.id, screens::ACCESS_DENIED)
                .await?;
            return Ok(());
        }

        // Answer the callback query to clear the spinner.
        self.messaging_service.answer_callback_query(&query.id, "").await?;

        let ctx = Context { handler: self, message, dialogue: &dialogue, query: Some(query) };
        let result = callbacks::handle(ctx, action).await;

        self.report_error(chat_id, result).await
    }

    /// Handles a plain text message according to the dialogue state.
    pub async fn handle_message(
        &self,
        msg: &Message,
        dialogue: BotDialogue,
    ) -> BotHandlerResult<()> {
        let ctx = Context { handler: self, message: msg, dialogue: &dialogue, query: None };
        let result = self.route_message(ctx).await;
        self.report_error(msg.chat.id, result).await
    }

    async fn route_message(&self, ctx: Context<'_>) -> BotHandlerResult<()> {
        let Some(text) = ctx.message.text() else {
            return ctx.reply(screens::use_start()).await;
        };

        let state = ctx.state().await?;
        if state.is_admin_only() && !self.is_admin(ctx.chat_id()) {
            ctx.reset_state().await?;
            return ctx.reply(screens::use_start()).await;
        }

        match state {
            CommandState::None | CommandState::ChoosingAddons { .. } => {
                ctx.reply(screens::use_start()).await
            }
            CommandState::AwaitingBookTitle { language, addons } => {
                callbacks::book_search::handle_title_reply(ctx, text, language, addons).await
            }
            CommandState::AwaitingPageCount { language, addons, outline } => {
                callbacks::book_search::handle_page_count_reply(ctx, text, language, addons, outline)
                    .await
            }
            CommandState::ChattingWithAi { history } => {
                callbacks::chat::handle_reply(ctx, text, history).await
            }
            CommandState::AwaitingUserSearch => {
                callbacks::admin::users::handle_search_reply(ctx, text).await
            }
            CommandState::AwaitingBroadcast { audience } => {
                callbacks::admin::notifications::handle_broadcast_reply(ctx, text, audience).await
            }
            CommandState::AwaitingDirectRecipient => {
                callbacks::admin::notifications::handle_recipient_reply(ctx, text).await
            }
            CommandState::AwaitingDirectMessage { recipient } => {
                callbacks::admin::notifications::handle_direct_reply(ctx, text, recipient).await
            }
            CommandState::AwaitingSettingValue { key } => {
                callbacks::admin::modes::handle_setting_reply(ctx, text, key).await
            }
            CommandState::AwaitingPlanName => {
                callbacks::admin::plans::handle_name_reply(ctx, text).await
            }
            CommandState::AwaitingPlanPrice { name } => {
                callbacks::admin::plans::handle_price_reply(ctx, text, name).await
            }
            CommandState::AwaitingGiftRecipient { plan_name } => {
                callbacks::admin::plans::handle_gift_recipient_reply(ctx, text, plan_name).await
            }
            CommandState::AwaitingGiftDays { plan_name, recipient } => {
                callbacks::admin::plans::handle_gift_days_reply(ctx, text, plan_name, recipient)
                    .await
            }
        }
    }

    /// Logs a failed update and tells the user about it.
    async fn report_error(
        &self,
        chat_id: ChatId,
        result: BotHandlerResult<()>,
    ) -> BotHandlerResult<()> {
        if let Err(e) = result {
            tracing::error!("Failed to handle update from {chat_id}: {e}");
            self.messaging_service.send_error_msg(chat_id, e).await?;
        }
        Ok(())
    }
}

#![warn(missing_docs)]
//! A Telegram bot that writes book digests with an LLM.
//!
//! Users pick a book, a language, a page count and optional extras such as
//! quotes or the author's biography. The bot splits the page budget into LLM
//! calls, assembles the text and keeps it in the user's library. Paid
//! subscriptions lift the free tier limits and an admin panel manages plans,
//! limits and broadcasts.

/// User accounts, quotas, subscriptions and the library.
pub mod account;
/// The main handler for the bot's logic.
pub mod bot_handler;
/// The configuration for the application.
pub mod config;
/// The dispatcher for routing updates to the correct handlers.
pub mod dispatcher;
/// Book outlines, page budgets and digest generation.
pub mod generation;
/// The client for the chat completions API.
pub mod llm;
/// The service for sending messages to the user.
pub mod messaging;
/// Broadcasts and direct messages written by admins.
pub mod notifications;
/// A utility for paginating data.
pub mod pagination;
/// Payment gateway client and the payment watcher.
pub mod payments;
/// Runtime settings an admin can change.
pub mod settings;
/// The storage layer for persisting data.
pub mod storage;

use std::sync::Arc;

use teloxide::{
    dispatching::dialogue::{SqliteStorage, serializer},
    prelude::*,
};

use crate::{
    account::{DefaultAccountService, SystemClock},
    bot_handler::{BotHandler, BotServices},
    config::Config,
    generation::DefaultBookService,
    llm::OpenAiClient,
    messaging::TelegramMessagingService,
    notifications::Notifier,
    payments::{PaymentWatcher, YooKassaClient},
    storage::{BotStorage, sqlite::SqliteStorage as ApplicationStorage},
};

/// Runs the bot.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    if config.admins.is_empty() {
        tracing::warn!("ADMINS is empty, the admin panel is unavailable");
    }

    let storage = Arc::new(ApplicationStorage::new(&config.database_url).await?);
    // Generations do not survive a restart.
    let interrupted = storage.clear_book_processing().await?;
    if interrupted > 0 {
        tracing::warn!("Cleared {interrupted} book generations interrupted by a restart");
    }
    let bot = Bot::new(config.telegram_bot_token.clone());

    let messaging_service = Arc::new(TelegramMessagingService::new(bot.clone()));
    let llm = Arc::new(OpenAiClient::new(
        &config.openai_api_key,
        &config.openai_api_url,
        &config.openai_model,
    )?);
    let payment_gateway = Arc::new(YooKassaClient::new(
        &config.yookassa_api_url,
        &config.yookassa_shop_id,
        &config.yookassa_secret_key,
        &config.payment_return_url,
    )?);

    let account_service = Arc::new(DefaultAccountService::new(storage, Arc::new(SystemClock)));
    let book_service = Arc::new(DefaultBookService::new(llm.clone(), messaging_service.clone()));
    let payment_watcher = Arc::new(PaymentWatcher::new(
        payment_gateway.clone(),
        account_service.clone(),
        messaging_service.clone(),
        config.payment_poll_interval,
        config.payment_timeout,
        config.subscription_days,
    ));
    let notifier = Arc::new(Notifier::new(
        account_service.clone(),
        messaging_service.clone(),
        config.max_concurrency,
    ));

    let services = BotServices {
        messaging: messaging_service,
        account: account_service,
        books: book_service,
        llm,
        payments: payment_gateway,
        payment_tracker: payment_watcher,
        notifications: notifier,
    };
    let handler = Arc::new(BotHandler::new(services, config.admins, config.subscription_days));

    let dialogue_storage = SqliteStorage::open(&config.database_url, serializer::Json).await?;
    let mut dispatcher = dispatcher::BotDispatcher::new(handler, dialogue_storage).build(bot);
    tracing::debug!("Dispatcher built successfully.");

    dispatcher.dispatch().await;

    Ok(())
}

use std::sync::Arc;

use teloxide::types::ChatId;

use crate::{
    account::{AccountError, AccountService},
    bot_handler::{BotHandlerError, BotHandlerResult, CommandState, Context},
    generation::{
        Addon, AddonSet, BookJob, BookLanguage, BookOutline, BookService, GenerationRequest,
        OutlineLookup, document,
    },
    messaging::{MessagingService, screens},
};

fn stale_session() -> BotHandlerError {
    BotHandlerError::InvalidInput(
        "Сессия устарела. Начните поиск книги заново из меню.".to_string(),
    )
}

pub async fn handle_find(ctx: Context<'_>) -> BotHandlerResult<()> {
    let access = ctx.handler.account_service.book_access(ctx.chat_id()).await?;
    ctx.reset_state().await?;

    if access.in_progress {
        return ctx.show(screens::book_in_progress(BookLanguage::Russian)).await;
    }
    if access.limit_reached() {
        return ctx.show(screens::book_limit_reached(BookLanguage::Russian, access.limited)).await;
    }
    ctx.show(screens::choose_language(&access)).await
}

pub async fn handle_language(ctx: Context<'_>, language: BookLanguage) -> BotHandlerResult<()> {
    let addons = AddonSet::default();
    ctx.set_state(CommandState::ChoosingAddons { language, addons }).await?;
    ctx.show(screens::addons(language, addons)).await
}

/// Applies `change` to the addons being chosen and redraws the keyboard.
async fn update_addons(
    ctx: Context<'_>,
    change: impl FnOnce(&mut AddonSet),
) -> BotHandlerResult<()> {
    let CommandState::ChoosingAddons { language, mut addons } = ctx.state().await? else {
        return Err(stale_session());
    };
    change(&mut addons);

    ctx.set_state(CommandState::ChoosingAddons { language, addons }).await?;
    ctx.show(screens::addons(language, addons)).await
}

pub async fn handle_toggle_addon(ctx: Context<'_>, addon: Addon) -> BotHandlerResult<()> {
    update_addons(ctx, |addons| {
        addons.toggle(addon);
    })
    .await
}

pub async fn handle_select_all(ctx: Context<'_>) -> BotHandlerResult<()> {
    update_addons(ctx, |addons| *addons = AddonSet::all()).await
}

pub async fn handle_remove_all(ctx: Context<'_>) -> BotHandlerResult<()> {
    update_addons(ctx, |addons| *addons = AddonSet::default()).await
}

pub async fn handle_addons_done(ctx: Context<'_>) -> BotHandlerResult<()> {
    let CommandState::ChoosingAddons { language, addons } = ctx.state().await? else {
        return Err(stale_session());
    };

    ctx.set_state(CommandState::AwaitingBookTitle { language, addons }).await?;
    ctx.show(screens::book_title_prompt(language)).await
}

/// Looks the title up and asks for the page count when the book exists.
pub async fn handle_title_reply(
    ctx: Context<'_>,
    text: &str,
    language: BookLanguage,
    addons: AddonSet,
) -> BotHandlerResult<()> {
    let chat_id = ctx.chat_id();
    let title = text.trim();

    let access = ctx.handler.account_service.book_access(chat_id).await?;
    if access.in_progress {
        ctx.reset_state().await?;
        return ctx.reply(screens::book_in_progress(language)).await;
    }
    if access.limit_reached() {
        ctx.reset_state().await?;
        return ctx.reply(screens::book_limit_reached(language, access.limited)).await;
    }

    let lookup = match ctx.handler.book_service.find_outline(title, language).await {
        Ok(lookup) => lookup,
        Err(e) => {
            tracing::error!("Outline lookup for '{title}' failed: {e}");
            return ctx.reply(screens::outline_failed(language)).await;
        }
    };

    match lookup {
        OutlineLookup::Found(outline) => {
            let screen = screens::book_found(language, &outline.title, &access.page_range);
            ctx.set_state(CommandState::AwaitingPageCount { language, addons, outline }).await?;
            ctx.reply(screen).await
        }
        OutlineLookup::NotFound => ctx.reply(screens::book_not_found(language, title)).await,
        OutlineLookup::Malformed => {
            tracing::warn!("Outline for '{title}' could not be parsed");
            ctx.reply(screens::outline_failed(language)).await
        }
    }
}

/// Validates the page count and starts writing the book in the background.
pub async fn handle_page_count_reply(
    ctx: Context<'_>,
    text: &str,
    language: BookLanguage,
    addons: AddonSet,
    outline: BookOutline,
) -> BotHandlerResult<()> {
    let chat_id = ctx.chat_id();
    let Ok(page_count) = text.trim().parse::<u32>() else {
        return ctx.reply(screens::page_count_not_a_number(language)).await;
    };

    let access = ctx.handler.account_service.book_access(chat_id).await?;
    if !access.page_range.contains(&page_count) {
        return ctx.reply(screens::page_count_out_of_range(language, &access.page_range)).await;
    }
    if access.limit_reached() {
        ctx.reset_state().await?;
        return ctx.reply(screens::book_limit_reached(language, access.limited)).await;
    }

    ctx.reset_state().await?;
    match ctx.handler.account_service.begin_book(chat_id).await {
        Ok(()) => {}
        Err(AccountError::BookInProgress) => {
            return ctx.reply(screens::book_in_progress(language)).await;
        }
        Err(e) => return Err(e.into()),
    }
    // Nothing clears the processing flag until the job is spawned
    if let Err(e) = ctx.reply(screens::book_started(language)).await {
        ctx.handler.account_service.abort_book(chat_id).await?;
        return Err(e);
    }

    tracing::info!("User {chat_id} ordered '{}', {page_count} pages, {addons:?}", outline.title);
    let job = BookJob { outline, language, request: GenerationRequest { page_count, addons } };

    let books = ctx.handler.book_service.clone();
    let account = ctx.handler.account_service.clone();
    let messaging = ctx.handler.messaging_service.clone();
    tokio::spawn(async move { write_book(books, account, messaging, chat_id, job).await });

    Ok(())
}

/// Writes the book, stores it in the library and sends it to the user. The
/// processing flag is cleared whatever happens.
pub(crate) async fn write_book(
    books: Arc<dyn BookService>,
    account: Arc<dyn AccountService>,
    messaging: Arc<dyn MessagingService>,
    chat_id: ChatId,
    job: BookJob,
) {
    let language = job.language;

    let stored = match books.generate(chat_id, job).await {
        Ok(book) => account
            .complete_book(chat_id, &book.title, &book.text)
            .await
            .map(|title| (title, book.text))
            .map_err(BotHandlerError::from),
        Err(e) => Err(e.into()),
    };

    let (title, text) = match stored {
        Ok(stored) => stored,
        Err(e) => {
            tracing::error!("Failed to write a book for {chat_id}: {e}");
            if let Err(e) = account.abort_book(chat_id).await {
                tracing::error!("Failed to clear book processing for {chat_id}: {e}");
            }
            if let Err(e) = messaging.send_screen(chat_id, screens::book_failed(language)).await {
                tracing::warn!("Failed to tell {chat_id} about the failed book: {e}");
            }
            return;
        }
    };

    // The book is already in the library, so a failed upload is only logged
    let file_name = document::file_name(&title);
    if let Err(e) = messaging
        .send_document(chat_id, file_name, document::render(&title, &text), title.clone())
        .await
    {
        tracing::error!("Failed to send book '{title}' to {chat_id}: {e}");
    }

    if let Err(e) = messaging.send_screen(chat_id, screens::book_ready(language, &title)).await {
        tracing::warn!("Failed to tell {chat_id} the book is ready: {e}");
    }
}

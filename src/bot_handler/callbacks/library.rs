use crate::{
    bot_handler::{BotHandlerResult, Context},
    generation::document,
    messaging::screens,
    pagination::{LIBRARY_PAGE_SIZE, Paginated},
    storage::BookSummary,
};

async fn library_page(ctx: &Context<'_>, page: usize) -> BotHandlerResult<Paginated<BookSummary>> {
    let books = ctx.handler.account_service.library(ctx.chat_id()).await?;
    Ok(Paginated::new(books, page, LIBRARY_PAGE_SIZE))
}

pub async fn handle_list(ctx: Context<'_>, page: usize) -> BotHandlerResult<()> {
    let books = library_page(&ctx, page).await?;
    ctx.show(screens::library(&books)).await
}

pub async fn handle_options(ctx: Context<'_>, book_id: i64) -> BotHandlerResult<()> {
    match ctx.handler.account_service.book(ctx.chat_id(), book_id).await? {
        Some(book) => ctx.show(screens::book_options(&book)).await,
        None => ctx.show(screens::book_missing()).await,
    }
}

pub async fn handle_send(ctx: Context<'_>, book_id: i64) -> BotHandlerResult<()> {
    let chat_id = ctx.chat_id();
    let Some(book) = ctx.handler.account_service.book(chat_id, book_id).await? else {
        return ctx.show(screens::book_missing()).await;
    };

    ctx.handler
        .messaging_service
        .send_document(
            chat_id,
            document::file_name(&book.title),
            document::render(&book.title, &book.content),
            book.title.clone(),
        )
        .await?;

    ctx.show(screens::book_sent(&book.title)).await
}

pub async fn handle_delete(ctx: Context<'_>, book_id: i64) -> BotHandlerResult<()> {
    let chat_id = ctx.chat_id();
    let account = &ctx.handler.account_service;

    let Some(book) = account.book(chat_id, book_id).await? else {
        return ctx.show(screens::book_missing()).await;
    };
    if !account.remove_book(chat_id, book_id).await? {
        return ctx.show(screens::book_missing()).await;
    }
    tracing::info!("User {chat_id} deleted book '{}'", book.title);

    let books = library_page(&ctx, 1).await?;
    ctx.show(screens::book_deleted(&book.title, &books)).await
}

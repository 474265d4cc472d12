use crate::{
    bot_handler::{BotHandlerResult, CommandState, Context},
    messaging::screens,
};

pub async fn handle_menu(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reset_state().await?;
    ctx.show(screens::user_management()).await
}

pub async fn handle_find(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.set_state(CommandState::AwaitingUserSearch).await?;
    ctx.show(screens::user_search_prompt()).await
}

/// Looks a user up by id or username. The admin may retry after a miss.
pub async fn handle_search_reply(ctx: Context<'_>, text: &str) -> BotHandlerResult<()> {
    match ctx.handler.account_service.find_user(text).await? {
        Some(profile) => {
            ctx.reset_state().await?;
            ctx.reply(screens::user_profile(&profile)).await
        }
        None => ctx.reply(screens::user_search_not_found()).await,
    }
}

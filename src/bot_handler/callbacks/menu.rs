use crate::{
    bot_handler::{BotHandlerResult, Context},
    messaging::screens,
};

pub async fn handle_menu(ctx: Context<'_>) -> BotHandlerResult<()> {
    // Leaving any flow through the menu drops its state
    ctx.reset_state().await?;
    let is_admin = ctx.handler.is_admin(ctx.chat_id());
    ctx.show(screens::main_menu(&ctx.first_name(), is_admin)).await
}

pub async fn handle_help(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.show(screens::help()).await
}

pub async fn handle_games(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.show(screens::games()).await
}

use crate::{
    bot_handler::{BotHandlerResult, Context},
    messaging::screens,
};

/// Registers the user on first contact and shows the main menu.
pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    let chat_id = ctx.chat_id();
    let first_name = ctx.first_name();

    ctx.handler.account_service.register_user(chat_id, ctx.username(), first_name.clone()).await?;
    ctx.reset_state().await?;

    let is_admin = ctx.handler.is_admin(chat_id);
    ctx.reply(screens::main_menu(&first_name, is_admin)).await
}

use crate::{
    bot_handler::{BotHandlerResult, Context},
    messaging::screens,
};

pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reset_state().await?;
    let is_admin = ctx.handler.is_admin(ctx.chat_id());
    ctx.reply(screens::main_menu(&ctx.first_name(), is_admin)).await
}

use crate::{
    bot_handler::{BotHandlerResult, Context},
    messaging::screens,
};

pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reply(screens::help()).await
}

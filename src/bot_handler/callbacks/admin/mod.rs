//! Admin panel. Every action here is refused for users outside the admin
//! list before it reaches these handlers.

pub mod modes;
pub mod notifications;
pub mod plans;
pub mod users;

use crate::{
    bot_handler::{BotHandlerResult, Context},
    messaging::screens,
};

pub async fn handle_panel(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reset_state().await?;
    ctx.show(screens::admin_panel()).await
}

pub async fn handle_statistics(ctx: Context<'_>) -> BotHandlerResult<()> {
    let stats = ctx.handler.account_service.statistics().await?;
    ctx.show(screens::statistics(&stats)).await
}

use teloxide::types::ChatId;

use crate::{
    account::Audience,
    bot_handler::{BotHandlerResult, CommandState, Context},
    messaging::screens,
    notifications::parse_broadcast,
};

pub async fn handle_menu(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reset_state().await?;
    ctx.show(screens::notifications()).await
}

pub async fn handle_broadcast(ctx: Context<'_>, audience: Audience) -> BotHandlerResult<()> {
    ctx.set_state(CommandState::AwaitingBroadcast { audience }).await?;
    ctx.show(screens::broadcast_prompt()).await
}

pub async fn handle_broadcast_reply(
    ctx: Context<'_>,
    text: &str,
    audience: Audience,
) -> BotHandlerResult<()> {
    let broadcast = match parse_broadcast(text) {
        Ok(broadcast) => broadcast,
        Err(e) => return ctx.reply(screens::broadcast_invalid(&e.to_string())).await,
    };
    ctx.reset_state().await?;

    let report = ctx.handler.notification_service.broadcast(audience, &broadcast).await?;
    ctx.reply(screens::broadcast_report(&report)).await
}

pub async fn handle_direct(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.set_state(CommandState::AwaitingDirectRecipient).await?;
    ctx.show(screens::direct_recipient_prompt()).await
}

pub async fn handle_recipient_reply(ctx: Context<'_>, text: &str) -> BotHandlerResult<()> {
    let Ok(id) = text.trim().parse::<i64>() else {
        return ctx.reply(screens::direct_recipient_invalid()).await;
    };
    let recipient = ChatId(id);

    if ctx.handler.account_service.get_user(recipient).await?.is_none() {
        ctx.reset_state().await?;
        return ctx.reply(screens::direct_recipient_missing()).await;
    }

    ctx.set_state(CommandState::AwaitingDirectMessage { recipient }).await?;
    ctx.reply(screens::broadcast_prompt()).await
}

pub async fn handle_direct_reply(
    ctx: Context<'_>,
    text: &str,
    recipient: ChatId,
) -> BotHandlerResult<()> {
    let broadcast = match parse_broadcast(text) {
        Ok(broadcast) => broadcast,
        Err(e) => return ctx.reply(screens::broadcast_invalid(&e.to_string())).await,
    };
    ctx.reset_state().await?;

    ctx.handler.notification_service.send_direct(recipient, &broadcast).await?;
    ctx.reply(screens::direct_sent(recipient)).await
}

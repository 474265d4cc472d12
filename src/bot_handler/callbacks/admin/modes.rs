use crate::{
    account::AccountError,
    bot_handler::{BotHandlerResult, CallbackAction, CommandState, Context},
    messaging::screens,
    settings::SettingKey,
};

pub async fn handle_menu(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reset_state().await?;
    ctx.show(screens::modes()).await
}

pub async fn handle_book_settings(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reset_state().await?;
    ctx.show(screens::book_settings()).await
}

pub async fn handle_chat_settings(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reset_state().await?;
    ctx.show(screens::chat_settings()).await
}

pub async fn handle_book_info(ctx: Context<'_>) -> BotHandlerResult<()> {
    let settings = ctx.handler.account_service.settings().await?;
    ctx.show(screens::book_mode_info(&settings)).await
}

pub async fn handle_chat_info(ctx: Context<'_>) -> BotHandlerResult<()> {
    let settings = ctx.handler.account_service.settings().await?;
    ctx.show(screens::chat_mode_info(&settings)).await
}

pub async fn handle_toggle_book_check(ctx: Context<'_>) -> BotHandlerResult<()> {
    let enabled = ctx.handler.account_service.toggle_book_check().await?;
    tracing::info!("Book subscription check is now {enabled}");
    ctx.show(screens::check_toggled(enabled, CallbackAction::BookSettings)).await
}

pub async fn handle_toggle_chat_check(ctx: Context<'_>) -> BotHandlerResult<()> {
    let enabled = ctx.handler.account_service.toggle_chat_check().await?;
    tracing::info!("Chat subscription check is now {enabled}");
    ctx.show(screens::check_toggled(enabled, CallbackAction::ChatSettings)).await
}

pub async fn handle_edit_setting(ctx: Context<'_>, key: SettingKey) -> BotHandlerResult<()> {
    let settings = ctx.handler.account_service.settings().await?;
    ctx.set_state(CommandState::AwaitingSettingValue { key }).await?;
    ctx.show(screens::setting_prompt(key, key.get(&settings))).await
}

/// Stores the new value, or asks again when it is out of range.
pub async fn handle_setting_reply(
    ctx: Context<'_>,
    text: &str,
    key: SettingKey,
) -> BotHandlerResult<()> {
    let Ok(value) = text.trim().parse::<u32>() else {
        return ctx.reply(screens::setting_invalid(key)).await;
    };

    match ctx.handler.account_service.update_setting(key, value).await {
        Ok(_) => {
            ctx.reset_state().await?;
            ctx.reply(screens::setting_updated(key, value)).await
        }
        Err(AccountError::InvalidValue(_)) => ctx.reply(screens::setting_invalid(key)).await,
        Err(e) => Err(e.into()),
    }
}

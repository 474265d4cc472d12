use teloxide::types::ChatId;

use crate::{
    account::AccountError,
    bot_handler::{BotHandlerResult, CommandState, Context},
    messaging::screens,
};

pub async fn handle_menu(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reset_state().await?;
    ctx.show(screens::manage_plans()).await
}

pub async fn handle_add(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.set_state(CommandState::AwaitingPlanName).await?;
    ctx.show(screens::plan_name_prompt()).await
}

pub async fn handle_name_reply(ctx: Context<'_>, text: &str) -> BotHandlerResult<()> {
    let name = text.trim();
    if name.is_empty() {
        return ctx.reply(screens::plan_name_prompt()).await;
    }

    let plans = ctx.handler.account_service.list_plans().await?;
    if plans.iter().any(|plan| plan.name == name) {
        return ctx.reply(screens::plan_exists(name)).await;
    }

    ctx.set_state(CommandState::AwaitingPlanPrice { name: name.to_string() }).await?;
    ctx.reply(screens::plan_price_prompt()).await
}

pub async fn handle_price_reply(ctx: Context<'_>, text: &str, name: String) -> BotHandlerResult<()> {
    let price = match text.trim().parse::<i64>() {
        Ok(price) if price > 0 => price,
        _ => return ctx.reply(screens::plan_price_invalid()).await,
    };

    let added = ctx.handler.account_service.add_plan(&name, price).await?;
    ctx.reset_state().await?;
    if added {
        tracing::info!("Added plan '{name}' for {price} rubles");
        ctx.reply(screens::plan_added(&name, price)).await
    } else {
        ctx.reply(screens::plan_exists(&name)).await
    }
}

pub async fn handle_remove_list(ctx: Context<'_>) -> BotHandlerResult<()> {
    let plans = ctx.handler.account_service.list_plans().await?;
    ctx.show(screens::remove_plan_list(&plans, None)).await
}

pub async fn handle_remove(ctx: Context<'_>, plan_id: i64) -> BotHandlerResult<()> {
    let account = &ctx.handler.account_service;

    let mut removed = None;
    if let Some(plan) = account.get_plan(plan_id).await? {
        if account.remove_plan(plan_id).await? {
            tracing::info!("Removed plan '{}'", plan.name);
            removed = Some(plan.name);
        }
    }

    let plans = account.list_plans().await?;
    ctx.show(screens::remove_plan_list(&plans, removed.as_deref())).await
}

pub async fn handle_gift_list(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reset_state().await?;
    let plans = ctx.handler.account_service.list_plans().await?;
    ctx.show(screens::gift_plan_list(&plans)).await
}

pub async fn handle_gift(ctx: Context<'_>, plan_id: i64) -> BotHandlerResult<()> {
    let Some(plan) = ctx.handler.account_service.get_plan(plan_id).await? else {
        return ctx.show(screens::plan_missing()).await;
    };

    let screen = screens::gift_recipient_prompt(&plan.name);
    ctx.set_state(CommandState::AwaitingGiftRecipient { plan_name: plan.name }).await?;
    ctx.show(screen).await
}

pub async fn handle_gift_recipient_reply(
    ctx: Context<'_>,
    text: &str,
    plan_name: String,
) -> BotHandlerResult<()> {
    let Ok(id) = text.trim().parse::<i64>() else {
        return ctx.reply(screens::gift_recipient_invalid()).await;
    };
    let recipient = ChatId(id);
    let account = &ctx.handler.account_service;

    if account.get_user(recipient).await?.is_none() {
        return ctx.reply(screens::gift_recipient_missing(recipient)).await;
    }
    if let Some(active) = account.active_subscription(recipient).await? {
        ctx.reset_state().await?;
        return ctx.reply(screens::gift_already_subscribed(active.end_date)).await;
    }

    ctx.set_state(CommandState::AwaitingGiftDays { plan_name, recipient }).await?;
    ctx.reply(screens::gift_days_prompt()).await
}

/// Activates a free subscription and tells the recipient about it.
pub async fn handle_gift_days_reply(
    ctx: Context<'_>,
    text: &str,
    plan_name: String,
    recipient: ChatId,
) -> BotHandlerResult<()> {
    let days = match text.trim().parse::<u32>() {
        Ok(days) if days > 0 => days,
        _ => return ctx.reply(screens::gift_days_invalid()).await,
    };

    let result = ctx.handler.account_service.gift_subscription(recipient, &plan_name, days).await;
    ctx.reset_state().await?;

    let end_date = match result {
        Ok(end_date) => end_date,
        Err(AccountError::AlreadySubscribed(until)) => {
            return ctx.reply(screens::gift_already_subscribed(until)).await;
        }
        Err(AccountError::UserNotFound(_)) => {
            return ctx.reply(screens::gift_recipient_missing(recipient)).await;
        }
        Err(e) => return Err(e.into()),
    };

    ctx.reply(screens::gift_done(&plan_name, recipient, end_date)).await?;

    if let Err(e) = ctx
        .handler
        .messaging_service
        .send_screen(recipient, screens::gift_received(&plan_name, end_date))
        .await
    {
        tracing::warn!("Failed to tell {recipient} about the gifted subscription: {e}");
    }
    Ok(())
}

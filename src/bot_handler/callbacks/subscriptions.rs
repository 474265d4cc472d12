use chrono::{Days, Utc};
use url::Url;

use crate::{
    bot_handler::{BotHandlerResult, Context},
    messaging::screens,
    payments::PendingPayment,
    storage::PlanEntity,
};

pub async fn handle_overview(ctx: Context<'_>) -> BotHandlerResult<()> {
    let status = ctx.handler.account_service.subscription_status(ctx.chat_id()).await?;
    ctx.show(screens::subscriptions(&status)).await
}

pub async fn handle_details(ctx: Context<'_>) -> BotHandlerResult<()> {
    let status = ctx.handler.account_service.subscription_status(ctx.chat_id()).await?;
    ctx.show(screens::subscription_details(&status)).await
}

pub async fn handle_plans(ctx: Context<'_>) -> BotHandlerResult<()> {
    let plans = ctx.handler.account_service.list_plans().await?;
    ctx.show(screens::plans(&plans)).await
}

pub async fn handle_plan_details(ctx: Context<'_>, plan_id: i64) -> BotHandlerResult<()> {
    let Some(plan) = ctx.handler.account_service.get_plan(plan_id).await? else {
        return ctx.show(screens::plan_missing()).await;
    };

    let days = ctx.handler.subscription_days;
    let end_date = Utc::now().date_naive() + Days::new(u64::from(days));
    ctx.show(screens::plan_details(&plan, days, end_date)).await
}

/// Creates a payment and hands it to the tracker, which activates the
/// subscription once the payment succeeds. A user has at most one pending payment.
pub async fn handle_buy(ctx: Context<'_>, plan_id: i64) -> BotHandlerResult<()> {
    let chat_id = ctx.chat_id();
    let account = &ctx.handler.account_service;
    let tracker = &ctx.handler.payment_tracker;

    let Some(plan) = account.get_plan(plan_id).await? else {
        return ctx.show(screens::plan_missing()).await;
    };
    if let Some(active) = account.active_subscription(chat_id).await? {
        return ctx.show(screens::already_subscribed(&active)).await;
    }
    if !tracker.reserve(chat_id) {
        return ctx.show(screens::payment_pending()).await;
    }

    match start_payment(&ctx, plan).await {
        Ok(Some(pending)) => {
            tracker.track(pending);
            Ok(())
        }
        Ok(None) => {
            tracker.release(chat_id);
            Ok(())
        }
        Err(e) => {
            tracker.release(chat_id);
            Err(e)
        }
    }
}

/// Creates the payment and shows its link. Returns `None` when the gateway failed.
async fn start_payment(
    ctx: &Context<'_>,
    plan: PlanEntity,
) -> BotHandlerResult<Option<PendingPayment>> {
    let chat_id = ctx.chat_id();
    ctx.handler.account_service.prepare_purchase(chat_id).await?;

    let description = format!("Оплата подписки: {}", plan.name);
    let created = match ctx.handler.payment_gateway.create_payment(plan.price, &description).await {
        Ok(created) => created,
        Err(e) => {
            tracing::error!("Failed to create payment for {chat_id}: {e}");
            ctx.show(screens::payment_unavailable()).await?;
            return Ok(None);
        }
    };
    let Ok(url) = Url::parse(&created.confirmation_url) else {
        tracing::error!("Payment {} has an invalid confirmation URL", created.id);
        ctx.show(screens::payment_unavailable()).await?;
        return Ok(None);
    };

    ctx.show(screens::payment_link(&plan.name, url)).await?;
    tracing::info!("Created payment {} for {chat_id}, plan '{}'", created.id, plan.name);

    Ok(Some(PendingPayment {
        payment_id: created.id,
        user_id: chat_id,
        message_id: ctx.message.id,
        plan_name: plan.name,
        price: plan.price,
    }))
}

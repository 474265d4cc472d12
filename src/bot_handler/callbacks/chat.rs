use crate::{
    account::ChatAccess,
    bot_handler::{BotHandlerResult, CommandState, Context},
    llm::{CHAT_MAX_TOKENS, ChatMessage, trim_history},
    messaging::screens,
};

pub async fn handle_start(ctx: Context<'_>) -> BotHandlerResult<()> {
    let quota = ctx.handler.account_service.chat_quota(ctx.chat_id()).await?;
    ctx.set_state(CommandState::ChattingWithAi { history: Vec::new() }).await?;
    ctx.show(screens::chat_start(quota)).await
}

/// Forwards the message with the recent history to the LLM.
pub async fn handle_reply(
    ctx: Context<'_>,
    text: &str,
    mut history: Vec<ChatMessage>,
) -> BotHandlerResult<()> {
    let chat_id = ctx.chat_id();

    if let ChatAccess::LimitReached { limit, wait, .. } =
        ctx.handler.account_service.register_chat_message(chat_id).await?
    {
        return ctx.reply(screens::chat_limit_reached(limit, wait)).await;
    }

    history.push(ChatMessage::user(text));
    trim_history(&mut history);

    let answer = match ctx.handler.llm.complete(history.clone(), CHAT_MAX_TOKENS).await {
        Ok(answer) => answer,
        Err(e) => {
            tracing::error!("Chat completion for {chat_id} failed: {e}");
            return ctx.reply(screens::chat_unavailable()).await;
        }
    };

    history.push(ChatMessage::assistant(answer.as_str()));
    trim_history(&mut history);
    ctx.set_state(CommandState::ChattingWithAi { history }).await?;

    ctx.handler.messaging_service.send_text(chat_id, &answer).await?;
    Ok(())
}

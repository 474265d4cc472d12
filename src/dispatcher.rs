use std::sync::Arc;

use teloxide::{
    dispatching::{DefaultKey, DpHandlerDescription, dialogue::Dialogue},
    dptree::{deps, filter_map},
    prelude::*,
    types::Update,
};

use crate::bot_handler::{
    BotDialogue, BotHandler, BotHandlerError, Command, CommandState, DialogueStorage,
};

/// Type alias to simplify handler type signatures.
type BotResultHandler =
    Handler<'static, DependencyMap, Result<(), BotHandlerError>, DpHandlerDescription>;

/// Encapsulates the dispatcher logic for the bot.
pub struct BotDispatcher {
    handler: Arc<BotHandler>,
    dialogue_storage: Arc<DialogueStorage>,
}

impl BotDispatcher {
    /// Creates a new `BotDispatcher`.
    pub fn new(handler: Arc<BotHandler>, dialogue_storage: Arc<DialogueStorage>) -> Self {
        Self { handler, dialogue_storage }
    }

    /// Builds the dispatcher using the provided `bot` instance.
    #[must_use = "This function returns a Dispatcher that should not be ignored"]
    pub fn build(&self, bot: Bot) -> Dispatcher<Bot, BotHandlerError, DefaultKey> {
        Dispatcher::builder(
            bot,
            dptree::entry()
                .branch(self.build_commands_branch())
                .branch(self.build_callback_queries_branch())
                .branch(self.build_messages_branch()),
        )
        .dependencies(deps![self.dialogue_storage.clone(), self.handler.clone()])
        .enable_ctrlc_handler()
        .build()
    }

    /// Builds the branch for handling text commands.
    fn build_commands_branch(&self) -> BotResultHandler {
        Update::filter_message()
            .filter_command::<Command>()
            .chain(filter_map(extract_dialogue))
            .endpoint(
                |msg: Message,
                 cmd: Command,
                 dialogue: BotDialogue,
                 handler: Arc<BotHandler>| async move {
                    handler.handle_commands(&msg, cmd, dialogue).await
                },
            )
    }

    /// Builds the branch for inline keyboard presses.
    fn build_callback_queries_branch(&self) -> BotResultHandler {
        Update::filter_callback_query().chain(filter_map(extract_dialogue)).endpoint(
            |query: CallbackQuery, dialogue: BotDialogue, handler: Arc<BotHandler>| async move {
                handler.handle_callback_query(&query, dialogue).await
            },
        )
    }

    /// Builds the branch for plain text, interpreted by the dialogue state.
    fn build_messages_branch(&self) -> BotResultHandler {
        Update::filter_message().chain(filter_map(extract_dialogue)).endpoint(
            |msg: Message, dialogue: BotDialogue, handler: Arc<BotHandler>| async move {
                handler.handle_message(&msg, dialogue).await
            },
        )
    }
}

/// Extracts a dialogue from an update using the provided dialogue storage.
fn extract_dialogue(update: Update, storage: Arc<DialogueStorage>) -> Option<BotDialogue> {
    update.chat().map(|chat| Dialogue::<CommandState, DialogueStorage>::new(storage, chat.id))
}

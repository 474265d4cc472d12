use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use mockall::predicate::*;
use teloxide::{
    dispatching::dialogue::{Dialogue, serializer},
    types::{
        CallbackQuery, Chat, ChatId, ChatKind, ChatPrivate, MaybeInaccessibleMessage, MediaKind,
        MediaText, Message, MessageCommon, MessageId, MessageKind, User, UserId,
    },
};

use super::*;
use crate::{
    account::{BookAccess, MockAccountService},
    generation::MockBookService,
    llm::MockLlmClient,
    messaging::MockMessagingService,
    notifications::MockNotificationService,
    payments::{MockPaymentGateway, watcher::MockPaymentTracker},
};

pub const CHAT_ID: ChatId = ChatId(123);
pub const MESSAGE_ID: MessageId = MessageId(1);

/// Mock services handed to the harness. Unused ones stay without expectations.
#[derive(Default)]
pub struct Mocks {
    pub messaging: MockMessagingService,
    pub account: MockAccountService,
    pub books: MockBookService,
    pub llm: MockLlmClient,
    pub payments: MockPaymentGateway,
    pub payment_tracker: MockPaymentTracker,
    pub notifications: MockNotificationService,
}

impl Mocks {
    // Every accepted button press is answered without a toast.
    pub fn expect_answer(&mut self) {
        self.messaging
            .expect_answer_callback_query()
            .with(eq("test_callback_id"), eq(""))
            .times(1)
            .returning(|_, _| Ok(()));
    }

    pub fn expect_edit(&mut self, text: &'static str) {
        self.messaging
            .expect_edit_screen()
            .withf(move |chat_id, message_id, screen| {
                *chat_id == CHAT_ID && *message_id == MESSAGE_ID && screen.text.contains(text)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
    }

    pub fn expect_reply(&mut self, text: &'static str) {
        self.messaging
            .expect_send_screen()
            .withf(move |chat_id, screen| *chat_id == CHAT_ID && screen.text.contains(text))
            .times(1)
            .returning(|_, _| Ok(MessageId(2)));
    }
}

// Test harness to encapsulate common test setup and actions.
pub struct TestHarness {
    pub bot_handler: BotHandler,
    pub dialogue: BotDialogue,
    storage: Arc<DialogueStorage>,
}

impl TestHarness {
    // Creates a harness for a regular user.
    pub async fn new(mocks: Mocks) -> Self {
        Self::with_admins(mocks, HashSet::new()).await
    }

    // Creates a harness where the test chat is an admin.
    pub async fn admin(mocks: Mocks) -> Self {
        Self::with_admins(mocks, HashSet::from([CHAT_ID])).await
    }

    async fn with_admins(mocks: Mocks, admins: HashSet<ChatId>) -> Self {
        let services = BotServices {
            messaging: Arc::new(mocks.messaging),
            account: Arc::new(mocks.account),
            books: Arc::new(mocks.books),
            llm: Arc::new(mocks.llm),
            payments: Arc::new(mocks.payments),
            payment_tracker: Arc::new(mocks.payment_tracker),
            notifications: Arc::new(mocks.notifications),
        };
        let bot_handler = BotHandler::new(services, admins, 30);
        let storage = DialogueStorage::open("sqlite::memory:", serializer::Json).await.unwrap();
        let dialogue = BotDialogue::new(storage.clone(), CHAT_ID);

        Self { bot_handler, dialogue, storage }
    }

    // Creates a new dialogue for the same chat ID to test state persistence.
    pub fn new_dialogue(&self) -> BotDialogue {
        Dialogue::new(self.storage.clone(), CHAT_ID)
    }

    pub async fn set_state(&self, state: CommandState) {
        self.dialogue.update(state).await.unwrap();
    }

    pub async fn state(&self) -> CommandState {
        self.new_dialogue().get().await.unwrap().unwrap_or_default()
    }

    // Simulates handling a command message.
    pub async fn handle_command(&self, command: Command) -> BotHandlerResult<()> {
        let msg = mock_message(CHAT_ID, &format!("/{command:?}").to_lowercase());
        self.bot_handler.handle_commands(&msg, command, self.dialogue.clone()).await
    }

    // Simulates the user typing a message.
    pub async fn handle_text(&self, text: &str) -> BotHandlerResult<()> {
        let msg = mock_message(CHAT_ID, text);
        self.bot_handler.handle_message(&msg, self.dialogue.clone()).await
    }

    // Simulates handling a callback query with an explicit dialogue.
    pub async fn handle_callback_with_dialogue(
        &self,
        action: &CallbackAction,
        dialogue: BotDialogue,
    ) -> BotHandlerResult<()> {
        let query = mock_callback_query(CHAT_ID, &serde_json::to_string(action).unwrap());
        self.bot_handler.handle_callback_query(&query, dialogue).await
    }

    // Simulates handling a callback query with the main dialogue.
    pub async fn handle_callback(&self, action: &CallbackAction) -> BotHandlerResult<()> {
        self.handle_callback_with_dialogue(action, self.dialogue.clone()).await
    }
}

pub fn book_access(used_today: u32, in_progress: bool) -> BookAccess {
    BookAccess {
        page_range: 5..=50,
        daily_limit: 3,
        used_today,
        subscribed: true,
        limited: false,
        in_progress,
    }
}

// Helper to create a mock teloxide message to reduce boilerplate in tests
pub fn mock_message(chat_id: ChatId, text: &str) -> Message {
    Message {
        id: MESSAGE_ID,
        date: Utc::now(),
        chat: Chat {
            id: chat_id,
            kind: ChatKind::Private(ChatPrivate {
                username: Some("test".to_string()),
                first_name: Some("Test".to_string()),
                last_name: None,
            }),
        },
        kind: MessageKind::Common(MessageCommon {
            media_kind: MediaKind::Text(MediaText {
                text: text.to_string(),
                entities: vec![],
                link_preview_options: None,
            }),
            reply_to_message: None,
            reply_markup: None,
            edit_date: None,
            author_signature: None,
            has_protected_content: false,
            is_automatic_forward: false,
            effect_id: None,
            forward_origin: None,
            external_reply: None,
            quote: None,
            reply_to_story: None,
            sender_boost_count: None,
            is_from_offline: false,
            business_connection_id: None,
        }),
        from: None,
        is_topic_message: false,
        sender_business_bot: None,
        sender_chat: None,
        thread_id: None,
        via_bot: None,
    }
}

// Helper to create a mock callback query with raw callback data
pub fn mock_callback_query(chat_id: ChatId, data: &str) -> CallbackQuery {
    let msg = mock_message(chat_id, "This is a message with a keyboard.");
    CallbackQuery {
        id: "test_callback_id".to_string(),
        from: User {
            id: UserId(1),
            is_bot: false,
            first_name: "Anna".to_string(),
            last_name: None,
            username: Some("anna".to_string()),
            language_code: None,
            is_premium: false,
            added_to_attachment_menu: false,
        },
        message: Some(MaybeInaccessibleMessage::Regular(Box::new(msg))),
        inline_message_id: None,
        chat_instance: "test_instance".to_string(),
        data: Some(data.to_string()),
        game_short_name: None,
    }
}

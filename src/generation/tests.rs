use std::sync::Arc;

use mockall::predicate::*;
use teloxide::types::{ChatId, MessageId};

use super::*;
use crate::{
    llm::{LlmError, MockLlmClient},
    messaging::MockMessagingService,
};

const CHAT_ID: ChatId = ChatId(7);

fn outline() -> BookOutline {
    BookOutline {
        title: "Идиот".to_string(),
        parts: (1..=7).map(|i| format!("Часть {i}")).collect(),
    }
}

fn progress_messaging(expected_edits: usize) -> MockMessagingService {
    let mut messaging = MockMessagingService::new();
    messaging
        .expect_send_text()
        .with(eq(CHAT_ID), always())
        .times(1)
        .returning(|_, _| Ok(MessageId(99)));
    messaging
        .expect_edit_text()
        .with(eq(CHAT_ID), eq(MessageId(99)), always())
        .times(expected_edits)
        .returning(|_, _, _| Ok(()));
    messaging
}

#[tokio::test]
async fn test_find_outline_found() {
    let mut llm = MockLlmClient::new();
    llm.expect_complete()
        .withf(|messages, max_tokens| {
            *max_tokens == 1000 && messages.len() == 1 && messages[0].content.contains("\"идиот\"")
        })
        .times(1)
        .returning(|_, _| {
            let mut reply = "Книга \"Идиот\" Достоевского:".to_string();
            for i in 1..=7 {
                reply.push_str(&format!("\n{i}. Часть {i}"));
            }
            Ok(reply)
        });
    let service = DefaultBookService::new(Arc::new(llm), Arc::new(MockMessagingService::new()));

    let lookup = service.find_outline("идиот", BookLanguage::Russian).await.unwrap();

    assert_eq!(lookup, OutlineLookup::Found(outline()));
}

#[tokio::test]
async fn test_find_outline_not_found() {
    let mut llm = MockLlmClient::new();
    llm.expect_complete().returning(|_, _| Ok("Такая книга не существует.".to_string()));
    let service = DefaultBookService::new(Arc::new(llm), Arc::new(MockMessagingService::new()));

    let lookup = service.find_outline("qwerty", BookLanguage::Russian).await.unwrap();

    assert_eq!(lookup, OutlineLookup::NotFound);
}

#[tokio::test]
async fn test_generate_core_only() {
    let mut llm = MockLlmClient::new();
    llm.expect_complete()
        .withf(|_, max_tokens| *max_tokens == 3000)
        .times(7)
        .returning(|_, _| Ok("core".to_string()));
    let service = DefaultBookService::new(Arc::new(llm), Arc::new(progress_messaging(7)));

    let job = BookJob {
        outline: outline(),
        language: BookLanguage::Russian,
        request: GenerationRequest { page_count: 5, addons: AddonSet::default() },
    };
    let book = service.generate(CHAT_ID, job).await.unwrap();

    assert_eq!(book.title, "Идиот");
    assert_eq!(book.text, vec!["core"; 7].join("\n\n"));
}

#[tokio::test]
async fn test_generate_with_addons_orders_sections() {
    let mut llm = MockLlmClient::new();
    llm.expect_complete().returning(|messages, _| {
        let prompt = &messages[0].content;
        let text = if prompt.contains("biography") {
            "BIO"
        } else if prompt.contains("analysis") {
            "ANALYSIS"
        } else {
            "CORE"
        };
        Ok(text.to_string())
    });
    // 10 pages with analysis and biography: 1190 core words give one sub-part
    // per part, and each addon fits into a single call.
    let service = DefaultBookService::new(Arc::new(llm), Arc::new(progress_messaging(9)));

    let job = BookJob {
        outline: outline(),
        language: BookLanguage::English,
        request: GenerationRequest {
            page_count: 10,
            addons: [Addon::Analysis, Addon::Biography].into_iter().collect(),
        },
    };
    let book = service.generate(CHAT_ID, job).await.unwrap();

    let mut expected = vec!["BIO"];
    expected.extend(vec!["CORE"; 7]);
    expected.push(SEPARATOR);
    expected.push("ANALYSIS");
    assert_eq!(book.text, expected.join("\n\n"));
}

#[tokio::test]
async fn test_generate_stops_on_llm_error() {
    let mut llm = MockLlmClient::new();
    llm.expect_complete().times(1).returning(|_, _| Err(LlmError::EmptyResponse));
    let mut messaging = MockMessagingService::new();
    messaging.expect_send_text().returning(|_, _| Ok(MessageId(1)));
    messaging.expect_edit_text().times(0);
    let service = DefaultBookService::new(Arc::new(llm), Arc::new(messaging));

    let job = BookJob {
        outline: outline(),
        language: BookLanguage::Russian,
        request: GenerationRequest { page_count: 5, addons: AddonSet::all() },
    };
    let result = service.generate(CHAT_ID, job).await;

    assert!(matches!(result, Err(BookServiceError::Llm(LlmError::EmptyResponse))));
}

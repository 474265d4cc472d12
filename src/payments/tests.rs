use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chrono::NaiveDate;
use mockall::predicate::*;
use teloxide::types::{ChatId, MessageId};

use super::{watcher::PaymentOutcome, *};
use crate::{
    account::{AccountError, MockAccountService},
    messaging::MockMessagingService,
};

const USER: ChatId = ChatId(42);

fn pending() -> PendingPayment {
    PendingPayment {
        payment_id: "pay-1".to_string(),
        user_id: USER,
        message_id: MessageId(7),
        plan_name: "Month".to_string(),
        price: 299,
    }
}

fn watcher(
    gateway: MockPaymentGateway,
    account: MockAccountService,
    messaging: MockMessagingService,
    timeout: Duration,
) -> PaymentWatcher {
    PaymentWatcher::new(
        Arc::new(gateway),
        Arc::new(account),
        Arc::new(messaging),
        Duration::from_millis(5),
        timeout,
        30,
    )
}

#[test]
fn test_create_payment_request_body() {
    let request = CreatePaymentRequest {
        amount: Amount::rubles(299),
        confirmation: ConfirmationRequest::Redirect { return_url: "https://t.me/bot" },
        capture: true,
        description: "Подписка Month",
    };

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "amount": {"value": "299.00", "currency": "RUB"},
            "confirmation": {"type": "redirect", "return_url": "https://t.me/bot"},
            "capture": true,
            "description": "Подписка Month"
        })
    );
}

#[test]
fn test_payment_response_parsing() {
    let body = r#"{
        "id": "2d0a",
        "status": "pending",
        "paid": false,
        "confirmation": {"type": "redirect", "confirmation_url": "https://yoomoney.ru/checkout?x=1"}
    }"#;
    let payment: PaymentResponse = serde_json::from_str(body).unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(
        payment.into_created().unwrap(),
        CreatedPayment {
            id: "2d0a".to_string(),
            confirmation_url: "https://yoomoney.ru/checkout?x=1".to_string()
        }
    );

    let body = r#"{"id": "2d0b", "status": "waiting_for_capture"}"#;
    let payment: PaymentResponse = serde_json::from_str(body).unwrap();
    assert_eq!(payment.status, PaymentStatus::WaitingForCapture);
    assert!(matches!(payment.into_created(), Err(PaymentError::MissingConfirmation(_))));
}

#[tokio::test]
async fn test_wait_for_outcome_polls_until_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut gateway = MockPaymentGateway::new();
    gateway.expect_payment_status().with(eq("pay-1")).returning(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Ok(PaymentStatus::Pending)
        } else {
            Ok(PaymentStatus::Succeeded)
        }
    });

    let watcher = watcher(
        gateway,
        MockAccountService::new(),
        MockMessagingService::new(),
        Duration::from_secs(5),
    );

    assert_eq!(watcher.wait_for_outcome("pay-1").await, PaymentOutcome::Succeeded);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_wait_for_outcome_survives_gateway_errors() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut gateway = MockPaymentGateway::new();
    gateway.expect_payment_status().returning(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(PaymentError::MissingConfirmation("pay-1".to_string()))
        } else {
            Ok(PaymentStatus::Canceled)
        }
    });

    let watcher = watcher(
        gateway,
        MockAccountService::new(),
        MockMessagingService::new(),
        Duration::from_secs(5),
    );

    assert_eq!(watcher.wait_for_outcome("pay-1").await, PaymentOutcome::Canceled);
}

#[tokio::test]
async fn test_wait_for_outcome_times_out() {
    let mut gateway = MockPaymentGateway::new();
    gateway.expect_payment_status().returning(|_| Ok(PaymentStatus::Pending));

    let watcher = watcher(
        gateway,
        MockAccountService::new(),
        MockMessagingService::new(),
        Duration::from_millis(30),
    );

    assert_eq!(watcher.wait_for_outcome("pay-1").await, PaymentOutcome::TimedOut);
}

#[tokio::test]
async fn test_settle_success_activates_subscription() {
    let end = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let mut account = MockAccountService::new();
    account
        .expect_activate_subscription()
        .with(eq(USER), eq("Month"), eq(299), eq(30))
        .times(1)
        .returning(move |_, _, _, _| Ok(end));
    let mut messaging = MockMessagingService::new();
    messaging
        .expect_edit_screen()
        .withf(|chat_id, message_id, screen| {
            *chat_id == USER && *message_id == MessageId(7) && screen.text.contains("01.06.2025")
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let watcher = watcher(MockPaymentGateway::new(), account, messaging, Duration::from_secs(1));
    watcher.settle(&pending(), PaymentOutcome::Succeeded).await;
}

#[tokio::test]
async fn test_settle_canceled_does_not_activate() {
    let mut account = MockAccountService::new();
    account.expect_activate_subscription().times(0);
    let mut messaging = MockMessagingService::new();
    messaging.expect_edit_screen().times(1).returning(|_, _, _| Ok(()));

    let watcher = watcher(MockPaymentGateway::new(), account, messaging, Duration::from_secs(1));
    watcher.settle(&pending(), PaymentOutcome::Canceled).await;
}

#[tokio::test]
async fn test_settle_activation_failure_is_reported() {
    let mut account = MockAccountService::new();
    account
        .expect_activate_subscription()
        .returning(|user, _, _, _| Err(AccountError::UserNotFound(user)));
    let mut messaging = MockMessagingService::new();
    messaging
        .expect_edit_screen()
        .withf(|_, _, screen| screen.text.contains("pay-1"))
        .times(1)
        .returning(|_, _, _| Ok(()));

    let watcher = watcher(MockPaymentGateway::new(), account, messaging, Duration::from_secs(1));
    watcher.settle(&pending(), PaymentOutcome::Succeeded).await;
}

#[test]
fn test_is_transient() {
    assert!(is_transient(&PaymentError::Api {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: String::new()
    }));
    assert!(!is_transient(&PaymentError::Api {
        status: StatusCode::UNAUTHORIZED,
        body: String::new()
    }));
    assert!(!is_transient(&PaymentError::MissingConfirmation("x".to_string())));
}

#[test]
fn test_one_pending_payment_per_user() {
    let watcher = watcher(
        MockPaymentGateway::new(),
        MockAccountService::new(),
        MockMessagingService::new(),
        Duration::from_secs(1),
    );

    assert!(watcher.reserve(USER));
    assert!(!watcher.reserve(USER));
    assert!(watcher.reserve(ChatId(43)));

    watcher.release(USER);
    assert!(watcher.reserve(USER));
}

#[tokio::test]
async fn test_run_frees_the_slot_after_settling() {
    let mut gateway = MockPaymentGateway::new();
    gateway.expect_payment_status().returning(|_| Ok(PaymentStatus::Canceled));
    let mut messaging = MockMessagingService::new();
    messaging.expect_edit_screen().times(1).returning(|_, _, _| Ok(()));
    let watcher = watcher(gateway, MockAccountService::new(), messaging, Duration::from_secs(5));
    assert!(watcher.reserve(USER));

    watcher.run(pending()).await;

    assert!(watcher.reserve(USER));
}

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use mockall::automock;
use teloxide::types::{ChatId, MessageId};

use super::{PaymentGateway, PaymentStatus};
use crate::{
    account::AccountService,
    messaging::{MessagingService, screens},
};

/// A purchase waiting for the payment to settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayment {
    /// Gateway payment id.
    pub payment_id: String,
    /// Buyer.
    pub user_id: ChatId,
    /// Message with the payment link, edited once the outcome is known.
    pub message_id: MessageId,
    /// Plan being bought.
    pub plan_name: String,
    /// Price in rubles.
    pub price: i64,
}

/// How a tracked payment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The payment was captured and the subscription activated.
    Succeeded,
    /// The gateway cancelled the payment.
    Canceled,
    /// The payment did not settle in time.
    TimedOut,
}

/// Tracks payments in the background, one pending payment per user.
#[automock]
pub trait PaymentTracker: Send + Sync {
    /// Reserves the user's purchase slot. Returns false while another payment of theirs is
    /// pending.
    fn reserve(&self, user_id: ChatId) -> bool;
    /// Frees a slot whose payment was never created.
    fn release(&self, user_id: ChatId);
    /// Watches a created payment. The slot is freed once it settles.
    fn track(&self, pending: PendingPayment);
}

/// Polls the gateway until a payment settles and activates the subscription.
#[derive(Clone)]
pub struct PaymentWatcher {
    gateway: Arc<dyn PaymentGateway>,
    account: Arc<dyn AccountService>,
    messaging_service: Arc<dyn MessagingService>,
    poll_interval: Duration,
    timeout: Duration,
    subscription_days: u32,
    pending_users: Arc<Mutex<HashSet<ChatId>>>,
}

impl PaymentWatcher {
    /// Builds a watcher that gives up on a payment after `timeout`.
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        account: Arc<dyn AccountService>,
        messaging_service: Arc<dyn MessagingService>,
        poll_interval: Duration,
        timeout: Duration,
        subscription_days: u32,
    ) -> Self {
        Self {
            gateway,
            account,
            messaging_service,
            poll_interval,
            timeout,
            subscription_days,
            pending_users: Arc::default(),
        }
    }

    /// Waits for the payment to succeed or be canceled.
    pub async fn wait_for_outcome(&self, payment_id: &str) -> PaymentOutcome {
        let poll = async {
            let mut interval = tokio::time::interval(self.poll_interval);
            loop {
                interval.tick().await;
                match self.gateway.payment_status(payment_id).await {
                    Ok(PaymentStatus::Succeeded) => return PaymentOutcome::Succeeded,
                    Ok(PaymentStatus::Canceled) => return PaymentOutcome::Canceled,
                    Ok(status) => tracing::debug!("Payment {payment_id} is {status:?}"),
                    Err(e) => {
                        tracing::warn!("Failed to check payment {payment_id}: {e}. Will retry.")
                    }
                }
            }
        };

        tokio::time::timeout(self.timeout, poll).await.unwrap_or(PaymentOutcome::TimedOut)
    }

    /// Applies the outcome and tells the user about it.
    pub async fn settle(&self, pending: &PendingPayment, outcome: PaymentOutcome) {
        let screen = match outcome {
            PaymentOutcome::Succeeded => {
                match self
                    .account
                    .activate_subscription(
                        pending.user_id,
                        &pending.plan_name,
                        pending.price,
                        self.subscription_days,
                    )
                    .await
                {
                    Ok(end_date) => screens::payment_succeeded(&pending.plan_name, end_date),
                    Err(e) => {
                        tracing::error!(
                            "Payment {} succeeded but the subscription was not activated: {e}",
                            pending.payment_id
                        );
                        screens::payment_activation_failed(&pending.payment_id)
                    }
                }
            }
            PaymentOutcome::Canceled => screens::payment_canceled(),
            PaymentOutcome::TimedOut => screens::payment_timed_out(),
        };

        if let Err(e) =
            self.messaging_service.edit_screen(pending.user_id, pending.message_id, screen).await
        {
            tracing::error!("Failed to report payment {} outcome: {e}", pending.payment_id);
        }
    }

    /// Polls a payment until it settles, then reports the outcome to the user.
    pub async fn run(&self, pending: PendingPayment) {
        tracing::debug!("Watching payment {} for {}", pending.payment_id, pending.user_id);
        let outcome = self.wait_for_outcome(&pending.payment_id).await;
        tracing::info!("Payment {} finished: {outcome:?}", pending.payment_id);
        self.settle(&pending, outcome).await;
        self.release(pending.user_id);
    }

    fn pending_users(&self) -> MutexGuard<'_, HashSet<ChatId>> {
        self.pending_users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PaymentTracker for PaymentWatcher {
    fn reserve(&self, user_id: ChatId) -> bool {
        self.pending_users().insert(user_id)
    }

    fn release(&self, user_id: ChatId) {
        self.pending_users().remove(&user_id);
    }

    fn track(&self, pending: PendingPayment) {
        let watcher = self.clone();
        tokio::spawn(async move { watcher.run(pending).await });
    }
}

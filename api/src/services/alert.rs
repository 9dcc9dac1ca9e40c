use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use domain::{Alert, AlertDraft, StockItem};
use notifier::{NotificationRequest, NotificationSender, SendResult};
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::repositories::{AlertRepository, StockRepository};

/// Cutoffs for the two alert rules. Both are inclusive at the boundary the
/// rule names: low stock fires strictly below `low_stock`, expiration fires
/// for anything expiring within `expiration_window_days` of today, overdue
/// items included.
#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    pub low_stock: i32,
    pub expiration_window_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            low_stock: 5,
            expiration_window_days: 7,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("failed to read stock items: {0}")]
    Inventory(#[source] anyhow::Error),
    #[error("failed to persist alerts: {0}")]
    Persistence(#[source] anyhow::Error),
}

/// Outcome of one evaluation pass: what was written and how each
/// notification fared. Send failures never appear as errors; they are
/// recorded here per alert.
#[derive(Debug)]
pub struct EvaluationReport {
    pub alerts: Vec<Alert>,
    pub outcomes: Vec<NotificationOutcome>,
}

#[derive(Debug)]
pub struct NotificationOutcome {
    pub alert_id: Uuid,
    pub result: SendResult,
}

impl EvaluationReport {
    pub fn failed_sends(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_failure())
            .count()
    }

    fn merge(mut self, other: EvaluationReport) -> EvaluationReport {
        self.alerts.extend(other.alerts);
        self.outcomes.extend(other.outcomes);
        self
    }
}

struct PendingNotification {
    subject: &'static str,
    body: String,
}

pub struct AlertEvaluator {
    stock_repo: Arc<dyn StockRepository>,
    alert_repo: Arc<dyn AlertRepository>,
    sender: Arc<dyn NotificationSender>,
    thresholds: AlertThresholds,
    recipients: Vec<String>,
}

impl AlertEvaluator {
    pub fn new(
        stock_repo: Arc<dyn StockRepository>,
        alert_repo: Arc<dyn AlertRepository>,
        sender: Arc<dyn NotificationSender>,
        thresholds: AlertThresholds,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            stock_repo,
            alert_repo,
            sender,
            thresholds,
            recipients,
        }
    }

    pub fn spawn(self: Arc<Self>, interval: Duration) {
        tokio::spawn(async move {
            loop {
                match self.run_once().await {
                    Ok(report) => {
                        if report.failed_sends() > 0 {
                            warn!(
                                alerts = report.alerts.len(),
                                failed_sends = report.failed_sends(),
                                "alert run finished with send failures"
                            );
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "alert evaluator run failed");
                    }
                }
                sleep(interval).await;
            }
        });
    }

    /// One full evaluation pass. The low-stock check is persisted and
    /// notified before the expiration check begins; each rule-check commits
    /// its own alert batch.
    pub async fn run_once(&self) -> Result<EvaluationReport, EvaluationError> {
        let low_stock = self.evaluate_low_stock().await?;
        let expiration = self.evaluate_expiration().await?;
        let report = low_stock.merge(expiration);

        info!(
            alerts = report.alerts.len(),
            failed_sends = report.failed_sends(),
            "alert evaluation pass complete"
        );
        Ok(report)
    }

    pub async fn evaluate_low_stock(&self) -> Result<EvaluationReport, EvaluationError> {
        let items = self
            .stock_repo
            .list_below_quantity(self.thresholds.low_stock)
            .await
            .map_err(EvaluationError::Inventory)?;
        let batch: Vec<_> = items
            .iter()
            .map(|item| low_stock_alert(item, self.thresholds.low_stock))
            .collect();
        self.commit_and_dispatch(batch).await
    }

    /// `today` is read once so every comparison in the check agrees on the
    /// date even across midnight. Overdue items still qualify; the rule is
    /// `expiration_date <= today + window`, not a strict future window.
    pub async fn evaluate_expiration(&self) -> Result<EvaluationReport, EvaluationError> {
        let today = Utc::now().date_naive();
        let cutoff = today + ChronoDuration::days(self.thresholds.expiration_window_days);
        let items = self
            .stock_repo
            .list_expiring_by(cutoff)
            .await
            .map_err(EvaluationError::Inventory)?;
        let batch: Vec<_> = items
            .iter()
            .map(|item| expiration_alert(item, today))
            .collect();
        self.commit_and_dispatch(batch).await
    }

    /// Commit the whole batch atomically, then dispatch one notification per
    /// alert, sequentially. The first send happens only after the commit; a
    /// failed send is recorded per alert and never unwinds committed rows.
    async fn commit_and_dispatch(
        &self,
        batch: Vec<(AlertDraft, PendingNotification)>,
    ) -> Result<EvaluationReport, EvaluationError> {
        let (drafts, pending): (Vec<_>, Vec<_>) = batch.into_iter().unzip();
        let alerts = self
            .alert_repo
            .create_batch(&drafts)
            .await
            .map_err(EvaluationError::Persistence)?;

        let mut outcomes = Vec::with_capacity(alerts.len());
        for (alert, notification) in alerts.iter().zip(pending) {
            let result = if self.recipients.is_empty() {
                SendResult::skipped()
            } else {
                let request = NotificationRequest {
                    subject: notification.subject.to_string(),
                    body: notification.body,
                    recipients: self.recipients.clone(),
                };
                self.sender.send(&request).await
            };
            if result.is_failure() {
                warn!(alert_id = %alert.id, reason = ?result.reason, "alert notification failed");
            }
            outcomes.push(NotificationOutcome {
                alert_id: alert.id,
                result,
            });
        }

        Ok(EvaluationReport { alerts, outcomes })
    }
}

fn low_stock_alert(item: &StockItem, threshold: i32) -> (AlertDraft, PendingNotification) {
    let message = format!(
        "Low stock alert: {} has only {} units left.",
        item.name, item.quantity
    );
    let notification = PendingNotification {
        subject: "Low Stock Alert",
        body: format!("{message} The restock threshold is {threshold}."),
    };
    (AlertDraft { message }, notification)
}

fn expiration_alert(item: &StockItem, today: NaiveDate) -> (AlertDraft, PendingNotification) {
    let message = format!(
        "Expiration alert: {} expires on {}.",
        item.name, item.expiration_date
    );
    let days_remaining = (item.expiration_date - today).num_days();
    let body = if days_remaining < 0 {
        format!("{message} It expired {} day(s) ago.", -days_remaining)
    } else {
        format!("{message} {days_remaining} day(s) remaining.")
    };
    let notification = PendingNotification {
        subject: "Expiration Alert",
        body,
    };
    (AlertDraft { message }, notification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::Days;
    use std::sync::Mutex;

    struct StubStockRepository {
        items: Vec<StockItem>,
    }

    fn item(name: &str, quantity: i32, expires_in_days: i64) -> StockItem {
        let expiration_date = if expires_in_days >= 0 {
            Utc::now().date_naive() + ChronoDuration::days(expires_in_days)
        } else {
            Utc::now()
                .date_naive()
                .checked_sub_days(Days::new((-expires_in_days) as u64))
                .unwrap()
        };
        StockItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            quantity,
            expiration_date,
        }
    }

    #[async_trait]
    impl StockRepository for StubStockRepository {
        async fn list_all(&self) -> Result<Vec<StockItem>> {
            Ok(self.items.clone())
        }

        async fn find_by_id(&self, _item_id: Uuid) -> Result<Option<StockItem>> {
            Ok(None)
        }

        async fn create(
            &self,
            _name: &str,
            _quantity: i32,
            _expiration_date: NaiveDate,
        ) -> Result<StockItem> {
            Err(anyhow!("not used in tests"))
        }

        async fn update(&self, _item: &StockItem) -> Result<bool> {
            Ok(false)
        }

        async fn delete(&self, _item_id: Uuid) -> Result<bool> {
            Ok(false)
        }

        async fn list_below_quantity(&self, threshold: i32) -> Result<Vec<StockItem>> {
            Ok(self
                .items
                .iter()
                .filter(|item| item.quantity < threshold)
                .cloned()
                .collect())
        }

        async fn list_expiring_by(&self, date: NaiveDate) -> Result<Vec<StockItem>> {
            Ok(self
                .items
                .iter()
                .filter(|item| item.expiration_date <= date)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct StubAlertRepository {
        stored: Mutex<Vec<Alert>>,
        fail: bool,
    }

    #[async_trait]
    impl AlertRepository for StubAlertRepository {
        async fn create_batch(&self, drafts: &[AlertDraft]) -> Result<Vec<Alert>> {
            if self.fail {
                return Err(anyhow!("database unavailable"));
            }
            let created: Vec<Alert> = drafts
                .iter()
                .map(|draft| Alert {
                    id: Uuid::new_v4(),
                    message: draft.message.clone(),
                    is_active: true,
                    created_at: Utc::now(),
                })
                .collect();
            self.stored.lock().unwrap().extend(created.clone());
            Ok(created)
        }

        async fn list_active(&self) -> Result<Vec<Alert>> {
            Ok(self.stored.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        requests: Mutex<Vec<NotificationRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSender for RecordingNotifier {
        async fn send(&self, request: &NotificationRequest) -> SendResult {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                SendResult::failed("smtp relay refused connection")
            } else {
                SendResult::sent()
            }
        }
    }

    fn evaluator(
        items: Vec<StockItem>,
        alert_repo: Arc<StubAlertRepository>,
        notifier: Arc<RecordingNotifier>,
        recipients: Vec<String>,
    ) -> AlertEvaluator {
        AlertEvaluator::new(
            Arc::new(StubStockRepository { items }),
            alert_repo,
            notifier,
            AlertThresholds::default(),
            recipients,
        )
    }

    #[tokio::test]
    async fn low_stock_threshold_is_strict() {
        let alert_repo = Arc::new(StubAlertRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let evaluator = evaluator(
            vec![item("Milk", 2, 30), item("Eggs", 5, 30), item("Rice", 10, 30)],
            alert_repo.clone(),
            notifier,
            vec!["pantry@example.com".to_string()],
        );

        let report = evaluator.run_once().await.unwrap();

        assert_eq!(report.alerts.len(), 1);
        assert_eq!(
            report.alerts[0].message,
            "Low stock alert: Milk has only 2 units left."
        );
    }

    #[tokio::test]
    async fn expiration_includes_boundary_and_overdue() {
        let alert_repo = Arc::new(StubAlertRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let expired = item("Yogurt", 9, -2);
        let boundary = item("Cheese", 9, 7);
        let fresh = item("Honey", 9, 8);
        let evaluator = evaluator(
            vec![expired.clone(), boundary.clone(), fresh],
            alert_repo.clone(),
            notifier,
            vec!["pantry@example.com".to_string()],
        );

        let report = evaluator.run_once().await.unwrap();

        let messages: Vec<&str> = report
            .alerts
            .iter()
            .map(|alert| alert.message.as_str())
            .collect();
        assert_eq!(messages.len(), 2);
        assert!(messages.contains(&format!(
            "Expiration alert: Yogurt expires on {}.",
            expired.expiration_date
        )
        .as_str()));
        assert!(messages.contains(&format!(
            "Expiration alert: Cheese expires on {}.",
            boundary.expiration_date
        )
        .as_str()));
    }

    #[tokio::test]
    async fn low_stock_is_processed_before_expiration() {
        let alert_repo = Arc::new(StubAlertRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());
        // One item that trips both rules.
        let evaluator = evaluator(
            vec![item("Milk", 2, 1)],
            alert_repo.clone(),
            notifier.clone(),
            vec!["pantry@example.com".to_string()],
        );

        let report = evaluator.run_once().await.unwrap();

        assert_eq!(report.alerts.len(), 2);
        assert!(report.alerts[0].message.starts_with("Low stock alert:"));
        assert!(report.alerts[1].message.starts_with("Expiration alert:"));
        let requests = notifier.requests.lock().unwrap();
        assert_eq!(requests[0].subject, "Low Stock Alert");
        assert_eq!(requests[1].subject, "Expiration Alert");
    }

    #[tokio::test]
    async fn repeated_runs_append_duplicate_alerts() {
        let alert_repo = Arc::new(StubAlertRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let evaluator = evaluator(
            vec![item("Milk", 1, 30)],
            alert_repo.clone(),
            notifier,
            vec!["pantry@example.com".to_string()],
        );

        evaluator.run_once().await.unwrap();
        evaluator.run_once().await.unwrap();

        let stored = alert_repo.list_active().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].message, stored[1].message);
    }

    #[tokio::test]
    async fn persistence_failure_sends_nothing() {
        let alert_repo = Arc::new(StubAlertRepository {
            fail: true,
            ..Default::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let evaluator = evaluator(
            vec![item("Milk", 1, 30)],
            alert_repo,
            notifier.clone(),
            vec!["pantry@example.com".to_string()],
        );

        let err = evaluator.run_once().await.unwrap_err();

        assert!(matches!(err, EvaluationError::Persistence(_)));
        assert!(notifier.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_failure_still_persists_alerts() {
        let alert_repo = Arc::new(StubAlertRepository::default());
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let evaluator = evaluator(
            vec![item("Milk", 1, 30), item("Flour", 2, 30)],
            alert_repo.clone(),
            notifier,
            vec!["pantry@example.com".to_string()],
        );

        let report = evaluator.run_once().await.unwrap();

        assert_eq!(report.alerts.len(), 2);
        assert_eq!(report.failed_sends(), 2);
        assert_eq!(alert_repo.list_active().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_recipients_skips_without_send_attempts() {
        let alert_repo = Arc::new(StubAlertRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let evaluator = evaluator(
            vec![item("Milk", 1, 30)],
            alert_repo,
            notifier.clone(),
            Vec::new(),
        );

        let report = evaluator.run_once().await.unwrap();

        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.failed_sends(), 0);
        assert!(notifier.requests.lock().unwrap().is_empty());
        assert!(report
            .outcomes
            .iter()
            .all(|outcome| outcome.result.status == notifier::SendStatus::Skipped));
    }

    #[tokio::test]
    async fn expiration_body_counts_days_remaining() {
        let today = Utc::now().date_naive();
        let stock = item("Butter", 9, 3);
        let (_, notification) = expiration_alert(&stock, today);
        assert!(notification.body.ends_with("3 day(s) remaining."));

        let overdue = item("Yogurt", 9, -2);
        let (_, notification) = expiration_alert(&overdue, today);
        assert!(notification.body.ends_with("It expired 2 day(s) ago."));
    }
}

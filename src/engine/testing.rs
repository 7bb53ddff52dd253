//! Recording fakes for the outbound seams.

use super::traits::{ChannelPublisher, NotifyError, PublishError, UserNotifier};
use crate::store::MessageRef;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockPublisher {
    pub published: Mutex<Vec<String>>,
    pub edits: Mutex<Vec<(MessageRef, String)>>,
    pub fail_publish: AtomicBool,
    pub fail_edit: AtomicBool,
    next_id: AtomicI64,
}

impl MockPublisher {
    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn edit_count(&self) -> usize {
        self.edits.lock().unwrap().len()
    }

    pub fn last_published(&self) -> Option<String> {
        self.published.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChannelPublisher for &MockPublisher {
    async fn publish(&self, text: &str) -> Result<MessageRef, PublishError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(PublishError("channel unreachable".to_string()));
        }
        self.published.lock().unwrap().push(text.to_string());
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 100)
    }

    async fn edit(&self, message: MessageRef, text: &str) -> Result<(), PublishError> {
        if self.fail_edit.load(Ordering::SeqCst) {
            return Err(PublishError("message too old to edit".to_string()));
        }
        self.edits.lock().unwrap().push((message, text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockNotifier {
    pub user_notices: Mutex<Vec<(i64, String, Option<String>)>>,
    pub admin_alerts: Mutex<Vec<String>>,
    pub fail_all: AtomicBool,
}

impl MockNotifier {
    pub fn user_notice_count(&self) -> usize {
        self.user_notices.lock().unwrap().len()
    }

    pub fn admin_alert_count(&self) -> usize {
        self.admin_alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl UserNotifier for &MockNotifier {
    async fn notify_user(
        &self,
        user_id: i64,
        text: &str,
        link: Option<&str>,
    ) -> Result<(), NotifyError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(NotifyError("user blocked the bot".to_string()));
        }
        self.user_notices
            .lock()
            .unwrap()
            .push((user_id, text.to_string(), link.map(String::from)));
        Ok(())
    }

    async fn notify_admins(&self, text: &str) -> Result<(), NotifyError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(NotifyError("admin group unreachable".to_string()));
        }
        self.admin_alerts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

//! A fake accrual service that replays canned answers.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use accrual_client::{AccrualApiError, AccrualResponse, AccrualStatus};
use async_trait::async_trait;

use crate::{
    db_types::{OrderNumber, Points},
    traits::AccrualChecker,
};

#[derive(Default)]
struct Script {
    replies: HashMap<OrderNumber, VecDeque<Result<AccrualResponse, AccrualApiError>>>,
    calls: Vec<OrderNumber>,
    pauses: Vec<Duration>,
}

/// Answers are handed out in the order they were added, per order number. The last answer for an order is repeated
/// once the queue runs dry; orders without a script are reported as not registered.
#[derive(Clone, Default)]
pub struct ScriptedAccrual {
    script: Arc<Mutex<Script>>,
    latency: Option<Duration>,
}

impl ScriptedAccrual {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every check sleeps for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn reply(&self, number: &str, reply: Result<AccrualResponse, AccrualApiError>) -> &Self {
        self.lock().replies.entry(number.into()).or_default().push_back(reply);
        self
    }

    pub fn reply_status(&self, number: &str, status: AccrualStatus, accrual: Option<Points>) -> &Self {
        self.reply(number, Ok(AccrualResponse { order: number.to_string(), status, accrual }))
    }

    pub fn calls_for(&self, number: &str) -> usize {
        let number = OrderNumber::from(number);
        self.lock().calls.iter().filter(|n| **n == number).count()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.lock().pauses.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn next_reply(&self, number: &OrderNumber) -> Result<AccrualResponse, AccrualApiError> {
        let mut script = self.lock();
        script.calls.push(number.clone());
        match script.replies.get_mut(number) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Err(AccrualApiError::NotRegistered)),
            Some(queue) => queue.front().cloned().unwrap_or(Err(AccrualApiError::NotRegistered)),
            None => Err(AccrualApiError::NotRegistered),
        }
    }
}

#[async_trait]
impl AccrualChecker for ScriptedAccrual {
    async fn check_accrual(&self, number: &OrderNumber) -> Result<AccrualResponse, AccrualApiError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.next_reply(number)
    }

    async fn pause(&self, duration: Duration) {
        self.lock().pauses.push(duration);
    }
}

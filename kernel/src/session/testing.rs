//! Test doubles for the session seams.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::session::provider::{Document, MessagingSession, SessionError, SessionProvider};
use crate::ws::{BroadcastReport, Broadcaster, Envelope};

#[derive(Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<Envelope>>,
}

impl RecordingBroadcaster {
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn publish(&self, envelope: Envelope) -> BroadcastReport {
        self.sent.lock().push(envelope);
        BroadcastReport::default()
    }
}

/// Session that records sends and fails for selected addresses.
#[derive(Default)]
pub struct FakeSession {
    pub texts: Mutex<Vec<(String, String)>>,
    pub documents: Mutex<Vec<(String, String)>>,
    pub failing: HashSet<String>,
    pub failing_documents: HashSet<String>,
}

impl FakeSession {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_for(addresses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: addresses.iter().map(|a| (*a).to_string()).collect(),
            ..Self::default()
        })
    }
}

#[async_trait]
impl MessagingSession for FakeSession {
    async fn send_text(&self, address: &str, body: &str) -> Result<(), SessionError> {
        if self.failing.contains(address) {
            return Err(SessionError::SendFailed("recipient not on WhatsApp".into()));
        }
        self.texts.lock().push((address.to_string(), body.to_string()));
        Ok(())
    }

    async fn send_document(&self, address: &str, document: &Document) -> Result<(), SessionError> {
        if self.failing_documents.contains(address) {
            return Err(SessionError::SendFailed("media upload failed".into()));
        }
        self.documents
            .lock()
            .push((address.to_string(), document.file_name.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeProvider {
    pairing: AtomicUsize,
    logouts: AtomicUsize,
}

impl FakeProvider {
    pub fn pairing_requests(&self) -> usize {
        self.pairing.load(Ordering::SeqCst)
    }

    pub fn logout_requests(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    async fn start_pairing(&self) -> Result<(), SessionError> {
        self.pairing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

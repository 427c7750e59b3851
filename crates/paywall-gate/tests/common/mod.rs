#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use paywall_core::{
    provider::{PaymentProvider, ProviderError},
    store::{AccessStore, StoreError},
    types::{AnyJson, CreateInvoice, Grant, Invoice, InvoiceId, ResourceId, SubjectId},
};
use paywall_gate::gate::AccessGate;
use paywall_store::MemoryAccessStore;

pub const CHECKOUT_LINK: &str = "https://pay.example.com/i/inv-1?lang=en&ref=%2Fpost%2F7";

/// How the fake answers `create_invoice`.
#[derive(Debug, Clone)]
pub enum CreateReply {
    Invoice { id: String, checkout_link: Option<String> },
    HttpError { status: u16, body: String },
}

#[derive(Debug)]
struct FakeState {
    create_reply: CreateReply,
    statuses: HashMap<String, String>,
    metadata: HashMap<String, AnyJson>,
    created: Vec<CreateInvoice>,
}

/// A scripted payment provider.
#[derive(Debug, Clone)]
pub struct FakeProvider {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        FakeProvider {
            state: Arc::new(Mutex::new(FakeState {
                create_reply: CreateReply::Invoice {
                    id: "inv-1".to_string(),
                    checkout_link: Some(CHECKOUT_LINK.to_string()),
                },
                statuses: HashMap::new(),
                metadata: HashMap::new(),
                created: Vec::new(),
            })),
        }
    }

    pub fn reply_with(&self, reply: CreateReply) {
        self.state.lock().unwrap().create_reply = reply;
    }

    pub fn set_status(&self, invoice_id: &str, status: &str) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(invoice_id.to_string(), status.to_string());
    }

    /// Script an invoice the gate never issued.
    pub fn issue(&self, invoice_id: &str, status: &str, metadata: Option<AnyJson>) {
        let mut state = self.state.lock().unwrap();
        state.statuses.insert(invoice_id.to_string(), status.to_string());
        match metadata {
            Some(metadata) => state.metadata.insert(invoice_id.to_string(), metadata),
            None => state.metadata.remove(invoice_id),
        };
    }

    pub fn created(&self) -> Vec<CreateInvoice> {
        self.state.lock().unwrap().created.clone()
    }
}

impl PaymentProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn create_invoice(&self, request: CreateInvoice) -> Result<Invoice, ProviderError> {
        let mut state = self.state.lock().unwrap();
        let metadata = request.metadata.clone();
        state.created.push(request);
        match state.create_reply.clone() {
            CreateReply::Invoice { id, checkout_link } => {
                state.statuses.entry(id.clone()).or_insert_with(|| "New".to_string());
                if let Some(metadata) = metadata.clone() {
                    state.metadata.insert(id.clone(), metadata);
                }
                Ok(Invoice {
                    id: InvoiceId::new(id),
                    status: "New".to_string(),
                    checkout_link,
                    metadata,
                })
            }
            CreateReply::HttpError { status, body } => Err(ProviderError::Upstream { status, body }),
        }
    }

    async fn invoice_status(&self, invoice_id: &InvoiceId) -> Result<Invoice, ProviderError> {
        let state = self.state.lock().unwrap();
        match state.statuses.get(invoice_id.as_str()) {
            Some(status) => Ok(Invoice {
                id: invoice_id.clone(),
                status: status.clone(),
                checkout_link: Some(CHECKOUT_LINK.to_string()),
                metadata: state.metadata.get(invoice_id.as_str()).cloned(),
            }),
            None => Err(ProviderError::NotFound(invoice_id.clone())),
        }
    }
}

/// A store whose backend is always down.
#[derive(Debug, Clone, Default)]
pub struct FailingStore;

impl AccessStore for FailingStore {
    async fn has_valid_access_at(
        &self,
        _resource_id: ResourceId,
        _subject_id: &SubjectId,
        _at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Backend("database is locked".to_string()))
    }

    async fn insert_grant(&self, _grant: Grant) -> Result<(), StoreError> {
        Err(StoreError::Backend("database is locked".to_string()))
    }

    async fn redeem_invoice(
        &self,
        _invoice_id: &InvoiceId,
        _at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Backend("database is locked".to_string()))
    }

    async fn prune_expired(&self, _before: DateTime<Utc>) -> Result<u64, StoreError> {
        Err(StoreError::Backend("database is locked".to_string()))
    }
}

pub fn gate() -> (AccessGate<FakeProvider, MemoryAccessStore>, FakeProvider, MemoryAccessStore) {
    let provider = FakeProvider::new();
    let store = MemoryAccessStore::new();
    let gate = AccessGate::builder()
        .provider(provider.clone())
        .store(store.clone())
        .build();
    (gate, provider, store)
}

use std::sync::Arc;

use paycontrol_core::AuditLog;
use paycontrol_service::PaymentControl;

use crate::auth::TokenSigner;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PaymentControl>,
    pub audit: Arc<dyn AuditLog>,
    pub tokens: Arc<TokenSigner>,
}

impl AppState {
    pub fn new(service: PaymentControl, audit: Arc<dyn AuditLog>, tokens: TokenSigner) -> Self {
        Self {
            service: Arc::new(service),
            audit,
            tokens: Arc::new(tokens),
        }
    }
}

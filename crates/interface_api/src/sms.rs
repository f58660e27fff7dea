//! SMS gateway wiring
//!
//! The notification transport is an external system. Deployments plug a
//! provider adapter in behind the `SmsGateway` port; this log-only
//! implementation is the default so the billing path works end-to-end
//! without one.

use async_trait::async_trait;
use tracing::info;

use core_kernel::{DomainPort, PortError};
use domain_billing::ports::SmsGateway;

/// Gateway that logs outbound messages and reports success
#[derive(Debug, Clone, Default)]
pub struct LogOnlySmsGateway;

impl LogOnlySmsGateway {
    pub fn new() -> Self {
        Self
    }
}

impl DomainPort for LogOnlySmsGateway {}

#[async_trait]
impl SmsGateway for LogOnlySmsGateway {
    async fn send(&self, phone: &str, message: &str) -> Result<(), PortError> {
        info!(phone = %phone, chars = message.len(), "SMS dispatched (log-only gateway)");
        Ok(())
    }
}

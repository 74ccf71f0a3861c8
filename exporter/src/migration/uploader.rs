use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::host::MigrationGateway;
use crate::migration::{ExportError, Payload};
use crate::primitives::ExporterConfig;

/// Bounded retry policy of app data uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub min_backoff: Duration,
    /// Upper bound of any delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Policy described by `config`.
    #[must_use]
    pub const fn from_config(config: &ExporterConfig) -> Self {
        Self {
            max_retries: config.upload_max_retries,
            min_backoff: config.min_backoff(),
            max_backoff: config.max_backoff(),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based): `min * 2^(attempt - 1)`, capped
    /// at `max`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.min_backoff
            .saturating_mul(1_u32 << exp)
            .min(self.max_backoff)
    }
}

/// Uploads payloads to the migration gateway of one transfer.
pub struct PayloadUploader {
    gateway: Arc<dyn MigrationGateway>,
    transfer_id: String,
    policy: RetryPolicy,
}

impl PayloadUploader {
    /// Creates an uploader for `transfer_id`.
    #[must_use]
    pub fn new(gateway: Arc<dyn MigrationGateway>, transfer_id: String, policy: RetryPolicy) -> Self {
        Self {
            gateway,
            transfer_id,
            policy,
        }
    }

    /// Serializes `payload` and writes it under its label, retrying failed writes.
    ///
    /// Every failed attempt is logged with its ordinal. Once the retries are exhausted the last
    /// failure is logged and returned.
    ///
    /// # Errors
    /// `ExportError::Serialization` if the payload cannot be encoded (not retried), or
    /// `ExportError::UploadFailed` after `1 + max_retries` failed attempts.
    pub async fn upload(&self, payload: &Payload) -> Result<(), ExportError> {
        let label = payload.label();
        let data = payload.to_bytes()?;
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt = 0_u32;

        loop {
            attempt += 1;

            match self
                .gateway
                .write_app_data(self.transfer_id.clone(), label.clone(), data.clone())
                .await
            {
                Ok(()) => {
                    crate::info!(
                        "app_data.uploaded transfer_id={} label={label} bytes={} attempt={attempt} timestamp={}",
                        self.transfer_id,
                        data.len(),
                        Utc::now().to_rfc3339()
                    );
                    return Ok(());
                }
                Err(err) if attempt >= max_attempts => {
                    crate::error!(
                        "app_data.retries_exceeded transfer_id={} label={label} attempts={attempt} error={err} timestamp={}",
                        self.transfer_id,
                        Utc::now().to_rfc3339()
                    );
                    return Err(ExportError::UploadFailed {
                        label,
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    let delay = self.policy.backoff_delay(attempt);
                    crate::warn!(
                        "app_data.upload_failed transfer_id={} label={label} attempt={attempt} retry_in_ms={} error={err}",
                        self.transfer_id,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

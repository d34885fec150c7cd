use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{ExportSettings, FileType};
use crate::contract::{ContextProvider, ExportOutcome, ExportRequest, ExportRequester};
use crate::error::{ExportError, ExportResult};

/// Coordinates one export of the active design.
///
/// The context check runs first; no export request is issued without an
/// active design. The wait for a terminal outcome is bounded by `timeout` and
/// can be cut short through a [`CancellationToken`].
pub struct ExportCoordinator<'a, P: ?Sized, R: ?Sized> {
    context: &'a P,
    requester: &'a R,
    accepted_file_types: Vec<FileType>,
    timeout: Duration,
}

impl<'a, P, R> ExportCoordinator<'a, P, R>
where
    P: ContextProvider + ?Sized,
    R: ExportRequester + ?Sized,
{
    pub fn new(context: &'a P, requester: &'a R, settings: &ExportSettings) -> Self {
        Self {
            context,
            requester,
            accepted_file_types: settings.accepted_file_types.clone(),
            timeout: settings.timeout,
        }
    }

    /// Export the active design and return the ordered bundle URLs.
    pub async fn export(&self, cancel: CancellationToken) -> ExportResult<Vec<String>> {
        let context = match self.context.current_context().await {
            Ok(Some(ctx)) => ctx,
            Ok(None) => {
                warn!("[EXPORT] No active design context, export not requested");
                return Err(ExportError::NoActiveContext);
            }
            Err(e) => {
                error!(error = ?e, "[EXPORT][ERROR] Design context query failed");
                return Err(ExportError::Context(e));
            }
        };

        info!(
            design_id = %context.design_id,
            accepted = ?self.accepted_file_types,
            timeout_secs = self.timeout.as_secs(),
            "[EXPORT] Requesting export"
        );
        let request = ExportRequest {
            accepted_file_types: self.accepted_file_types.clone(),
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(design_id = %context.design_id, "[EXPORT] Export cancelled while waiting");
                return Err(ExportError::Cancelled);
            }
            res = tokio::time::timeout(self.timeout, self.requester.request_export(request)) => match res {
                Err(_) => {
                    error!(design_id = %context.design_id, timeout_secs = self.timeout.as_secs(), "[EXPORT][ERROR] Export timed out");
                    return Err(ExportError::Timeout { after: self.timeout });
                }
                Ok(Err(e)) => {
                    error!(design_id = %context.design_id, error = ?e, "[EXPORT][ERROR] Export request failed");
                    return Err(ExportError::Request(e));
                }
                Ok(Ok(outcome)) => outcome,
            },
        };

        match outcome {
            ExportOutcome::Completed { bundle_urls } => {
                info!(design_id = %context.design_id, bundles = bundle_urls.len(), "[EXPORT] Export completed");
                Ok(bundle_urls)
            }
            ExportOutcome::Failed { reason } => {
                error!(design_id = %context.design_id, reason = %reason, "[EXPORT][ERROR] Export failed");
                Err(ExportError::Failed { reason })
            }
            ExportOutcome::Pending => {
                error!(design_id = %context.design_id, "[EXPORT][ERROR] Export resolved while still pending");
                Err(ExportError::NotCompleted {
                    status: "pending".to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockContextProvider, MockExportRequester, PageContext};

    fn active() -> MockContextProvider {
        let mut context = MockContextProvider::new();
        context.expect_current_context().returning(|| {
            Ok(Some(PageContext {
                design_id: "DAF1".into(),
            }))
        });
        context
    }

    #[tokio::test]
    async fn missing_context_never_requests_export() {
        let mut context = MockContextProvider::new();
        context.expect_current_context().returning(|| Ok(None));
        let mut requester = MockExportRequester::new();
        requester.expect_request_export().never();

        let coordinator = ExportCoordinator::new(&context, &requester, &ExportSettings::default());
        let err = coordinator.export(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ExportError::NoActiveContext));
    }

    #[tokio::test]
    async fn request_carries_the_allow_list() {
        let context = active();
        let mut requester = MockExportRequester::new();
        requester
            .expect_request_export()
            .withf(|req: &ExportRequest| req.accepted_file_types == FileType::default_allow_list())
            .times(1)
            .returning(|_| {
                Ok(ExportOutcome::Completed {
                    bundle_urls: vec!["https://cdn/1.zip".into(), "https://cdn/2.zip".into()],
                })
            });

        let coordinator = ExportCoordinator::new(&context, &requester, &ExportSettings::default());
        let urls = coordinator.export(CancellationToken::new()).await.unwrap();

        assert_eq!(urls, vec!["https://cdn/1.zip", "https://cdn/2.zip"]);
    }

    #[tokio::test]
    async fn failed_outcome_is_an_error() {
        let context = active();
        let mut requester = MockExportRequester::new();
        requester
            .expect_request_export()
            .returning(|_| Ok(ExportOutcome::Failed { reason: "quota".into() }));

        let coordinator = ExportCoordinator::new(&context, &requester, &ExportSettings::default());
        let err = coordinator.export(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ExportError::Failed { ref reason } if reason == "quota"));
    }

    #[tokio::test]
    async fn pending_outcome_is_not_treated_as_done() {
        let context = active();
        let mut requester = MockExportRequester::new();
        requester
            .expect_request_export()
            .returning(|_| Ok(ExportOutcome::Pending));

        let coordinator = ExportCoordinator::new(&context, &requester, &ExportSettings::default());
        let err = coordinator.export(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ExportError::NotCompleted { .. }));
    }

    struct NeverFinishes;

    #[async_trait::async_trait]
    impl ExportRequester for NeverFinishes {
        async fn request_export(
            &self,
            _request: ExportRequest,
        ) -> Result<ExportOutcome, crate::error::HostError> {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
            Ok(ExportOutcome::Pending)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_export_times_out() {
        let context = active();
        let settings = ExportSettings {
            timeout: Duration::from_secs(5),
            ..ExportSettings::default()
        };

        let coordinator = ExportCoordinator::new(&context, &NeverFinishes, &settings);
        let err = coordinator.export(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ExportError::Timeout { after } if after == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_wait() {
        let context = active();
        let mut requester = MockExportRequester::new();
        requester
            .expect_request_export()
            .returning(|_| Ok(ExportOutcome::Completed { bundle_urls: vec![] }));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let coordinator = ExportCoordinator::new(&context, &requester, &ExportSettings::default());
        let err = coordinator.export(cancel).await.unwrap_err();

        assert!(matches!(err, ExportError::Cancelled));
    }
}

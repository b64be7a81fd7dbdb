use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::token_cache::TokenCache;
use crate::config::upstreams::{PlatformConfig, ServiceCredential};
use crate::error::{UploadError, UploadStep};
use crate::helpers::time::{get_instant, Clock, SystemClock};
use crate::identity::acquirer::{AcquireToken, PasswordGrantAcquirer};
use crate::observability::metrics::get_metrics;
use crate::orchestrator::state::{UploadReceipt, UploadRequest, UploadState};
use crate::platform::client::PlatformClient;
use crate::platform::finalizer::UploadFinalizer;
use crate::platform::stager::ArtifactStager;
use crate::platform::uploader::ArtifactUploader;

/// Runs token -> stage -> transfer -> finalize for one artifact.
///
/// Steps are never retried here. Every run allocates a fresh lob; a lob left behind
/// by a failed run is never reused and never deleted by this service.
/// A 401 from any platform step drops the cached token, so the next run acquires a new one.
pub struct UploadOrchestrator<A = PasswordGrantAcquirer, C = SystemClock> {
    tokens: TokenCache<A, C>,
    stager: ArtifactStager,
    uploader: ArtifactUploader,
    finalizer: UploadFinalizer,
}

impl UploadOrchestrator {
    pub fn from_config(client: Client, identity: &ServiceCredential, platform: &PlatformConfig) -> Self {
        let acquirer = PasswordGrantAcquirer::new(client.clone(), identity.clone());
        Self::new(TokenCache::new(acquirer), PlatformClient::new(client, platform))
    }
}

impl<A: AcquireToken, C: Clock> UploadOrchestrator<A, C> {
    pub fn new(tokens: TokenCache<A, C>, platform: PlatformClient) -> Self {
        Self {
            tokens,
            stager: ArtifactStager::new(platform.clone()),
            uploader: ArtifactUploader::new(platform.clone()),
            finalizer: UploadFinalizer::new(platform),
        }
    }

    pub fn token_cache(&self) -> &TokenCache<A, C> {
        &self.tokens
    }

    pub async fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        self.upload_with_cancel(request, &CancellationToken::new()).await
    }

    pub async fn upload_with_cancel(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt, UploadError> {
        self.run(request, cancel).await.into_result()
    }

    /// Drives the flow to a terminal state. Once `cancel` fires no further step is sent,
    /// but steps the remote side already acknowledged are left as they are.
    pub async fn run(&self, request: &UploadRequest, cancel: &CancellationToken) -> UploadState {
        info!(
            correlation_id = %request.correlation_id,
            job_id = %request.job_id,
            result_key = request.result_key.as_deref().unwrap_or("-"),
            size = request.artifact.len(),
            "starting PDF upload to IFS Cloud"
        );

        let mut state = UploadState::Idle;
        while !state.is_terminal() {
            state = self.advance(state, request, cancel).await;
            debug!(correlation_id = %request.correlation_id, "upload state -> {}", state.name());
        }

        self.record_outcome(&state, request).await;
        state
    }

    async fn advance(
        &self,
        state: UploadState,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> UploadState {
        let step = match next_step(&state) {
            Some(step) => step,
            None => return state,
        };
        if cancel.is_cancelled() {
            return UploadState::Failed(UploadError::Cancelled {
                step,
                handle_id: state.handle_id().map(str::to_owned),
            });
        }

        let start = get_instant();
        let next = match state {
            UploadState::Idle => match self.tokens.get_valid_token().await {
                Ok(token) => UploadState::TokenReady { token },
                Err(e) => UploadState::Failed(e),
            },
            UploadState::TokenReady { token } => match self.stager.create_handle(&token).await {
                Ok(handle) => UploadState::Staged { token, handle },
                Err(e) => UploadState::Failed(e),
            },
            UploadState::Staged { token, handle } => {
                match self.uploader.write_bytes(&token, &handle, request.artifact.clone()).await {
                    Ok(()) => UploadState::Transferred { token, handle },
                    Err(e) => UploadState::Failed(e),
                }
            }
            UploadState::Transferred { token, handle } => {
                match self
                    .finalizer
                    .finalize(
                        &token,
                        &request.job_id,
                        &request.correlation_id,
                        request.result_key.as_deref(),
                        &handle,
                    )
                    .await
                {
                    Ok(()) => UploadState::Finalized { handle },
                    Err(e) => UploadState::Failed(e),
                }
            }
            terminal => terminal,
        };

        if let UploadState::Failed(err) = &next {
            if err.is_token_rejected() {
                warn!(
                    correlation_id = %request.correlation_id,
                    "platform rejected the access token at {} step, dropping it from cache",
                    step
                );
                self.tokens.invalidate().await;
            }
        }

        get_metrics()
            .await
            .upload_step_duration
            .with_label_values(&[step.as_str()])
            .observe(start.elapsed().as_secs_f64());
        next
    }

    async fn record_outcome(&self, state: &UploadState, request: &UploadRequest) {
        let metrics = get_metrics().await;
        match state {
            UploadState::Finalized { handle } => {
                metrics.uploads.with_label_values(&["delivered"]).inc();
                info!(
                    correlation_id = %request.correlation_id,
                    lob_id = %handle,
                    "PDF uploaded successfully to IFS Cloud"
                );
            }
            UploadState::Failed(err) => {
                metrics.uploads.with_label_values(&["failed"]).inc();
                metrics
                    .upload_failures
                    .with_label_values(&[err.kind(), err.step().as_str()])
                    .inc();
                match err {
                    UploadError::Finalization { handle_id, .. } => error!(
                        correlation_id = %request.correlation_id,
                        job_id = %request.job_id,
                        orphaned_lob_id = %handle_id,
                        "ORPHANED LOB: artifact bytes were written but never linked to the print job: {}",
                        err
                    ),
                    UploadError::Cancelled { .. } => warn!(
                        correlation_id = %request.correlation_id,
                        lob_id = err.handle_id().unwrap_or("-"),
                        "{}",
                        err
                    ),
                    _ => error!(
                        correlation_id = %request.correlation_id,
                        failure = err.kind(),
                        lob_id = err.handle_id().unwrap_or("-"),
                        "failed to upload PDF to IFS Cloud: {}",
                        err
                    ),
                }
            }
            _ => {}
        }
    }
}

fn next_step(state: &UploadState) -> Option<UploadStep> {
    match state {
        UploadState::Idle => Some(UploadStep::Authenticate),
        UploadState::TokenReady { .. } => Some(UploadStep::Stage),
        UploadState::Staged { .. } => Some(UploadStep::Transfer),
        UploadState::Transferred { .. } => Some(UploadStep::Finalize),
        UploadState::Finalized { .. } | UploadState::Failed(_) => None,
    }
}

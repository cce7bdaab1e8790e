//! Release orchestration.
//!
//! A run walks the [`Step`] sequence for one [`ReleaseRequest`]:
//! - Pre-release steps (change request, mergeability, merge, release) fail fast
//! - Post-release steps (version record, notification) only annotate the
//!   outcome, since the release already exists on the provider
//!
//! Nothing is shared between runs. Each run gets its own provider client from
//! the [`ProviderFactory`] and carries its own context through the steps.

use std::error::Error as _;
use std::sync::Arc;

use notify::{Notifier, NotifyEvent};
use scm::{Backend, ChangeRequest, ProviderClient, ProviderSettings, RepositoryTarget, ScmError};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::{ReleaseError, StatusMapping};
use crate::outcome::OrchestrationOutcome;
use crate::poller::{MergeabilityPoller, PollError, PollPolicy};
use crate::request::ReleaseRequest;
use crate::state::Step;
use crate::store::RepositoryStore;

/// Builds a provider client for a single run.
pub trait ProviderFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns a configuration error when the backend cannot be used, e.g.
    /// no credential is configured.
    fn connect(
        &self,
        backend: Backend,
        target: &RepositoryTarget,
    ) -> Result<Box<dyn ProviderClient>, ScmError>;
}

/// Factory backed by the REST clients in the `scm` crate.
#[derive(Debug, Clone, Default)]
pub struct ScmProviderFactory {
    settings: ProviderSettings,
}

impl ScmProviderFactory {
    #[must_use]
    pub const fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }
}

impl ProviderFactory for ScmProviderFactory {
    fn connect(
        &self,
        backend: Backend,
        target: &RepositoryTarget,
    ) -> Result<Box<dyn ProviderClient>, ScmError> {
        scm::connect(backend, target, &self.settings)
    }
}

/// State owned by one run.
struct RunContext {
    request: ReleaseRequest,
    backend: Backend,
    provider: Box<dyn ProviderClient>,
    change_request: Option<ChangeRequest>,
    /// Post-release failures reported alongside the success message.
    warnings: Vec<ReleaseError>,
}

impl RunContext {
    fn change_request_id(&self) -> Result<u64, ReleaseError> {
        // Unreachable through `Step::next`: every merge path starts with
        // `CreateChangeRequest`.
        self.change_request
            .as_ref()
            .map(|cr| cr.id)
            .ok_or_else(|| self.merge_failed(0, None))
    }

    fn merge_failed(&self, id: u64, source: Option<ScmError>) -> ReleaseError {
        ReleaseError::MergeFailed {
            repo: self.request.repo_name.clone(),
            version: self.request.release_version.clone(),
            id,
            provider: self.backend,
            source,
        }
    }

    fn provider_failure(&self, step: Step, source: ScmError) -> ReleaseError {
        ReleaseError::from_provider(step, &self.request.repo_name, self.backend, source)
    }

    fn notification(&self) -> NotifyEvent {
        let repository = self.request.repo_name.clone();
        let version = self.request.release_version.clone();
        let provider = self.backend.display_name().to_string();
        let body = self.request.release_body.clone();

        if self.request.hotfix {
            NotifyEvent::HotfixCreated {
                repository,
                version,
                provider,
                body,
            }
        } else {
            NotifyEvent::ReleaseCreated {
                repository,
                version,
                provider,
                body,
            }
        }
    }

    fn outcome(&self, statuses: &StatusMapping) -> OrchestrationOutcome {
        let suffix: String = self.warnings.iter().map(|w| format!("; {w}")).collect();
        let status = self
            .warnings
            .first()
            .map_or(statuses.success(), |w| statuses.status_for(w.kind()));

        OrchestrationOutcome::new(
            format!(
                "Created {} release version {} on {}{suffix}.",
                self.request.repo_name, self.request.release_version, self.backend
            ),
            status,
        )
    }
}

/// Drives release runs against a provider, the version store and the notifier.
pub struct ReleaseOrchestrator {
    providers: Arc<dyn ProviderFactory>,
    store: Arc<dyn RepositoryStore>,
    notifier: Arc<Notifier>,
    poller: MergeabilityPoller,
    statuses: StatusMapping,
}

impl ReleaseOrchestrator {
    #[must_use]
    pub fn new(
        providers: Arc<dyn ProviderFactory>,
        store: Arc<dyn RepositoryStore>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            providers,
            store,
            notifier,
            poller: MergeabilityPoller::default(),
            statuses: StatusMapping::default(),
        }
    }

    #[must_use]
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poller = MergeabilityPoller::new(policy);
        self
    }

    #[must_use]
    pub fn with_status_mapping(mut self, statuses: StatusMapping) -> Self {
        self.statuses = statuses;
        self
    }

    #[must_use]
    pub const fn statuses(&self) -> &StatusMapping {
        &self.statuses
    }

    /// Run one release to completion and report the outcome.
    ///
    /// Never fails: every error is mapped to a message and status.
    pub async fn handle(&self, request: ReleaseRequest) -> OrchestrationOutcome {
        let span = info_span!(
            "release",
            repo = %request.repo_name,
            version = %request.release_version,
            hotfix = request.hotfix,
        );

        async move {
            match self.run(request).await {
                Ok(outcome) => {
                    info!(status = outcome.status_code, "{}", outcome.message);
                    outcome
                }
                Err(e) => OrchestrationOutcome::from_error(&e, &self.statuses),
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: ReleaseRequest) -> Result<OrchestrationOutcome, ReleaseError> {
        let request = request.trimmed();
        let backend = request.validate().inspect_err(|e| {
            warn!(error = %e, "Rejected release request");
        })?;

        let provider = self
            .providers
            .connect(backend, &request.target())
            .map_err(|source| {
                error!(provider = backend.as_str(), error = %source, "Failed to build provider client");
                ReleaseError::from_provider(
                    Step::first(request.hotfix),
                    &request.repo_name,
                    backend,
                    source,
                )
            })?;

        let mut ctx = RunContext {
            request,
            backend,
            provider,
            change_request: None,
            warnings: Vec::new(),
        };
        self.execute(&mut ctx).await?;
        Ok(ctx.outcome(&self.statuses))
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<(), ReleaseError> {
        let requires_poll = ctx.provider.requires_mergeability_poll();
        let mut step = Some(Step::first(ctx.request.hotfix));

        while let Some(current) = step {
            debug!(step = %current, "Running release step");

            if let Err(e) = self.run_step(current, ctx).await {
                let source = e.source().map(ToString::to_string);
                if current.is_post_release() {
                    warn!(
                        repo = %ctx.request.repo_name,
                        version = %ctx.request.release_version,
                        step = %current,
                        provider = ctx.backend.as_str(),
                        error = %e,
                        source = ?source,
                        "Post-release step failed, release stands"
                    );
                    ctx.warnings.push(e);
                } else {
                    error!(
                        repo = %ctx.request.repo_name,
                        version = %ctx.request.release_version,
                        step = %current,
                        provider = ctx.backend.as_str(),
                        error = %e,
                        source = ?source,
                        "Release step failed"
                    );
                    return Err(e);
                }
            }

            step = current.next(requires_poll);
        }

        Ok(())
    }

    async fn run_step(&self, step: Step, ctx: &mut RunContext) -> Result<(), ReleaseError> {
        match step {
            Step::CreateChangeRequest => {
                let created = ctx
                    .provider
                    .create_change_request(&ctx.request.change_request())
                    .await
                    .map_err(|e| ctx.provider_failure(step, e))?;
                info!(
                    change_request = created.id,
                    url = created.web_url.as_deref().unwrap_or_default(),
                    "Created {}",
                    ctx.backend.change_request_noun()
                );
                ctx.change_request = Some(created);
            }
            Step::PollMergeability => {
                let id = ctx.change_request_id()?;
                match self
                    .poller
                    .wait_until_mergeable(ctx.provider.as_ref(), id)
                    .await
                {
                    Ok(checks) => debug!(change_request = id, checks, "Ready to merge"),
                    Err(PollError::Conflict { .. }) => {
                        return Err(ReleaseError::MergeConflict {
                            repo: ctx.request.repo_name.clone(),
                            id,
                            provider: ctx.backend,
                        });
                    }
                    Err(PollError::Timeout { attempts }) => {
                        return Err(ReleaseError::MergeTimeout {
                            repo: ctx.request.repo_name.clone(),
                            id,
                            provider: ctx.backend,
                            attempts,
                        });
                    }
                    Err(PollError::Provider(source)) => {
                        return Err(ctx.provider_failure(step, source));
                    }
                }
            }
            Step::Merge => {
                let id = ctx.change_request_id()?;
                match ctx.provider.merge_change_request(id).await {
                    Ok(true) => info!(change_request = id, "Merged {}", ctx.backend.change_request_noun()),
                    Ok(false) => return Err(ctx.merge_failed(id, None)),
                    Err(source) if source.is_auth() || source.is_configuration() => {
                        return Err(ctx.provider_failure(step, source));
                    }
                    Err(source) => return Err(ctx.merge_failed(id, Some(source))),
                }
            }
            Step::CreateRelease => {
                ctx.provider
                    .create_release(&ctx.request.release_artifact())
                    .await
                    .map_err(|e| ctx.provider_failure(step, e))?;
                info!(tag = %ctx.request.release_version, "Created release");
            }
            Step::UpdateVersionRecord => {
                let key = ctx.request.repository_key();
                self.store
                    .put_version(&key, &ctx.request.release_version)
                    .await?;
                debug!(key = %key, "Recorded latest version");
            }
            Step::Notify => {
                if self.notifier.has_channels() {
                    self.notifier.deliver(&ctx.notification()).await?;
                } else {
                    debug!("No notification channels, skipping");
                }
            }
        }

        Ok(())
    }
}

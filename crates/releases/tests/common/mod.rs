//! Shared collaborators for release integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockall::mock;
use notify::{ChannelError, Notifier, NotifyChannel, NotifyEvent};
use releases::{
    PollPolicy, ProviderFactory, ReleaseOrchestrator, ReleaseRequest, RepositoryKey,
    RepositoryRecord, RepositoryStore, StoreError,
};
use scm::{
    Backend, ChangeRequest, MergeStatus, NewChangeRequest, ProviderClient, ReleaseArtifact,
    RepositoryTarget, ScmError,
};

mock! {
    pub Provider {}

    #[async_trait]
    impl ProviderClient for Provider {
        fn backend(&self) -> Backend;
        fn requires_mergeability_poll(&self) -> bool;
        async fn create_change_request(
            &self,
            request: &NewChangeRequest,
        ) -> Result<ChangeRequest, ScmError>;
        async fn query_mergeability(&self, id: u64) -> Result<MergeStatus, ScmError>;
        async fn merge_change_request(&self, id: u64) -> Result<bool, ScmError>;
        async fn create_release(&self, release: &ReleaseArtifact) -> Result<(), ScmError>;
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl RepositoryStore for Store {
        async fn put_version(&self, key: &RepositoryKey, version: &str) -> Result<(), StoreError>;
        async fn create(&self, record: RepositoryRecord) -> Result<(), StoreError>;
        async fn delete(&self, key: &RepositoryKey) -> Result<(), StoreError>;
        async fn list(&self) -> Result<Vec<RepositoryRecord>, StoreError>;
    }
}

mock! {
    pub Channel {}

    #[async_trait]
    impl NotifyChannel for Channel {
        fn name(&self) -> &'static str;
        fn enabled(&self) -> bool;
        async fn send(&self, event: &NotifyEvent) -> Result<(), ChannelError>;
    }
}

/// Hands out one prepared provider, or a construction error.
pub struct StaticFactory {
    provider: Mutex<Option<Box<dyn ProviderClient>>>,
    error: Option<String>,
    pub connects: Mutex<Vec<(Backend, RepositoryTarget)>>,
}

impl StaticFactory {
    pub fn new(provider: MockProvider) -> Self {
        Self {
            provider: Mutex::new(Some(Box::new(provider))),
            error: None,
            connects: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            provider: Mutex::new(None),
            error: Some(message.to_string()),
            connects: Mutex::new(Vec::new()),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }
}

impl ProviderFactory for StaticFactory {
    fn connect(
        &self,
        backend: Backend,
        target: &RepositoryTarget,
    ) -> Result<Box<dyn ProviderClient>, ScmError> {
        self.connects
            .lock()
            .unwrap()
            .push((backend, target.clone()));
        if let Some(message) = &self.error {
            return Err(ScmError::Configuration(message.clone()));
        }
        self.provider
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ScmError::Configuration("provider already taken".to_string()))
    }
}

/// Provider with only the capability methods stubbed.
pub fn provider(backend: Backend) -> MockProvider {
    let mut provider = MockProvider::new();
    provider.expect_backend().return_const(backend);
    provider
        .expect_requires_mergeability_poll()
        .return_const(backend == Backend::GitLab);
    provider
}

pub fn change_request(id: u64) -> ChangeRequest {
    ChangeRequest {
        id,
        status: MergeStatus::Unresolved,
        web_url: Some(format!("https://example.test/cr/{id}")),
    }
}

pub fn api_error(backend: Backend, status: u16) -> ScmError {
    ScmError::Api {
        provider: backend,
        status,
        body: "{\"message\":\"failed\"}".to_string(),
    }
}

/// Store expecting exactly `times` successful version writes.
pub fn store_expecting_versions(times: usize) -> MockStore {
    let mut store = MockStore::new();
    store.expect_put_version().times(times).returning(|_, _| Ok(()));
    store
}

/// Channel that records every delivered event.
pub fn recording_channel(events: Arc<Mutex<Vec<NotifyEvent>>>) -> MockChannel {
    let mut channel = MockChannel::new();
    channel.expect_name().return_const("recording");
    channel.expect_enabled().return_const(true);
    channel.expect_send().returning(move |event| {
        events.lock().unwrap().push(event.clone());
        Ok(())
    });
    channel
}

pub fn orchestrator(
    factory: Arc<StaticFactory>,
    store: MockStore,
    notifier: Notifier,
) -> ReleaseOrchestrator {
    ReleaseOrchestrator::new(factory, Arc::new(store), Arc::new(notifier))
        .with_poll_policy(PollPolicy::immediate(7))
}

pub fn github_request() -> ReleaseRequest {
    ReleaseRequest {
        repo_owner: "acme".to_string(),
        repo_name: "svc".to_string(),
        repo_provider: Some("github".to_string()),
        branch_base: "main".to_string(),
        branch_head: "develop".to_string(),
        release_version: "v1.2.0".to_string(),
        release_body: "Bug fixes".to_string(),
        hotfix: false,
        gitlab_project_id: None,
    }
}

pub fn gitlab_request() -> ReleaseRequest {
    ReleaseRequest {
        repo_provider: Some("gitlab".to_string()),
        gitlab_project_id: Some("4242".to_string()),
        ..github_request()
    }
}

use async_trait::async_trait;
use mockall::mock;
use scm::{
    Backend, ChangeRequest, MergeStatus, NewChangeRequest, ProviderClient, ReleaseArtifact,
    ScmError,
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

//! Resolving a step type to its task generator.

use crate::builtin::BuiltinRegistry;
use crate::profile::DiscoverProfile;
use async_trait::async_trait;
use shiori_core::{TaskError, TaskGenerator};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Caller-supplied cancellation and deadline for one resolution.
///
/// Builtin lookups never block; the context matters for remote resolvers
/// that fetch templates.
#[derive(Debug, Clone, Default)]
pub struct DiscoverContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl DiscoverContext {
    /// Creates a context with no deadline and a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `token` for cancellation.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the cancellation token.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns an error if the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), TaskError> {
        if self.cancel.is_cancelled() {
            return Err(TaskError::Cancelled("cancelled by caller".to_string()));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(TaskError::Cancelled("deadline exceeded".to_string()));
        }
        Ok(())
    }

    /// Runs `fut` until it finishes, the token is cancelled or the deadline
    /// passes, whichever comes first.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T, TaskError>
    where
        F: Future<Output = Result<T, TaskError>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                Err(TaskError::Cancelled("cancelled by caller".to_string()))
            }
            _ = deadline => Err(TaskError::Cancelled("deadline exceeded".to_string())),
            result = fut => result,
        }
    }
}

/// Resolves a step type to a generator.
///
/// This is the contract the outer engine calls, and also what a remote
/// resolver implements.
#[async_trait]
pub trait TaskDiscover: Send + Sync {
    /// Returns the generator for step type `name`.
    async fn get_task_generator(
        &self,
        ctx: &DiscoverContext,
        name: &str,
    ) -> Result<Arc<dyn TaskGenerator>, TaskError>;
}

/// One link of a [`TaskDiscoverer`] chain.
///
/// `Ok(None)` passes the name on to the next link. `Err` stops the chain
/// and is returned as is.
#[async_trait]
pub trait GeneratorSource: Send + Sync {
    /// Short label used in logs.
    fn source_name(&self) -> &str;

    /// Looks up `name`.
    async fn resolve(
        &self,
        ctx: &DiscoverContext,
        name: &str,
    ) -> Result<Option<Arc<dyn TaskGenerator>>, TaskError>;
}

#[async_trait]
impl GeneratorSource for BuiltinRegistry {
    fn source_name(&self) -> &str {
        "builtin"
    }

    async fn resolve(
        &self,
        _ctx: &DiscoverContext,
        name: &str,
    ) -> Result<Option<Arc<dyn TaskGenerator>>, TaskError> {
        Ok(self.get(name))
    }
}

/// Adapts a [`TaskDiscover`] into a chain link that claims every name it
/// resolves and passes its errors through unchanged.
pub struct RemoteSource {
    remote: Arc<dyn TaskDiscover>,
}

impl RemoteSource {
    /// Wraps a remote resolver.
    pub fn new(remote: Arc<dyn TaskDiscover>) -> Self {
        Self { remote }
    }
}

impl fmt::Debug for RemoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl GeneratorSource for RemoteSource {
    fn source_name(&self) -> &str {
        "remote"
    }

    async fn resolve(
        &self,
        ctx: &DiscoverContext,
        name: &str,
    ) -> Result<Option<Arc<dyn TaskGenerator>>, TaskError> {
        self.remote.get_task_generator(ctx, name).await.map(Some)
    }
}

/// The delegating resolver.
///
/// Asks each source in order and returns the first generator found.
/// Builtins come first, so a remote template can never shadow a builtin
/// step type. If no source knows the name the result is
/// [`TaskError::GeneratorNotFound`].
///
/// # Examples
///
/// ```
/// use shiori::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() {
/// let discover = TaskDiscoverer::new(BuiltinRegistry::with_builtins([Builtin::Suspend]), None);
/// let ctx = DiscoverContext::new();
///
/// assert!(discover.get_task_generator(&ctx, "suspend").await.is_ok());
///
/// let error = discover.get_task_generator(&ctx, "deploy").await.err().unwrap();
/// assert_eq!(error.to_string(), "can't find task generator: deploy");
/// # }
/// ```
pub struct TaskDiscoverer {
    sources: Vec<Box<dyn GeneratorSource>>,
    profile: Option<DiscoverProfile>,
}

impl fmt::Debug for TaskDiscoverer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDiscoverer")
            .field(
                "sources",
                &self
                    .sources
                    .iter()
                    .map(|s| s.source_name())
                    .collect::<Vec<_>>(),
            )
            .field("profile", &self.profile)
            .finish()
    }
}

impl TaskDiscoverer {
    /// Creates a resolver that consults `builtins`, then `remote` if given.
    pub fn new(builtins: BuiltinRegistry, remote: Option<Arc<dyn TaskDiscover>>) -> Self {
        let mut sources: Vec<Box<dyn GeneratorSource>> = vec![Box::new(builtins)];
        if let Some(remote) = remote {
            sources.push(Box::new(RemoteSource::new(remote)));
        }
        Self::from_sources(sources)
    }

    /// Creates a resolver from an explicit chain, consulted in order.
    ///
    /// The builtin registry must come first so builtins cannot be shadowed.
    pub(crate) fn from_sources(sources: Vec<Box<dyn GeneratorSource>>) -> Self {
        Self {
            sources,
            profile: None,
        }
    }

    /// Records the profile this resolver was built from.
    pub fn with_profile(mut self, profile: DiscoverProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Returns the profile this resolver was built from, if any.
    pub fn profile(&self) -> Option<&DiscoverProfile> {
        self.profile.as_ref()
    }

    /// Returns the source labels in lookup order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.source_name()).collect()
    }
}

#[async_trait]
impl TaskDiscover for TaskDiscoverer {
    async fn get_task_generator(
        &self,
        ctx: &DiscoverContext,
        name: &str,
    ) -> Result<Arc<dyn TaskGenerator>, TaskError> {
        for source in &self.sources {
            if let Some(generator) = source.resolve(ctx, name).await? {
                debug!(
                    "Resolved task generator '{}' from {} source",
                    name,
                    source.source_name()
                );
                return Ok(generator);
            }
        }

        warn!("No task generator found for step type '{}'", name);
        Err(TaskError::GeneratorNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::Builtin;
    use shiori_core::{GeneratorOptions, WorkflowStep};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingRemote {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TaskDiscover for FailingRemote {
        async fn get_task_generator(
            &self,
            _ctx: &DiscoverContext,
            _name: &str,
        ) -> Result<Arc<dyn TaskGenerator>, TaskError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TaskError::delegate("template fetch failed"))
        }
    }

    #[tokio::test]
    async fn test_builtin_short_circuits_remote() {
        let remote = Arc::new(FailingRemote {
            calls: AtomicU32::new(0),
        });
        let discover = TaskDiscoverer::new(
            BuiltinRegistry::with_builtins([Builtin::Suspend]),
            Some(remote.clone() as Arc<dyn TaskDiscover>),
        );

        let generator = discover
            .get_task_generator(&DiscoverContext::new(), "suspend")
            .await
            .unwrap();
        let runner = generator
            .generate(&WorkflowStep::new("s", "suspend"), &GeneratorOptions::default())
            .unwrap();

        assert_eq!(runner.name(), "s");
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
        assert_eq!(discover.source_names(), vec!["builtin", "remote"]);
    }

    #[tokio::test]
    async fn test_remote_error_passes_through() {
        let remote = Arc::new(FailingRemote {
            calls: AtomicU32::new(0),
        });
        let discover = TaskDiscoverer::new(
            BuiltinRegistry::new(),
            Some(remote.clone() as Arc<dyn TaskDiscover>),
        );

        let error = discover
            .get_task_generator(&DiscoverContext::new(), "apply-component")
            .await
            .err()
            .unwrap();

        assert!(matches!(error, TaskError::Delegate(_)));
        assert_eq!(error.to_string(), "template fetch failed");
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_without_remote() {
        let discover = TaskDiscoverer::new(BuiltinRegistry::new(), None);

        let error = discover
            .get_task_generator(&DiscoverContext::new(), "suspend")
            .await
            .err()
            .unwrap();

        assert!(error.is_not_found());
        assert!(error.to_string().contains("suspend"));
        assert_eq!(discover.source_names(), vec!["builtin"]);
    }

    #[test]
    fn test_context_check() {
        assert!(DiscoverContext::new().check().is_ok());

        let token = CancellationToken::new();
        let ctx = DiscoverContext::new().with_cancellation(token.clone());
        token.cancel();
        assert!(matches!(ctx.check(), Err(TaskError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_guard_honors_cancellation() {
        let token = CancellationToken::new();
        let ctx = DiscoverContext::new().with_cancellation(token.clone());
        token.cancel();

        let result: Result<(), TaskError> = ctx.guard(async { Ok(()) }).await;
        assert!(matches!(result, Err(TaskError::Cancelled(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_honors_deadline() {
        let ctx = DiscoverContext::new().with_timeout(Duration::from_millis(50));

        let result: Result<(), TaskError> = ctx
            .guard(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        match result {
            Err(TaskError::Cancelled(reason)) => assert_eq!(reason, "deadline exceeded"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_guard_returns_result() {
        let ctx = DiscoverContext::new().with_timeout(Duration::from_secs(5));
        let value = ctx.guard(async { Ok::<_, TaskError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}

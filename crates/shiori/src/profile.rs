//! Construction profiles: which builtins and provider groups a resolver gets.
//!
//! Two profiles exist. The revision profile backs pipeline execution and
//! includes the `suspend` builtin. The view profile backs read-only
//! rendering, where pausing has no meaning, so it has no builtins at all.

use crate::builtin::{Builtin, BuiltinRegistry};
use crate::discover::{TaskDiscover, TaskDiscoverer};
use crate::providers::{ProviderGroup, ProviderSet, Providers};
use crate::template::{
    PackageDiscover, PipelineRevision, ProcessContext, RevisionTemplateSource, TemplateCompiler,
    TemplateEnv, TemplateSource, TemplateStore, TemplateTaskLoader, ViewTemplateSource,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// What the remote resolver's template source is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateScope {
    /// Templates frozen into a pipeline revision.
    Revision {
        /// Revision name.
        revision: String,
    },
    /// View templates stored in a namespace.
    View {
        /// Namespace holding the templates.
        namespace: String,
    },
}

impl fmt::Display for TemplateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateScope::Revision { revision } => write!(f, "revision {revision}"),
            TemplateScope::View { namespace } => write!(f, "namespace {namespace}"),
        }
    }
}

/// Declarative description of a resolver.
///
/// # Examples
///
/// ```
/// use shiori::{Builtin, DiscoverProfile, ProviderGroup};
///
/// let profile = DiscoverProfile::revision("app-v2");
/// assert!(profile.includes_builtin(Builtin::Suspend));
/// assert!(profile.providers.contains(ProviderGroup::Workspace));
///
/// let view = DiscoverProfile::view("vela-system", 1);
/// assert!(!view.includes_builtin(Builtin::Suspend));
/// assert!(view.providers.contains(ProviderGroup::Query));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverProfile {
    /// Builtin step types, consulted before templates.
    #[serde(default)]
    pub builtins: BTreeSet<Builtin>,
    /// Provider groups templates may call.
    #[serde(default)]
    pub providers: ProviderSet,
    /// Template source scope.
    pub template_scope: TemplateScope,
    /// Diagnostic verbosity for template loading; 0 is quiet.
    #[serde(default)]
    pub log_level: u8,
}

impl DiscoverProfile {
    /// Profile for executing the steps of one pipeline revision.
    pub fn revision(revision: impl Into<String>) -> Self {
        Self {
            builtins: BTreeSet::from([Builtin::Suspend]),
            providers: [
                ProviderGroup::Workspace,
                ProviderGroup::Email,
                ProviderGroup::Util,
            ]
            .into_iter()
            .collect(),
            template_scope: TemplateScope::Revision {
                revision: revision.into(),
            },
            log_level: 0,
        }
    }

    /// Profile for rendering read-only views from a namespace.
    pub fn view(namespace: impl Into<String>, log_level: u8) -> Self {
        Self {
            builtins: BTreeSet::new(),
            providers: [
                ProviderGroup::Query,
                ProviderGroup::Time,
                ProviderGroup::Kube,
                ProviderGroup::Http,
                ProviderGroup::Email,
            ]
            .into_iter()
            .collect(),
            template_scope: TemplateScope::View {
                namespace: namespace.into(),
            },
            log_level,
        }
    }

    /// Returns `true` if `builtin` is active in this profile.
    pub fn includes_builtin(&self, builtin: Builtin) -> bool {
        self.builtins.contains(&builtin)
    }

    /// Builds the builtin registry this profile calls for.
    pub fn builtin_registry(&self) -> BuiltinRegistry {
        BuiltinRegistry::with_builtins(self.builtins.iter().copied())
    }
}

/// Collaborators owned by the embedding application.
#[derive(Clone)]
pub struct DiscoverDeps {
    /// Turns templates into generators.
    pub compiler: Arc<dyn TemplateCompiler>,
    /// Every installed provider; the profile narrows this down.
    pub providers: Providers,
    /// Package resolver handed to templates.
    pub package_discover: Option<Arc<dyn PackageDiscover>>,
    /// Facts about the running pipeline.
    pub process_context: ProcessContext,
}

impl DiscoverDeps {
    /// Creates deps with no providers and an empty process context.
    pub fn new(compiler: Arc<dyn TemplateCompiler>) -> Self {
        Self {
            compiler,
            providers: Providers::default(),
            package_discover: None,
            process_context: ProcessContext::default(),
        }
    }
}

impl TaskDiscoverer {
    /// Builds a resolver from `profile`, resolving templates from `source`.
    ///
    /// Templates only see the provider groups the profile names.
    pub fn from_profile(
        profile: DiscoverProfile,
        source: Arc<dyn TemplateSource>,
        deps: DiscoverDeps,
    ) -> Self {
        let env = TemplateEnv {
            providers: deps.providers.restricted_to(&profile.providers),
            package_discover: deps.package_discover,
            log_level: profile.log_level,
            process_context: deps.process_context,
        };
        info!(
            "Task discover for {}: builtins {:?}, providers {}",
            profile.template_scope, profile.builtins, profile.providers
        );

        let loader: Arc<dyn TaskDiscover> =
            Arc::new(TemplateTaskLoader::new(source, deps.compiler, env));
        TaskDiscoverer::new(profile.builtin_registry(), Some(loader)).with_profile(profile)
    }
}

/// Creates the resolver used to execute a pipeline revision.
pub fn new_task_discover_from_revision(
    revision: PipelineRevision,
    deps: DiscoverDeps,
) -> TaskDiscoverer {
    let profile = DiscoverProfile::revision(revision.name.clone());
    TaskDiscoverer::from_profile(
        profile,
        Arc::new(RevisionTemplateSource::new(revision)),
        deps,
    )
}

/// Creates the resolver used to render read-only views from `namespace`.
pub fn new_view_task_discover(
    store: Arc<dyn TemplateStore>,
    namespace: &str,
    log_level: u8,
    deps: DiscoverDeps,
) -> TaskDiscoverer {
    let profile = DiscoverProfile::view(namespace, log_level);
    TaskDiscoverer::from_profile(
        profile,
        Arc::new(ViewTemplateSource::new(store, namespace)),
        deps,
    )
}

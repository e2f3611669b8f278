use async_trait::async_trait;
use serde_json::json;
use shiori::prelude::*;
use shiori::{
    new_task_discover_from_revision, new_view_task_discover, suspend_step_wait, DiscoverDeps,
    PipelineRevision, ProviderGroup, ProviderHandler, Providers, TemplateCompiler, TemplateEnv,
    TemplateStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Runner produced by template-backed generators in these tests.
#[derive(Debug)]
struct TemplateRunner {
    name: StepName,
    id: String,
    step_type: String,
}

#[async_trait]
impl TaskRunner for TemplateRunner {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn run(
        &self,
        _ctx: &mut WorkflowContext,
        _options: &TaskRunOptions,
    ) -> Result<TaskOutput, TaskError> {
        Ok(TaskOutput {
            status: StepStatus {
                id: self.id.clone(),
                name: self.name.clone(),
                step_type: self.step_type.clone(),
                phase: StepPhase::Succeeded,
                ..StepStatus::default()
            },
            operation: Operation::default(),
        })
    }

    fn pending(&self, _ctx: &WorkflowContext) -> bool {
        false
    }
}

struct TemplateGenerator {
    step_type: String,
}

impl TaskGenerator for TemplateGenerator {
    fn generate(
        &self,
        step: &WorkflowStep,
        options: &GeneratorOptions,
    ) -> Result<Box<dyn TaskRunner>, TaskError> {
        Ok(Box::new(TemplateRunner {
            name: step.name.clone(),
            id: options.id.clone(),
            step_type: self.step_type.clone(),
        }))
    }
}

/// Remote resolver that claims every step type.
struct ClaimAllRemote {
    calls: AtomicU32,
}

#[async_trait]
impl TaskDiscover for ClaimAllRemote {
    async fn get_task_generator(
        &self,
        _ctx: &DiscoverContext,
        name: &str,
    ) -> Result<Arc<dyn TaskGenerator>, TaskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(TemplateGenerator {
            step_type: name.to_string(),
        }))
    }
}

/// Compiler that records the provider groups it was handed.
#[derive(Default)]
struct InspectingCompiler {
    compiled: AtomicU32,
    provider_groups: Mutex<Vec<String>>,
}

impl TemplateCompiler for InspectingCompiler {
    fn compile(
        &self,
        name: &str,
        _template: &str,
        env: &TemplateEnv,
    ) -> Result<Arc<dyn TaskGenerator>, TaskError> {
        self.compiled.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut groups) = self.provider_groups.lock() {
            *groups = env.providers.groups().iter().map(|g| g.to_string()).collect();
        }
        Ok(Arc::new(TemplateGenerator {
            step_type: name.to_string(),
        }))
    }
}

struct Echo;

#[async_trait]
impl ProviderHandler for Echo {
    async fn call(
        &self,
        _ctx: &mut WorkflowContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, TaskError> {
        Ok(args)
    }
}

#[derive(Debug, Default)]
struct MemoryStore {
    templates: HashMap<(String, String), String>,
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn get_template(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<String>, TaskError> {
        Ok(self
            .templates
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

fn all_providers() -> Providers {
    [
        ProviderGroup::Workspace,
        ProviderGroup::Email,
        ProviderGroup::Util,
        ProviderGroup::Query,
        ProviderGroup::Time,
        ProviderGroup::Kube,
        ProviderGroup::Http,
    ]
    .into_iter()
    .fold(Providers::new(), |providers, group| {
        providers.register(group, "echo", Arc::new(Echo))
    })
}

async fn run_step(
    discover: &dyn TaskDiscover,
    step: &WorkflowStep,
    id: &str,
) -> Result<(Box<dyn TaskRunner>, TaskOutput), TaskError> {
    let generator = discover
        .get_task_generator(&DiscoverContext::new(), &step.step_type)
        .await?;
    let runner = generator.generate(step, &GeneratorOptions::new(id))?;
    let output = runner
        .run(&mut WorkflowContext::new(), &TaskRunOptions::default())
        .await?;
    Ok((runner, output))
}

#[tokio::test]
async fn test_builtin_wins_over_remote() {
    let remote = Arc::new(ClaimAllRemote {
        calls: AtomicU32::new(0),
    });
    let discover = TaskDiscoverer::new(
        BuiltinRegistry::with_builtins([Builtin::Suspend]),
        Some(remote.clone() as Arc<dyn TaskDiscover>),
    );

    let step = WorkflowStep::new("hold", "suspend");
    let (_, output) = run_step(&discover, &step, "hold-1")
        .await
        .expect("suspend resolves");

    assert!(output.operation.suspend);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 0);

    let step = WorkflowStep::new("deploy", "apply-component");
    let (_, output) = run_step(&discover, &step, "deploy-1")
        .await
        .expect("remote resolves");

    assert!(!output.operation.suspend);
    assert_eq!(output.status.step_type, "apply-component");
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unresolvable_name_reports_name() {
    let compiler = Arc::new(InspectingCompiler::default());
    let revision = PipelineRevision {
        name: "r1".to_string(),
        step_definitions: HashMap::new(),
    };
    let revision_discover =
        new_task_discover_from_revision(revision, DiscoverDeps::new(compiler.clone()));
    let view_discover = new_view_task_discover(
        Arc::new(MemoryStore::default()),
        "ns",
        0,
        DiscoverDeps::new(compiler.clone()),
    );

    for (discover, scope) in [(&revision_discover, "revision r1"), (&view_discover, "namespace ns")]
    {
        let error = discover
            .get_task_generator(&DiscoverContext::new(), "no-such-step")
            .await
            .err()
            .expect("resolution fails");

        assert!(error.is_not_found(), "{scope}: {error}");
        assert!(error.to_string().contains("no-such-step"));
        assert!(error.to_string().contains(scope));
    }
    assert_eq!(compiler.compiled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scenario_suspend_without_duration() {
    let discover = TaskDiscoverer::new(BuiltinRegistry::with_builtins(Builtin::ALL), None);
    let step: WorkflowStep = serde_json::from_value(json!({
        "name": "pause1",
        "type": "suspend",
        "properties": {}
    }))
    .expect("valid step");

    let (runner, output) = run_step(&discover, &step, "").await.expect("suspend runs");

    assert_eq!(
        output.status,
        StepStatus {
            id: String::new(),
            name: StepName::new("pause1"),
            step_type: "suspend".to_string(),
            phase: StepPhase::Succeeded,
            message: None,
            reason: None,
        }
    );
    assert_eq!(output.operation, Operation::suspend());
    assert_eq!(runner.name(), "pause1");
    assert!(!runner.pending(&WorkflowContext::new()));
}

#[tokio::test]
async fn test_scenario_suspend_with_duration() {
    let discover = TaskDiscoverer::new(BuiltinRegistry::with_builtins(Builtin::ALL), None);
    let step: WorkflowStep = serde_json::from_value(json!({
        "name": "pause2",
        "type": "suspend",
        "properties": {"duration": "10s"}
    }))
    .expect("valid step");

    let (_, output) = run_step(&discover, &step, "pause2-id")
        .await
        .expect("suspend runs");

    assert_eq!(output.status.phase, StepPhase::Running);
    assert_eq!(output.status.id, "pause2-id");
    assert!(output.operation.suspend);
}

#[tokio::test]
async fn test_malformed_duration_yields_no_runner() {
    let discover = TaskDiscoverer::new(BuiltinRegistry::with_builtins(Builtin::ALL), None);
    let step = WorkflowStep::new("pause3", "suspend")
        .with_properties(json!({"duration": "not-a-duration"}));

    let generator = discover
        .get_task_generator(&DiscoverContext::new(), "suspend")
        .await
        .expect("suspend resolves");
    let result = generator.generate(&step, &GeneratorOptions::default());

    assert!(matches!(result, Err(TaskError::DurationParse(_))));
    assert!(suspend_step_wait(&step).is_err());
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let discover = TaskDiscoverer::new(BuiltinRegistry::with_builtins(Builtin::ALL), None);
    let step = WorkflowStep::new("pause4", "suspend").with_properties(json!({"duration": "1h"}));
    let generator = discover
        .get_task_generator(&DiscoverContext::new(), "suspend")
        .await
        .expect("suspend resolves");
    let runner = generator
        .generate(&step, &GeneratorOptions::new("p4"))
        .expect("valid config");

    let mut ctx = WorkflowContext::new();
    let options = TaskRunOptions::default();
    let mut outputs = Vec::new();
    for _ in 0..3 {
        assert!(!runner.pending(&ctx));
        outputs.push(runner.run(&mut ctx, &options).await.expect("run succeeds"));
        assert_eq!(runner.name(), "pause4");
    }

    assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_revision_profile_resolution() {
    let compiler = Arc::new(InspectingCompiler::default());
    let mut deps = DiscoverDeps::new(compiler.clone());
    deps.providers = all_providers();

    let revision = PipelineRevision {
        name: "app-v1".to_string(),
        step_definitions: HashMap::from([
            ("notify".to_string(), "template: notify".to_string()),
            ("suspend".to_string(), "template: shadow".to_string()),
        ]),
    };
    let discover = new_task_discover_from_revision(revision, deps);

    // The revision's own "suspend" template never shadows the builtin.
    let (_, output) = run_step(&discover, &WorkflowStep::new("s", "suspend"), "s")
        .await
        .expect("suspend resolves");
    assert!(output.operation.suspend);
    assert_eq!(compiler.compiled.load(Ordering::SeqCst), 0);

    let (_, output) = run_step(&discover, &WorkflowStep::new("n", "notify"), "n")
        .await
        .expect("notify resolves");
    assert_eq!(output.status.step_type, "notify");
    assert_eq!(compiler.compiled.load(Ordering::SeqCst), 1);
    assert_eq!(
        *compiler.provider_groups.lock().expect("lock"),
        vec!["workspace", "email", "util"]
    );

    let error = discover
        .get_task_generator(&DiscoverContext::new(), "deploy")
        .await
        .err()
        .expect("unknown template");
    assert!(matches!(error, TaskError::TemplateNotFound { .. }));
    assert!(discover
        .profile()
        .is_some_and(|p| p.includes_builtin(Builtin::Suspend)));
}

#[tokio::test]
async fn test_view_profile_has_no_suspend() {
    let compiler = Arc::new(InspectingCompiler::default());
    let mut deps = DiscoverDeps::new(compiler.clone());
    deps.providers = all_providers();

    let store = MemoryStore {
        templates: HashMap::from([(
            ("vela-system".to_string(), "component-pod-view".to_string()),
            "template: pods".to_string(),
        )]),
    };
    let discover = new_view_task_discover(Arc::new(store), "vela-system", 0, deps);

    let error = discover
        .get_task_generator(&DiscoverContext::new(), "suspend")
        .await
        .err()
        .expect("suspend is not a view step");
    assert!(matches!(error, TaskError::TemplateNotFound { .. }));

    assert!(discover
        .get_task_generator(&DiscoverContext::new(), "component-pod-view")
        .await
        .is_ok());
    assert_eq!(
        *compiler.provider_groups.lock().expect("lock"),
        vec!["email", "query", "time", "kube", "http"]
    );
}

#[test]
fn test_resolution_from_blocking_caller() {
    let discover = TaskDiscoverer::new(BuiltinRegistry::with_builtins(Builtin::ALL), None);
    let result =
        tokio_test::block_on(discover.get_task_generator(&DiscoverContext::new(), "suspend"));
    assert!(result.is_ok());
}

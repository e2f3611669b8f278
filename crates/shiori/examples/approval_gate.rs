//! A toy reconciliation loop that stops at a suspend step.
//!
//! The pipeline deploys to staging, waits for approval, then deploys to
//! production. Each pass resolves and runs steps in order until a runner
//! asks the engine to suspend.

use async_trait::async_trait;
use serde_json::json;
use shiori::prelude::*;
use shiori::{
    new_task_discover_from_revision, DiscoverDeps, PipelineRevision, TemplateCompiler, TemplateEnv,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct DeployRunner {
    id: String,
    name: StepName,
    target: String,
}

#[async_trait]
impl TaskRunner for DeployRunner {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn run(
        &self,
        ctx: &mut WorkflowContext,
        _options: &TaskRunOptions,
    ) -> Result<TaskOutput, TaskError> {
        println!("Deploying to {}...", self.target);
        ctx.set_var(format!("deployed.{}", self.target), json!(true));
        Ok(TaskOutput {
            status: StepStatus {
                id: self.id.clone(),
                name: self.name.clone(),
                step_type: "deploy".to_string(),
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

/// Treats the template text as the deploy target.
struct DeployCompiler;

impl TemplateCompiler for DeployCompiler {
    fn compile(
        &self,
        _name: &str,
        template: &str,
        _env: &TemplateEnv,
    ) -> Result<Arc<dyn TaskGenerator>, TaskError> {
        let target = template.trim().to_string();
        let generator = move |step: &WorkflowStep,
                              options: &GeneratorOptions|
              -> Result<Box<dyn TaskRunner>, TaskError> {
            let target = step
                .properties
                .as_ref()
                .and_then(|p| p.get("target"))
                .and_then(|t| t.as_str())
                .unwrap_or(&target)
                .to_string();
            Ok(Box::new(DeployRunner {
                id: options.id.clone(),
                name: step.name.clone(),
                target,
            }))
        };
        Ok(Arc::new(generator))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let revision = PipelineRevision {
        name: "shop-v3".to_string(),
        step_definitions: HashMap::from([("deploy".to_string(), "staging".to_string())]),
    };
    let discover =
        new_task_discover_from_revision(revision, DiscoverDeps::new(Arc::new(DeployCompiler)));

    let steps = vec![
        WorkflowStep::new("deploy-staging", "deploy"),
        WorkflowStep::new("approve", "suspend"),
        WorkflowStep::new("deploy-prod", "deploy")
            .with_properties(json!({"target": "production"})),
    ];

    let mut ctx = WorkflowContext::new();
    for (index, step) in steps.iter().enumerate() {
        let generator = discover
            .get_task_generator(&DiscoverContext::new(), &step.step_type)
            .await?;
        let runner = generator.generate(step, &GeneratorOptions::new(format!("step-{index}")))?;
        if runner.pending(&ctx) {
            println!("Step {} is pending", runner.name());
            break;
        }

        let output = runner.run(&mut ctx, &TaskRunOptions::default()).await?;
        println!(
            "Step {} -> {} (suspend: {})",
            output.status.name, output.status.phase, output.operation.suspend
        );
        if output.operation.suspend {
            println!("Pipeline suspended at {}", runner.name());
            break;
        }
    }

    println!("Deployed so far: {:?}", ctx.get_var("deployed"));
    Ok(())
}

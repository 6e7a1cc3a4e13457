//! End-to-end pipeline tests over a scripted backend.

use std::sync::Mutex;

use envforge::backend::{GenerationFuture, GenerationRequest, Generator};
use envforge::error::{BackendError, PipelineError, Stage};
use envforge::pipeline::{context, orchestrator, Subject, TaskCategory};

/// One scripted backend response.
enum Step {
    Text(&'static str),
    Fail,
}

/// Serves scripted responses in order and records every request.
struct ScriptedBackend {
    steps: Mutex<Vec<Step>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    fn new(steps: Vec<Step>) -> Self {
        let mut steps = steps;
        steps.reverse();
        Self { steps: Mutex::new(steps), requests: Mutex::new(Vec::new()) }
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn generation_requests(&self) -> Vec<GenerationRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.user_prompt.contains("### FILE:"))
            .collect()
    }
}

impl Generator for ScriptedBackend {
    fn send(&self, request: &GenerationRequest) -> GenerationFuture<'_> {
        self.requests.lock().unwrap().push(request.clone());
        let step = self.steps.lock().unwrap().pop();
        Box::pin(async move {
            match step {
                Some(Step::Text(text)) => Ok(text.to_string()),
                Some(Step::Fail) => {
                    Err(BackendError::Unavailable { details: "nim: scripted failure".into() })
                }
                None => Err(BackendError::Unavailable { details: "script exhausted".into() }),
            }
        })
    }
}

const BALANCE_RECORD: &str = r#"{
    "category": "classic-balance",
    "subject": "pole-cart",
    "objectives": ["keep the pole upright"],
    "constraints": ["cart stays on the rail"],
    "difficulty": "medium",
    "episode_length_s": 5.0,
    "instance_count": 4096
}"#;

const VALID_RESPONSE: &str = r#"### FILE: cartpole_balance_env_cfg.py
```python
from isaaclab.envs import ManagerBasedRLEnvCfg
from isaaclab.managers import RewardTermCfg as RewTerm
from isaaclab.utils import configclass

import isaaclab.envs.mdp as mdp


@configclass
class RewardsCfg:
    alive = RewTerm(func=mdp.is_alive, weight=1.0)
    terminating = RewTerm(func=mdp.is_terminated, weight=-2.0)


@configclass
class CartpoleBalanceEnvCfg(ManagerBasedRLEnvCfg):
    rewards: RewardsCfg = RewardsCfg()

    def __post_init__(self):
        self.decimation = 2
        self.episode_length_s = 5.0
```
### FILE: __init__.py
```python
import gymnasium as gym
```
### FILE: train.sh
```bash
echo train
```
"#;

// Same shape, but without the initialization routine the validator requires.
const INVALID_RESPONSE: &str = r#"### FILE: cartpole_balance_env_cfg.py
```python
from isaaclab.envs import ManagerBasedRLEnvCfg
from isaaclab.utils import configclass

import isaaclab.envs.mdp as mdp


@configclass
class RewardsCfg:
    pass


@configclass
class CartpoleBalanceEnvCfg(ManagerBasedRLEnvCfg):
    rewards: RewardsCfg = RewardsCfg()
```
"#;

const BARE_CODE_RESPONSE: &str = r#"```python
from isaaclab.envs import ManagerBasedRLEnvCfg
from isaaclab.utils import configclass

import isaaclab.envs.mdp as mdp


@configclass
class RewardsCfg:
    pass


@configclass
class CartpoleBalanceEnvCfg(ManagerBasedRLEnvCfg):
    rewards: RewardsCfg = RewardsCfg()

    def __post_init__(self):
        self.decimation = 2
```
"#;

#[tokio::test]
async fn balance_description_runs_end_to_end() {
    let backend = ScriptedBackend::new(vec![
        Step::Text(BALANCE_RECORD),
        Step::Text(VALID_RESPONSE),
        Step::Text("## Reward design\nThe alive bonus dominates."),
    ]);

    let outcome =
        orchestrator::run(&backend, "Balance a pole on a cart", None).await.unwrap();

    assert_eq!(outcome.spec.category, TaskCategory::ClassicBalance);
    assert_eq!(outcome.spec.subject, Subject::PoleCart);
    assert!(outcome.report.is_acceptable());

    assert_eq!(outcome.bundle.task_name, "cartpole_balance");
    assert_eq!(outcome.bundle.task_id, "EnvForge-Balance-Cartpole-v0");
    assert!(outcome.bundle.primary_file.contains("class CartpoleBalanceEnvCfg"));
    // Backend-provided registration and launch files win over synthesis.
    assert_eq!(outcome.bundle.registration_file, "import gymnasium as gym");
    assert_eq!(outcome.bundle.launch_script, "echo train");
    assert!(outcome.bundle.explanation.contains("Reward design"));
    assert_eq!(outcome.bundle.raw_response, VALID_RESPONSE);

    assert_eq!(backend.requests().len(), 3);

    // The assembled context for this run leads with the pole-cart example.
    let context = context::assemble(&outcome.spec);
    let section = &context[context.find("=== WORKED EXAMPLE").unwrap()..];
    let first_example = context::category_examples(outcome.spec.category)[0].0;
    assert_eq!(first_example, "cartpole_env_cfg.py");
    assert!(section.find(first_example).unwrap() < section.find("reach_env_cfg_base.py").unwrap());
}

#[tokio::test]
async fn unparseable_analysis_fails_after_one_retry() {
    let backend = ScriptedBackend::new(vec![
        Step::Text("I cannot classify this."),
        Step::Text("Still prose, sorry."),
    ]);

    let err = orchestrator::run(&backend, "do something", None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Analysis { .. }));

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].user_prompt.contains("ONLY a valid JSON object"));
}

#[tokio::test]
async fn failing_validation_generates_exactly_twice() {
    let backend = ScriptedBackend::new(vec![
        Step::Text(BALANCE_RECORD),
        Step::Text(INVALID_RESPONSE),
        Step::Text(INVALID_RESPONSE),
        Step::Text("explanation"),
    ]);

    let outcome = orchestrator::run(&backend, "balance", None).await.unwrap();

    let generations = backend.generation_requests();
    assert_eq!(generations.len(), 2, "retry must be bounded to one extra cycle");
    assert!(generations[1].user_prompt.contains("failed validation"));
    assert!(generations[1].user_prompt.contains("__post_init__"));

    // Degraded result: findings surface with the bundle, not as a failure.
    assert!(!outcome.report.is_acceptable());
    assert!(outcome.report.errors.iter().any(|e| e.contains("__post_init__")));
    assert_eq!(outcome.bundle.explanation, "explanation");
}

#[tokio::test]
async fn acceptable_first_attempt_skips_the_retry() {
    let backend = ScriptedBackend::new(vec![
        Step::Text(BALANCE_RECORD),
        Step::Text(VALID_RESPONSE),
        Step::Text("explanation"),
    ]);

    orchestrator::run(&backend, "balance", None).await.unwrap();
    assert_eq!(backend.generation_requests().len(), 1);
}

#[tokio::test]
async fn backend_failure_during_generation_is_fatal() {
    let backend = ScriptedBackend::new(vec![Step::Text(BALANCE_RECORD), Step::Fail]);

    let err = orchestrator::run(&backend, "balance", None).await.unwrap_err();
    match err {
        PipelineError::Backend { stage, source } => {
            assert_eq!(stage, Stage::Generate);
            assert!(matches!(source, BackendError::Unavailable { .. }));
        }
        other => panic!("expected a generate-stage backend error, got {other}"),
    }
}

#[tokio::test]
async fn explanation_failure_is_swallowed() {
    let backend = ScriptedBackend::new(vec![
        Step::Text(BALANCE_RECORD),
        Step::Text(VALID_RESPONSE),
        Step::Fail,
    ]);

    let outcome = orchestrator::run(&backend, "balance", None).await.unwrap();
    assert!(outcome.report.is_acceptable());
    assert!(outcome.bundle.explanation.is_empty());
}

#[tokio::test]
async fn incompatible_subject_override_is_rejected() {
    let backend = ScriptedBackend::new(vec![Step::Text(BALANCE_RECORD)]);

    let err = orchestrator::run(&backend, "balance", Some(Subject::Quadruped))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::IncompatibleSubject { .. }));
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn marker_free_response_degrades_into_the_primary_file() {
    let backend = ScriptedBackend::new(vec![
        Step::Text(BALANCE_RECORD),
        Step::Text(BARE_CODE_RESPONSE),
        Step::Text("explanation"),
    ]);

    let outcome = orchestrator::run(&backend, "balance", None).await.unwrap();

    assert!(outcome.report.is_acceptable());
    assert!(outcome.bundle.primary_file.starts_with("from isaaclab.envs"));
    // Registration and launch files come from deterministic synthesis.
    assert!(outcome.bundle.registration_file.contains("gym.register("));
    assert!(outcome.bundle.registration_file.contains(":CartpoleBalanceEnvCfg"));
    assert!(outcome.bundle.launch_script.contains("isaaclab.sh"));
    assert!(outcome.bundle.launch_script.contains("EnvForge-Balance-Cartpole-v0"));
}

// src/core/workflow.rs — Phase/subtask dispatcher for the development workflow
//
// Walks a fixed list of phases, hands each subtask to the agent responsible
// for it, and saves the agent's text to `<output>/<subtask>.txt`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::ProgressEvent;
use crate::agents::{
    AgentContext, AgentRole, AgentTask, DevOpsAgent, EngineerAgent, QaAgent, ReviewAgent,
    RoleAgent,
};
use crate::infra::config::Config;
use crate::provider::gateway::ModelGateway;

/// Phases in execution order with their subtasks.
pub const PHASES: &[(&str, &[&str])] = &[
    ("requirements analysis", &["gather requirements", "define scope"]),
    ("architecture design", &["design components", "define data structures"]),
    ("implementation", &["develop modules", "write tests"]),
    ("integration and testing", &["integrate components", "run tests"]),
    ("deployment", &["deploy application", "monitor performance"]),
    ("maintenance", &["bug fixes", "feature enhancements"]),
    ("review", &["review codebase"]),
];

const OUTPUT_SUBDIRS: &[&str] = &["src", "tests", "docs"];
const SUMMARY_FILE: &str = "workflow_summary.json";

/// Role responsible for a subtask, `None` for names outside the phase table.
pub fn agent_for_subtask(subtask: &str) -> Option<AgentRole> {
    match subtask {
        "gather requirements" | "define scope" => Some(AgentRole::Engineer),
        "design components" | "define data structures" => Some(AgentRole::Engineer),
        "develop modules" | "write tests" => Some(AgentRole::Engineer),
        "integrate components" | "run tests" => Some(AgentRole::Qa),
        "deploy application" | "monitor performance" => Some(AgentRole::DevOps),
        "bug fixes" | "feature enhancements" => Some(AgentRole::Engineer),
        "review codebase" => Some(AgentRole::Reviewer),
        _ => None,
    }
}

/// `<output>/<subtask with spaces as underscores>.txt`
pub fn result_path(output_dir: &Path, subtask: &str) -> PathBuf {
    output_dir.join(format!("{}.txt", subtask.replace(' ', "_")))
}

#[derive(Debug, Clone, Serialize)]
pub struct SubtaskStats {
    pub role: AgentRole,
    pub time_secs: f64,
    pub model_calls: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub run_id: String,
    pub project_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output_dir: PathBuf,
    pub phase_status: BTreeMap<String, bool>,
    pub subtask_stats: BTreeMap<String, SubtaskStats>,
    pub phase_time_secs: BTreeMap<String, f64>,
    pub skipped: Vec<String>,
    pub saved_files: Vec<PathBuf>,
    pub total_calls: u64,
    pub cost_usd: f64,
}

impl WorkflowReport {
    pub fn completed(&self) -> usize {
        self.phase_status.values().filter(|done| **done).count()
    }
}

pub struct DevWorkflow {
    project_name: String,
    output_dir: PathBuf,
    agents: HashMap<AgentRole, Arc<dyn RoleAgent>>,
    gateway: Arc<ModelGateway>,
    phase_status: BTreeMap<String, bool>,
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send + Sync>>,
}

impl DevWorkflow {
    /// Create the output tree (`src/`, `tests/`, `docs/`) and an empty roster.
    pub fn new(
        project_name: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        gateway: Arc<ModelGateway>,
    ) -> anyhow::Result<Self> {
        let output_dir = output_dir.into();
        for sub in OUTPUT_SUBDIRS {
            let dir = output_dir.join(sub);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let phase_status = PHASES
            .iter()
            .flat_map(|(_, subtasks)| subtasks.iter())
            .map(|s| (s.to_string(), false))
            .collect();

        Ok(Self {
            project_name: project_name.into(),
            output_dir,
            agents: HashMap::new(),
            gateway,
            phase_status,
            on_progress: None,
        })
    }

    /// Workflow with all four agents, each on its configured model.
    pub fn from_config(
        project_name: impl Into<String>,
        gateway: Arc<ModelGateway>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let models = &config.models;
        let notes = config.workflow.notes.clone();
        let ctx = |model: &Option<String>| {
            AgentContext::new(gateway.clone(), model.as_deref().unwrap_or(&models.default))
                .with_notes(notes.clone())
        };

        let engineer = EngineerAgent::new(ctx(&models.engineer));
        let qa = QaAgent::new(ctx(&models.qa));
        let devops = DevOpsAgent::new(ctx(&models.devops));
        let reviewer = ReviewAgent::new(ctx(&models.reviewer));

        Ok(
            Self::new(project_name, &config.workflow.output_dir, gateway.clone())?
                .with_agent(Arc::new(engineer))
                .with_agent(Arc::new(qa))
                .with_agent(Arc::new(devops))
                .with_agent(Arc::new(reviewer)),
        )
    }

    /// Register the agent for its role, replacing any earlier one.
    pub fn with_agent(mut self, agent: Arc<dyn RoleAgent>) -> Self {
        self.agents.insert(agent.role(), agent);
        self
    }

    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn phase_status(&self) -> &BTreeMap<String, bool> {
        &self.phase_status
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Run every phase in order. The first agent failure aborts the run.
    pub async fn perform_development(&mut self) -> anyhow::Result<WorkflowReport> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut artifacts: BTreeMap<String, String> = BTreeMap::new();
        let mut subtask_stats = BTreeMap::new();
        let mut phase_time_secs = BTreeMap::new();
        let mut skipped = Vec::new();
        let mut saved_files = Vec::new();

        tracing::info!(project = %self.project_name, run_id = %run_id, "Starting development workflow");

        for (index, (phase, subtasks)) in PHASES.iter().enumerate() {
            let phase_start = Instant::now();
            tracing::info!(phase, "Starting phase");
            self.emit(ProgressEvent::PhaseStart {
                phase: phase.to_string(),
                index: index + 1,
                total: PHASES.len(),
            });

            for subtask in subtasks.iter() {
                let Some(agent) = self.agent_for(subtask) else {
                    tracing::warn!(subtask, "No agent available for subtask, skipping");
                    skipped.push(subtask.to_string());
                    self.emit(ProgressEvent::SubtaskSkipped {
                        subtask: subtask.to_string(),
                    });
                    continue;
                };

                let calls_before = self.gateway.total_calls();
                let started = Instant::now();

                let task = AgentTask::new(&self.project_name, subtask, &artifacts);
                let result = agent
                    .perform_task(&task)
                    .await
                    .with_context(|| format!("Subtask '{}' ({}) failed", subtask, agent.role()))?;

                let path = self.save_result(subtask, &result)?;
                saved_files.push(path);
                artifacts.insert(subtask.to_string(), result);
                self.phase_status.insert(subtask.to_string(), true);

                let stats = SubtaskStats {
                    role: agent.role(),
                    time_secs: started.elapsed().as_secs_f64(),
                    model_calls: self.gateway.total_calls().saturating_sub(calls_before),
                };
                self.emit(ProgressEvent::SubtaskDone {
                    subtask: subtask.to_string(),
                    role: stats.role.to_string(),
                    elapsed_secs: stats.time_secs,
                    model_calls: stats.model_calls,
                });
                subtask_stats.insert(subtask.to_string(), stats);
            }

            let elapsed = phase_start.elapsed().as_secs_f64();
            tracing::info!(phase, elapsed_secs = elapsed, "Completed phase");
            phase_time_secs.insert(phase.to_string(), elapsed);
        }

        let report = WorkflowReport {
            run_id,
            project_name: self.project_name.clone(),
            started_at,
            finished_at: Utc::now(),
            output_dir: self.output_dir.clone(),
            phase_status: self.phase_status.clone(),
            subtask_stats,
            phase_time_secs,
            skipped,
            saved_files,
            total_calls: self.gateway.total_calls(),
            cost_usd: self.gateway.cost_estimate(),
        };

        self.write_summary(&report)?;
        tracing::info!(
            completed = report.completed(),
            "Workflow finished: {}",
            self.gateway.cost_snapshot().summary()
        );
        self.emit(ProgressEvent::WorkflowDone {
            completed: report.completed(),
            total: report.phase_status.len(),
            cost: report.cost_usd,
        });
        Ok(report)
    }

    fn agent_for(&self, subtask: &str) -> Option<Arc<dyn RoleAgent>> {
        let role = agent_for_subtask(subtask)?;
        self.agents.get(&role).cloned()
    }

    fn save_result(&self, subtask: &str, result: &str) -> anyhow::Result<PathBuf> {
        let path = result_path(&self.output_dir, subtask);
        std::fs::write(&path, result)
            .with_context(|| format!("Failed to save result to {}", path.display()))?;
        tracing::debug!(path = %path.display(), bytes = result.len(), "Saved subtask result");
        Ok(path)
    }

    fn write_summary(&self, report: &WorkflowReport) -> anyhow::Result<()> {
        let path = self.output_dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{gateway_over, ScriptedProvider};

    #[test]
    fn test_every_phase_subtask_has_an_agent() {
        for (_, subtasks) in PHASES {
            for s in subtasks.iter() {
                assert!(agent_for_subtask(s).is_some(), "{s} has no agent");
            }
        }
    }

    #[test]
    fn test_dispatch_table() {
        assert_eq!(agent_for_subtask("define scope"), Some(AgentRole::Engineer));
        assert_eq!(agent_for_subtask("write tests"), Some(AgentRole::Engineer));
        assert_eq!(agent_for_subtask("run tests"), Some(AgentRole::Qa));
        assert_eq!(agent_for_subtask("monitor performance"), Some(AgentRole::DevOps));
        assert_eq!(agent_for_subtask("review codebase"), Some(AgentRole::Reviewer));
        assert_eq!(agent_for_subtask("make coffee"), None);
    }

    #[test]
    fn test_result_path() {
        let p = result_path(Path::new("out"), "define data structures");
        assert_eq!(p, Path::new("out").join("define_data_structures.txt"));
    }

    #[test]
    fn test_new_creates_output_tree() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("project_repo");
        let wf = DevWorkflow::new("p", &out, gateway_over(ScriptedProvider::fixed("x"))).unwrap();
        for sub in ["src", "tests", "docs"] {
            assert!(out.join(sub).is_dir());
        }
        assert_eq!(wf.phase_status().len(), 13);
        assert!(wf.phase_status().values().all(|done| !done));
    }

    #[tokio::test]
    async fn test_missing_role_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_over(ScriptedProvider::fixed("text"));
        let engineer = EngineerAgent::new(AgentContext::new(gateway.clone(), "gpt-4o-mini"));
        let mut wf = DevWorkflow::new("p", dir.path(), gateway)
            .unwrap()
            .with_agent(Arc::new(engineer));

        let report = wf.perform_development().await.unwrap();
        assert_eq!(report.completed(), 8);
        assert_eq!(report.skipped.len(), 5);
        assert!(!report.phase_status["run tests"]);
        assert!(!dir.path().join("run_tests.txt").exists());
        assert!(dir.path().join("bug_fixes.txt").exists());
    }
}

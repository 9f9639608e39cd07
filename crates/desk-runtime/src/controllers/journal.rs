//! Journal controller: intentions a developer writes against a project and
//! task, plus the recent lists the journal view loads.

use super::{string_arg, ControllerArgError};
use chrono::{DateTime, Utc};
use desk_bus::{ControllerRouter, Delivery, Handler, MainBus};
use desk_types::catalog;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

pub const LOAD_RECENT_JOURNAL: &str = "load-recent-journal";
pub const CREATE_INTENTION: &str = "create-intention";
pub const CREATE_TASK_REFERENCE: &str = "create-task-reference";
pub const GET_RECENT_INTENTIONS: &str = "get-recent-intentions";
pub const GET_RECENT_PROJECTS: &str = "get-recent-projects";
pub const GET_RECENT_TASKS: &str = "get-recent-tasks";

/// Length of every "recent" list.
pub const RECENT_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub task_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intention {
    pub id: String,
    pub user_name: String,
    pub project_id: String,
    pub task_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the journal view shows on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentJournal {
    pub recent_intentions: Vec<Intention>,
    pub recent_projects: Vec<Project>,
    pub recent_tasks_by_project_name: BTreeMap<String, Vec<Task>>,
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("project '{0}' does not exist")]
    UnknownProject(String),

    #[error("task '{0}' does not exist")]
    UnknownTask(String),
}

#[derive(Debug, Default)]
struct Journal {
    projects: Vec<Project>,
    tasks: Vec<Task>,
    intentions: Vec<Intention>,
}

/// In-memory journal store. Lists are kept in creation order.
#[derive(Debug, Default)]
pub struct JournalStore {
    journal: RwLock<Journal>,
}

impl JournalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&self, name: &str) -> Project {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        self.journal.write().projects.push(project.clone());
        project
    }

    /// Find the task named `task_name`, creating it when missing.
    pub fn task_reference(&self, task_name: &str) -> Task {
        let mut journal = self.journal.write();
        if let Some(task) = journal.tasks.iter().find(|t| t.task_name == task_name) {
            return task.clone();
        }

        let task = Task {
            id: Uuid::new_v4().to_string(),
            task_name: task_name.to_string(),
            created_at: Utc::now(),
        };
        journal.tasks.push(task.clone());
        task
    }

    pub fn create_intention(
        &self,
        user_name: &str,
        project_id: &str,
        task_id: &str,
        description: &str,
    ) -> Result<Intention, JournalError> {
        let mut journal = self.journal.write();
        if !journal.projects.iter().any(|p| p.id == project_id) {
            return Err(JournalError::UnknownProject(project_id.to_string()));
        }
        if !journal.tasks.iter().any(|t| t.id == task_id) {
            return Err(JournalError::UnknownTask(task_id.to_string()));
        }

        let intention = Intention {
            id: Uuid::new_v4().to_string(),
            user_name: user_name.to_string(),
            project_id: project_id.to_string(),
            task_id: task_id.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
        };
        journal.intentions.push(intention.clone());
        Ok(intention)
    }

    /// Newest first.
    pub fn recent_intentions(&self, user_name: &str) -> Vec<Intention> {
        self.journal
            .read()
            .intentions
            .iter()
            .rev()
            .filter(|i| i.user_name == user_name)
            .take(RECENT_LIMIT)
            .cloned()
            .collect()
    }

    pub fn recent_projects(&self) -> Vec<Project> {
        self.journal
            .read()
            .projects
            .iter()
            .rev()
            .take(RECENT_LIMIT)
            .cloned()
            .collect()
    }

    pub fn recent_tasks(&self) -> Vec<Task> {
        self.journal
            .read()
            .tasks
            .iter()
            .rev()
            .take(RECENT_LIMIT)
            .cloned()
            .collect()
    }

    /// Recent intentions, projects, and the tasks used under each project.
    pub fn recent_journal(&self, user_name: &str) -> RecentJournal {
        let recent_intentions = self.recent_intentions(user_name);
        let journal = self.journal.read();

        let mut recent_tasks_by_project_name: BTreeMap<String, Vec<Task>> = BTreeMap::new();
        for intention in &recent_intentions {
            let project = journal.projects.iter().find(|p| p.id == intention.project_id);
            let task = journal.tasks.iter().find(|t| t.id == intention.task_id);
            if let (Some(project), Some(task)) = (project, task) {
                let tasks = recent_tasks_by_project_name
                    .entry(project.name.clone())
                    .or_default();
                if !tasks.iter().any(|t| t.id == task.id) {
                    tasks.push(task.clone());
                }
            }
        }

        RecentJournal {
            recent_intentions,
            recent_projects: journal.projects.iter().rev().take(RECENT_LIMIT).cloned().collect(),
            recent_tasks_by_project_name,
        }
    }
}

fn user_name(args: &Value) -> &str {
    args.get("userName").and_then(Value::as_str).unwrap_or("me")
}

fn intention_args(args: &Value) -> Result<(&str, &str, &str), ControllerArgError> {
    Ok((
        string_arg(args, "projectId")?,
        string_arg(args, "taskId")?,
        string_arg(args, "description")?,
    ))
}

/// Action router for `ipc-journal-client`.
pub fn router(store: Arc<JournalStore>) -> ControllerRouter {
    let load = store.clone();
    let intentions = store.clone();
    let create = store.clone();
    let reference = store.clone();
    let projects = store.clone();
    let tasks = store;

    ControllerRouter::new("JournalController")
        .action(LOAD_RECENT_JOURNAL, move |_, args| {
            Ok(serde_json::to_value(load.recent_journal(user_name(args)))?)
        })
        .action(CREATE_INTENTION, move |ctx, args| {
            let (project_id, task_id, description) = intention_args(args)?;
            let intention = create.create_intention(user_name(args), project_id, task_id, description)?;
            let intention = serde_json::to_value(intention)?;

            let report = ctx.emit(catalog::JOURNAL_DATA_REFRESH, intention.clone());
            info!(
                "[JournalController] intention created, refresh sent to {} windows",
                report.windows_reached.len()
            );
            Ok(intention)
        })
        .action(CREATE_TASK_REFERENCE, move |_, args| {
            let task = reference.task_reference(string_arg(args, "taskName")?);
            debug!("[JournalController] task reference {}", task.task_name);
            Ok(serde_json::to_value(task)?)
        })
        .action(GET_RECENT_INTENTIONS, move |_, args| {
            Ok(serde_json::to_value(intentions.recent_intentions(user_name(args)))?)
        })
        .action(GET_RECENT_PROJECTS, move |_, _| {
            Ok(serde_json::to_value(projects.recent_projects())?)
        })
        .action(GET_RECENT_TASKS, move |_, _| {
            Ok(serde_json::to_value(tasks.recent_tasks())?)
        })
}

/// Register the journal controller on the bus.
pub fn register(bus: &MainBus, store: Arc<JournalStore>) -> Handler {
    bus.register(
        router(store)
            .registration(catalog::JOURNAL_CLIENT)
            .delivery(Delivery::Deferred),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::LocalIpc;
    use desk_bus::BusConfig;
    use desk_types::{Channel, WindowId};
    use serde_json::json;

    fn bus() -> (Arc<LocalIpc>, MainBus) {
        let (ipc, _inbound) = LocalIpc::new();
        let ipc = Arc::new(ipc);
        let bus = MainBus::new(ipc.clone(), ipc.clone(), BusConfig::default());
        (ipc, bus)
    }

    #[test]
    fn test_task_reference_is_reused() {
        let store = JournalStore::new();
        let first = store.task_reference("DESK-42");
        let second = store.task_reference("DESK-42");

        assert_eq!(first.id, second.id);
        assert_eq!(store.recent_tasks().len(), 1);
    }

    #[test]
    fn test_intention_needs_known_project_and_task() {
        let store = JournalStore::new();
        let project = store.add_project("desk");
        let task = store.task_reference("DESK-1");

        assert!(matches!(
            store.create_intention("me", "nope", &task.id, "x"),
            Err(JournalError::UnknownProject(_))
        ));
        assert!(matches!(
            store.create_intention("me", &project.id, "nope", "x"),
            Err(JournalError::UnknownTask(_))
        ));
        assert!(store.create_intention("me", &project.id, &task.id, "x").is_ok());
    }

    #[test]
    fn test_recent_journal_groups_tasks_by_project() {
        let store = JournalStore::new();
        let desk = store.add_project("desk");
        let bus_project = store.add_project("bus");
        let t1 = store.task_reference("DESK-1");
        let t2 = store.task_reference("BUS-7");

        store.create_intention("me", &desk.id, &t1.id, "wire the pump").expect("created");
        store.create_intention("me", &desk.id, &t1.id, "again").expect("created");
        store.create_intention("me", &bus_project.id, &t2.id, "fan out").expect("created");
        store.create_intention("zoe", &desk.id, &t1.id, "not mine").expect("created");

        let recent = store.recent_journal("me");
        assert_eq!(recent.recent_intentions.len(), 3);
        assert_eq!(recent.recent_intentions[0].description, "fan out");
        assert_eq!(recent.recent_projects.len(), 2);
        assert_eq!(recent.recent_tasks_by_project_name["desk"].len(), 1);
        assert_eq!(recent.recent_tasks_by_project_name["bus"][0].task_name, "BUS-7");
    }

    #[test]
    fn test_create_intention_refreshes_views() {
        let (ipc, bus) = bus();
        let mut window = ipc.open_window(WindowId::new(1));
        let store = Arc::new(JournalStore::new());
        let project = store.add_project("desk");
        register(&bus, store.clone());

        let task = bus.emit(
            catalog::JOURNAL_CLIENT,
            json!({"action": CREATE_TASK_REFERENCE, "taskName": "DESK-9"}),
        );
        let task: Task = task.envelope.data_as().expect("decodes").expect("task");

        let created = bus.emit(
            catalog::JOURNAL_CLIENT,
            json!({
                "action": CREATE_INTENTION,
                "projectId": project.id,
                "taskId": task.id,
                "description": "finish the journal controller",
            }),
        );
        assert!(created.envelope.error.is_none());

        let mut channels = Vec::new();
        while let Ok(message) = window.try_recv() {
            channels.push(message.channel);
        }
        assert!(channels.contains(&Channel::new(catalog::JOURNAL_DATA_REFRESH)));
        assert_eq!(store.recent_intentions("me").len(), 1);
    }

    #[test]
    fn test_create_intention_reports_missing_args() {
        let (_, bus) = bus();
        register(&bus, Arc::new(JournalStore::new()));

        let report = bus.emit(
            catalog::JOURNAL_CLIENT,
            json!({"action": CREATE_INTENTION, "projectId": "p"}),
        );

        let err = report.envelope.error.expect("missing task id");
        assert!(err.message.contains("missing argument 'taskId'"));
    }
}

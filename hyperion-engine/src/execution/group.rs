// Task Group
// Runs selected tasks sequentially or in parallel under one group deadline

use crate::error::{EngineError, EngineResult};
use crate::execution::context::RunScope;
use crate::execution::events::{EngineEvent, EventSender};
use crate::model::{Value, Variable};
use crate::runners::{TaskError, TaskOutput};
use crate::tasks::Task;
use crate::template::{render, TemplateContext};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Stand-in deadline for timeouts too large to add to the clock
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Variable store of a task group, keyed by variable name
pub type VariableStore = Arc<Mutex<BTreeMap<String, Variable>>>;

/// Ordered tasks sharing one variable store
#[derive(Debug)]
pub struct TaskGroup {
    pub title: String,
    /// Run every selected task on its own unit of work
    pub parallel: bool,
    tasks: Vec<Arc<Task>>,
    variables: VariableStore,
}

impl TaskGroup {
    pub fn new(title: impl Into<String>, parallel: bool) -> Self {
        Self {
            title: title.into(),
            parallel,
            tasks: Vec::new(),
            variables: VariableStore::default(),
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.add(task);
        self
    }

    pub fn add(&mut self, task: Task) {
        self.tasks.push(Arc::new(task));
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().map(Arc::as_ref)
    }

    /// Snapshot of the variable store after the last run
    pub async fn variables(&self) -> BTreeMap<String, Variable> {
        self.variables.lock().await.clone()
    }

    /// Run the tasks selected by `tags` within `timeout`.
    ///
    /// Returns true when every selected task succeeded (trivially true when none is selected).
    /// On timeout the remaining tasks are cancelled, their processes killed, and the group fails.
    pub async fn run(&self, tags: &BTreeSet<String>, timeout: Duration, scope: &RunScope) -> bool {
        let started = Instant::now();
        self.variables.lock().await.clear();

        let selected: Vec<Arc<Task>> = self
            .tasks
            .iter()
            .filter(|task| task.is_selected(tags))
            .cloned()
            .collect();

        tracing::info!(
            group = %self.title,
            parallel = self.parallel,
            "running task group with {} of {} tasks",
            selected.len(),
            self.tasks.len()
        );
        let events = &scope.env.events;
        events.send_event(EngineEvent::TaskGroupStarted {
            title: self.title.clone(),
            parallel: self.parallel,
            selected_tasks: selected.len(),
        });

        let cancel = CancellationToken::new();
        let mut units = JoinSet::new();
        let unit = |tasks: Vec<Arc<Task>>| Unit {
            group: self.title.clone(),
            tasks,
            store: Arc::clone(&self.variables),
            scope: scope.clone(),
            cancel: cancel.clone(),
        };

        if self.parallel {
            for task in selected {
                units.spawn(unit(vec![task]).run());
            }
        } else if !selected.is_empty() {
            units.spawn(unit(selected).run());
        }

        let mut success = true;
        let now = tokio::time::Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);
        let timed_out = loop {
            tokio::select! {
                joined = units.join_next() => match joined {
                    Some(result) => success &= unit_succeeded(result),
                    None => break false,
                },
                _ = tokio::time::sleep_until(deadline) => break true,
            }
        };

        if timed_out {
            success = false;
            tracing::warn!(group = %self.title, "task group timed out after {:?}", timeout);
            events.send_event(EngineEvent::TaskGroupTimedOut {
                title: self.title.clone(),
                timeout,
            });
            cancel.cancel();
            drain(&mut units, scope.env.cancel_grace).await;
        }

        let duration = started.elapsed();
        if success {
            tracing::info!(group = %self.title, "task group succeeded in {:?}", duration);
        } else {
            tracing::error!(group = %self.title, "task group failed after {:?}", duration);
        }
        events.send_event(EngineEvent::group_completed(&self.title, success, duration));
        success
    }
}

fn unit_succeeded(result: Result<bool, JoinError>) -> bool {
    match result {
        Ok(success) => success,
        Err(e) => {
            tracing::error!("task unit ended abnormally: {}", e);
            false
        }
    }
}

/// Wait for cancelled units to wind down, aborting whatever outlives `grace`
async fn drain(units: &mut JoinSet<bool>, grace: Duration) {
    let finished = tokio::time::timeout(grace, async {
        while units.join_next().await.is_some() {}
    })
    .await;

    if finished.is_err() {
        tracing::warn!("aborting {} task(s) still running after cancellation", units.len());
        units.abort_all();
        while units.join_next().await.is_some() {}
    }
}

/// Tasks executed one after another on a single unit of work
struct Unit {
    group: String,
    tasks: Vec<Arc<Task>>,
    store: VariableStore,
    scope: RunScope,
    cancel: CancellationToken,
}

impl Unit {
    async fn run(self) -> bool {
        let mut success = true;
        for task in &self.tasks {
            if self.cancel.is_cancelled() {
                return false;
            }
            success &= self.run_task(task).await;
        }
        success
    }

    /// Run every invocation of `task`; true when all of them succeeded
    async fn run_task(&self, task: &Task) -> bool {
        let pool = Arc::clone(&self.scope.env.pool);
        let _permit = tokio::select! {
            permit = pool.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return false,
            },
            _ = self.cancel.cancelled() => return false,
        };

        // Declared state at the start of every group run, carried across entries
        let mut variable = task.variable.clone();

        if task.with_values.is_empty() {
            return self.invoke(task, None, &mut variable).await;
        }

        let mut success = true;
        for (index, entry) in task.with_values.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return false;
            }
            success &= self.invoke(task, Some((index, entry)), &mut variable).await;
        }
        success
    }

    /// One invocation: render, execute, extract, then publish the variable
    async fn invoke(
        &self,
        task: &Task,
        entry: Option<(usize, &Value)>,
        variable: &mut Variable,
    ) -> bool {
        let started = Instant::now();
        let snapshot = self.store.lock().await.clone();
        let context = TemplateContext::new(&self.scope.model)
            .with_variables(&snapshot)
            .with_matrix(self.scope.matrix.as_deref());

        let title = match render(&task.title, &context) {
            Ok(title) => title,
            Err(e) => {
                tracing::debug!("cannot render title '{}': {}", task.title, e);
                task.title.clone()
            }
        };
        tracing::info!(group = %self.group, task = %title, kind = task.type_name(), "running task");

        let events = &self.scope.env.events;
        events.send_event(EngineEvent::task_started(
            &self.group,
            &title,
            entry.map(|(index, _)| index),
        ));

        let success = match self.execute(task, entry, context).await {
            Ok(output) => {
                if !variable.set_value(&output.text) {
                    tracing::debug!(
                        variable = %variable.name,
                        "output did not match '{}', keeping previous value",
                        variable.regex
                    );
                }
                if !output.success {
                    tracing::error!(group = %self.group, task = %title, "task failed");
                }
                output.success
            }
            Err(EngineError::Task(TaskError::Cancelled)) => {
                tracing::warn!(group = %self.group, task = %title, "task cancelled");
                events.send_event(EngineEvent::task_completed(
                    &self.group,
                    &title,
                    false,
                    started.elapsed(),
                ));
                return false;
            }
            Err(e) => {
                tracing::error!(group = %self.group, task = %title, "{}", e);
                events.send_event(EngineEvent::error(Some(self.group.clone()), e.to_string()));
                false
            }
        };

        self.store
            .lock()
            .await
            .insert(variable.name.clone(), variable.clone());
        events.send_event(EngineEvent::variable_set(
            &self.group,
            &variable.name,
            variable.value(),
        ));
        events.send_event(EngineEvent::task_completed(
            &self.group,
            &title,
            success,
            started.elapsed(),
        ));
        success
    }

    async fn execute(
        &self,
        task: &Task,
        entry: Option<(usize, &Value)>,
        context: TemplateContext<'_>,
    ) -> EngineResult<TaskOutput> {
        let runner = &self.scope.env.runner;
        match entry {
            None => Ok(runner.run(&task.kind, &context, &self.cancel).await?),
            Some((index, value)) => {
                // Entries see model, variables and matrix but never another entry
                let rendered = value.try_map_strings(&mut |text| render(text, &context))?;
                let context = context.with_entry(index, &rendered);
                Ok(runner.run(&task.kind, &context, &self.cancel).await?)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::execution::config::ExecutorConfig;
    use crate::execution::context::ExecutionEnv;
    use crate::execution::events::{progress_channel, ProgressReceiver};
    use tempfile::TempDir;

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn scope_in(dir: &TempDir) -> (RunScope, ProgressReceiver) {
        let (tx, rx) = progress_channel();
        let config = ExecutorConfig::default()
            .with_working_dir(dir.path())
            .with_max_parallel_tasks(4)
            .with_cancel_grace(Duration::from_secs(1));
        let env = ExecutionEnv::new(&config).with_events(tx);
        (RunScope::new(env, Arc::new(Value::empty_map())), rx)
    }

    fn variable_values(rx: &mut ProgressReceiver) -> Vec<String> {
        let mut values = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let EngineEvent::VariableSet { value, .. } = event {
                values.push(value);
            }
        }
        values
    }

    fn names_group(parallel: bool) -> TaskGroup {
        TaskGroup::new("names", parallel)
            .with_task(
                Task::shell("echo Gandalf")
                    .with_tag("first")
                    .with_variable(Variable::new("name1")),
            )
            .with_task(
                Task::shell("echo Frodo")
                    .with_tag("second")
                    .with_variable(Variable::new("name2")),
            )
    }

    #[tokio::test]
    async fn test_sequential_group_sets_variables() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);
        let group = names_group(false);

        assert!(group.run(&tags(&[]), Duration::from_secs(30), &scope).await);

        let variables = group.variables().await;
        assert_eq!(variables.len(), 2);
        assert_eq!(variables["name1"].value(), "Gandalf");
        assert_eq!(variables["name2"].value(), "Frodo");
    }

    #[tokio::test]
    async fn test_tag_filter_runs_matching_tasks_only() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);
        let group = names_group(false);

        assert!(group.run(&tags(&["first"]), Duration::from_secs(30), &scope).await);

        let variables = group.variables().await;
        assert_eq!(variables.len(), 1);
        assert_eq!(variables["name1"].value(), "Gandalf");
    }

    #[tokio::test]
    async fn test_store_is_reset_between_runs() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);
        let group = names_group(false);

        assert!(group.run(&tags(&[]), Duration::from_secs(30), &scope).await);
        assert!(group.run(&tags(&["second"]), Duration::from_secs(30), &scope).await);

        let variables = group.variables().await;
        assert!(!variables.contains_key("name1"));
        assert_eq!(variables["name2"].value(), "Frodo");
    }

    #[tokio::test]
    async fn test_later_task_reads_earlier_variable() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);
        let group = TaskGroup::new("chain", false)
            .with_task(Task::shell("echo Gandalf").with_variable(Variable::new("wizard")))
            .with_task(
                Task::shell("echo \"{{ variables.wizard.value }} the Grey\"")
                    .with_variable(Variable::new("title")),
            );

        assert!(group.run(&tags(&[]), Duration::from_secs(30), &scope).await);
        assert_eq!(group.variables().await["title"].value(), "Gandalf the Grey");
    }

    #[tokio::test]
    async fn test_sequential_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);
        let group = TaskGroup::new("failing", false)
            .with_task(Task::shell("exit 1").with_variable(Variable::new("first")))
            .with_task(Task::shell("echo still running").with_variable(Variable::new("second")));

        assert!(!group.run(&tags(&[]), Duration::from_secs(30), &scope).await);
        assert_eq!(group.variables().await["second"].value(), "still running");
    }

    #[tokio::test]
    async fn test_empty_selection_succeeds() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);

        assert!(TaskGroup::new("empty", false).run(&tags(&[]), Duration::from_secs(1), &scope).await);
        assert!(names_group(true).run(&tags(&["none"]), Duration::from_secs(1), &scope).await);
    }

    #[tokio::test]
    async fn test_with_fan_out_events() {
        let dir = TempDir::new().unwrap();
        let (tx, mut rx) = progress_channel();
        let mut attributes = BTreeMap::new();
        attributes.insert("test1".to_string(), Value::from("hello world 1!"));
        let config = ExecutorConfig::default().with_working_dir(dir.path());
        let scope = RunScope::new(
            ExecutionEnv::new(&config).with_events(tx),
            Arc::new(Value::from(attributes)),
        );

        let group = TaskGroup::new("fan-out", false)
            .with_task(Task::shell("echo \"{{ with.value }}\"").with_values(vec![
                Value::from("hello world 1!"),
                Value::from("hello world 2!"),
                Value::from("hello world 3!"),
            ]))
            .with_task(Task::shell("echo \"{{ with.value }}\"").with_values(vec![
                Value::from("{{ model.attributes.test1 }}"),
                Value::from("hello world 4!"),
            ]));

        assert!(group.run(&tags(&[]), Duration::from_secs(30), &scope).await);
        assert_eq!(
            variable_values(&mut rx),
            vec![
                "hello world 1!",
                "hello world 2!",
                "hello world 3!",
                "hello world 1!",
                "hello world 4!",
            ]
        );
    }

    #[tokio::test]
    async fn test_fan_out_keeps_value_on_mismatch() {
        let dir = TempDir::new().unwrap();
        let (scope, mut rx) = scope_in(&dir);
        let group = TaskGroup::new("regex", false).with_task(
            Task::shell("echo \"{{ with.value }}\"")
                .with_values(vec![Value::from("version 1.2"), Value::from("no digits")])
                .with_variable(Variable::new("version").with_regex(r"\d+\.\d+")),
        );

        assert!(group.run(&tags(&[]), Duration::from_secs(30), &scope).await);
        assert_eq!(variable_values(&mut rx), vec!["1.2", "1.2"]);
    }

    #[tokio::test]
    async fn test_render_error_fails_invocation() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);
        let group = TaskGroup::new("broken", false)
            .with_task(Task::shell("echo {{ model.name | shout }}").with_variable(Variable::new("out")));

        assert!(!group.run(&tags(&[]), Duration::from_secs(30), &scope).await);
        assert_eq!(group.variables().await["out"].value(), "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_tasks_overlap() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);
        let group = TaskGroup::new("parallel", true)
            .with_task(Task::shell("sleep 1; echo a").with_variable(Variable::new("a")))
            .with_task(Task::shell("sleep 1; echo b").with_variable(Variable::new("b")))
            .with_task(Task::shell("sleep 1; echo c").with_variable(Variable::new("c")));

        let started = Instant::now();
        assert!(group.run(&tags(&[]), Duration::from_secs(30), &scope).await);

        assert!(started.elapsed() < Duration::from_millis(2500));
        let variables = group.variables().await;
        assert_eq!(variables["a"].value(), "a");
        assert_eq!(variables["c"].value(), "c");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_failure_fails_group() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);
        let group = TaskGroup::new("parallel", true)
            .with_task(Task::shell("echo ok"))
            .with_task(Task::shell("exit 2"));

        assert!(!group.run(&tags(&[]), Duration::from_secs(30), &scope).await);
    }

    #[tokio::test]
    async fn test_unbounded_timeout_runs_group() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);

        assert!(names_group(false).run(&tags(&[]), Duration::MAX, &scope).await);
        assert!(names_group(true).run(&tags(&[]), Duration::MAX, &scope).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_bounds_parallel_tasks() {
        let dir = TempDir::new().unwrap();
        let config = ExecutorConfig::default()
            .with_working_dir(dir.path())
            .with_max_parallel_tasks(1);
        let scope = RunScope::new(ExecutionEnv::new(&config), Arc::new(Value::empty_map()));
        let group = TaskGroup::new("bounded", true)
            .with_task(Task::shell("sleep 1").with_variable(Variable::new("a")))
            .with_task(Task::shell("sleep 1").with_variable(Variable::new("b")))
            .with_task(Task::shell("sleep 1").with_variable(Variable::new("c")));

        let started = Instant::now();
        assert!(group.run(&tags(&[]), Duration::from_secs(30), &scope).await);

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(group.variables().await.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_writers_share_one_entry() {
        let dir = TempDir::new().unwrap();
        let (scope, _rx) = scope_in(&dir);
        let group = TaskGroup::new("shared", true)
            .with_task(Task::shell("echo left").with_variable(Variable::new("side")))
            .with_task(Task::shell("echo right").with_variable(Variable::new("side")));

        assert!(group.run(&tags(&[]), Duration::from_secs(30), &scope).await);

        let variables = group.variables().await;
        assert_eq!(variables.len(), 1);
        let value = variables["side"].value();
        assert!(value == "left" || value == "right", "unexpected value {}", value);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_kills_background_children() {
        let dir = TempDir::new().unwrap();
        let config = ExecutorConfig::default()
            .with_working_dir(dir.path())
            .with_cancel_grace(Duration::from_millis(500));
        let scope = RunScope::new(ExecutionEnv::new(&config), Arc::new(Value::empty_map()));
        let marker = dir.path().join("marker");
        let group = TaskGroup::new("detached", false).with_task(Task::shell(format!(
            "(sleep 3; touch {}) & echo started",
            marker.display()
        )));

        let started = Instant::now();
        assert!(!group.run(&tags(&[]), Duration::from_millis(500), &scope).await);
        assert!(started.elapsed() < Duration::from_secs(3));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!marker.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_kills_process() {
        let dir = TempDir::new().unwrap();
        let (scope, mut rx) = scope_in(&dir);
        let marker = dir.path().join("marker");
        let group = TaskGroup::new("slow", false)
            .with_task(Task::shell(format!("sleep 2; touch {}", marker.display())))
            .with_task(Task::shell("echo never").with_variable(Variable::new("after")));

        let started = Instant::now();
        assert!(!group.run(&tags(&[]), Duration::from_millis(300), &scope).await);
        assert!(started.elapsed() < Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!marker.exists());
        assert!(!group.variables().await.contains_key("after"));

        let mut timed_out = false;
        while let Ok(event) = rx.try_recv() {
            timed_out |= matches!(event, EngineEvent::TaskGroupTimedOut { .. });
        }
        assert!(timed_out);
    }
}

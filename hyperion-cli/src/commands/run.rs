use crate::output;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use color_eyre::Result;

use hyperion_engine::{
    progress_channel, DocumentExecutor, DocumentParameters, DocumentReader, EngineEvent,
    ExecutorConfig,
};

/// Run a hyperion document locally
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the document YAML file
    pub document: PathBuf,

    /// Run only tasks carrying this tag (can be repeated)
    #[arg(long = "tag", short = 't', value_name = "TAG")]
    pub tags: Vec<String>,

    /// Deadline of each task group in minutes
    #[arg(long, value_name = "MINUTES")]
    pub timeout: Option<u64>,

    /// Working directory for execution
    #[arg(long, short = 'w', value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Maximum number of tasks running at once
    #[arg(long, value_name = "N", env = "HYPERION_MAX_PARALLEL")]
    pub max_parallel: Option<usize>,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let document_path = &args.document;

    output::status("Reading", &format!("{}", document_path.display()));
    let document = match DocumentReader::read_file(document_path) {
        Ok(document) => document,
        Err(e) => {
            output::error(&e.to_string());
            output::failure("Document failed before any task ran");
            std::process::exit(1);
        }
    };

    let mut config = ExecutorConfig::default();
    if let Some(dir) = args.working_dir {
        config = config.with_working_dir(dir);
    }
    if let Some(max) = args.max_parallel {
        config = config.with_max_parallel_tasks(max);
    }

    let parameters = match args.timeout {
        Some(minutes) => DocumentParameters::new(args.tags, minutes),
        None => DocumentParameters::new(args.tags, 0).with_timeout(config.default_timeout),
    };
    if !parameters.tags.is_empty() {
        let tags: Vec<_> = parameters.tags.iter().map(String::as_str).collect();
        output::info(&format!("Selecting tags: {}", tags.join(", ")));
    }

    // Create progress channel and executor
    let (tx, mut rx) = progress_channel();
    let executor = DocumentExecutor::with_config(config).with_progress(tx);

    // Spawn execution in background
    let exec_handle =
        tokio::spawn(async move { executor.execute(&document, &parameters).await });

    // Process events in the foreground
    while let Some(event) = rx.recv().await {
        match &event {
            EngineEvent::DocumentStarted {
                total_groups,
                iterations,
            } => {
                println!();
                output::header(&format!(
                    "Document '{}' ({} groups, {} iterations)",
                    document_path.display(),
                    total_groups,
                    iterations
                ));
            }

            EngineEvent::DocumentCompleted { success, duration } => {
                println!();
                if *success {
                    output::success(&format!(
                        "Document completed successfully in {:.2}s",
                        duration.as_secs_f64()
                    ));
                } else {
                    output::failure(&format!(
                        "Document failed after {:.2}s",
                        duration.as_secs_f64()
                    ));
                }
            }

            EngineEvent::IterationStarted { title } => {
                if let Some(title) = title {
                    output::iteration(title);
                }
            }

            EngineEvent::TaskGroupStarted {
                title,
                parallel,
                selected_tasks,
            } => {
                output::group_header(title, *parallel, *selected_tasks);
            }

            EngineEvent::TaskGroupCompleted {
                title,
                success,
                duration,
            } => {
                let line = format!(
                    "  Group '{}' {} ({:.2}s)",
                    title,
                    if *success { "OK" } else { "FAIL" },
                    duration.as_secs_f64()
                );
                if *success {
                    output::dim_success(&line);
                } else {
                    output::dim_failure(&line);
                }
            }

            EngineEvent::TaskGroupTimedOut { title, timeout } => {
                output::warning(&format!(
                    "  Group '{}' timed out after {}",
                    title,
                    format_timeout(*timeout)
                ));
            }

            EngineEvent::TaskStarted {
                title, with_index, ..
            } => match with_index {
                Some(index) => println!("    [{}] {}", index + 1, title),
                None => println!("    {}", title),
            },

            EngineEvent::TaskCompleted {
                title,
                success,
                duration,
                ..
            } => {
                let line = format!(
                    "      {} {} ({:.2}s)",
                    title,
                    if *success { "OK" } else { "FAIL" },
                    duration.as_secs_f64()
                );
                if *success {
                    output::dim_success(&line);
                } else {
                    output::dim_failure(&line);
                }
            }

            EngineEvent::VariableSet { name, value, .. } => {
                output::dim(&format!("      [var] {} = {}", name, value));
            }

            EngineEvent::Error { group, message } => match group {
                Some(group) => output::error(&format!("[{}] {}", group, message)),
                None => output::error(message),
            },
        }
    }

    // Wait for executor to finish
    let result = exec_handle.await?;

    if !result.success {
        std::process::exit(1);
    }

    Ok(())
}

fn format_timeout(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

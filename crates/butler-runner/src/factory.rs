//! Task creation: one task per (step, language, dirty workspace).
//!
//! Steps emit in their build order, so the queue holds every Lint task
//! before any Test task, and so on. Within a step, languages emit in config
//! order and workspaces in scan order.

use tracing::info;

use butler_core::{BuildStep, ButlerConfig};

use crate::queue::TaskQueue;
use crate::task::{Task, DEFAULT_RETRIES};

/// Placeholder replaced by the workspace location in command templates.
const WORKSPACE_TOKEN: &str = "%w";

/// Build the run's task queue from the finalized config.
///
/// A workspace produces a task for a step when the step's flag is enabled,
/// the workspace is dirty (or the run is in run-all mode), and the language
/// has a non-empty command template for that step.
pub fn populate_queue(config: &ButlerConfig, run_all: bool) -> TaskQueue {
    let mut queue = TaskQueue::new();

    for step in BuildStep::ORDERED {
        if !config.task.enabled(step) {
            continue;
        }
        for lang in &config.languages {
            let template = lang.task_commands.for_step(step);
            if template.is_empty() {
                continue;
            }
            for workspace in &lang.workspaces {
                if !(workspace.is_dirty || run_all) {
                    continue;
                }
                let command = template.replace(WORKSPACE_TOKEN, &workspace.location);
                queue.enqueue(Task::new(
                    workspace.location.clone(),
                    lang.name.clone(),
                    workspace.location.clone(),
                    step,
                    command,
                    DEFAULT_RETRIES,
                ));
            }
        }
    }

    info!(tasks = queue.len(), run_all = run_all, "task queue populated");
    queue
}

#[cfg(test)]
mod tests {
    use super::*;
    use butler_core::{Language, TaskCommands, TaskFlags, Workspace};

    fn config_with(languages: Vec<Language>, flags: TaskFlags) -> ButlerConfig {
        ButlerConfig {
            task: flags,
            languages,
            ..ButlerConfig::default()
        }
    }

    fn language(name: &str, commands: TaskCommands, workspaces: Vec<Workspace>) -> Language {
        Language {
            name: name.to_string(),
            workspace_files: vec![".go".to_string()],
            task_commands: commands,
            workspaces,
            ..Language::default()
        }
    }

    fn dirty(location: &str) -> Workspace {
        Workspace {
            location: location.to_string(),
            is_dirty: true,
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_workspace_token_substitution() {
        let lang = language(
            "golang",
            TaskCommands {
                test: "echo %w".to_string(),
                ..TaskCommands::default()
            },
            vec![dirty("./a")],
        );
        let flags = TaskFlags {
            test: true,
            ..TaskFlags::default()
        };

        let queue = populate_queue(&config_with(vec![lang], flags), false);
        let tasks: Vec<Task> = queue.into_iter().collect();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].command, "echo ./a");
        assert_eq!(tasks[0].path, "./a");
        assert_eq!(tasks[0].step, BuildStep::Test);
        assert_eq!(tasks[0].retries, 0);
    }

    #[test]
    fn test_step_major_ordering() {
        let lang = language(
            "golang",
            TaskCommands {
                lint: "lint %w".to_string(),
                test: "test %w".to_string(),
                build: "build %w".to_string(),
                ..TaskCommands::default()
            },
            vec![dirty("./a"), dirty("./b")],
        );
        let flags = TaskFlags {
            lint: true,
            test: true,
            build: true,
            ..TaskFlags::default()
        };

        let queue = populate_queue(&config_with(vec![lang], flags), false);
        let steps: Vec<BuildStep> = queue.iter().map(|t| t.step).collect();
        let mut sorted = steps.clone();
        sorted.sort();
        assert_eq!(steps, sorted, "steps must enqueue in build order");
        assert_eq!(steps.len(), 6);
    }

    #[test]
    fn test_clean_workspace_skipped_unless_run_all() {
        let clean = Workspace {
            location: "./c".to_string(),
            is_dirty: false,
            dependencies: Vec::new(),
        };
        let lang = language(
            "golang",
            TaskCommands {
                test: "test %w".to_string(),
                ..TaskCommands::default()
            },
            vec![clean],
        );
        let flags = TaskFlags {
            test: true,
            ..TaskFlags::default()
        };
        let config = config_with(vec![lang], flags);

        assert!(populate_queue(&config, false).is_empty());
        assert_eq!(populate_queue(&config, true).len(), 1);
    }

    #[test]
    fn test_empty_template_emits_nothing() {
        let lang = language("golang", TaskCommands::default(), vec![dirty("./a")]);
        let flags = TaskFlags {
            lint: true,
            test: true,
            build: true,
            publish: true,
            ..TaskFlags::default()
        };
        assert!(populate_queue(&config_with(vec![lang], flags), true).is_empty());
    }

    #[test]
    fn test_disabled_step_emits_nothing_even_in_run_all() {
        let lang = language(
            "golang",
            TaskCommands {
                publish: "publish %w".to_string(),
                ..TaskCommands::default()
            },
            vec![dirty("./a")],
        );
        let flags = TaskFlags::default();
        assert!(populate_queue(&config_with(vec![lang], flags), true).is_empty());
    }

    #[test]
    fn test_language_order_preserved_within_step() {
        let first = language(
            "golang",
            TaskCommands {
                test: "go test %w".to_string(),
                ..TaskCommands::default()
            },
            vec![dirty("./a")],
        );
        let second = language(
            "python",
            TaskCommands {
                test: "pytest %w".to_string(),
                ..TaskCommands::default()
            },
            vec![dirty("./b")],
        );
        let flags = TaskFlags {
            test: true,
            ..TaskFlags::default()
        };

        let queue = populate_queue(&config_with(vec![first, second], flags), false);
        let languages: Vec<String> = queue.into_iter().map(|t| t.language).collect();
        assert_eq!(languages, vec!["golang", "python"]);
    }
}

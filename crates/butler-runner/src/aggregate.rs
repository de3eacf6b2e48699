//! Run status classification and error aggregation.

use butler_core::BuildStatus;

use crate::task::Task;

/// Classify the run from its task outcomes.
///
/// Clean: every task passed on its first attempt. Dirty: every task passed
/// but at least one needed more than one attempt. Fail: any task carries a
/// terminal error (classification stops at the first).
pub fn status_from_tasks(tasks: &[Task]) -> BuildStatus {
    let mut status = BuildStatus::Clean;
    for task in tasks {
        if task.attempts > 1 {
            status = BuildStatus::Dirty;
        }
        if task.error.is_some() {
            status = BuildStatus::Fail;
            break;
        }
    }
    status
}

/// Join the terminal errors of failed tasks, first error kept in front.
pub fn run_error(tasks: &[Task]) -> Option<String> {
    let failures: Vec<String> = tasks
        .iter()
        .filter_map(|task| {
            task.error
                .as_ref()
                .map(|err| format!("{}: {}", task.name, err))
        })
        .collect();
    if failures.is_empty() {
        None
    } else {
        Some(failures.join("; "))
    }
}

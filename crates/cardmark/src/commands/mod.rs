use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use cardmark_app::{MoveTask, NewTask, RepoEvent, Repository};
use cardmark_core::{Task, TaskId};
use cardmark_store_fs::Storage;
use tokio::sync::broadcast::error::RecvError;

use crate::{Command, LsFormat};

pub async fn run<S: Storage>(repo: &Repository<S>, command: Command) -> Result<()> {
    match command {
        Command::Lists => {
            for snapshot in repo.lists()? {
                let mut flags = String::new();
                if snapshot.list.hidden {
                    flags.push_str(" (hidden)");
                }
                if let Some(filter) = &snapshot.list.filter {
                    flags.push_str(&format!(" [filter: {filter}]"));
                }
                println!("{}\t{}{flags}", snapshot.list.name, snapshot.tasks.len());
            }
        }
        Command::Ls { list, format } => {
            let tasks = match list {
                Some(name) => {
                    if repo.config().find_list(&name).is_none() {
                        bail!("list '{name}' is not configured");
                    }
                    repo.get_tasks_in_list(&name)?
                }
                None => repo
                    .lists()?
                    .into_iter()
                    .filter(|snapshot| !snapshot.list.hidden && !snapshot.list.is_virtual())
                    .flat_map(|snapshot| snapshot.tasks)
                    .collect(),
            };
            match format {
                LsFormat::Table => {
                    for task in &tasks {
                        println!("{}", task_row(task));
                    }
                }
                LsFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
            }
        }
        Command::Mv {
            task,
            list,
            position,
        } => {
            let id = resolve_task(repo, &task)?;
            let position = match position {
                Some(position) => position,
                None => repo.get_tasks_in_list(&list)?.len(),
            };
            let moved = repo
                .move_task(MoveTask {
                    task: id,
                    list,
                    position,
                })
                .await?;
            println!("moved: {}", task_row(&moved));
        }
        Command::Add {
            list,
            text,
            to,
            order,
            description,
        } => {
            let added = repo
                .add_task(NewTask {
                    list,
                    text,
                    description,
                    path: to,
                    order,
                })
                .await?;
            println!("added: {}", task_row(&added));
        }
        Command::Watch => watch(repo).await?,
    }
    Ok(())
}

async fn watch<S: Storage>(repo: &Repository<S>) -> Result<()> {
    let handle = repo.watch()?;
    let mut events = repo.subscribe();
    println!("watching {} (ctrl-c to stop)", repo.storage().root().display());
    let report = async {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", event_row(&event)),
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "Dropped events"),
                Err(RecvError::Closed) => break,
            }
        }
    };
    tokio::select! {
        () = repo.run_watch(handle) => {}
        () = report => {}
        signal = tokio::signal::ctrl_c() => signal.context("failed to listen for ctrl-c")?,
    }
    Ok(())
}

/// Accept a full task id or `path:line` of a task title.
fn resolve_task<S: Storage>(repo: &Repository<S>, raw: &str) -> Result<TaskId> {
    let id = match raw.parse::<TaskId>() {
        Ok(id) => id,
        Err(_) => {
            let (path, line) = raw
                .rsplit_once(':')
                .ok_or_else(|| anyhow!("expected a task id or path:line, got '{raw}'"))?;
            let line: usize = line
                .parse()
                .with_context(|| format!("invalid line number in '{raw}'"))?;
            TaskId::from_location(Path::new(path), line)
        }
    };
    if repo.find_task(id)?.is_none() {
        bail!("no task found for '{raw}'");
    }
    Ok(id)
}

fn task_row(task: &Task) -> String {
    let order = task
        .order
        .map_or_else(|| "-".to_owned(), |order| order.to_string());
    format!(
        "{}\t{}\t{}:{}\t{order}\t{}",
        task.id,
        task.list,
        task.path().display(),
        task.line,
        task.text
    )
}

fn event_row(event: &RepoEvent) -> String {
    match event {
        RepoEvent::FileSaved(path) | RepoEvent::FileUpdate(path) => {
            format!("{}\t{}", event.name(), path.display())
        }
        RepoEvent::TaskFound { id, list, path } => {
            format!("{}\t{list}\t{}\t{id}", event.name(), path.display())
        }
        RepoEvent::ListFound { list, count } => format!("{}\t{list}\t{count}", event.name()),
    }
}

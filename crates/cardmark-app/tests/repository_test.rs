//! Integration tests for the watch-driven repository.

use anyhow::Result;
use cardmark_app::{Lifecycle, MoveTask, NewTask, RepoError, RepoEvent, Repository};
use cardmark_core::{Config, ListConfig, Task};
use cardmark_plugins::{Plugin, PluginError, PluginRegistry, PluginsConfig, TaskDraft};
use cardmark_store_fs::{FsStorage, StorageEvent};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::{TempDir, tempdir};

fn project(files: &[(&str, &str)]) -> Result<TempDir> {
    let dir = tempdir()?;
    for (path, content) in files {
        let abs = dir.path().join(path);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(abs, content)?;
    }
    Ok(dir)
}

fn repository(dir: &TempDir, config: Config) -> Result<Repository<FsStorage>> {
    let storage = FsStorage::new(dir.path(), &config.exclude)?;
    Ok(Repository::new(storage, config, PluginRegistry::default()))
}

fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|task| task.text.as_str()).collect()
}

fn set_mtime(path: &Path, time: SystemTime) -> Result<()> {
    let file = fs::OpenOptions::new().write(true).open(path)?;
    file.set_modified(time)?;
    Ok(())
}

#[tokio::test]
async fn init_indexes_text_and_code_files() -> Result<()> {
    let dir = project(&[
        ("board.md", "#TODO:20 second\n#TODO:10 first\n\n#DOING busy\n"),
        ("src/lib.rs", "// #TODO:30 third\nfn f() {}\n"),
        ("logo.bin", "\0\u{1}\u{2}"),
        ("node_modules/x.md", "#TODO hidden\n"),
    ])?;
    let repo = repository(&dir, Config::default())?;
    let report = repo.init().await?;

    assert_eq!(repo.lifecycle()?, Lifecycle::Ready);
    assert_eq!(report.tasks, 4);
    assert!(report.failed.is_empty());
    assert_eq!(titles(&repo.get_tasks_in_list("TODO")?), ["first", "second", "third"]);
    assert_eq!(titles(&repo.get_tasks_in_list("DOING")?), ["busy"]);
    assert!(repo.get_tasks_in_list("DONE")?.is_empty());

    let binary = repo
        .file(Path::new("logo.bin"))?
        .unwrap_or_else(|| panic!("binary file must be indexed"));
    assert!(binary.binary);
    assert!(binary.tasks.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_init_fails_fast() -> Result<()> {
    let dir = project(&[("a.md", "#TODO a\n")])?;
    let repo = repository(&dir, Config::default())?;

    let (first, second) = tokio::join!(repo.init(), repo.init());
    assert!(first.is_ok());
    assert!(matches!(second, Err(RepoError::Busy(Lifecycle::Initializing))));
    assert_eq!(repo.lifecycle()?, Lifecycle::Ready);
    Ok(())
}

#[tokio::test]
async fn refresh_requires_a_first_scan() -> Result<()> {
    let dir = project(&[("a.md", "#TODO a\n")])?;
    let repo = repository(&dir, Config::default())?;
    assert!(matches!(repo.refresh().await, Err(RepoError::NotReady(Lifecycle::Idle))));

    repo.init().await?;
    fs::write(dir.path().join("b.md"), "#TODO b\n")?;
    let report = repo.refresh().await?;
    assert_eq!(report.tasks, 2);

    repo.destroy()?;
    assert!(matches!(repo.refresh().await, Err(RepoError::Destroyed)));
    Ok(())
}

#[tokio::test]
async fn destroy_during_a_scan_discards_its_results() -> Result<()> {
    let dir = project(&[("a.md", "#TODO a\n"), ("b.md", "#TODO b\n")])?;
    let repo = repository(&dir, Config::default())?;

    let (scan, destroyed) = tokio::join!(repo.init(), async { repo.destroy() });
    destroyed?;
    assert!(matches!(scan, Err(RepoError::Destroyed)));
    assert_eq!(repo.lifecycle()?, Lifecycle::Destroyed);
    assert!(repo.get_tasks_in_list("TODO")?.is_empty());
    assert!(repo.file(Path::new("a.md"))?.is_none());
    Ok(())
}

#[tokio::test]
async fn move_within_a_list_keeps_the_others_in_place() -> Result<()> {
    let dir = project(&[("board.md", "#TODO:10 a\n#TODO:20 b\n#TODO:30 c\n#TODO:40 d\n")])?;
    let repo = repository(&dir, Config::default())?;
    repo.init().await?;

    let d = repo.get_tasks_in_list("TODO")?[3].clone();
    let moved = repo
        .move_task(MoveTask {
            task: d.id,
            list: "TODO".into(),
            position: 1,
        })
        .await?;
    assert_eq!(moved.order, Some(15.0));
    assert_eq!(titles(&repo.get_tasks_in_list("TODO")?), ["a", "d", "b", "c"]);
    assert_eq!(
        fs::read_to_string(dir.path().join("board.md"))?,
        "#TODO:10 a\n#TODO:20 b\n#TODO:30 c\n#TODO:15 d\n"
    );

    let a = repo.get_tasks_in_list("TODO")?[0].clone();
    repo.move_task(MoveTask {
        task: a.id,
        list: "TODO".into(),
        position: 3,
    })
    .await?;
    assert_eq!(titles(&repo.get_tasks_in_list("TODO")?), ["d", "b", "c", "a"]);
    Ok(())
}

#[tokio::test]
async fn move_into_an_equal_order_group_lands_at_the_position() -> Result<()> {
    let dir = project(&[("board.md", "#TODO:10 m\n#TODO:10 n\n#TODO z\n")])?;
    let repo = repository(&dir, Config::default())?;
    repo.init().await?;

    let z = repo.get_tasks_in_list("TODO")?[2].clone();
    repo.move_task(MoveTask {
        task: z.id,
        list: "TODO".into(),
        position: 1,
    })
    .await?;
    assert_eq!(titles(&repo.get_tasks_in_list("TODO")?), ["m", "z", "n"]);
    assert_eq!(
        fs::read_to_string(dir.path().join("board.md"))?,
        "#TODO:10 m\n#TODO:30 n\n#TODO:20 z\n"
    );

    repo.refresh().await?;
    assert_eq!(titles(&repo.get_tasks_in_list("TODO")?), ["m", "z", "n"]);
    Ok(())
}

#[tokio::test]
async fn move_across_lists_rewrites_the_token() -> Result<()> {
    let dir = project(&[("board.md", "#TODO:10 a\nbody\n\n\n[b](#TODO:20)\n")])?;
    let repo = repository(&dir, Config::default())?;
    repo.init().await?;

    let b = repo.get_tasks_in_list("TODO")?[1].clone();
    let moved = repo
        .move_task(MoveTask {
            task: b.id,
            list: "DOING".into(),
            position: 0,
        })
        .await?;
    assert_eq!(moved.list, "DOING");
    assert_eq!(moved.order, Some(0.0));
    assert_eq!(
        fs::read_to_string(dir.path().join("board.md"))?,
        "#TODO:10 a\nbody\n\n\n[b](#DOING:0)\n"
    );
    assert_eq!(titles(&repo.get_tasks_in_list("TODO")?), ["a"]);

    let err = repo
        .move_task(MoveTask {
            task: moved.id,
            list: "NOPE".into(),
            position: 0,
        })
        .await;
    assert!(matches!(err, Err(RepoError::UnknownList(name)) if name == "NOPE"));
    Ok(())
}

#[tokio::test]
async fn order_meta_moves_write_metadata_comments() -> Result<()> {
    let dir = project(&[("board.md", "#TODO:10 a\n#TODO:20 b\n")])?;
    let config = Config {
        order_meta: true,
        ..Config::default()
    };
    let repo = repository(&dir, config)?;
    repo.init().await?;

    let b = repo.get_tasks_in_list("TODO")?[1].clone();
    let moved = repo
        .move_task(MoveTask {
            task: b.id,
            list: "TODO".into(),
            position: 0,
        })
        .await?;
    assert_eq!(moved.order, Some(0.0));
    assert_eq!(moved.line, 3);
    // Inline literals are not orders in metadata mode, so `a` is numbered too.
    assert_eq!(
        fs::read_to_string(dir.path().join("board.md"))?,
        "#TODO: a\n<!-- order:10 -->\n#TODO: b\n<!-- order:0 -->\n"
    );
    assert_eq!(titles(&repo.get_tasks_in_list("TODO")?), ["b", "a"]);
    Ok(())
}

#[tokio::test]
async fn modify_task_can_defer_the_write() -> Result<()> {
    let dir = project(&[("board.md", "#TODO:10 old title\n")])?;
    let repo = repository(&dir, Config::default())?;
    repo.init().await?;

    let mut task = repo.get_tasks_in_list("TODO")?[0].clone();
    task.text = "new title".into();
    let modified = repo.modify_task(&task, false).await?;
    assert_eq!(modified.text, "new title");
    assert_eq!(fs::read_to_string(dir.path().join("board.md"))?, "#TODO:10 old title\n");

    repo.write_file(Path::new("board.md")).await?;
    assert_eq!(fs::read_to_string(dir.path().join("board.md"))?, "#TODO:10 new title\n");
    Ok(())
}

#[tokio::test]
async fn add_and_delete_round_trip() -> Result<()> {
    let dir = project(&[])?;
    let repo = repository(&dir, Config::default())?;
    repo.init().await?;

    let added = repo
        .add_task(NewTask {
            list: "TODO".into(),
            text: "write docs".into(),
            description: vec!["with examples".into()],
            path: PathBuf::from("notes/new.md"),
            order: None,
        })
        .await?;
    assert_eq!(added.order, Some(0.0));
    assert_eq!(
        fs::read_to_string(dir.path().join("notes/new.md"))?,
        "#TODO:0 write docs\nwith examples\n"
    );

    let second = repo
        .add_task(NewTask {
            list: "TODO".into(),
            text: "second".into(),
            description: Vec::new(),
            path: PathBuf::from("notes/new.md"),
            order: None,
        })
        .await?;
    assert_eq!(second.order, Some(10.0));
    assert_eq!(second.line, 4);

    repo.delete_task(added.id).await?;
    assert_eq!(titles(&repo.get_tasks_in_list("TODO")?), ["second"]);
    assert_eq!(
        fs::read_to_string(dir.path().join("notes/new.md"))?,
        "\n#TODO:10 second\n"
    );
    Ok(())
}

#[tokio::test]
async fn add_task_frames_code_comments() -> Result<()> {
    let dir = project(&[("main.py", "print('hi')\n")])?;
    let repo = repository(&dir, Config::default())?;
    repo.init().await?;

    let added = repo
        .add_task(NewTask {
            list: "DOING".into(),
            text: "profile this".into(),
            description: Vec::new(),
            path: PathBuf::from("main.py"),
            order: Some(5.0),
        })
        .await?;
    assert_eq!(added.order, Some(5.0));
    assert_eq!(
        fs::read_to_string(dir.path().join("main.py"))?,
        "print('hi')\n# #DOING:5 profile this\n"
    );
    Ok(())
}

struct NoDone;

impl Plugin for NoDone {
    fn name(&self) -> &str {
        "no-done"
    }

    fn on_before_add_task(&self, draft: &mut TaskDraft) -> cardmark_plugins::Result<()> {
        if draft.list == "DONE" {
            return Err(PluginError::Rejected {
                plugin: self.name().into(),
                reason: "tasks start unfinished".into(),
            });
        }
        Ok(())
    }
}

#[tokio::test]
async fn plugins_can_reject_new_tasks() -> Result<()> {
    let dir = project(&[])?;
    let mut plugins = PluginRegistry::new(PluginsConfig::default());
    plugins.register(Box::new(NoDone))?;
    let storage = FsStorage::new(dir.path(), &[])?;
    let repo = Repository::new(storage, Config::default(), plugins);
    repo.init().await?;

    let err = repo
        .add_task(NewTask {
            list: "DONE".into(),
            text: "finished".into(),
            description: Vec::new(),
            path: PathBuf::from("a.md"),
            order: None,
        })
        .await;
    assert!(matches!(err, Err(RepoError::Plugin(PluginError::Rejected { .. }))));
    assert!(!dir.path().join("a.md").exists());
    Ok(())
}

#[tokio::test]
async fn virtual_lists_filter_every_task() -> Result<()> {
    let dir = project(&[
        ("a.md", "#TODO:1 fix login +urgent\n#DOING:2 refactor\n"),
        ("b.md", "#DONE:3 ship it +urgent\n"),
    ])?;
    let mut config = Config::default();
    config.lists.push(ListConfig {
        filter: Some("+urgent".into()),
        ..ListConfig::new("URGENT")
    });
    let repo = repository(&dir, config)?;
    repo.init().await?;

    let urgent = repo.get_tasks_in_list("URGENT")?;
    assert_eq!(titles(&urgent), ["fix login +urgent", "ship it +urgent"]);
    let lists = repo.lists()?;
    assert_eq!(lists.len(), 4);
    assert_eq!(lists[3].tasks.len(), 2);
    Ok(())
}

#[tokio::test]
async fn stale_watch_events_are_ignored() -> Result<()> {
    let dir = project(&[("board.md", "#TODO a\n")])?;
    let repo = repository(&dir, Config::default())?;
    repo.init().await?;
    let abs = dir.path().join("board.md");

    // Same mtime as indexed.
    assert!(!repo.handle_event(StorageEvent::Changed("board.md".into())).await?);

    fs::write(&abs, "#TODO a\n#TODO b\n")?;
    set_mtime(&abs, SystemTime::UNIX_EPOCH + Duration::from_secs(1_000))?;
    assert!(!repo.handle_event(StorageEvent::Changed("board.md".into())).await?);
    assert_eq!(repo.get_tasks_in_list("TODO")?.len(), 1);

    set_mtime(&abs, SystemTime::now() + Duration::from_secs(60))?;
    assert!(repo.handle_event(StorageEvent::Changed("board.md".into())).await?);
    assert_eq!(titles(&repo.get_tasks_in_list("TODO")?), ["a", "b"]);
    Ok(())
}

#[tokio::test]
async fn paused_watch_and_removals() -> Result<()> {
    let dir = project(&[("board.md", "#TODO a\n"), ("other.md", "#DOING b\n")])?;
    let repo = repository(&dir, Config::default())?;
    repo.init().await?;
    let mut events = repo.subscribe();

    fs::remove_file(dir.path().join("board.md"))?;
    repo.pause_watch();
    assert!(repo.is_watch_paused());
    assert!(!repo.handle_event(StorageEvent::Removed("board.md".into())).await?);
    assert_eq!(repo.get_tasks_in_list("TODO")?.len(), 1);

    repo.resume_watch();
    assert!(repo.handle_event(StorageEvent::Removed("board.md".into())).await?);
    assert!(repo.get_tasks_in_list("TODO")?.is_empty());
    assert_eq!(events.try_recv()?, RepoEvent::FileUpdate("board.md".into()));

    // Touching with identical content only refreshes the timestamp.
    let other = dir.path().join("other.md");
    set_mtime(&other, SystemTime::now() + Duration::from_secs(60))?;
    assert!(!repo.handle_event(StorageEvent::Changed("other.md".into())).await?);
    Ok(())
}

#[tokio::test]
async fn scan_publishes_task_and_list_events() -> Result<()> {
    let dir = project(&[("a.md", "#TODO a\n#TODO b\n")])?;
    let repo = repository(&dir, Config::default())?;
    let mut events = repo.subscribe();
    repo.init().await?;

    let mut names = Vec::new();
    while let Ok(event) = events.try_recv() {
        names.push(event.name());
        if let RepoEvent::ListFound { list, count } = &event {
            assert_eq!((list.as_str(), *count), ("TODO", 2));
        }
    }
    assert_eq!(names, ["task.found", "task.found", "list.found"]);
    Ok(())
}

use std::fs;

use taskflow::clock::{FixedClock, SequentialIds};
use taskflow::seed::seed_tasks;
use taskflow::{
    BackgroundStorage, FileStorage, MemoryStorage, NewTask, Priority, TaskPatch, TaskStatus,
    TaskStore,
};
use tempfile::TempDir;

fn clock() -> FixedClock {
    FixedClock::at(chrono::NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(), 12)
}

#[test]
fn reload_from_files_preserves_order() {
    let dir = TempDir::new().unwrap();

    let expected = {
        let mut store = TaskStore::new(FileStorage::new(dir.path())).with_clock(clock());
        store.load();
        store.create(NewTask::new("first")).unwrap();
        let second = store.create(NewTask::new("second")).unwrap();
        store.update_status(2, TaskStatus::Completed).unwrap();
        store.delete(4).unwrap();
        store
            .update(
                second.id,
                TaskPatch {
                    priority: Some(Priority::Urgent),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        store.tasks().to_vec()
    };

    let reloaded = TaskStore::open(FileStorage::new(dir.path()));
    assert_eq!(reloaded.tasks(), expected.as_slice());
}

#[test]
fn background_writes_reach_disk() {
    let dir = TempDir::new().unwrap();
    {
        let storage = BackgroundStorage::spawn(FileStorage::new(dir.path())).unwrap();
        let mut store = TaskStore::new(storage).with_clock(clock());
        store.load();
        for i in 0..20 {
            store.create(NewTask::new(format!("task {i}"))).unwrap();
        }
    }

    let reloaded = TaskStore::open(FileStorage::new(dir.path()));
    assert_eq!(reloaded.tasks().len(), 25);
    assert_eq!(reloaded.tasks().last().unwrap().title, "task 19");
}

#[test]
fn corrupt_file_is_replaced_by_seed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taskflow_tasks.json");
    fs::write(&path, "[{\"id\": 1, \"title\": ").unwrap();

    let store = TaskStore::open(FileStorage::new(dir.path()));
    assert_eq!(store.tasks(), seed_tasks().as_slice());

    let on_disk: Vec<taskflow::Task> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, seed_tasks());
}

#[test]
fn clear_all_removes_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taskflow_tasks.json");

    let mut store = TaskStore::open(FileStorage::new(dir.path()));
    assert!(path.exists());
    store.clear_all();
    assert!(!path.exists());
    assert_eq!(store.stats().completion_rate, 0);

    // Next session starts from the sample board again.
    let store = TaskStore::open(FileStorage::new(dir.path()));
    assert_eq!(store.tasks().len(), 5);
}

#[test]
fn custom_key_uses_its_own_slot() {
    let storage = MemoryStorage::new();
    let mut work = TaskStore::new(storage.clone()).with_key("work");
    work.load();
    work.clear_all();

    let mut home = TaskStore::new(storage.clone()).with_key("home");
    home.load();

    assert!(storage.contains("home"));
    assert!(!storage.contains("work"));
    assert_eq!(home.tasks().len(), 5);
}

#[test]
fn stats_total_matches_columns_through_a_session() {
    let mut store = TaskStore::new(MemoryStorage::new())
        .with_clock(clock())
        .with_ids(SequentialIds::default());
    store.load();

    let check = |store: &TaskStore| {
        let stats = store.stats();
        let columns: usize = TaskStatus::ALL
            .into_iter()
            .map(|s| store.list_by_status(s).len())
            .sum();
        assert_eq!(stats.total, columns);
    };

    check(&store);
    let a = store.create(NewTask::new("a")).unwrap();
    check(&store);
    store.update_status(a.id, TaskStatus::InProgress).unwrap();
    check(&store);
    store.delete(1).unwrap();
    check(&store);
    store.clear_all();
    check(&store);
    store.reset_to_seed();
    check(&store);
}

#[test]
fn failing_writes_never_reach_the_caller() {
    let storage = MemoryStorage::new();
    let mut store = TaskStore::new(storage.clone()).with_clock(clock());
    store.load();
    storage.fail_writes(true);

    let task = store.create(NewTask::new("kept")).unwrap();
    store.update_status(task.id, TaskStatus::Completed).unwrap();
    store.clear_all();
    store.reset_to_seed();
    assert_eq!(store.tasks().len(), 5);

    // The mirror still holds what was written before the fault.
    let mirror: Vec<taskflow::Task> =
        serde_json::from_slice(&storage.get("taskflow_tasks").unwrap()).unwrap();
    assert_eq!(mirror, seed_tasks());
}

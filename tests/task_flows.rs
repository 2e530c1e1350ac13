//! Task creation, editing and reminders wired together over in-memory
//! services.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::NaiveDateTime;
use common::{FakeIdentity, FakeRemote, ScriptedLlm, principal};
use gogodo::assistant::Assistant;
use gogodo::auth::Auth;
use gogodo::config::{ExtractFailurePolicy, LlmConfig};
use gogodo::flows::{CreateOutcome, create_task};
use gogodo::models::{NewTask, Task};
use gogodo::reminders::ReminderScheduler;
use gogodo::store::TaskStore;
use gogodo::utils::{parse_date, parse_time};
use gogodo::Database;

fn at(date: &str, time: &str) -> NaiveDateTime {
    parse_date(date).unwrap().and_time(parse_time(time).unwrap())
}

async fn signed_in_store(remote: &Arc<FakeRemote>) -> TaskStore {
    let mut store = TaskStore::new(remote.clone(), None);
    store.set_principal(Some(principal("alice"))).await;
    store
}

fn assistant(llm: &Arc<ScriptedLlm>) -> Assistant {
    Assistant::new(llm.clone(), &LlmConfig::default())
}

#[tokio::test]
async fn natural_language_due_dates_are_stored() {
    let remote = Arc::new(FakeRemote::default());
    let llm = Arc::new(ScriptedLlm::replying(&[r#"{"dueDate": "2024-06-02", "dueTime": "17:00"}"#]));
    let mut store = signed_in_store(&remote).await;

    let outcome = create_task(
        &mut store,
        &assistant(&llm),
        "  remind me tomorrow at 5pm ",
        "2024-06-01",
        ExtractFailurePolicy::Undated,
    )
    .await
    .unwrap()
    .unwrap();

    let CreateOutcome::Created(task) = outcome else {
        panic!("expected a dated task, got {:?}", outcome);
    };
    assert_eq!(task.description, "remind me tomorrow at 5pm");
    assert_eq!(task.due_date.as_deref(), Some("2024-06-02"));
    assert_eq!(task.due_time.as_deref(), Some("17:00"));
    assert!(!task.completed);

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].json);
    assert!(requests[0].user.contains("remind me tomorrow at 5pm"));
    assert!(requests[0].user.contains("2024-06-01"));

    let stored = remote.records("alice");
    assert_eq!(stored.get(&task.id), Some(&task.record()));
    assert_eq!(store.list(), &[task]);
}

#[tokio::test]
async fn blank_text_does_nothing() {
    let remote = Arc::new(FakeRemote::default());
    let llm = Arc::new(ScriptedLlm::default());
    let mut store = signed_in_store(&remote).await;

    let outcome = create_task(&mut store, &assistant(&llm), "   ", "2024-06-01", ExtractFailurePolicy::Undated)
        .await
        .unwrap();
    assert!(outcome.is_none());
    assert!(llm.requests().is_empty());
    assert_eq!(remote.calls(), vec!["read_all alice"]);
}

#[tokio::test]
async fn extraction_failure_follows_the_policy() {
    let remote = Arc::new(FakeRemote::default());
    let llm = Arc::new(ScriptedLlm::default());
    llm.push_failure("quota exceeded");
    llm.push_failure("quota exceeded");
    let mut store = signed_in_store(&remote).await;

    let outcome = create_task(&mut store, &assistant(&llm), "water plants", "2024-06-01", ExtractFailurePolicy::Undated)
        .await
        .unwrap()
        .unwrap();
    match outcome {
        CreateOutcome::CreatedUndated(task, _) => {
            assert_eq!(task.description, "water plants");
            assert_eq!(task.due_date, None);
            assert_eq!(task.due_time, None);
        }
        other => panic!("expected an undated task, got {:?}", other),
    }

    let result = create_task(&mut store, &assistant(&llm), "feed cat", "2024-06-01", ExtractFailurePolicy::Abort).await;
    assert!(result.is_err());
    assert_eq!(store.list().len(), 1);
    assert_eq!(remote.records("alice").len(), 1);
}

#[tokio::test]
async fn adding_while_signed_out_never_reaches_the_remote() {
    let remote = Arc::new(FakeRemote::default());
    let llm = Arc::new(ScriptedLlm::replying(&[r#"{"dueDate": null, "dueTime": null}"#]));
    let mut store = TaskStore::new(remote.clone(), None);

    let outcome = create_task(&mut store, &assistant(&llm), "buy milk", "2024-06-01", ExtractFailurePolicy::Undated)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, CreateOutcome::NotStored));
    assert!(store.list().is_empty());
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn a_new_store_reads_back_what_was_written() {
    let remote = Arc::new(FakeRemote::default());
    let mut store = signed_in_store(&remote).await;
    let added = store
        .add(NewTask {
            description: "dentist".to_string(),
            due_date: Some("2024-06-03".to_string()),
            due_time: Some("09:30".to_string()),
            completed: false,
        })
        .await
        .unwrap();
    store
        .update(&added.id, |task| Task {
            completed: true,
            ..task.clone()
        })
        .await
        .unwrap();

    let fresh = signed_in_store(&remote).await;
    assert_eq!(fresh.list(), store.list());
    assert!(fresh.list()[0].completed);
}

#[tokio::test]
async fn delete_removes_the_task_only_when_the_remote_agrees() {
    let remote = Arc::new(FakeRemote::default());
    let mut store = signed_in_store(&remote).await;
    let task = store.add(NewTask::new("call mom")).await.unwrap();

    remote.fail_deletes.store(true, Ordering::SeqCst);
    assert!(store.delete(&task.id).await.is_err());
    assert_eq!(store.list().len(), 1);

    remote.fail_deletes.store(false, Ordering::SeqCst);
    store.delete(&task.id).await.unwrap();
    assert!(store.list().is_empty());
    assert!(remote.records("alice").is_empty());
}

#[tokio::test]
async fn failed_update_keeps_the_local_change() {
    let remote = Arc::new(FakeRemote::default());
    let mut store = signed_in_store(&remote).await;
    let task = store.add(NewTask::new("call mom")).await.unwrap();

    remote.fail_writes.store(true, Ordering::SeqCst);
    assert!(store.update(&task.id, Task::toggled).await.is_err());
    assert!(store.get(&task.id).unwrap().completed);
    assert!(!remote.records("alice")[&task.id].completed);
}

#[tokio::test]
async fn unreachable_remote_keeps_the_current_list() {
    let remote = Arc::new(FakeRemote::default());
    remote.seed("alice", "-Na", NewTask::new("cached"));
    let mut store = signed_in_store(&remote).await;
    let revision = store.revision();

    remote.fail_reads.store(true, Ordering::SeqCst);
    assert!(!store.reload().await);
    assert_eq!(store.list().len(), 1);
    assert_eq!(store.revision(), revision);
}

#[tokio::test]
async fn users_only_see_their_own_tasks() {
    let remote = Arc::new(FakeRemote::default());
    remote.seed("alice", "-Na", NewTask::new("alice's"));
    remote.seed("bob", "-Nb", NewTask::new("bob's"));
    let mut store = signed_in_store(&remote).await;
    assert_eq!(store.list()[0].description, "alice's");

    store.set_principal(Some(principal("bob"))).await;
    assert_eq!(store.list().len(), 1);
    assert_eq!(store.list()[0].description, "bob's");
}

#[tokio::test]
async fn cached_list_shows_before_the_remote_answers() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("gogodo.db");
    let remote = Arc::new(FakeRemote::default());
    remote.seed("alice", "-Na", NewTask::new("offline copy"));

    let mut store = TaskStore::new(remote.clone(), Some(Database::new(&db_path).unwrap()));
    store.set_principal(Some(principal("alice"))).await;
    drop(store);

    remote.fail_reads.store(true, Ordering::SeqCst);
    let mut store = TaskStore::new(remote.clone(), Some(Database::new(&db_path).unwrap()));
    store.set_principal(Some(principal("alice"))).await;
    assert_eq!(store.list().len(), 1);
    assert_eq!(store.list()[0].description, "offline copy");
}

#[tokio::test(start_paused = true)]
async fn each_task_rings_once() {
    let remote = Arc::new(FakeRemote::default());
    let mut store = signed_in_store(&remote).await;
    store
        .add(NewTask {
            description: "call mom".to_string(),
            due_date: Some("2024-06-02".to_string()),
            due_time: Some("17:00".to_string()),
            completed: false,
        })
        .await
        .unwrap();

    let now = at("2024-06-02", "16:59");
    let (mut scheduler, mut fired) = ReminderScheduler::new();
    scheduler.rearm_at(store.list(), now);
    assert_eq!(scheduler.rearm_at(store.list(), now), 1);

    tokio::time::sleep(Duration::from_secs(120)).await;
    let alarm = fired.try_recv().unwrap();
    assert_eq!(alarm.description, "call mom");
    assert_eq!(alarm.due, at("2024-06-02", "17:00"));
    assert!(fired.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn completing_a_task_silences_its_reminder() {
    let remote = Arc::new(FakeRemote::default());
    let mut store = signed_in_store(&remote).await;
    let task = store
        .add(NewTask {
            description: "call mom".to_string(),
            due_date: Some("2024-06-02".to_string()),
            due_time: Some("17:00".to_string()),
            completed: false,
        })
        .await
        .unwrap();

    let now = at("2024-06-02", "16:59");
    let (mut scheduler, mut fired) = ReminderScheduler::new();
    scheduler.rearm_at(store.list(), now);

    store.update(&task.id, Task::toggled).await.unwrap();
    assert_eq!(scheduler.rearm_at(store.list(), now), 0);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(fired.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn alarm_queued_before_completion_is_stale() {
    let remote = Arc::new(FakeRemote::default());
    let mut store = signed_in_store(&remote).await;
    let task = store
        .add(NewTask {
            description: "call mom".to_string(),
            due_date: Some("2024-06-02".to_string()),
            due_time: Some("17:00".to_string()),
            completed: false,
        })
        .await
        .unwrap();

    let (mut scheduler, mut fired) = ReminderScheduler::new();
    scheduler.rearm_at(store.list(), at("2024-06-02", "16:59"));
    // Fires while the completion write is still in flight
    tokio::time::sleep(Duration::from_secs(61)).await;
    store.update(&task.id, Task::toggled).await.unwrap();
    assert_eq!(scheduler.rearm_at(store.list(), at("2024-06-02", "17:00")), 0);

    let queued = fired.try_recv().unwrap();
    assert!(!scheduler.is_current(&queued));
    assert!(!gogodo::reminders::still_due(&queued, store.list()));
}

#[tokio::test(start_paused = true)]
async fn rescheduled_task_drops_the_old_alarm() {
    let remote = Arc::new(FakeRemote::default());
    let mut store = signed_in_store(&remote).await;
    let task = store
        .add(NewTask {
            description: "call mom".to_string(),
            due_date: Some("2024-06-02".to_string()),
            due_time: Some("17:00".to_string()),
            completed: false,
        })
        .await
        .unwrap();

    let (mut scheduler, mut fired) = ReminderScheduler::new();
    scheduler.rearm_at(store.list(), at("2024-06-02", "16:59"));
    let alarm = task_alarm(&scheduler, &mut fired).await;
    assert!(gogodo::reminders::still_due(&alarm, store.list()));

    store
        .update(&task.id, |t| Task {
            due_time: Some("18:00".to_string()),
            ..t.clone()
        })
        .await
        .unwrap();
    assert!(!gogodo::reminders::still_due(&alarm, store.list()));
    store.delete(&task.id).await.unwrap();
    assert!(!gogodo::reminders::still_due(&alarm, store.list()));
}

async fn task_alarm(
    scheduler: &ReminderScheduler,
    fired: &mut tokio::sync::mpsc::UnboundedReceiver<gogodo::reminders::Alarm>,
) -> gogodo::reminders::Alarm {
    tokio::time::sleep(Duration::from_secs(61)).await;
    let alarm = fired.try_recv().unwrap();
    assert!(scheduler.is_current(&alarm));
    alarm
}

#[tokio::test(start_paused = true)]
async fn signing_out_clears_the_list_and_disarms() {
    let identity = Arc::new(FakeIdentity::default());
    let auth = Auth::new(identity, None);
    let remote = Arc::new(FakeRemote::default());
    let mut store = TaskStore::new(remote.clone(), None);
    let mut changes = auth.subscribe();

    auth.sign_in("alice@example.com", "hunter22").await.unwrap();
    assert!(changes.has_changed().unwrap());
    changes.borrow_and_update();
    store.set_principal(auth.current()).await;
    store
        .add(NewTask {
            description: "call mom".to_string(),
            due_date: Some("2024-06-02".to_string()),
            due_time: Some("17:00".to_string()),
            completed: false,
        })
        .await
        .unwrap();

    let now = at("2024-06-02", "16:59");
    let (mut scheduler, mut fired) = ReminderScheduler::new();
    assert_eq!(scheduler.rearm_at(store.list(), now), 1);

    auth.sign_out();
    assert!(changes.has_changed().unwrap());
    store.set_principal(auth.current()).await;
    assert!(store.list().is_empty());
    assert_eq!(scheduler.rearm_at(store.list(), now), 0);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(fired.try_recv().is_err());
}

#[tokio::test]
async fn saved_sessions_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("gogodo.db");
    let identity = Arc::new(FakeIdentity::default());

    let auth = Auth::new(identity.clone(), Some(Database::new(&db_path).unwrap()));
    let signed_in = auth.sign_in("alice@example.com", "hunter22").await.unwrap();
    drop(auth);

    let auth = Auth::new(identity.clone(), Some(Database::new(&db_path).unwrap()));
    assert!(auth.is_loading());
    let restored = auth.restore().await.unwrap();
    assert_eq!(restored.uid, signed_in.uid);
    assert!(!auth.is_loading());
    assert_eq!(identity.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_password_leaves_nobody_signed_in() {
    let auth = Auth::new(Arc::new(FakeIdentity::default()), None);
    let err = auth.sign_in("alice@example.com", "wrong-password").await.unwrap_err();
    assert_eq!(err.to_string(), "Incorrect email or password");
    assert!(auth.current().is_none());
}

#[tokio::test]
async fn questions_send_the_whole_list() {
    let llm = Arc::new(ScriptedLlm::replying(&[r#"{"answer": "You need to call mom at 5 PM."}"#]));
    let tasks = vec![
        NewTask {
            description: "call mom".to_string(),
            due_date: Some("2024-06-02".to_string()),
            due_time: Some("17:00".to_string()),
            completed: false,
        }
        .with_id("-Na".to_string()),
        NewTask::new("buy milk").with_id("-Nb".to_string()),
    ];

    let answer = assistant(&llm).answer_or_error("what's due today?", &tasks).await;
    assert_eq!(answer, "You need to call mom at 5 PM.");
    let prompt = &llm.requests()[0].user;
    assert!(prompt.contains("call mom"));
    assert!(prompt.contains("buy milk"));
    assert!(prompt.contains("June 2, 2024 5:00 PM"));
    assert!(prompt.ends_with("Question: what's due today?"));
}

#[tokio::test]
async fn question_failures_become_the_answer() {
    let llm = Arc::new(ScriptedLlm::default());
    llm.push_failure("quota exceeded");
    let answer = assistant(&llm).answer_or_error("anything?", &[]).await;
    assert!(answer.starts_with("Error: "));
    assert!(answer.contains("quota exceeded"));
}

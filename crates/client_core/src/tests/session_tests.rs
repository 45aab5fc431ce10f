use super::*;

use futures::StreamExt;
use shared::protocol::ReorderEntry;

use crate::{
    realtime::InMemoryRealtimeStore,
    test_support::{board, profile, subtask, task, ApiCall, FakeBoardApi},
};

const HOUR: Duration = Duration::from_secs(3600);

struct Harness {
    api: Arc<FakeBoardApi>,
    realtime: Arc<InMemoryRealtimeStore>,
    session: Arc<KanbanSession>,
}

async fn harness(boards: Vec<Board>) -> Harness {
    let api = Arc::new(FakeBoardApi::new(boards));
    let realtime = InMemoryRealtimeStore::new();
    let session = KanbanSession::new_with_dependencies(
        api.clone(),
        realtime.clone(),
        SessionOptions {
            app_origin: "https://kanban.example/".into(),
            timer_period: HOUR,
        },
    );
    Harness {
        api,
        realtime,
        session,
    }
}

async fn selected(tasks: Vec<Task>) -> Harness {
    let h = harness(vec![board("b1", 0, tasks)]).await;
    h.session
        .select_board(&BoardId::from("b1"))
        .await
        .expect("select");
    h.api.clear_calls();
    h
}

#[tokio::test]
async fn same_column_drop_issues_no_request() {
    let h = selected(vec![task("t1", TaskStatus::Todo)]).await;

    let result = h
        .session
        .handle_drop(DropOutcome::SameColumn {
            task_id: TaskId::from("t1"),
        })
        .await
        .expect("drop");
    assert!(result.is_none());

    let result = h
        .session
        .move_task(&TaskId::from("t1"), TaskStatus::Todo)
        .await
        .expect("move");
    assert!(result.is_none());
    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn moved_drop_commits_and_refetches() {
    let h = selected(vec![task("t1", TaskStatus::Todo)]).await;

    let commit = h
        .session
        .handle_drop(DropOutcome::Moved {
            task_id: TaskId::from("t1"),
            from: TaskStatus::Todo,
            to: TaskStatus::Done,
        })
        .await
        .expect("drop")
        .expect("commit");
    assert_eq!(commit.status, TaskStatus::Done);
    assert_eq!(
        h.api.writes(),
        vec![ApiCall::UpdateTask(
            BoardId::from("b1"),
            TaskId::from("t1"),
            TaskPatch::status(TaskStatus::Done)
        )]
    );
    let view = h.session.current_view().await;
    assert_eq!(view.done.len(), 1);
    assert!(view.todo.is_empty());
}

#[tokio::test]
async fn moving_unknown_task_is_rejected_locally() {
    let h = selected(vec![task("t1", TaskStatus::Todo)]).await;
    let err = h
        .session
        .move_task(&TaskId::from("nope"), TaskStatus::Done)
        .await
        .expect_err("unknown");
    assert!(matches!(err, ClientError::UnknownTask(_)));
    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn finished_commit_keeps_other_moves_in_flight_on_screen() {
    let h = selected(vec![task("t1", TaskStatus::Todo), task("t2", TaskStatus::Todo)]).await;
    let mut gate = h.api.gate_updates(&["t2"]);

    let session = Arc::clone(&h.session);
    let slow = tokio::spawn(async move {
        session
            .move_task(&TaskId::from("t2"), TaskStatus::Doing)
            .await
    });
    assert_eq!(gate.arrived().await, TaskId::from("t2"));

    let commit = h
        .session
        .move_task(&TaskId::from("t1"), TaskStatus::Done)
        .await
        .expect("t1 commit")
        .expect("t1 moved");
    assert_eq!(commit.refetch, Some(RefetchOutcome::Installed));

    let view = h.session.current_view().await;
    assert_eq!(view.status_of(&TaskId::from("t1")), Some(TaskStatus::Done));
    assert_eq!(
        view.status_of(&TaskId::from("t2")),
        Some(TaskStatus::Doing),
        "t2 must stay optimistic while its commit is in flight"
    );

    gate.release_one();
    slow.await.expect("join").expect("t2 commit");
    let view = h.session.current_view().await;
    assert_eq!(view.status_of(&TaskId::from("t2")), Some(TaskStatus::Doing));
    assert_eq!(
        h.api.stored_task("b1", "t2").map(|t| t.status),
        Some(TaskStatus::Doing)
    );
}

#[tokio::test]
async fn first_answer_does_not_undo_a_second_move_of_the_same_task() {
    let h = selected(vec![task("t1", TaskStatus::Todo)]).await;
    let task_id = TaskId::from("t1");
    let mut gate = h.api.gate_updates(&["t1"]);

    let session = Arc::clone(&h.session);
    let first = tokio::spawn(async move {
        session
            .move_task(&TaskId::from("t1"), TaskStatus::Doing)
            .await
    });
    gate.arrived().await;
    let session = Arc::clone(&h.session);
    let second = tokio::spawn(async move {
        session
            .move_task(&TaskId::from("t1"), TaskStatus::Done)
            .await
    });
    gate.arrived().await;
    assert_eq!(
        h.session.current_view().await.status_of(&task_id),
        Some(TaskStatus::Done)
    );

    gate.release_one();
    first.await.expect("join").expect("first commit");
    assert_eq!(
        h.session.current_view().await.status_of(&task_id),
        Some(TaskStatus::Done),
        "second move must survive the first commit and its refetch"
    );

    gate.release_one();
    second.await.expect("join").expect("second commit");
    assert_eq!(
        h.session.current_view().await.status_of(&task_id),
        Some(TaskStatus::Done)
    );
    assert_eq!(
        h.api.stored_task("b1", "t1").map(|t| t.status),
        Some(TaskStatus::Done)
    );
}

#[tokio::test]
async fn timer_stop_persists_previous_total_plus_ticks() {
    let mut seeded = task("t1", TaskStatus::Doing);
    seeded.time_tracked = 90;
    let h = selected(vec![seeded]).await;
    let task_id = TaskId::from("t1");

    let timer = h.session.start_timer(&task_id).await.expect("start");
    {
        let mut timer = timer.lock().await;
        for _ in 0..25 {
            timer.tick();
        }
    }
    assert_eq!(h.session.timer_display(&task_id).await.as_deref(), Some("00:01:55"));

    let total = h.session.stop_timer(&task_id).await.expect("stop");
    assert_eq!(total, Some(115));
    assert_eq!(
        h.api.writes(),
        vec![ApiCall::UpdateTask(
            BoardId::from("b1"),
            task_id.clone(),
            TaskPatch::time_tracked(115)
        )]
    );
    assert_eq!(h.session.task(&task_id).await.expect("task").time_tracked, 115);

    assert_eq!(h.session.stop_timer(&task_id).await.expect("idle stop"), None);
}

#[tokio::test]
async fn timer_reset_persists_zero() {
    let mut seeded = task("t1", TaskStatus::Doing);
    seeded.time_tracked = 500;
    let h = selected(vec![seeded]).await;
    let task_id = TaskId::from("t1");

    h.session.start_timer(&task_id).await.expect("start");
    assert_eq!(h.session.reset_timer(&task_id).await.expect("reset"), 0);
    assert_eq!(
        h.api.writes(),
        vec![ApiCall::UpdateTask(
            BoardId::from("b1"),
            task_id,
            TaskPatch::time_tracked(0)
        )]
    );
}

#[tokio::test]
async fn failed_timer_save_keeps_the_total_for_the_next_stop() {
    let mut seeded = task("t1", TaskStatus::Doing);
    seeded.time_tracked = 60;
    let h = selected(vec![seeded]).await;
    let task_id = TaskId::from("t1");

    let timer = h.session.start_timer(&task_id).await.expect("start");
    {
        let mut timer = timer.lock().await;
        for _ in 0..30 {
            timer.tick();
        }
    }
    h.api.fail_updates(true);
    h.session.stop_timer(&task_id).await.expect_err("save fails");
    assert_eq!(h.session.timer_display(&task_id).await.as_deref(), Some("00:01:30"));
    assert!(!timer.lock().await.is_running());

    h.api.fail_updates(false);
    h.api.clear_calls();
    assert_eq!(h.session.stop_timer(&task_id).await.expect("retry"), Some(90));
    assert_eq!(
        h.api.writes(),
        vec![ApiCall::UpdateTask(
            BoardId::from("b1"),
            task_id.clone(),
            TaskPatch::time_tracked(90)
        )]
    );
    assert_eq!(h.session.timer_display(&task_id).await, None);
}

#[tokio::test]
async fn restarting_an_unsaved_timer_continues_from_its_total() {
    let h = selected(vec![task("t1", TaskStatus::Doing)]).await;
    let task_id = TaskId::from("t1");

    let timer = h.session.start_timer(&task_id).await.expect("start");
    timer.lock().await.tick();
    h.api.fail_updates(true);
    h.session.stop_timer(&task_id).await.expect_err("save fails");
    h.api.fail_updates(false);

    let resumed = h.session.start_timer(&task_id).await.expect("restart");
    assert!(resumed.lock().await.is_running());
    assert_eq!(resumed.lock().await.elapsed(), 1);
}

#[tokio::test]
async fn second_start_of_running_timer_is_rejected() {
    let h = selected(vec![task("t1", TaskStatus::Doing)]).await;
    let task_id = TaskId::from("t1");
    h.session.start_timer(&task_id).await.expect("start");
    assert!(matches!(
        h.session.start_timer(&task_id).await,
        Err(ClientError::Validation(_))
    ));
}

#[tokio::test]
async fn subtask_toggle_to_same_value_sends_one_request() {
    let mut seeded = task("t1", TaskStatus::Doing);
    seeded.subtasks = vec![
        subtask("s1", SubtaskStatus::Undone),
        subtask("s2", SubtaskStatus::Undone),
    ];
    let h = selected(vec![seeded]).await;
    let task_id = TaskId::from("t1");
    let subtask_id = SubtaskId::from("s1");

    assert!(h
        .session
        .set_subtask_status(&task_id, &subtask_id, true)
        .await
        .expect("first toggle"));
    assert!(!h
        .session
        .set_subtask_status(&task_id, &subtask_id, true)
        .await
        .expect("second toggle"));

    assert_eq!(h.api.writes().len(), 1);
    let stored = h.api.stored_task("b1", "t1").expect("stored");
    assert_eq!(stored.completed_subtasks(), 1);
    assert_eq!(stored.progress_label(), "2 subtasks (1 completed)");
}

#[tokio::test]
async fn add_subtask_appends_unchecked_entry() {
    let mut seeded = task("t1", TaskStatus::Todo);
    seeded.subtasks = vec![subtask("s1", SubtaskStatus::Done)];
    let h = selected(vec![seeded]).await;

    h.session
        .add_subtask(&TaskId::from("t1"), "  Review  ")
        .await
        .expect("add");
    let task = h.session.task(&TaskId::from("t1")).await.expect("task");
    assert_eq!(task.subtasks.len(), 2);
    assert_eq!(task.subtasks[1].name, "Review");
    assert_eq!(task.subtasks[1].status, SubtaskStatus::Undone);

    assert!(matches!(
        h.session.add_subtask(&TaskId::from("t1"), "   ").await,
        Err(ClientError::Validation(_))
    ));
}

#[tokio::test]
async fn priority_change_skips_unchanged_value() {
    let h = selected(vec![task("t1", TaskStatus::Todo)]).await;
    let task_id = TaskId::from("t1");
    assert!(!h
        .session
        .change_priority(&task_id, Priority::Medium)
        .await
        .expect("same"));
    assert!(h
        .session
        .change_priority(&task_id, Priority::High)
        .await
        .expect("changed"));
    assert_eq!(
        h.api.writes(),
        vec![ApiCall::UpdateTask(
            BoardId::from("b1"),
            task_id,
            TaskPatch::priority(Priority::High)
        )]
    );
}

#[tokio::test]
async fn assign_rejects_duplicates_and_notifies_assignee() {
    let h = selected(vec![task("t1", TaskStatus::Todo)]).await;
    let task_id = TaskId::from("t1");
    let grace = profile("u2", "Grace Hopper");

    h.session.assign_user(&task_id, &grace).await.expect("assign");
    let err = h
        .session
        .assign_user(&task_id, &grace)
        .await
        .expect_err("duplicate");
    assert!(matches!(err, ClientError::Validation(_)));

    let ledger = h
        .realtime
        .assigned_members(&UserId::from("owner"))
        .await
        .expect("ledger");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].assigned_by, "Ada Lovelace");

    let inbox = h.realtime.notifications(&grace.id).await.expect("inbox");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::Assign);
    assert_eq!(inbox[0].action_by.name, "Ada Lovelace");

    h.session
        .unassign_user(&task_id, &grace.id)
        .await
        .expect("unassign");
    assert!(!h.session.task(&task_id).await.expect("task").is_assigned(&grace.id));
    assert!(h
        .realtime
        .assigned_members(&UserId::from("owner"))
        .await
        .expect("ledger")
        .is_empty());
}

#[tokio::test]
async fn create_board_rejects_blank_name_without_request() {
    let h = harness(Vec::new()).await;
    assert!(matches!(
        h.session.create_board("   ").await,
        Err(ClientError::Validation(_))
    ));
    assert!(h.api.calls().is_empty());

    h.session.create_board(" Sprint 1 ").await.expect("create");
    assert_eq!(h.api.writes(), vec![ApiCall::CreateBoard("Sprint 1".into())]);
    let boards = h.session.boards().await;
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].board_name, "Sprint 1");
}

#[tokio::test]
async fn board_reorder_gesture_commits_final_permutation_once() {
    let h = harness(vec![
        board("A", 0, Vec::new()),
        board("B", 1, Vec::new()),
        board("C", 2, Vec::new()),
    ])
    .await;
    h.session.load_boards(None).await.expect("boards");
    h.api.clear_calls();

    h.session.start_board_drag(BoardId::from("A")).await.expect("start");
    h.session.hover_board_index(2).await.expect("hover");
    h.session.hover_board_index(1).await.expect("hover");
    let outcome = h.session.end_board_drag().await.expect("end");

    let expected = vec![
        ReorderEntry {
            board_id: BoardId::from("B"),
            order: 0,
        },
        ReorderEntry {
            board_id: BoardId::from("A"),
            order: 1,
        },
    ];
    assert_eq!(outcome, ReorderOutcome::Committed(expected.clone()));
    assert_eq!(h.api.writes(), vec![ApiCall::Reorder(expected)]);
    let names: Vec<String> = h
        .session
        .boards()
        .await
        .into_iter()
        .map(|board| board.board_id.to_string())
        .collect();
    assert_eq!(names, ["B", "A", "C"]);
}

#[tokio::test]
async fn invite_maps_server_conflicts_to_friendly_messages() {
    let h = selected(Vec::new()).await;
    h.api.reject_invites_with("User already invited");

    let err = h
        .session
        .invite_user(&BoardId::from("b1"), "u2@example.com")
        .await
        .expect_err("conflict");
    assert_eq!(err.user_message(), ALREADY_INVITED);

    let err = h
        .session
        .invite_user(&BoardId::from("b1"), "nobody@example.com")
        .await
        .expect_err("unknown email");
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn invite_of_existing_member_is_rejected_before_request() {
    let mut seeded = board("b1", 0, Vec::new());
    seeded.accepted_invite_users.push(UserId::from("u2"));
    let h = harness(vec![seeded]).await;
    h.session
        .select_board(&BoardId::from("b1"))
        .await
        .expect("select");

    let err = h
        .session
        .invite_user(&BoardId::from("b1"), "u2@example.com")
        .await
        .expect_err("member");
    assert_eq!(err.user_message(), ALREADY_MEMBER);
    assert!(h.api.writes().is_empty());
}

#[tokio::test]
async fn invite_link_uses_app_origin() {
    let h = harness(Vec::new()).await;
    assert_eq!(
        h.session.invite_link(&BoardId::from("b9")),
        "https://kanban.example/invite/b9"
    );
}

#[tokio::test]
async fn notifications_feed_and_mark_read() {
    let h = harness(Vec::new()).await;
    let me = UserId::from("owner");
    let mut feed = h.session.subscribe_notifications().await.expect("feed");
    assert!(feed.next().await.expect("initial").is_empty());

    let record = NotificationRecord::new(
        NotificationKind::Join,
        (&profile("u2", "Grace Hopper")).into(),
        None,
        None,
    );
    h.realtime.push_notification(&me, &record).await.expect("push");
    let update = tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .expect("in time")
        .expect("open");
    assert_eq!(update.len(), 1);

    assert_eq!(h.session.unread_notifications().await.expect("count"), 1);
    h.session.mark_all_read().await.expect("mark");
    assert_eq!(h.session.unread_notifications().await.expect("count"), 0);
}

#[tokio::test]
async fn deleting_selected_board_clears_mirror() {
    let h = selected(vec![task("t1", TaskStatus::Todo)]).await;
    h.session
        .delete_board(&BoardId::from("b1"))
        .await
        .expect("delete");
    assert!(h.session.selected_board().await.is_none());
    assert!(h.session.current_view().await.is_empty());
}

#[test]
fn invite_errors_keep_unrelated_messages() {
    let err = map_invite_error(ClientError::Api {
        code: shared::error::ErrorCode::Internal,
        message: "boom".into(),
    });
    assert_eq!(err.user_message(), "boom");
}

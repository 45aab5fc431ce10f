use super::*;

fn ids(raw: &[&str]) -> Vec<BoardId> {
    raw.iter().map(|id| BoardId::from(*id)).collect()
}

#[test]
fn identical_order_produces_empty_diff() {
    let diff = diff_order(&ids(&["A", "B", "C"]), &ids(&["A", "B", "C"])).expect("diff");
    assert!(diff.is_empty());
}

#[test]
fn swap_only_reports_changed_positions() {
    let diff = diff_order(&ids(&["A", "B", "C"]), &ids(&["B", "A", "C"])).expect("diff");
    assert_eq!(
        diff,
        vec![
            ReorderEntry {
                board_id: BoardId::from("B"),
                order: 0
            },
            ReorderEntry {
                board_id: BoardId::from("A"),
                order: 1
            },
        ]
    );
}

#[test]
fn rejects_non_permutations() {
    assert!(diff_order(&ids(&["A", "B"]), &ids(&["A"])).is_err());
    assert!(diff_order(&ids(&["A", "B"]), &ids(&["A", "Z"])).is_err());
    assert!(diff_order(&ids(&["A", "B"]), &ids(&["A", "A"])).is_err());
}

#[test]
fn drag_back_to_origin_commits_nothing() {
    let mut tracker = ReorderTracker::new(ids(&["A", "B", "C"]));
    tracker.start_drag(BoardId::from("A")).expect("start");
    tracker.hover_index(2).expect("hover");
    assert_eq!(tracker.view(), ids(&["B", "C", "A"]).as_slice());
    tracker.hover_index(0).expect("hover back");
    assert_eq!(tracker.phase(), ReorderPhase::Reordering);

    let diff = tracker.end_drag().expect("end");
    assert!(diff.is_empty());
    assert_eq!(tracker.phase(), ReorderPhase::Idle);
}

#[test]
fn only_final_permutation_is_diffed() {
    let mut tracker = ReorderTracker::new(ids(&["A", "B", "C", "D"]));
    tracker.start_drag(BoardId::from("D")).expect("start");
    tracker.hover_index(0).expect("hover");
    tracker.hover_index(1).expect("hover");
    tracker.hover_index(2).expect("hover");

    let diff = tracker.end_drag().expect("end");
    assert_eq!(tracker.view(), ids(&["A", "B", "D", "C"]).as_slice());
    assert_eq!(
        diff,
        vec![
            ReorderEntry {
                board_id: BoardId::from("D"),
                order: 2
            },
            ReorderEntry {
                board_id: BoardId::from("C"),
                order: 3
            },
        ]
    );
    assert_eq!(tracker.phase(), ReorderPhase::DragEnded);
}

#[test]
fn commit_lifecycle_promotes_or_restores() {
    let mut tracker = ReorderTracker::new(ids(&["A", "B"]));
    tracker.propose(ids(&["B", "A"])).expect("propose");
    tracker.begin_commit().expect("commit");
    assert_eq!(tracker.phase(), ReorderPhase::Committing);
    assert!(!tracker.load(ids(&["A", "B"])), "refresh deferred while committing");
    tracker.finish_commit(true);
    assert_eq!(tracker.committed(), ids(&["B", "A"]).as_slice());

    tracker.propose(ids(&["A", "B"])).expect("propose");
    tracker.begin_commit().expect("commit");
    tracker.finish_commit(false);
    assert_eq!(tracker.view(), ids(&["B", "A"]).as_slice());
    assert_eq!(tracker.phase(), ReorderPhase::Idle);
}

#[test]
fn cancel_restores_committed_order() {
    let mut tracker = ReorderTracker::new(ids(&["A", "B", "C"]));
    tracker.start_drag(BoardId::from("C")).expect("start");
    tracker.hover_index(0).expect("hover");
    tracker.cancel_drag();
    assert_eq!(tracker.view(), ids(&["A", "B", "C"]).as_slice());
    assert_eq!(tracker.phase(), ReorderPhase::Idle);
}

#[test]
fn second_drag_is_rejected_until_settled() {
    let mut tracker = ReorderTracker::new(ids(&["A", "B"]));
    tracker.start_drag(BoardId::from("A")).expect("start");
    assert!(tracker.start_drag(BoardId::from("B")).is_err());
}

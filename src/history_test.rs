use super::*;
use crate::state::test_helpers::stroke_operation;

fn author() -> Uuid {
    Uuid::new_v4()
}

#[test]
fn new_history_is_empty_with_cursor_at_minus_one() {
    let history = RoomHistory::new();
    assert_eq!(history.cursor(), -1);
    assert!(history.is_empty());
    assert!(history.visible_operations().is_empty());
}

#[test]
fn append_advances_cursor_and_extends_visible() {
    let mut history = RoomHistory::new();
    let a = author();

    history.append(stroke_operation(a, &[(0.0, 0.0)]));
    assert_eq!(history.cursor(), 0);
    assert_eq!(history.visible_operations().len(), 1);

    history.append(stroke_operation(a, &[(1.0, 1.0)]));
    assert_eq!(history.cursor(), 1);
    assert_eq!(history.visible_operations().len(), 2);
    assert_eq!(history.len(), 2);
}

#[test]
fn visible_always_matches_prefix_up_to_cursor() {
    let mut history = RoomHistory::new();
    let a = author();
    for i in 0..5 {
        history.append(stroke_operation(a, &[(f64::from(i), 0.0)]));
    }

    history.undo();
    history.undo();
    let end = usize::try_from(history.cursor() + 1).unwrap();
    assert_eq!(history.visible_operations().len(), end);
    assert_eq!(end, 3);

    history.redo();
    assert_eq!(history.visible_operations().len(), 4);
}

#[test]
fn undo_on_empty_history_is_a_repeatable_no_op() {
    let mut history = RoomHistory::new();
    for _ in 0..3 {
        assert_eq!(history.undo(), None);
        assert_eq!(history.cursor(), -1);
        assert!(history.visible_operations().is_empty());
    }
}

#[test]
fn undo_returns_new_cursor_and_retains_operations() {
    let mut history = RoomHistory::new();
    let a = author();
    history.append(stroke_operation(a, &[(0.0, 0.0)]));
    history.append(stroke_operation(a, &[(1.0, 1.0)]));

    assert_eq!(history.undo(), Some(0));
    assert_eq!(history.visible_operations().len(), 1);
    // Both operations stay stored for redo.
    assert_eq!(history.len(), 2);

    assert_eq!(history.undo(), Some(-1));
    assert!(history.visible_operations().is_empty());
    assert_eq!(history.undo(), None);
}

#[test]
fn redo_at_head_is_a_no_op() {
    let mut history = RoomHistory::new();
    assert_eq!(history.redo(), None);

    history.append(stroke_operation(author(), &[(0.0, 0.0)]));
    assert_eq!(history.redo(), None);
    assert_eq!(history.cursor(), 0);
}

#[test]
fn append_after_undo_discards_redo_tail() {
    let mut history = RoomHistory::new();
    let a = author();
    let op_a = stroke_operation(a, &[(0.0, 0.0)]);
    let id_a = op_a.id;
    history.append(op_a);
    history.append(stroke_operation(a, &[(1.0, 1.0)]));
    history.append(stroke_operation(a, &[(2.0, 2.0)]));

    history.undo();
    history.undo();
    assert_eq!(history.cursor(), 0);

    let op_d = stroke_operation(a, &[(3.0, 3.0)]);
    let id_d = op_d.id;
    history.append(op_d);

    assert_eq!(history.len(), 2);
    assert_eq!(history.cursor(), 1);
    let ids: Vec<Uuid> = history.visible_operations().iter().map(|op| op.id).collect();
    assert_eq!(ids, vec![id_a, id_d]);
}

#[test]
fn undo_redo_round_trips_visible_state() {
    let mut history = RoomHistory::new();
    let op = stroke_operation(author(), &[(1.0, 2.0), (3.0, 4.0)]);
    history.append(op.clone());
    let before = history.visible_operations().to_vec();

    assert_eq!(history.undo(), Some(-1));
    assert_eq!(history.redo(), Some(0));
    assert_eq!(history.visible_operations(), before.as_slice());
    assert_eq!(history.visible_operations()[0], op);
}

#[test]
fn clear_resets_everything_and_is_not_undoable() {
    let mut history = RoomHistory::new();
    let a = author();
    history.append(stroke_operation(a, &[(0.0, 0.0)]));
    history.append(stroke_operation(a, &[(1.0, 1.0)]));

    history.clear();
    assert!(history.is_empty());
    assert_eq!(history.cursor(), -1);
    assert_eq!(history.undo(), None);
    assert_eq!(history.redo(), None);
}

#[test]
fn append_returns_the_stored_operation() {
    let mut history = RoomHistory::new();
    let op = stroke_operation(author(), &[(9.0, 9.0)]);
    let id = op.id;
    let stored = history.append(op);
    assert_eq!(stored.id, id);
    assert_eq!(stored.kind, OperationKind::Stroke);
}

//! Edge/gap layouts applied through the editor

use dual_layout::layout::{Edge, Gap, LayoutError, RelativeEntry, RelativePosition, RelativeTarget, Size};
use dual_layout::{ContainerId, ContainerPosition, EditError, Editor, Orientation, RelativeLayout};

const EPSILON: f64 = 1e-6;

fn assert_close(actual: &ContainerPosition, expected: ContainerPosition) {
    for (a, e) in [
        (actual.x, expected.x),
        (actual.y, expected.y),
        (actual.width, expected.width),
        (actual.height, expected.height),
    ] {
        assert!((a - e).abs() < EPSILON, "{:?} != {:?}", actual, expected);
    }
}

fn header_and_body(header: &ContainerId, body: &ContainerId) -> RelativeLayout {
    RelativeLayout::new()
        .with_entry(
            RelativeEntry::new(header.clone(), Size::new(390.0, 80.0))
                .with_horizontal(RelativePosition::screen(Edge::Left, Gap::zero()))
                .with_vertical(RelativePosition::screen(Edge::Top, Gap::px(0.0))),
        )
        .with_entry(
            RelativeEntry::new(body.clone(), Size::new(370.0, 200.0))
                .with_horizontal(RelativePosition::screen(Edge::Right, Gap::px(10.0)))
                .with_vertical(RelativePosition::new(
                    Edge::Top,
                    RelativeTarget::Container(header.clone()),
                    Edge::Bottom,
                    Gap::percent(1.0),
                )),
        )
}

#[test]
fn test_stacked_layout_applies_in_one_orientation() {
    let mut editor = Editor::default();
    let header = editor.add_container(None).unwrap();
    let body = editor.add_container(None).unwrap();
    let landscape_before = editor.state().containers[&body].position.landscape;

    editor
        .apply_relative_layout(&header_and_body(&header, &body), Orientation::Portrait)
        .expect("layout should solve");

    let state = editor.state();
    assert_close(&state.containers[&header].position.portrait, ContainerPosition::new(195.0, 40.0, 390.0, 80.0));
    // right edge 10px in from the frame, top 1% of 844 below the header
    assert_close(
        &state.containers[&body].position.portrait,
        ContainerPosition::new(195.0, 188.44, 370.0, 200.0),
    );
    assert_eq!(state.containers[&body].position.landscape, landscape_before);
}

#[test]
fn test_children_follow_their_solved_parent() {
    let mut editor = Editor::default();
    let header = editor.add_container(None).unwrap();
    let body = editor.add_container(None).unwrap();
    let badge = editor.add_container(Some(&header)).unwrap();
    let before = editor.state().containers[&badge].position.portrait;
    let header_before = editor.state().containers[&header].position.portrait;

    editor
        .apply_relative_layout(&header_and_body(&header, &body), Orientation::Portrait)
        .unwrap();

    let header_after = editor.state().containers[&header].position.portrait;
    let dx = header_after.x - header_before.x;
    let dy = header_after.y - header_before.y;
    assert_close(&editor.state().containers[&badge].position.portrait, before.translated(dx, dy));
}

#[test]
fn test_cycle_is_rejected_without_changes() {
    let mut editor = Editor::default();
    let a = editor.add_container(None).unwrap();
    let b = editor.add_container(None).unwrap();
    let before = editor.state().clone();

    let layout = RelativeLayout::new()
        .with_entry(RelativeEntry::new(a.clone(), Size::new(10.0, 10.0)).with_vertical(
            RelativePosition::new(Edge::Top, RelativeTarget::Container(b.clone()), Edge::Bottom, Gap::zero()),
        ))
        .with_entry(RelativeEntry::new(b.clone(), Size::new(10.0, 10.0)).with_vertical(
            RelativePosition::new(Edge::Top, RelativeTarget::Container(a.clone()), Edge::Bottom, Gap::zero()),
        ));

    let err = editor.apply_relative_layout(&layout, Orientation::Portrait).unwrap_err();
    assert!(matches!(
        err,
        EditError::Layout(LayoutError::CircularConstraint { .. })
    ));
    assert_eq!(editor.state(), &before);
}

#[test]
fn test_locked_entry_is_rejected() {
    let mut editor = Editor::default();
    let header = editor.add_container(None).unwrap();
    let body = editor.add_container(None).unwrap();
    editor.toggle_container_lock(&body).unwrap();

    assert!(matches!(
        editor.apply_relative_layout(&header_and_body(&header, &body), Orientation::Portrait),
        Err(EditError::Locked { .. })
    ));
}

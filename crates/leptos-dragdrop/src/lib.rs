//! Leptos DragDrop Utilities
//!
//! Mouse-event drag-and-drop for kanban boards: cards are dropped onto
//! columns, columns are dropped into slots between other columns.
//! Uses a movement threshold to distinguish click from drag.

use leptos::prelude::*;
use wasm_bindgen::JsCast;

/// What is being dragged
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DragKind {
    /// A card inside a column
    Card,
    /// A whole column
    Column,
}

/// A dragged element: its kind and the id it was registered with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dragged {
    pub kind: DragKind,
    pub id: u32,
}

/// Drop target types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// Drop a card into the column with this id
    Column(u32),
    /// Drop a column at this index
    Slot(usize),
}

impl DropTarget {
    /// Whether a dragged element of `kind` may land here
    pub fn accepts(self, kind: DragKind) -> bool {
        matches!(
            (kind, self),
            (DragKind::Card, DropTarget::Column(_)) | (DragKind::Column, DropTarget::Slot(_))
        )
    }
}

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: i32 = 5;

/// True once the pointer moved far enough from `start` to count as a drag
pub fn exceeds_threshold(start: (i32, i32), now: (i32, i32)) -> bool {
    (now.0 - start.0).abs() > DRAG_THRESHOLD_PX || (now.1 - start.1).abs() > DRAG_THRESHOLD_PX
}

/// DnD state signals
#[derive(Clone, Copy)]
pub struct DndSignals {
    pub dragging_read: ReadSignal<Option<Dragged>>,
    pub dragging_write: WriteSignal<Option<Dragged>>,
    pub drop_target_read: ReadSignal<Option<DropTarget>>,
    pub drop_target_write: WriteSignal<Option<DropTarget>>,
    pub drag_just_ended_read: ReadSignal<bool>,
    pub drag_just_ended_write: WriteSignal<bool>,
    /// Pending element (mousedown but not yet dragging)
    pub pending_read: ReadSignal<Option<Dragged>>,
    pub pending_write: WriteSignal<Option<Dragged>>,
    /// Start position for movement detection
    pub start_read: ReadSignal<(i32, i32)>,
    pub start_write: WriteSignal<(i32, i32)>,
}

impl DndSignals {
    /// Currently dragged element of the given kind, if any
    pub fn dragging(&self, kind: DragKind) -> Option<u32> {
        self.dragging_read
            .get()
            .filter(|dragged| dragged.kind == kind)
            .map(|dragged| dragged.id)
    }

    /// Whether `target` is the current drop target
    pub fn is_target(&self, target: DropTarget) -> bool {
        self.drop_target_read.get() == Some(target)
    }
}

pub fn create_dnd_signals() -> DndSignals {
    let (dragging_read, dragging_write) = signal(None::<Dragged>);
    let (drop_target_read, drop_target_write) = signal(None::<DropTarget>);
    let (drag_just_ended_read, drag_just_ended_write) = signal(false);
    let (pending_read, pending_write) = signal(None::<Dragged>);
    let (start_read, start_write) = signal((0i32, 0i32));
    DndSignals {
        dragging_read,
        dragging_write,
        drop_target_read,
        drop_target_write,
        drag_just_ended_read,
        drag_just_ended_write,
        pending_read,
        pending_write,
        start_read,
        start_write,
    }
}

/// End drag operation.
///
/// Uses `try_*` accessors: the document listeners outlive the component
/// that created the signals.
pub fn end_drag(dnd: &DndSignals) {
    let _ = dnd.dragging_write.try_set(None);
    let _ = dnd.drop_target_write.try_set(None);
    let _ = dnd.pending_write.try_set(None);
    let _ = dnd.drag_just_ended_write.try_set(true);

    if let Some(win) = web_sys::window() {
        let clear = dnd.drag_just_ended_write;
        let cb = wasm_bindgen::closure::Closure::<dyn FnMut()>::new(move || {
            let _ = clear.try_set(false);
        });
        let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(cb.as_ref().unchecked_ref(), 100);
        cb.forget();
    }
}

/// Create mousedown handler for a draggable card or column.
/// Records a pending drag with the start position.
pub fn make_on_mousedown(dnd: DndSignals, kind: DragKind, id: u32) -> impl Fn(web_sys::MouseEvent) + Copy + 'static {
    move |ev: web_sys::MouseEvent| {
        if ev.button() != 0 {
            return;
        }
        // Form controls inside cards and column headers keep their own mouse handling
        if let Some(target) = ev.target() {
            if target.dyn_ref::<web_sys::HtmlInputElement>().is_some()
                || target.dyn_ref::<web_sys::HtmlButtonElement>().is_some()
                || target.dyn_ref::<web_sys::HtmlSelectElement>().is_some()
            {
                return;
            }
        }
        // Cards sit inside columns; the innermost draggable wins
        ev.stop_propagation();
        dnd.pending_write.set(Some(Dragged { kind, id }));
        dnd.start_write.set((ev.client_x(), ev.client_y()));
    }
}

/// Create mouseenter handler for a drop target.
/// Targets that do not accept the dragged kind are ignored.
pub fn make_on_target_mouseenter(dnd: DndSignals, target: DropTarget) -> impl Fn(web_sys::MouseEvent) + Copy + 'static {
    move |_ev: web_sys::MouseEvent| {
        if let Some(dragged) = dnd.dragging_read.get_untracked() {
            if target.accepts(dragged.kind) {
                dnd.drop_target_write.set(Some(target));
            }
        }
    }
}

/// Create mouseleave handler
pub fn make_on_mouseleave(dnd: DndSignals) -> impl Fn(web_sys::MouseEvent) + Copy + 'static {
    move |_ev: web_sys::MouseEvent| {
        if dnd.dragging_read.get_untracked().is_some() {
            dnd.drop_target_write.set(None);
        }
    }
}

/// Bind document mousemove handler - starts the drag once the pointer moved enough
fn bind_global_mousemove(dnd: DndSignals) {
    use wasm_bindgen::closure::Closure;

    let on_mousemove = Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |ev: web_sys::MouseEvent| {
        let (Some(pending), Some(None)) = (
            dnd.pending_read.try_get_untracked().flatten(),
            dnd.dragging_read.try_get_untracked(),
        ) else {
            return;
        };
        let Some(start) = dnd.start_read.try_get_untracked() else {
            return;
        };
        if exceeds_threshold(start, (ev.client_x(), ev.client_y())) {
            let _ = dnd.dragging_write.try_set(Some(pending));
        }
    });

    if let Some(doc) = web_sys::window().and_then(|win| win.document()) {
        let _ = doc.add_event_listener_with_callback("mousemove", on_mousemove.as_ref().unchecked_ref());
    }
    on_mousemove.forget();
}

/// Bind document mouseup handler for drop detection.
///
/// `on_drop` only fires for a real drag that ended over a target
/// accepting the dragged kind; a plain click falls through to the element.
pub fn bind_global_mouseup<F>(dnd: DndSignals, on_drop: F)
where
    F: Fn(Dragged, DropTarget) + 'static,
{
    use wasm_bindgen::closure::Closure;

    let on_mouseup = Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |_ev: web_sys::MouseEvent| {
        // Signals are gone once the owning component unmounted
        let Some(dragging) = dnd.dragging_read.try_get_untracked() else {
            return;
        };
        let drop_target = dnd.drop_target_read.try_get_untracked().flatten();

        end_drag(&dnd);

        if let (Some(dragged), Some(target)) = (dragging, drop_target) {
            if target.accepts(dragged.kind) {
                on_drop(dragged, target);
            }
        }
    });

    if let Some(doc) = web_sys::window().and_then(|win| win.document()) {
        let _ = doc.add_event_listener_with_callback("mouseup", on_mouseup.as_ref().unchecked_ref());
    }
    on_mouseup.forget();

    bind_global_mousemove(dnd);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_separates_click_from_drag() {
        assert!(!exceeds_threshold((10, 10), (10, 10)));
        assert!(!exceeds_threshold((10, 10), (15, 5)));
        assert!(exceeds_threshold((10, 10), (16, 10)));
        assert!(exceeds_threshold((10, 10), (10, 4)));
    }

    #[test]
    fn test_targets_accept_matching_kind_only() {
        assert!(DropTarget::Column(3).accepts(DragKind::Card));
        assert!(!DropTarget::Column(3).accepts(DragKind::Column));
        assert!(DropTarget::Slot(0).accepts(DragKind::Column));
        assert!(!DropTarget::Slot(0).accepts(DragKind::Card));
    }
}

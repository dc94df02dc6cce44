#![no_main]

use std::cell::RefCell;
use std::rc::Rc;

use libfuzzer_sys::fuzz_target;

use cell_edit::{
    CellHost, CellId, CellState, EditorSurface, InputSignal, Key, LifecycleController, OpenOptions,
    Placement, SaveOptions, Scope, SurfaceSpec,
};

/// Bound the number of operations per input so each run stays fast.
const MAX_OPS: usize = 512;
const CELLS: [&str; 4] = ["a", "b", "c", "d"];
const TEXTS: [&str; 4] = ["", "one", "two", "three"];

struct Surface(Rc<RefCell<String>>);

impl EditorSurface for Surface {
    fn text(&self) -> String {
        self.0.borrow().clone()
    }

    fn focus(&mut self) {}

    fn destroy(self) {}
}

#[derive(Default)]
struct Host {
    live: Rc<RefCell<String>>,
}

impl CellHost for Host {
    type Surface = Surface;

    fn text(&self, cell: &CellId) -> Option<String> {
        Some(format!("rest-{cell}"))
    }

    fn set_text(&mut self, _cell: &CellId, _text: &str) {}

    fn set_marker(&mut self, _cell: &CellId, _marker: &str, _present: bool) {}

    fn placement(&self, _cell: &CellId) -> Placement {
        Placement::default()
    }

    fn create_surface(&mut self, _cell: &CellId, spec: SurfaceSpec) -> Surface {
        *self.live.borrow_mut() = spec.initial_text;
        Surface(self.live.clone())
    }
}

fn check_invariants(ctl: &LifecycleController<Host>) {
    let mut editing = 0;
    for record in ctl.cells().iter() {
        let open_here = ctl.active_cell() == Some(record.id());
        assert_eq!(record.previous().is_some(), open_here, "previous/open mismatch");
        if record.is_dirty() {
            assert!(record.original().is_some(), "dirty cell without baseline");
            assert_ne!(record.original(), Some(record.current()));
        }
        if !open_here && !record.is_dirty() {
            assert!(record.original().is_none(), "stale baseline on clean cell");
        }
        if record.state() == CellState::Editing {
            editing += 1;
        }
    }
    assert!(editing <= 1, "more than one open editor");
}

fuzz_target!(|data: &[u8]| {
    let mut ctl = LifecycleController::new(Host::default());
    let mut pending = Vec::new();

    for pair in data.chunks_exact(2).take(MAX_OPS) {
        let cell = CellId::from(CELLS[(pair[1] & 0b11) as usize]);
        let text = TEXTS[((pair[1] >> 2) & 0b11) as usize];
        let _ = match pair[0] % 13 {
            0 => ctl.open(&cell, OpenOptions::default()).map(|_| ()),
            1 => ctl.store(&cell).map(|_| ()),
            2 => ctl.cancel(&cell).map(|_| ()),
            3 => ctl.revert(&cell).map(|_| ()),
            4 => ctl.close(&cell).map(|_| ()),
            5 => {
                *ctl.host().live.borrow_mut() = text.to_string();
                ctl.handle_input(InputSignal::KeyUp(Key::Char('x'))).map(|_| ())
            }
            6 => ctl.handle_input(InputSignal::KeyDown(Key::Enter)).map(|_| ()),
            7 => ctl.handle_input(InputSignal::KeyDown(Key::Escape)).map(|_| ()),
            8 => ctl
                .prepare_save(&cell, SaveOptions::new("http://localhost/save"))
                .map(|save| pending.push(save)),
            9 => ctl
                .prepare_save_all(&Scope::all("doc"), SaveOptions::new("http://localhost/save"))
                .map(|save| pending.push(save)),
            10 if !pending.is_empty() => {
                let save = pending.remove(0);
                ctl.complete_save(save, Ok(())).map(|_| ())
            }
            11 if !pending.is_empty() => {
                let save = pending.remove(0);
                let err = cell_edit::RemoteWriteError::Transport("fuzz".to_string());
                ctl.complete_save(save, Err(err)).map(|_| ())
            }
            12 if !pending.is_empty() => {
                ctl.abandon_save(pending.remove(0));
                Ok(())
            }
            _ => Ok(()),
        };
        check_invariants(&ctl);
    }
});

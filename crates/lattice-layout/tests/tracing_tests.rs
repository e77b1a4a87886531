#![forbid(unsafe_code)]

//! Tracing integration tests.
//!
//! Recalculation spans enabled:
//!   cargo test -p lattice-layout --features tracing --test tracing_tests
//!
//! Without the feature the same passes run with a subscriber installed and
//! record nothing.

use std::sync::{Arc, Mutex};

use lattice_layout::{Canvas, GridLayoutManager, Rect};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

/// Records the name of every span and event.
struct NameCapture {
    names: Arc<Mutex<Vec<String>>>,
}

impl<S> tracing_subscriber::Layer<S> for NameCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        self.names
            .lock()
            .unwrap()
            .push(attrs.metadata().name().to_string());
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        self.names
            .lock()
            .unwrap()
            .push(event.metadata().name().to_string());
    }
}

fn with_captured_names<F: FnOnce()>(f: F) -> Vec<String> {
    let names = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(NameCapture {
        names: Arc::clone(&names),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = names.lock().unwrap().clone();
    captured
}

fn two_cell_pass() {
    let grid = GridLayoutManager::new();
    {
        let mut lock = grid.lock();
        lock.append_row()
            .border("thin_0%")
            .unwrap()
            .create(Canvas::fixed(4, 1).shared())
            .unwrap()
            .create(Canvas::fixed(4, 1).shared())
            .unwrap();
    }
    grid.set_container(Rect::new(0, 0, 20, 5));
}

#[test]
#[cfg(feature = "tracing")]
fn recalculation_opens_a_span() {
    let names = with_captured_names(two_cell_pass);
    assert!(
        names.iter().any(|name| name == "grid_recalculate"),
        "expected a grid_recalculate span, got {names:?}"
    );
}

#[test]
#[cfg(not(feature = "tracing"))]
fn zero_overhead_without_feature() {
    let names = with_captured_names(two_cell_pass);
    assert!(names.is_empty(), "unexpected trace output: {names:?}");
}

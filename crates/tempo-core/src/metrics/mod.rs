//! Metric events.
//!
//! Events are recorded through the `metrics` facade. The batch binary installs
//! no exporter, so emission is a no-op unless an embedding application
//! registers a recorder.

pub mod events;

/// Emit a metric event.
///
/// Calls `InternalEvent::emit()` on the given event.
///
/// ```ignore
/// use tempo_core::metrics::events::TableRowsWritten;
///
/// emit!(TableRowsWritten { rows: 42, table: "songs".to_string() });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

pub use emit;

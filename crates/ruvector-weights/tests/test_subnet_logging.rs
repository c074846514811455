//! Log output of the root-weight subnet filter.
//!
//! Kept in its own test binary so the thread-local subscriber installed
//! here is the only dispatcher the callsites ever see.

use std::fmt;
use std::sync::{Arc, Mutex};

use ruvector_weights::convert::convert_root_weight_uids_and_vals_to_tensor;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: Level,
    message: String,
    uid: Option<i64>,
}

impl Visit for CapturedEvent {
    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "uid" {
            self.uid = Some(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut captured =
            CapturedEvent { level: *event.metadata().level(), message: String::new(), uid: None };
        event.record(&mut captured);
        self.events.lock().unwrap().push(captured);
    }
}

#[test]
fn unavailable_subnet_emits_one_warning_naming_the_uid() {
    let layer = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    let dense = tracing::subscriber::with_default(subscriber, || {
        convert_root_weight_uids_and_vals_to_tensor(3, &[1, 3], &[100.0, 200.0], &[1, 2]).unwrap()
    });
    assert_eq!(dense, vec![0.0, 1.0, 0.0]);

    let events = layer.events.lock().unwrap();
    let warnings: Vec<&CapturedEvent> = events.iter().filter(|e| e.level == Level::WARN).collect();
    assert_eq!(warnings.len(), 1, "expected one warning, got {events:?}");
    assert_eq!(warnings[0].uid, Some(3));
    assert!(
        warnings[0].message.contains("subnet unavailable"),
        "unexpected message: {}",
        warnings[0].message
    );
}

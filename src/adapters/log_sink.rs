//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events
//! through the `log` facade (`env_logger` on the host).

use log::{debug, info, warn};

use crate::app::events::{AppEvent, OfflineCause, SystemStatus};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { tick, staleness } => {
                info!(
                    "START | tick={}ms | staleness={}ms",
                    tick.as_millis(),
                    staleness.as_millis()
                );
            }
            AppEvent::StatusChanged { from, to, cause } => {
                let why = match cause {
                    Some(OfflineCause::Link(state)) => format!("link {state}"),
                    Some(OfflineCause::NoData) => "no frame yet".to_string(),
                    Some(OfflineCause::Stale(age)) => format!("frame {}ms old", age.as_millis()),
                    None => "fresh data".to_string(),
                };
                if *to == SystemStatus::Offline {
                    warn!("STATUS | {from} -> {to} | {why}");
                } else {
                    info!("STATUS | {from} -> {to} | {why}");
                }
            }
            AppEvent::CycleCompleted { seq, duties, held } => {
                let [fan, hum, led, pump] = duties;
                info!(
                    "CYCLE | #{seq} | fan={fan:.1}% hum={hum:.1}% led={led:.1}% pump={pump:.1}% | held={held}"
                );
            }
            AppEvent::ControllerHeld {
                actuator,
                reason,
                duty,
            } => {
                debug!("HOLD | {actuator} at {duty:.1}% | {reason:?}");
            }
            AppEvent::RecordFailed(e) => {
                warn!("RECORD | append failed: {e}");
            }
        }
    }
}

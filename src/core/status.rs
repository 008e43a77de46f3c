//! Running training summary shown next to the diagram.

use crate::event::UpdateEvent;
use crate::float_fmt::fmt_f64_fixed;

/// Merged view of every update seen so far. Absent fields in an event leave
/// the previous value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingStatus {
    pub epoch: Option<u64>,
    pub batch: Option<u64>,
    pub avg_error: Option<f64>,
    pub error: Option<String>,
    pub message: Option<String>,
    /// Number of events that carried weights.
    pub weight_updates: u64,
}

impl TrainingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &UpdateEvent) {
        if let Some(epoch) = event.epoch {
            self.epoch = Some(epoch);
        }
        if let Some(batch) = event.batch {
            self.batch = Some(batch);
        }
        if let Some(avg_error) = event.avg_error {
            self.avg_error = Some(avg_error);
        }
        if let Some(error) = &event.error {
            self.error = Some(error.clone());
        }
        if let Some(message) = &event.message {
            self.message = Some(message.clone());
        }
        if event.weights.is_some() {
            self.weight_updates += 1;
        }
    }

    /// Human-readable lines, one per known field.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(message) = &self.message {
            out.push(format!("Response: {message}"));
        }
        if let Some(error) = &self.error {
            out.push(format!("Live training error: {error}"));
        }
        if let Some(avg) = self.avg_error {
            out.push(format!("Average training error: {}", fmt_f64_fixed(avg, 4)));
        }
        if let Some(epoch) = self.epoch {
            out.push(format!("Current epoch: {epoch}"));
        }
        if let Some(batch) = self.batch {
            out.push(format!("Current batch: {batch}"));
        }
        out
    }
}

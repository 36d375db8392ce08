use log::warn;

use crate::engine::Anomaly;

/// Records anomalies the engine reports. It never changes the session's course.
#[derive(Debug)]
pub struct ErrorReporter {
    input: String,
    anomalies: Vec<Anomaly>,
}

impl ErrorReporter {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            anomalies: Vec::new(),
        }
    }

    pub fn report(&mut self, anomaly: &Anomaly) {
        warn!("Decoder reported {anomaly} while decoding {}", self.input);
        self.anomalies.push(anomaly.clone());
    }

    pub fn count(&self) -> usize {
        self.anomalies.len()
    }

    pub fn into_anomalies(self) -> Vec<Anomaly> {
        self.anomalies
    }
}

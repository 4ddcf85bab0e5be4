//! Usage and failure reporting.

use std::fmt;

/// Where usage events and failures are reported.
pub trait Telemetry: Send + Sync {
    fn track_event(&self, name: &str, properties: &[(&str, &str)]);

    fn track_exception(&self, site: &str, error: &dyn std::error::Error);
}

/// Sends telemetry to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn track_event(&self, name: &str, properties: &[(&str, &str)]) {
        tracing::debug!(event = name, "{}", Properties(properties));
    }

    fn track_exception(&self, site: &str, error: &dyn std::error::Error) {
        tracing::debug!(site, "exception: {}", error);
    }
}

struct Properties<'a>(&'a [(&'a str, &'a str)]);

impl fmt::Display for Properties<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

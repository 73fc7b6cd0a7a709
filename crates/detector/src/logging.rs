use crate::config::DetectorConfig;
use common::TelemetryGuard;

pub fn setup_logging(config: &DetectorConfig, telemetry: Option<&TelemetryGuard>) {
    common::setup_logging(config.environment, telemetry.map(TelemetryGuard::tracer));
}

//! Progress gauge fed by the engine's `-progress pipe:1` stream.

use std::sync::Arc;

use crate::registry::Registry;

/// Gauge value reported while the engine runs; `ready` sets 100.
const RUNNING_CEILING: f32 = 99.0;

/// Elapsed output time, in seconds, carried by one `-progress` line.
///
/// ffmpeg reports `out_time_us` and, despite its name, `out_time_ms` in
/// microseconds. Anything else (including `N/A`) yields `None`.
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let (key, value) = line.split_once('=')?;
    match key.trim() {
        "out_time_us" | "out_time_ms" => value
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|micros| *micros >= 0)
            .map(|micros| micros as f64 / 1_000_000.0),
        _ => None,
    }
}

/// Forwards engine progress to the registry record of one job.
#[derive(Clone)]
pub struct ProgressReporter {
    registry: Option<Arc<Registry>>,
    job_id: String,
    expected_duration: Option<f64>,
}

impl ProgressReporter {
    pub fn new(
        registry: Arc<Registry>,
        job_id: impl Into<String>,
        expected_duration: Option<f64>,
    ) -> Self {
        Self {
            registry: Some(registry),
            job_id: job_id.into(),
            expected_duration,
        }
    }

    /// A reporter that drops everything.
    pub fn noop(job_id: impl Into<String>) -> Self {
        Self {
            registry: None,
            job_id: job_id.into(),
            expected_duration: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Report `seconds` of output written so far.
    pub fn report_seconds(&self, seconds: f64) {
        let (Some(registry), Some(total)) = (&self.registry, self.expected_duration) else {
            return;
        };
        let percent = (seconds / total * 100.0) as f32;
        registry.report_progress(&self.job_id, percent.min(RUNNING_CEILING));
    }

    /// Feed one raw stdout line.
    pub fn report_line(&self, line: &str) {
        if let Some(seconds) = parse_progress_line(line) {
            self.report_seconds(seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BlobStore;
    use rstest::rstest;

    #[rstest]
    #[case("out_time_us=2500000", Some(2.5))]
    #[case("out_time_ms=1000000", Some(1.0))]
    #[case("out_time_us=N/A", None)]
    #[case("out_time_us=-9223372036854775807", None)]
    #[case("frame=42", None)]
    #[case("progress=end", None)]
    #[case("garbage", None)]
    fn test_parse_progress_line(#[case] line: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_progress_line(line), expected);
    }

    #[test]
    fn test_reports_percent_of_expected_duration() {
        let registry = Arc::new(Registry::in_memory(BlobStore::new("/unused")));
        let job = registry.create_job("concat").unwrap();
        let reporter = ProgressReporter::new(registry.clone(), &job.id, Some(10.0));

        reporter.report_line("out_time_us=2500000");
        assert_eq!(registry.get(&job.id).unwrap().progress, Some(25.0));

        reporter.report_line("out_time_us=1000000");
        assert_eq!(registry.get(&job.id).unwrap().progress, Some(25.0));

        reporter.report_line("out_time_us=60000000");
        assert_eq!(registry.get(&job.id).unwrap().progress, Some(99.0));
    }

    #[test]
    fn test_unknown_duration_reports_nothing() {
        let registry = Arc::new(Registry::in_memory(BlobStore::new("/unused")));
        let job = registry.create_job("thumbnail").unwrap();
        let reporter = ProgressReporter::new(registry.clone(), &job.id, None);
        reporter.report_line("out_time_us=2500000");
        assert_eq!(registry.get(&job.id).unwrap().progress, Some(0.0));

        ProgressReporter::noop("x").report_seconds(1.0);
    }
}

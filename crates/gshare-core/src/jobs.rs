//! Job accounting helpers.

use std::sync::LazyLock;

use regex::Regex;

static CORE_COUNT_METRIC: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"coreCount=(\d+)").ok());

/// Resolve the number of cores a job ran on.
///
/// Precedence: the reported actual count, then `coreCount=<n>` in the job
/// metrics string, then the definition's count if non-zero, then 1.
pub fn core_count(actual: Option<u32>, defined: Option<u32>, job_metrics: Option<&str>) -> u32 {
    if let Some(n) = actual {
        return n;
    }
    let from_metrics = job_metrics
        .zip(CORE_COUNT_METRIC.as_ref())
        .and_then(|(m, re)| re.captures(m))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    if let Some(n) = from_metrics {
        return n;
    }
    match defined {
        Some(n) if n != 0 => n,
        _ => 1,
    }
}

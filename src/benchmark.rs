//! Repeat-and-measure harness for drawing workloads.

use std::fmt;
use std::time::{Duration, Instant};

/// Timing summary of a [`BenchmarkRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkReport {
    /// Number of timed runs.
    pub samples: usize,
    /// Mean duration.
    pub average: Duration,
    /// Median duration.
    pub median: Duration,
    /// Slowest run.
    pub max: Duration,
    /// Fastest run.
    pub min: Duration,
}

impl BenchmarkReport {
    /// Summarise raw samples. `None` when there are none.
    pub fn from_samples(mut samples: Vec<Duration>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable();

        let n = samples.len();
        let total: Duration = samples.iter().sum();
        let median = if n % 2 == 0 {
            (samples[n / 2 - 1] + samples[n / 2]) / 2
        } else {
            samples[n / 2]
        };

        Some(Self {
            samples: n,
            average: total / n as u32,
            median,
            max: samples[n - 1],
            min: samples[0],
        })
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} runs: avg {:.3} ms, median {:.3} ms, max {:.3} ms, min {:.3} ms",
            self.samples,
            self.average.as_secs_f64() * 1e3,
            self.median.as_secs_f64() * 1e3,
            self.max.as_secs_f64() * 1e3,
            self.min.as_secs_f64() * 1e3,
        )
    }
}

/// Runs a unit of work a fixed number of times.
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkRun {
    /// How many times the work runs.
    pub repeats: usize,
}

impl BenchmarkRun {
    /// Zero repeats is treated as one.
    pub fn new(repeats: usize) -> Self {
        Self { repeats }
    }

    /// Time `work` on every repeat; `after` runs untimed after each one
    /// (e.g. clearing the surface). `None` for zero repeats.
    pub fn run<W, A>(&self, mut work: W, mut after: A) -> Option<BenchmarkReport>
    where
        W: FnMut(usize),
        A: FnMut(usize),
    {
        let mut samples = Vec::with_capacity(self.repeats);
        for i in 0..self.repeats {
            let start = Instant::now();
            work(i);
            samples.push(start.elapsed());
            after(i);
        }
        let report = BenchmarkReport::from_samples(samples);
        if let Some(report) = &report {
            log::info!("{report}");
        }
        report
    }
}

//! Time-indexed community matrices.
//!
//! A [`TimeMatrix`] is a row-major 2D table of kWh values indexed by
//! `(timestep, participant)`, with a parallel calendar axis of
//! [`SimTimestamp`]s. Production and consumption are each one instance;
//! both must share an identical time axis throughout the pipeline.

use std::ops::Range;

/// Calendar position of one simulation row.
///
/// After the monthly/hourly reduction, `day` is a synthetic representative
/// day (the month's 1-based ordinal within the season) rather than a real
/// day-of-month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTimestamp {
    /// Calendar month (1-12).
    pub month: u32,
    /// Day of month (1-31), or the representative-day ordinal after reduction.
    pub day: u32,
    /// Hour of day (0-23).
    pub hour: u32,
}

impl SimTimestamp {
    /// Creates a timestamp from calendar components.
    pub fn new(month: u32, day: u32, hour: u32) -> Self {
        Self { month, day, hour }
    }
}

/// Row-major numeric table indexed by `(timestep, participant)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMatrix {
    timestamps: Vec<SimTimestamp>,
    values: Vec<f64>,
    cols: usize,
}

impl TimeMatrix {
    /// Creates a zero-filled matrix over the given time axis.
    pub fn zeros(timestamps: Vec<SimTimestamp>, cols: usize) -> Self {
        let values = vec![0.0; timestamps.len() * cols];
        Self {
            timestamps,
            values,
            cols,
        }
    }

    /// Creates a matrix from row vectors. Every row must have the same
    /// length and there must be one row per timestamp.
    ///
    /// # Panics
    ///
    /// Panics if row count or any row length is inconsistent.
    pub fn from_rows(timestamps: Vec<SimTimestamp>, rows: Vec<Vec<f64>>) -> Self {
        assert_eq!(timestamps.len(), rows.len(), "row count must match time axis");
        let cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(timestamps.len() * cols);
        for row in &rows {
            assert_eq!(row.len(), cols, "all rows must have the same length");
            values.extend_from_slice(row);
        }
        Self {
            timestamps,
            values,
            cols,
        }
    }

    /// Number of timesteps (rows).
    pub fn rows(&self) -> usize {
        self.timestamps.len()
    }

    /// Number of participants (columns).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The calendar axis.
    pub fn timestamps(&self) -> &[SimTimestamp] {
        &self.timestamps
    }

    /// Value at `(timestep, participant)`.
    pub fn get(&self, t: usize, i: usize) -> f64 {
        debug_assert!(t < self.rows() && i < self.cols);
        self.values[t * self.cols + i]
    }

    /// Sets the value at `(timestep, participant)`.
    pub fn set(&mut self, t: usize, i: usize, value: f64) {
        debug_assert!(t < self.rows() && i < self.cols);
        self.values[t * self.cols + i] = value;
    }

    /// Adds `delta` to the value at `(timestep, participant)`.
    pub fn add(&mut self, t: usize, i: usize, delta: f64) {
        debug_assert!(t < self.rows() && i < self.cols);
        self.values[t * self.cols + i] += delta;
    }

    /// One timestep as a participant-indexed slice.
    pub fn row(&self, t: usize) -> &[f64] {
        &self.values[t * self.cols..(t + 1) * self.cols]
    }

    /// Sum of one timestep across all participants.
    pub fn row_total(&self, t: usize) -> f64 {
        self.row(t).iter().sum()
    }

    /// Sum of one participant's column across all timesteps.
    pub fn column_total(&self, i: usize) -> f64 {
        (0..self.rows()).map(|t| self.get(t, i)).sum()
    }

    /// Sum of every value in the matrix.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Sets an entire participant column to zero.
    pub fn zero_column(&mut self, i: usize) {
        for t in 0..self.rows() {
            self.set(t, i, 0.0);
        }
    }

    /// New matrix keeping only rows whose timestamp satisfies `keep`.
    pub fn filter_rows(&self, keep: impl Fn(&SimTimestamp) -> bool) -> Self {
        let mut timestamps = Vec::new();
        let mut values = Vec::new();
        for (t, ts) in self.timestamps.iter().enumerate() {
            if keep(ts) {
                timestamps.push(*ts);
                values.extend_from_slice(self.row(t));
            }
        }
        Self {
            timestamps,
            values,
            cols: self.cols,
        }
    }

    /// New matrix keeping only the listed participant columns, in order.
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        let mut out = Self::zeros(self.timestamps.clone(), indices.len());
        for t in 0..self.rows() {
            for (j, &i) in indices.iter().enumerate() {
                out.set(t, j, self.get(t, i));
            }
        }
        out
    }

    /// Contiguous row ranges sharing the same `(month, day)`, in axis order.
    pub fn day_ranges(&self) -> Vec<(u32, u32, Range<usize>)> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for t in 1..=self.rows() {
            let boundary = t == self.rows()
                || (self.timestamps[t].month, self.timestamps[t].day)
                    != (self.timestamps[start].month, self.timestamps[start].day);
            if boundary {
                let ts = self.timestamps[start];
                ranges.push((ts.month, ts.day, start..t));
                start = t;
            }
        }
        ranges
    }
}

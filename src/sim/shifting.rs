//! Smart-device demand shifting.
//!
//! Models deferrable appliances: a fixed daily quantity (dishwasher) and a
//! smaller every-third-day quantity (washing machine) are moved from each
//! day's community demand peak to a nearby high-production hour, for a
//! randomly chosen subset of participants. Load is only moved within the
//! 08:00 to 22:00 window and only when the source hour holds enough of it,
//! so per-participant daily totals are preserved.

use rand::Rng;
use rand::rngs::StdRng;

use crate::data::TimeMatrix;

/// First hour of the allowed shifting window (inclusive).
const WINDOW_START_HOUR: u32 = 8;
/// Last hour of the allowed shifting window (inclusive).
const WINDOW_END_HOUR: u32 = 22;
/// Energy moved once per day (kWh).
const DAILY_SHIFT_KWH: f64 = 0.64;
/// Energy moved on every third day (kWh).
const THIRD_DAY_SHIFT_KWH: f64 = 0.5;
/// Peaks, valleys, and shift targets considered per day.
const MAX_PEAKS: usize = 3;
/// Minimum prominence for a detected demand peak (kWh).
const MIN_PROMINENCE: f64 = 0.2;
/// Minimum spacing between detected peaks (samples).
const MIN_PEAK_SEPARATION: usize = 3;

/// Detects local maxima with at least `min_prominence` and pairwise spacing
/// of at least `min_distance` samples.
///
/// Prominence of a peak is its height above the higher of the two lowest
/// points reached while walking outward until a taller sample is met (or
/// the series ends). When peaks crowd closer than `min_distance`, taller
/// ones win. Returned indices are ascending.
pub fn find_peaks(values: &[f64], min_prominence: f64, min_distance: usize) -> Vec<usize> {
    let mut candidates = Vec::new();
    for i in 1..values.len().saturating_sub(1) {
        if values[i] > values[i - 1] && values[i] > values[i + 1] {
            let mut left_min = values[i];
            for j in (0..i).rev() {
                if values[j] > values[i] {
                    break;
                }
                left_min = left_min.min(values[j]);
            }
            let mut right_min = values[i];
            for &v in &values[i + 1..] {
                if v > values[i] {
                    break;
                }
                right_min = right_min.min(v);
            }
            let prominence = values[i] - left_min.max(right_min);
            if prominence >= min_prominence {
                candidates.push(i);
            }
        }
    }

    // taller peaks suppress smaller neighbours within min_distance
    candidates.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(std::cmp::Ordering::Equal));
    let mut kept: Vec<usize> = Vec::new();
    for &peak in &candidates {
        if kept.iter().all(|&k| peak.abs_diff(k) >= min_distance) {
            kept.push(peak);
        }
    }
    kept.sort_unstable();
    kept
}

/// Returns the indices of the `count` largest (or smallest) entries in
/// `values`, best first.
fn ranked_indices(indices: &[usize], values: &[f64], count: usize, largest: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..indices.len()).collect();
    order.sort_by(|&a, &b| {
        let cmp = values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal);
        if largest { cmp.reverse() } else { cmp }
    });
    order.into_iter().take(count).map(|k| indices[k]).collect()
}

/// Reschedules deferrable loads for a random subset of participants.
#[derive(Debug, Clone)]
pub struct DemandShifter {
    /// Share of participants owning smart devices (0 to 100).
    percentage: u32,
}

impl DemandShifter {
    pub fn new(percentage: u32) -> Self {
        Self { percentage }
    }

    /// Applies the shifting heuristic in place. No-op at 0 percent.
    ///
    /// Both matrices must share one time axis and one participant count.
    pub fn shift(&self, consumption: &mut TimeMatrix, production: &TimeMatrix, rng: &mut StdRng) {
        if self.percentage == 0 {
            return;
        }
        let n = consumption.cols();
        let n_shiftable = n * self.percentage as usize / 100;
        if n_shiftable == 0 {
            return;
        }
        let shiftable = rand::seq::index::sample(rng, n, n_shiftable).into_vec();

        for (_, day, range) in consumption.day_ranges() {
            let window: Vec<usize> = range
                .clone()
                .filter(|&t| {
                    let hour = consumption.timestamps()[t].hour;
                    (WINDOW_START_HOUR..=WINDOW_END_HOUR).contains(&hour)
                })
                .collect();
            if window.is_empty() {
                continue;
            }
            let demand_totals: Vec<f64> = window.iter().map(|&t| consumption.row_total(t)).collect();
            let pv_totals: Vec<f64> = window.iter().map(|&t| production.row_total(t)).collect();

            let detected = find_peaks(&demand_totals, MIN_PROMINENCE, MIN_PEAK_SEPARATION);
            let peak_hours = if detected.is_empty() {
                ranked_indices(&window, &demand_totals, MAX_PEAKS, true)
            } else {
                let peak_values: Vec<f64> = detected.iter().map(|&k| demand_totals[k]).collect();
                let peak_rows: Vec<usize> = detected.iter().map(|&k| window[k]).collect();
                ranked_indices(&peak_rows, &peak_values, MAX_PEAKS, true)
            };
            if peak_hours.is_empty() {
                continue;
            }
            let valley_hours = ranked_indices(&window, &demand_totals, MAX_PEAKS, false);
            // the highest-production hours usually cluster around one pv peak
            let targets = if pv_totals.iter().sum::<f64>() > 0.0 {
                ranked_indices(&window, &pv_totals, MAX_PEAKS, true)
            } else {
                valley_hours
            };
            if targets.is_empty() {
                continue;
            }

            Self::move_load(consumption, &shiftable, peak_hours[0], &targets, DAILY_SHIFT_KWH, rng);
            if day % 3 == 0 {
                let second = *peak_hours.get(1).unwrap_or(&peak_hours[0]);
                Self::move_load(consumption, &shiftable, second, &targets, THIRD_DAY_SHIFT_KWH, rng);
            }
        }
    }

    /// Moves `quantity` kWh from `from_row` to a random target row for every
    /// shiftable participant holding at least that much load at the source.
    fn move_load(
        consumption: &mut TimeMatrix,
        shiftable: &[usize],
        from_row: usize,
        targets: &[usize],
        quantity: f64,
        rng: &mut StdRng,
    ) {
        for &user in shiftable {
            if consumption.get(from_row, user) >= quantity {
                let to_row = targets[rng.random_range(0..targets.len())];
                consumption.add(from_row, user, -quantity);
                consumption.add(to_row, user, quantity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::data::SimTimestamp;

    fn day_matrix(days: u32, cols: usize, fill: impl Fn(u32, u32, usize) -> f64) -> TimeMatrix {
        let mut timestamps = Vec::new();
        let mut rows = Vec::new();
        for day in 1..=days {
            for hour in 0..24 {
                timestamps.push(SimTimestamp::new(6, day, hour));
                rows.push((0..cols).map(|i| fill(day, hour, i)).collect());
            }
        }
        TimeMatrix::from_rows(timestamps, rows)
    }

    #[test]
    fn find_peaks_detects_separated_maxima() {
        let values = [0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        assert_eq!(find_peaks(&values, 0.2, 3), vec![1, 5]);
    }

    #[test]
    fn find_peaks_ignores_low_prominence_bumps() {
        let values = [1.0, 1.1, 1.0, 1.05, 1.0];
        assert!(find_peaks(&values, 0.2, 3).is_empty());
    }

    #[test]
    fn find_peaks_keeps_taller_of_crowded_pair() {
        let values = [0.0, 1.0, 0.5, 2.0, 0.0];
        assert_eq!(find_peaks(&values, 0.2, 3), vec![3]);
    }

    #[test]
    fn find_peaks_handles_flat_series() {
        assert!(find_peaks(&[1.0; 10], 0.2, 3).is_empty());
        assert!(find_peaks(&[], 0.2, 3).is_empty());
    }

    #[test]
    fn zero_percentage_is_noop() {
        let mut consumption = day_matrix(1, 4, |_, h, _| if h == 19 { 3.0 } else { 1.0 });
        let production = day_matrix(1, 4, |_, h, _| if h == 12 { 5.0 } else { 0.0 });
        let before = consumption.clone();
        let mut rng = StdRng::seed_from_u64(1);
        DemandShifter::new(0).shift(&mut consumption, &production, &mut rng);
        assert_eq!(consumption, before);
    }

    #[test]
    fn shifting_preserves_daily_totals() {
        let mut consumption = day_matrix(3, 4, |_, h, _| if h == 19 { 3.0 } else { 1.0 });
        let production = day_matrix(3, 4, |_, h, _| if h == 12 { 5.0 } else { 0.0 });
        let daily_before: Vec<f64> = (0..3)
            .map(|d| (d * 24..(d + 1) * 24).map(|t| consumption.row_total(t)).sum())
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        DemandShifter::new(100).shift(&mut consumption, &production, &mut rng);
        let daily_after: Vec<f64> = (0..3)
            .map(|d| (d * 24..(d + 1) * 24).map(|t| consumption.row_total(t)).sum())
            .collect();
        for (before, after) in daily_before.iter().zip(&daily_after) {
            assert!((before - after).abs() < 1e-9);
        }
    }

    #[test]
    fn shifting_changes_the_peak_hour() {
        let mut consumption = day_matrix(1, 4, |_, h, _| if h == 19 { 3.0 } else { 1.0 });
        let production = day_matrix(1, 4, |_, h, _| if h == 12 { 5.0 } else { 0.0 });
        let mut rng = StdRng::seed_from_u64(5);
        DemandShifter::new(100).shift(&mut consumption, &production, &mut rng);
        // every participant gave up the daily quantity at hour 19
        for i in 0..4 {
            assert!((consumption.get(19, i) - (3.0 - DAILY_SHIFT_KWH)).abs() < 1e-9);
        }
    }

    #[test]
    fn load_never_moves_outside_the_window() {
        let mut consumption = day_matrix(2, 6, |_, h, _| if h == 19 { 4.0 } else { 1.0 });
        let production = day_matrix(2, 6, |_, _, _| 0.0);
        let before = consumption.clone();
        let mut rng = StdRng::seed_from_u64(11);
        DemandShifter::new(100).shift(&mut consumption, &production, &mut rng);
        for (t, ts) in consumption.timestamps().iter().enumerate() {
            if ts.hour < WINDOW_START_HOUR || ts.hour > WINDOW_END_HOUR {
                for i in 0..6 {
                    assert_eq!(consumption.get(t, i), before.get(t, i));
                }
            }
        }
    }

    #[test]
    fn insufficient_load_at_peak_skips_the_user() {
        // peak total stands out but each participant holds less than the
        // daily quantity there
        let mut consumption = day_matrix(1, 4, |_, h, _| if h == 19 { 0.5 } else { 0.1 });
        let production = day_matrix(1, 4, |_, h, _| if h == 12 { 5.0 } else { 0.0 });
        let before = consumption.clone();
        let mut rng = StdRng::seed_from_u64(3);
        DemandShifter::new(100).shift(&mut consumption, &production, &mut rng);
        assert_eq!(consumption, before);
    }

    #[test]
    fn third_day_shift_fires_only_on_divisible_days() {
        let mut consumption = day_matrix(3, 2, |_, h, _| match h {
            19 => 5.0,
            12 => 3.0,
            _ => 1.0,
        });
        let production = day_matrix(3, 2, |_, h, _| if h == 10 { 5.0 } else { 0.0 });
        let mut rng = StdRng::seed_from_u64(13);
        DemandShifter::new(100).shift(&mut consumption, &production, &mut rng);
        // day 1 and 2 lose only the daily quantity at the top peak, day 3
        // additionally loses the third-day quantity at the second peak
        let day3_peak2 = 2 * 24 + 12;
        assert!(consumption.get(day3_peak2, 0) < 3.0);
        assert!((consumption.get(12, 0) - 3.0).abs() < 1e-9);
    }
}

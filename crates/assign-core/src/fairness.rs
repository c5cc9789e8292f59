//! Fairness tracking over a sliding window (component C2).

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::model::{Booking, BookingStatus};

/// Computes per-interpreter workload over a sliding window and the
/// resulting fairness gap.
pub struct FairnessTracker<'a> {
    bookings: &'a [Booking],
}

impl<'a> FairnessTracker<'a> {
    pub fn new(bookings: &'a [Booking]) -> Self {
        Self { bookings }
    }

    /// Sum of assigned hours per interpreter, attributed by `created_at`
    /// (workload commit time, per the fairness-window design decision)
    /// within `[now - window_days, now]`.
    pub fn hours_by_interpreter(
        &self,
        scope: &[String],
        now: DateTime<Utc>,
        window_days: u32,
    ) -> HashMap<String, f64> {
        let cutoff = now - Duration::days(window_days as i64);
        let mut hours: HashMap<String, f64> = scope.iter().map(|e| (e.clone(), 0.0)).collect();

        for booking in self.bookings {
            if booking.booking_status == BookingStatus::Cancel {
                continue;
            }
            let Some(emp_code) = booking.interpreter_emp_code.as_ref() else {
                continue;
            };
            if !scope.contains(emp_code) {
                continue;
            }
            if booking.created_at < cutoff {
                continue;
            }
            let duration_hours = (booking.time_end - booking.time_start).num_minutes() as f64 / 60.0;
            *hours.entry(emp_code.clone()).or_insert(0.0) += duration_hours;
        }

        hours
    }

    pub fn gap(hours: &HashMap<String, f64>) -> f64 {
        if hours.len() <= 1 {
            return 0.0;
        }
        let max = hours.values().cloned().fold(f64::MIN, f64::max);
        let min = hours.values().cloned().fold(f64::MAX, f64::min);
        max - min
    }

    /// Projected gap if `emp_code` received `duration_hours` more.
    pub fn simulate_assign(
        hours: &HashMap<String, f64>,
        emp_code: &str,
        duration_hours: f64,
    ) -> f64 {
        let mut projected = hours.clone();
        *projected.entry(emp_code.to_string()).or_insert(0.0) += duration_hours;
        Self::gap(&projected)
    }
}

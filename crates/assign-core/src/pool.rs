//! Deferred-booking pool (component C8).
//!
//! Pool state lives on the booking row itself (`pool_status`, deadline
//! fields); this module is the logical view plus the pure rules for
//! deadlines and the atomic "claim" transition used for worker exclusion.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Booking, PoolStatus};
use crate::policy::MeetingTypePriority;

/// Logical view of a booking tracked by the pool.
pub struct PoolEntry<'a> {
    pub booking: &'a Booking,
}

pub struct Pool;

impl Pool {
    /// `poolDeadlineTime = timeStart − max(1, urgentThresholdDays) days`.
    pub fn deadline_for(time_start: DateTime<Utc>, thresholds: &MeetingTypePriority) -> DateTime<Utc> {
        let days = thresholds.urgent_threshold_days.max(1.0);
        time_start - Duration::seconds((days * 86_400.0) as i64)
    }

    /// Place `booking` into the pool with freshly computed deadline fields.
    pub fn enqueue(booking: &mut Booking, now: DateTime<Utc>, thresholds: &MeetingTypePriority) {
        booking.pool_status = Some(PoolStatus::Waiting);
        booking.pool_entry_time = Some(now);
        booking.pool_deadline_time = Some(Self::deadline_for(booking.time_start, thresholds));
        booking.pool_processing_attempts = 0;
    }

    /// A pool entry is ready once its deadline has passed.
    pub fn is_ready(booking: &Booking, now: DateTime<Utc>) -> bool {
        matches!(booking.pool_status, Some(PoolStatus::Waiting) | Some(PoolStatus::Ready))
            && booking
                .pool_deadline_time
                .map(|deadline| deadline <= now)
                .unwrap_or(false)
    }

    /// Atomic conditional claim: succeeds only when currently waiting/ready.
    /// Returns `true` if the caller now owns the entry.
    pub fn mark_processing(booking: &mut Booking) -> bool {
        match booking.pool_status {
            Some(PoolStatus::Waiting) | Some(PoolStatus::Ready) => {
                booking.pool_status = Some(PoolStatus::Processing);
                true
            }
            _ => false,
        }
    }

    pub fn fail_attempt(booking: &mut Booking) {
        booking.pool_processing_attempts += 1;
        booking.pool_status = Some(PoolStatus::Waiting);
    }

    /// Remove the booking from pool tracking entirely (I4).
    pub fn remove(booking: &mut Booking) {
        booking.pool_status = None;
        booking.pool_entry_time = None;
        booking.pool_deadline_time = None;
        booking.pool_processing_attempts = 0;
    }

    /// Recovery sweep: entries stuck in `processing` longer than `stale_after`
    /// are reset to `waiting`.
    pub fn recover_stale(booking: &mut Booking, now: DateTime<Utc>, stale_after: Duration) {
        if booking.pool_status == Some(PoolStatus::Processing) {
            if let Some(entry_time) = booking.pool_entry_time {
                if now - entry_time > stale_after {
                    booking.pool_status = Some(PoolStatus::Waiting);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AutoAssignStatus, BookingStatus, MeetingType};

    fn booking(now: DateTime<Utc>, lead_days: i64) -> Booking {
        Booking {
            booking_id: 1,
            created_at: now,
            owner_emp_code: "owner".into(),
            owner_group: None,
            meeting_type: MeetingType::General,
            dr_type: None,
            time_start: now + Duration::days(lead_days),
            time_end: now + Duration::days(lead_days) + Duration::hours(1),
            meeting_room: None,
            language_code: None,
            selected_interpreter_emp_code: None,
            chairman_email: None,
            booking_status: BookingStatus::Waiting,
            interpreter_emp_code: None,
            auto_assign_at: now,
            auto_assign_status: AutoAssignStatus::Pending,
            auto_assign_locked_at: None,
            auto_assign_locked_by: None,
            pool_status: None,
            pool_entry_time: None,
            pool_deadline_time: None,
            pool_processing_attempts: 0,
            forward_environment_ids: Vec::new(),
        }
    }

    #[test]
    fn enqueue_sets_deadline_before_time_start() {
        let now = Utc::now();
        let mut b = booking(now, 30);
        let thresholds = MeetingTypePriority {
            urgent_threshold_days: 2.0,
            general_threshold_days: 14.0,
        };
        Pool::enqueue(&mut b, now, &thresholds);
        assert_eq!(b.pool_status, Some(PoolStatus::Waiting));
        assert!(b.pool_deadline_time.unwrap() < b.time_start);
    }

    #[test]
    fn not_ready_before_deadline() {
        let now = Utc::now();
        let mut b = booking(now, 30);
        let thresholds = MeetingTypePriority::default();
        Pool::enqueue(&mut b, now, &thresholds);
        assert!(!Pool::is_ready(&b, now));
    }

    #[test]
    fn ready_once_deadline_passes() {
        let now = Utc::now();
        let mut b = booking(now, 30);
        let thresholds = MeetingTypePriority::default();
        Pool::enqueue(&mut b, now, &thresholds);
        let deadline = b.pool_deadline_time.unwrap();
        assert!(Pool::is_ready(&b, deadline));
    }

    #[test]
    fn mark_processing_then_remove_clears_pool_state() {
        let now = Utc::now();
        let mut b = booking(now, 30);
        let thresholds = MeetingTypePriority::default();
        Pool::enqueue(&mut b, now, &thresholds);
        assert!(Pool::mark_processing(&mut b));
        assert!(!Pool::mark_processing(&mut b), "already claimed");
        Pool::remove(&mut b);
        assert_eq!(b.pool_status, None);
        assert_eq!(b.pool_entry_time, None);
        assert_eq!(b.pool_deadline_time, None);
    }

    #[test]
    fn stale_processing_entries_are_recovered() {
        let now = Utc::now();
        let mut b = booking(now, 30);
        let thresholds = MeetingTypePriority::default();
        Pool::enqueue(&mut b, now, &thresholds);
        Pool::mark_processing(&mut b);
        let later = now + Duration::hours(2);
        Pool::recover_stale(&mut b, later, Duration::hours(1));
        assert_eq!(b.pool_status, Some(PoolStatus::Waiting));
    }
}

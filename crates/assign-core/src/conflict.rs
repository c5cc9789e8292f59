//! Time-overlap conflict detection (component C5).

use chrono::{DateTime, Utc};

use crate::model::{Booking, BookingStatus};

pub struct ConflictChecker<'a> {
    bookings: &'a [Booking],
}

impl<'a> ConflictChecker<'a> {
    pub fn new(bookings: &'a [Booking]) -> Self {
        Self { bookings }
    }

    pub fn has_interpreter_conflict(
        &self,
        emp_code: &str,
        time_start: DateTime<Utc>,
        time_end: DateTime<Utc>,
        exclude_booking_id: Option<i64>,
    ) -> Option<i64> {
        self.bookings
            .iter()
            .filter(|b| b.booking_status != BookingStatus::Cancel)
            .filter(|b| Some(b.booking_id) != exclude_booking_id)
            .filter(|b| b.interpreter_emp_code.as_deref() == Some(emp_code))
            .find(|b| overlaps(b.time_start, b.time_end, time_start, time_end))
            .map(|b| b.booking_id)
    }

    pub fn has_room_conflict(
        &self,
        room: &str,
        time_start: DateTime<Utc>,
        time_end: DateTime<Utc>,
        exclude_booking_id: Option<i64>,
    ) -> Option<i64> {
        self.bookings
            .iter()
            .filter(|b| b.booking_status != BookingStatus::Cancel)
            .filter(|b| Some(b.booking_id) != exclude_booking_id)
            .filter(|b| b.meeting_room.as_deref() == Some(room))
            .find(|b| overlaps(b.time_start, b.time_end, time_start, time_end))
            .map(|b| b.booking_id)
    }

    /// `chairmanAvailable` (§4.5): same half-open overlap predicate as the
    /// interpreter/room checks, against `Booking.chairman_email`.
    pub fn chairman_available(
        &self,
        email: &str,
        time_start: DateTime<Utc>,
        time_end: DateTime<Utc>,
        exclude_booking_id: Option<i64>,
    ) -> ChairmanAvailability {
        let conflicting_booking_id = self
            .bookings
            .iter()
            .filter(|b| b.booking_status != BookingStatus::Cancel)
            .filter(|b| Some(b.booking_id) != exclude_booking_id)
            .filter(|b| b.chairman_email.as_deref() == Some(email))
            .find(|b| overlaps(b.time_start, b.time_end, time_start, time_end))
            .map(|b| b.booking_id);

        ChairmanAvailability {
            available: conflicting_booking_id.is_none(),
            conflicting_booking_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChairmanAvailability {
    pub available: bool,
    pub conflicting_booking_id: Option<i64>,
}

fn overlaps(
    existing_start: DateTime<Utc>,
    existing_end: DateTime<Utc>,
    candidate_start: DateTime<Utc>,
    candidate_end: DateTime<Utc>,
) -> bool {
    existing_start < candidate_end && existing_end > candidate_start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AutoAssignStatus, MeetingType};
    use chrono::Duration;

    fn booking(id: i64, emp: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Booking {
        Booking {
            booking_id: id,
            created_at: start,
            owner_emp_code: "owner".into(),
            owner_group: None,
            meeting_type: MeetingType::General,
            dr_type: None,
            time_start: start,
            time_end: end,
            meeting_room: Some("room-1".into()),
            language_code: None,
            selected_interpreter_emp_code: None,
            chairman_email: Some("chair@example.com".into()),
            booking_status: BookingStatus::Approve,
            interpreter_emp_code: Some(emp.to_string()),
            auto_assign_at: start,
            auto_assign_status: AutoAssignStatus::Done,
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
    fn exact_touching_is_not_a_conflict() {
        let now = Utc::now();
        let existing = booking(1, "E1", now, now + Duration::hours(1));
        let bookings = vec![existing];
        let checker = ConflictChecker::new(&bookings);
        let result = checker.has_interpreter_conflict(
            "E1",
            now + Duration::hours(1),
            now + Duration::hours(2),
            None,
        );
        assert!(result.is_none());
    }

    #[test]
    fn overlapping_interval_is_a_conflict() {
        let now = Utc::now();
        let existing = booking(1, "E1", now, now + Duration::hours(2));
        let bookings = vec![existing];
        let checker = ConflictChecker::new(&bookings);
        let result = checker.has_interpreter_conflict(
            "E1",
            now + Duration::hours(1),
            now + Duration::hours(3),
            None,
        );
        assert_eq!(result, Some(1));
    }

    #[test]
    fn cancelled_booking_does_not_conflict() {
        let now = Utc::now();
        let mut existing = booking(1, "E1", now, now + Duration::hours(2));
        existing.booking_status = BookingStatus::Cancel;
        let bookings = vec![existing];
        let checker = ConflictChecker::new(&bookings);
        let result = checker.has_interpreter_conflict("E1", now, now + Duration::hours(1), None);
        assert!(result.is_none());
    }

    #[test]
    fn excluded_booking_id_is_ignored() {
        let now = Utc::now();
        let existing = booking(1, "E1", now, now + Duration::hours(2));
        let bookings = vec![existing];
        let checker = ConflictChecker::new(&bookings);
        let result =
            checker.has_interpreter_conflict("E1", now, now + Duration::hours(1), Some(1));
        assert!(result.is_none());
    }

    #[test]
    fn room_conflict_detected() {
        let now = Utc::now();
        let existing = booking(1, "E1", now, now + Duration::hours(2));
        let bookings = vec![existing];
        let checker = ConflictChecker::new(&bookings);
        let result = checker.has_room_conflict("room-1", now, now + Duration::hours(1), None);
        assert_eq!(result, Some(1));
    }

    #[test]
    fn chairman_conflict_reports_the_conflicting_booking() {
        let now = Utc::now();
        let existing = booking(1, "E1", now, now + Duration::hours(2));
        let bookings = vec![existing];
        let checker = ConflictChecker::new(&bookings);
        let result = checker.chairman_available("chair@example.com", now + Duration::hours(1), now + Duration::hours(3), None);
        assert!(!result.available);
        assert_eq!(result.conflicting_booking_id, Some(1));
    }

    #[test]
    fn chairman_available_when_no_overlap() {
        let now = Utc::now();
        let existing = booking(1, "E1", now, now + Duration::hours(1));
        let bookings = vec![existing];
        let checker = ConflictChecker::new(&bookings);
        let result = checker.chairman_available("chair@example.com", now + Duration::hours(1), now + Duration::hours(2), None);
        assert!(result.available);
        assert_eq!(result.conflicting_booking_id, None);
    }
}

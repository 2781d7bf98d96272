use crate::bookings::BookingStatus;

/// Service for managing booking status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Confirmed, Cancelled
    /// - Confirmed → Cancelled
    /// - Cancelled → (none)
    ///
    /// Same-status transitions are rejected so that a double confirm or a
    /// double cancel surfaces as a conflict.
    pub fn is_valid_transition(from: BookingStatus, to: BookingStatus) -> bool {
        matches!(
            (from, to),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    /// Attempt to transition from one status to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: BookingStatus, to: BookingStatus) -> Result<BookingStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }

    /// Items, details and payments may change until a booking is cancelled
    pub fn is_mutable(status: BookingStatus) -> bool {
        status != BookingStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
    ];

    #[test]
    fn test_pending_to_confirmed() {
        assert!(StatusMachine::is_valid_transition(
            BookingStatus::Pending,
            BookingStatus::Confirmed
        ));
    }

    #[test]
    fn test_pending_to_cancelled() {
        assert!(StatusMachine::is_valid_transition(
            BookingStatus::Pending,
            BookingStatus::Cancelled
        ));
    }

    #[test]
    fn test_confirmed_to_cancelled() {
        assert!(StatusMachine::is_valid_transition(
            BookingStatus::Confirmed,
            BookingStatus::Cancelled
        ));
    }

    #[test]
    fn test_confirmed_never_returns_to_pending() {
        assert!(!StatusMachine::is_valid_transition(
            BookingStatus::Confirmed,
            BookingStatus::Pending
        ));
    }

    #[test]
    fn test_nothing_leaves_cancelled() {
        for to in ALL {
            assert!(!StatusMachine::is_valid_transition(BookingStatus::Cancelled, to));
        }
    }

    #[test]
    fn test_same_status_is_rejected() {
        for status in ALL {
            assert!(!StatusMachine::is_valid_transition(status, status));
        }
    }

    #[test]
    fn test_transition_error_message() {
        let err = StatusMachine::transition(BookingStatus::Confirmed, BookingStatus::Confirmed)
            .unwrap_err();
        assert_eq!(err, "Invalid status transition from confirmed to confirmed");
        assert_eq!(
            StatusMachine::transition(BookingStatus::Pending, BookingStatus::Confirmed),
            Ok(BookingStatus::Confirmed)
        );
    }

    #[test]
    fn test_is_mutable() {
        assert!(StatusMachine::is_mutable(BookingStatus::Pending));
        assert!(StatusMachine::is_mutable(BookingStatus::Confirmed));
        assert!(!StatusMachine::is_mutable(BookingStatus::Cancelled));
    }
}

//! Environment-derived configuration.
//!
//! Centralizes the handful of environment variables the core consults so
//! nothing reaches for `std::env::var` ad hoc.

#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// How many months ahead an admin may forward a booking.
    pub forward_month_limit: u32,
    /// Whether the forwarding workflow is enabled for this deployment.
    pub forwarding_enabled: bool,
    /// Whether the room-booking branch (bypasses interpreter assignment) is enabled.
    pub room_booking_enabled: bool,
    /// Whether Teams calendar integration is enabled.
    pub teams_integration_enabled: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            forward_month_limit: 1,
            forwarding_enabled: false,
            room_booking_enabled: false,
            teams_integration_enabled: false,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            forward_month_limit: read_u32("FORWARD_MONTH_LIMIT", 1),
            forwarding_enabled: read_bool("FEATURE_FORWARDING", false),
            room_booking_enabled: read_bool("FEATURE_ROOM_BOOKING", false),
            teams_integration_enabled: read_bool("FEATURE_TEAMS_INTEGRATION", false),
        }
    }
}

fn read_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn read_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

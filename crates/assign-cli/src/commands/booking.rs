use assign_core::{AssignmentService, BookingStatus, CreateBookingRequest, DrType, MeetingType, NamedLockRegistry};
use chrono::{DateTime, Utc};
use clap::Subcommand;

use crate::json_store::JsonFileStore;
use crate::PolicyStoreImpl;

type Service = AssignmentService<JsonFileStore, PolicyStoreImpl, NamedLockRegistry>;

#[derive(Subcommand)]
pub enum BookingAction {
    /// Create a booking and compute its auto-assign deadline
    Create {
        #[arg(long)]
        booking_id: i64,
        #[arg(long)]
        owner_emp_code: String,
        #[arg(long)]
        owner_group: Option<String>,
        #[arg(long, value_enum)]
        meeting_type: MeetingTypeArg,
        #[arg(long, value_enum)]
        dr_type: Option<DrTypeArg>,
        /// RFC3339 timestamp
        #[arg(long)]
        time_start: DateTime<Utc>,
        /// RFC3339 timestamp
        #[arg(long)]
        time_end: DateTime<Utc>,
        #[arg(long)]
        meeting_room: Option<String>,
        #[arg(long)]
        language_code: Option<String>,
        #[arg(long)]
        selected_interpreter: Option<String>,
        #[arg(long)]
        chairman_email: Option<String>,
    },
    /// Cancel a booking from any non-terminal state
    Cancel { booking_id: i64 },
    /// Apply a direct status transition (validated against the transition table)
    PatchStatus {
        booking_id: i64,
        #[arg(value_enum)]
        status: BookingStatusArg,
    },
    /// Show the derived auto-assign ETA for a booking
    Eta { booking_id: i64 },
    /// Print one booking as JSON
    Show { booking_id: i64 },
    /// List all bookings as JSON
    List,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum MeetingTypeArg {
    Dr,
    Vip,
    Weekly,
    General,
    Urgent,
    President,
    Other,
}

impl From<MeetingTypeArg> for MeetingType {
    fn from(value: MeetingTypeArg) -> Self {
        match value {
            MeetingTypeArg::Dr => MeetingType::Dr,
            MeetingTypeArg::Vip => MeetingType::Vip,
            MeetingTypeArg::Weekly => MeetingType::Weekly,
            MeetingTypeArg::General => MeetingType::General,
            MeetingTypeArg::Urgent => MeetingType::Urgent,
            MeetingTypeArg::President => MeetingType::President,
            MeetingTypeArg::Other => MeetingType::Other,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum DrTypeArg {
    DrPr,
    DrI,
    DrIi,
    DrK,
    Other,
}

impl From<DrTypeArg> for DrType {
    fn from(value: DrTypeArg) -> Self {
        match value {
            DrTypeArg::DrPr => DrType::DrPr,
            DrTypeArg::DrI => DrType::DrI,
            DrTypeArg::DrIi => DrType::DrIi,
            DrTypeArg::DrK => DrType::DrK,
            DrTypeArg::Other => DrType::Other,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum BookingStatusArg {
    Waiting,
    Approve,
    Cancel,
    Complet,
}

impl From<BookingStatusArg> for BookingStatus {
    fn from(value: BookingStatusArg) -> Self {
        match value {
            BookingStatusArg::Waiting => BookingStatus::Waiting,
            BookingStatusArg::Approve => BookingStatus::Approve,
            BookingStatusArg::Cancel => BookingStatus::Cancel,
            BookingStatusArg::Complet => BookingStatus::Complet,
        }
    }
}

pub async fn run(service: &Service, action: BookingAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        BookingAction::Create {
            booking_id,
            owner_emp_code,
            owner_group,
            meeting_type,
            dr_type,
            time_start,
            time_end,
            meeting_room,
            language_code,
            selected_interpreter,
            chairman_email,
        } => {
            let booking = service
                .create_booking(CreateBookingRequest {
                    booking_id,
                    owner_emp_code,
                    owner_group,
                    meeting_type: meeting_type.into(),
                    dr_type: dr_type.map(Into::into),
                    time_start,
                    time_end,
                    meeting_room,
                    language_code,
                    selected_interpreter_emp_code: selected_interpreter,
                    chairman_email,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }
        BookingAction::Cancel { booking_id } => {
            let booking = service.cancel_booking(booking_id).await?;
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }
        BookingAction::PatchStatus { booking_id, status } => {
            let booking = service.patch_booking_status(booking_id, status.into()).await?;
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }
        BookingAction::Eta { booking_id } => {
            let eta = service.compute_eta(booking_id).await?;
            println!(
                "{}",
                serde_json::json!({
                    "urgentFrom": eta.urgent_from,
                    "schedulerFrom": eta.scheduler_from,
                    "firstAutoAssignAt": eta.first_auto_assign_at,
                    "etaSeconds": eta.eta_seconds,
                })
            );
        }
        BookingAction::Show { booking_id } => {
            let booking = service.get_booking(booking_id).await?;
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }
        BookingAction::List => {
            let bookings = service.list_bookings().await?;
            println!("{}", serde_json::to_string_pretty(&bookings)?);
        }
    }
    Ok(())
}

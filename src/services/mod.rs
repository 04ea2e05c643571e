pub mod outbox_relay;
pub mod schedule_service;

pub use outbox_relay::{OutboxRelay, RelayReport};
pub use schedule_service::{
    CreateScheduleRequest, ScheduleError, ScheduleService, ScheduleView, UpdateScheduleRequest,
};

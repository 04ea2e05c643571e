use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use proptest::strategy::Just;

use courier_core::messaging::{PayloadMetadata, SchedulePayload};
use courier_core::state_machine::{DeliveryEvent, DeliveryState};

/// Strategy for generating any delivery state
pub fn delivery_state_strategy() -> impl Strategy<Value = DeliveryState> {
    prop_oneof![
        Just(DeliveryState::Scheduled),
        Just(DeliveryState::Sent),
        Just(DeliveryState::Canceled),
        Just(DeliveryState::Failed),
    ]
}

/// Strategy for generating terminal delivery states
pub fn terminal_state_strategy() -> impl Strategy<Value = DeliveryState> {
    prop_oneof![
        Just(DeliveryState::Sent),
        Just(DeliveryState::Canceled),
        Just(DeliveryState::Failed),
    ]
}

/// Strategy for generating delivery events
pub fn delivery_event_strategy() -> impl Strategy<Value = DeliveryEvent> {
    prop_oneof![
        Just(DeliveryEvent::MarkSent),
        Just(DeliveryEvent::Cancel),
        "[a-zA-Z0-9 .,]{1,64}".prop_map(DeliveryEvent::Fail),
    ]
}

/// Strategy for generating recipient addresses
pub fn recipient_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.]{0,20}@[a-z]{2,10}\\.(com|org|net)"
}

/// Strategy for generating message bodies
pub fn message_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?]{1,200}"
}

/// Strategy for generating channel names from the seeded set
pub fn channel_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("email".to_string()),
        Just("sms".to_string()),
        Just("push".to_string()),
        Just("whatsapp".to_string()),
    ]
}

/// Strategy for generating scheduled datetimes within a realistic window
pub fn scheduled_datetime_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    // Seconds across roughly 2020-2035
    (1_577_836_800i64..2_051_222_400i64)
        .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
}

/// Strategy for generating full schedule payloads
pub fn schedule_payload_strategy() -> impl Strategy<Value = SchedulePayload> {
    (
        1i64..1_000_000,
        recipient_strategy(),
        message_strategy(),
        scheduled_datetime_strategy(),
        channel_name_strategy(),
    )
        .prop_map(|(id, recipient, message, scheduled_datetime, channel)| SchedulePayload {
            id,
            recipient,
            message,
            scheduled_datetime,
            channel,
            status: DeliveryState::Scheduled.to_string(),
            metadata: PayloadMetadata::new(),
        })
}

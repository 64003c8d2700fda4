use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("askme.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("askme.client.request_errors");

pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("askme.stream.fragments");
pub(crate) static STREAM_BYTES: Counter = Counter::new("askme.stream.bytes");
pub(crate) static DECODE_ERRORS: Counter = Counter::new("askme.stream.decode_errors");
pub(crate) static STREAM_TTFF: Moments =
    Moments::new("askme.stream.time_to_first_fragment_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("askme.stream.duration_seconds");

pub(crate) static RELAY_CANCELLATIONS: Counter = Counter::new("askme.relay.cancellations");
pub(crate) static RELAY_ERRORS: Counter = Counter::new("askme.relay.errors");

pub(crate) static CHAT_TURNS: Counter = Counter::new("askme.chat.turns");
pub(crate) static CHAT_TURN_ERRORS: Counter = Counter::new("askme.chat.turn_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&DECODE_ERRORS);
    collector.register_moments(&STREAM_TTFF);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&RELAY_CANCELLATIONS);
    collector.register_counter(&RELAY_ERRORS);

    collector.register_counter(&CHAT_TURNS);
    collector.register_counter(&CHAT_TURN_ERRORS);
}

use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("pdfchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("pdfchat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("pdfchat.client.request_duration_seconds");
pub(crate) static CLIENT_UPLOAD_BYTES: Counter = Counter::new("pdfchat.client.upload_bytes");

pub(crate) static CONTROLLER_VALIDATION_REJECTIONS: Counter =
    Counter::new("pdfchat.controller.validation_rejections");
pub(crate) static CONTROLLER_SERVER_ERRORS: Counter =
    Counter::new("pdfchat.controller.server_errors");
pub(crate) static CONTROLLER_TRANSPORT_ERRORS: Counter =
    Counter::new("pdfchat.controller.transport_errors");
pub(crate) static CONTROLLER_CANCELLATIONS: Counter =
    Counter::new("pdfchat.controller.cancellations");
pub(crate) static CONTROLLER_SILENT_ERRORS: Counter =
    Counter::new("pdfchat.controller.silent_errors");

pub(crate) static CHAT_MESSAGES: Counter = Counter::new("pdfchat.chat.messages");
pub(crate) static CHAT_ANSWERS: Counter = Counter::new("pdfchat.chat.answers");
pub(crate) static CHAT_ROUND_TRIP: Moments = Moments::new("pdfchat.chat.round_trip_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);
    collector.register_counter(&CLIENT_UPLOAD_BYTES);

    collector.register_counter(&CONTROLLER_VALIDATION_REJECTIONS);
    collector.register_counter(&CONTROLLER_SERVER_ERRORS);
    collector.register_counter(&CONTROLLER_TRANSPORT_ERRORS);
    collector.register_counter(&CONTROLLER_CANCELLATIONS);
    collector.register_counter(&CONTROLLER_SILENT_ERRORS);

    collector.register_counter(&CHAT_MESSAGES);
    collector.register_counter(&CHAT_ANSWERS);
    collector.register_moments(&CHAT_ROUND_TRIP);
}

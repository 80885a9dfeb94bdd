use tracing::info;

/// Hands a payload to the message broker.
///
/// Delivery failures are the publisher's concern; loggers never see them.
/// Any `Fn(&str, &str)` closure is a publisher.
pub trait Publish {
    fn publish(&self, topic: &str, payload: &str);
}

impl<F> Publish for F
where
    F: Fn(&str, &str),
{
    fn publish(&self, topic: &str, payload: &str) {
        self(topic, payload)
    }
}

/// Publisher that writes payloads to the log, used when no broker client is
/// wired in.
#[derive(Debug, Clone)]
pub struct LogPublisher {
    broker: String,
}

impl LogPublisher {
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
        }
    }
}

impl Publish for LogPublisher {
    fn publish(&self, topic: &str, payload: &str) {
        info!(broker = %self.broker, topic, payload, "Publishing");
    }
}

/// Operator-facing progress reporting. The sink is an external
/// collaborator; every call site tolerates its absence, so a caller that
/// supplies no sink simply gets no progress output.
pub trait MessageSink: Send + Sync {
    /// A headline progress message.
    fn info(&self, message: &str);

    /// A detail line under the most recent headline.
    fn detail(&self, message: &str);
}

/// Sink that discards everything.
pub struct NullSink;

impl MessageSink for NullSink {
    fn info(&self, _message: &str) {}
    fn detail(&self, _message: &str) {}
}

/// Report an info message if a sink is present.
pub fn info(sink: Option<&dyn MessageSink>, message: &str) {
    if let Some(sink) = sink {
        sink.info(message);
    }
}

/// Report a detail message if a sink is present.
pub fn detail(sink: Option<&dyn MessageSink>, message: &str) {
    if let Some(sink) = sink {
        sink.detail(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CaptureSink {
        lines: Mutex<Vec<String>>,
    }

    impl MessageSink for CaptureSink {
        fn info(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("info: {message}"));
        }
        fn detail(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("detail: {message}"));
        }
    }

    #[test]
    fn test_absent_sink_is_a_no_op() {
        info(None, "ignored");
        detail(None, "ignored");
    }

    #[test]
    fn test_capture() {
        let sink = CaptureSink {
            lines: Mutex::new(Vec::new()),
        };
        info(Some(&sink), "Models:");
        detail(Some(&sink), "shop_item");
        assert_eq!(
            *sink.lines.lock().unwrap(),
            vec!["info: Models:", "detail: shop_item"]
        );
    }
}

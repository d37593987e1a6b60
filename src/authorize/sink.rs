//! One-shot result delivery.

/// Receives the single pass/fail outcome of an authorization attempt.
///
/// Delivery consumes the sink, so a result can be produced at most once per
/// attempt; the pipeline hands the boxed sink to whichever path finishes the
/// attempt — the synchronous checks or the forked push continuation.
pub trait ResultSink: Send + 'static {
    /// Report the outcome; `reason` is set exactly when `success` is false.
    fn deliver(self: Box<Self>, success: bool, reason: Option<String>);
}

impl<F> ResultSink for F
where
    F: FnOnce(bool, Option<String>) + Send + 'static,
{
    fn deliver(self: Box<Self>, success: bool, reason: Option<String>) {
        (*self)(success, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::ResultSink;
    use std::sync::mpsc;

    #[test]
    fn closure_sinks_deliver_and_are_consumed() {
        let (tx, rx) = mpsc::channel();
        let sink: Box<dyn ResultSink> = Box::new(move |success: bool, reason: Option<String>| {
            tx.send((success, reason)).unwrap();
        });

        sink.deliver(false, Some("Invalid pin".to_string()));

        assert_eq!(
            rx.recv().unwrap(),
            (false, Some("Invalid pin".to_string()))
        );
        // The sender moved into the sink and was dropped with it.
        assert!(rx.recv().is_err());
    }
}

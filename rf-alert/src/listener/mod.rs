//! Signal listener.
//!
//! Polls a [`SignalSource`] at a fixed interval and hands every new frame
//! carrying a configured alert code to an [`AlertHandler`]. The handler is
//! awaited inline: while a dispatch is in flight nothing is polled, so frames
//! decoded in the meantime are superseded by whatever the receiver holds when
//! polling resumes. Those frames are counted in
//! [`ListenerStats::dropped_while_busy`] and otherwise ignored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::AppConfig;
use crate::domain::{AlertCode, SignalEvent, SignalStamp};
use crate::receiver::{ReceiverGuard, SignalSource};
use crate::shutdown::Shutdown;

/// Receives matched alerts from the listener.
#[async_trait]
pub trait AlertHandler: Send + Sync {
    /// Handle one alert occurrence. Must not fail; errors are the handler's own business.
    async fn on_alert(&self, code: AlertCode, timestamp: DateTime<Local>);
}

/// Counters collected over one listener run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub polls: u64,
    /// Frames with a timestamp not seen before.
    pub signals: u64,
    pub matched: u64,
    pub ignored: u64,
    /// Frames decoded during a dispatch and overwritten before they were polled.
    pub dropped_while_busy: u64,
}

/// Cooperative polling loop over a signal source.
pub struct SignalListener {
    config: Arc<AppConfig>,
    poll_interval: Duration,
    last_timestamp: Option<SignalStamp>,
    last_sequence: Option<u64>,
    resumed_from_dispatch: bool,
    stats: ListenerStats,
}

impl SignalListener {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let poll_interval = config.receiver.poll_interval();
        Self {
            config,
            poll_interval,
            last_timestamp: None,
            last_sequence: None,
            resumed_from_dispatch: false,
            stats: ListenerStats::default(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats
    }

    /// Poll until `shutdown` is cancelled or the source fails.
    ///
    /// Cancellation is only observed between polls, never during a dispatch.
    /// Source errors end the loop and are returned to the caller, which still
    /// owns the receiver guard and releases it.
    pub async fn run<S, H>(
        &mut self,
        source: &S,
        handler: &H,
        shutdown: CancellationToken,
    ) -> Result<ListenerStats>
    where
        S: SignalSource + ?Sized,
        H: AlertHandler + ?Sized,
    {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Listening for RF codes ...");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Shutdown requested, listener stopping");
                    break;
                }
                _ = ticker.tick() => {}
            }
            self.poll_once(source, handler).await?;
        }

        Ok(self.stats)
    }

    /// Run over a guarded receiver until shutdown, then release it.
    ///
    /// A forced shutdown drops the in-flight dispatch. The receiver is
    /// released before returning in every case.
    pub async fn run_guarded<S, H>(
        &mut self,
        guard: ReceiverGuard<S>,
        handler: &H,
        shutdown: &Shutdown,
    ) -> Result<ListenerStats>
    where
        S: SignalSource,
        H: AlertHandler + ?Sized,
    {
        let forced = shutdown.forced();
        let finished = tokio::select! {
            biased;
            _ = forced.cancelled() => None,
            result = self.run(guard.source(), handler, shutdown.graceful()) => Some(result),
        };
        guard.release();

        match finished {
            Some(result) => result,
            None => {
                warn!("Listener aborted mid-dispatch");
                Ok(self.stats)
            }
        }
    }

    /// Read the source once and dispatch if it holds a new matching frame.
    ///
    /// Returns whether the handler was invoked.
    pub async fn poll_once<S, H>(&mut self, source: &S, handler: &H) -> Result<bool>
    where
        S: SignalSource + ?Sized,
        H: AlertHandler + ?Sized,
    {
        self.stats.polls += 1;

        let Some(event) = source.latest()? else {
            return Ok(false);
        };
        if !event.is_new_since(self.last_timestamp) {
            return Ok(false);
        }
        self.observe(&event);

        if !self.config.alerts.contains(event.code) {
            self.stats.ignored += 1;
            return Ok(false);
        }

        self.stats.matched += 1;
        info!(code = %event.code, "Received 433 MHz signal with matching alert code");
        handler.on_alert(event.code, Local::now()).await;
        self.resumed_from_dispatch = true;
        Ok(true)
    }

    fn observe(&mut self, event: &SignalEvent) {
        self.last_timestamp = Some(event.timestamp);
        self.stats.signals += 1;

        let previous = self.last_sequence.replace(event.sequence);
        if std::mem::take(&mut self.resumed_from_dispatch) {
            let skipped = previous
                .map(|prev| event.sequence.saturating_sub(prev).saturating_sub(1))
                .unwrap_or(0);
            if skipped > 0 {
                self.stats.dropped_while_busy += skipped;
                warn!(skipped, "Frames received during dispatch were dropped");
            }
        }

        debug!(
            "{} [pulselength {}, protocol {}]",
            event.code, event.pulse_length, event.protocol
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    use crate::Error;

    const CONFIG: &str = r#"
        [receiver]
        gpio_pin = 27
        [alert]
        codes = [17, 42]
        descriptions = ["front door", "garage"]
    "#;

    fn listener() -> SignalListener {
        let config = Arc::new(AppConfig::from_toml_str(CONFIG).unwrap());
        SignalListener::new(config).with_poll_interval(Duration::from_millis(1))
    }

    fn frame(code: u64, stamp: u64, sequence: u64) -> SignalEvent {
        SignalEvent {
            code: AlertCode(code),
            pulse_length: 350,
            protocol: 1,
            bit_length: 24,
            timestamp: SignalStamp(stamp),
            sequence,
        }
    }

    /// Returns one scripted snapshot per poll; repeats the last one afterwards.
    struct ScriptedSource {
        frames: Mutex<VecDeque<Option<SignalEvent>>>,
        current: Mutex<Option<SignalEvent>>,
        fail_when_empty: bool,
    }

    impl ScriptedSource {
        fn new(frames: Vec<Option<SignalEvent>>) -> Self {
            Self {
                frames: Mutex::new(frames.into()),
                current: Mutex::new(None),
                fail_when_empty: false,
            }
        }
    }

    impl SignalSource for ScriptedSource {
        fn enable(&mut self) -> Result<()> {
            Ok(())
        }

        fn latest(&self) -> Result<Option<SignalEvent>> {
            match self.frames.lock().pop_front() {
                Some(next) => {
                    *self.current.lock() = next;
                    Ok(next)
                }
                None if self.fail_when_empty => Err(Error::Receiver("receiver vanished".into())),
                None => Ok(*self.current.lock()),
            }
        }

        fn cleanup(&mut self) {}
    }

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<AlertCode>>,
    }

    #[async_trait]
    impl AlertHandler for RecordingHandler {
        async fn on_alert(&self, code: AlertCode, _timestamp: DateTime<Local>) {
            self.calls.lock().push(code);
        }
    }

    async fn poll_all(
        listener: &mut SignalListener,
        source: &ScriptedSource,
        handler: &RecordingHandler,
        polls: usize,
    ) {
        for _ in 0..polls {
            listener.poll_once(source, handler).await.unwrap();
        }
    }

    #[tokio::test]
    async fn repeated_timestamp_dispatches_once() {
        let mut listener = listener();
        let source = ScriptedSource::new(vec![
            Some(frame(42, 100, 1)),
            Some(frame(42, 100, 1)),
            Some(frame(42, 100, 1)),
        ]);
        let handler = RecordingHandler::default();

        poll_all(&mut listener, &source, &handler, 5).await;

        assert_eq!(*handler.calls.lock(), vec![AlertCode(42)]);
        assert_eq!(listener.stats().signals, 1);
        assert_eq!(listener.stats().polls, 5);
    }

    #[tokio::test]
    async fn unknown_codes_are_ignored() {
        let mut listener = listener();
        let source = ScriptedSource::new(vec![Some(frame(7, 1, 1)), Some(frame(8, 2, 2))]);
        let handler = RecordingHandler::default();

        poll_all(&mut listener, &source, &handler, 2).await;

        assert!(handler.calls.lock().is_empty());
        assert_eq!(listener.stats().ignored, 2);
        assert_eq!(listener.stats().matched, 0);
    }

    #[tokio::test]
    async fn each_new_timestamp_dispatches() {
        let mut listener = listener();
        let source = ScriptedSource::new(vec![
            None,
            Some(frame(17, 1, 1)),
            Some(frame(17, 2, 2)),
            Some(frame(99, 3, 3)),
            Some(frame(42, 4, 4)),
            Some(frame(42, 4, 4)),
        ]);
        let handler = RecordingHandler::default();

        poll_all(&mut listener, &source, &handler, 6).await;

        assert_eq!(
            *handler.calls.lock(),
            vec![AlertCode(17), AlertCode(17), AlertCode(42)]
        );
        assert_eq!(listener.stats().matched, 3);
        assert_eq!(listener.stats().ignored, 1);
    }

    #[tokio::test]
    async fn skipped_sequences_after_dispatch_are_counted() {
        let mut listener = listener();
        let source = ScriptedSource::new(vec![Some(frame(17, 1, 1)), Some(frame(17, 9, 5))]);
        let handler = RecordingHandler::default();

        poll_all(&mut listener, &source, &handler, 2).await;

        assert_eq!(listener.stats().dropped_while_busy, 3);
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let mut listener = listener();
        let source = ScriptedSource::new(vec![Some(frame(42, 1, 1))]);
        let handler = RecordingHandler::default();
        let shutdown = CancellationToken::new();

        let cancel = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let stats = listener.run(&source, &handler, shutdown).await.unwrap();
        assert_eq!(stats.matched, 1);
        assert!(stats.polls >= 1);
    }

    #[tokio::test]
    async fn run_propagates_source_errors() {
        let mut listener = listener();
        let mut source = ScriptedSource::new(vec![Some(frame(42, 1, 1))]);
        source.fail_when_empty = true;
        let handler = RecordingHandler::default();

        let err = listener
            .run(&source, &handler, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Receiver(_)));
        assert_eq!(handler.calls.lock().len(), 1);
    }
}

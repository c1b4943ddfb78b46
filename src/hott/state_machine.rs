//! # HoTT Protocol State Machine
//!
//! Drives one HoTT sensor on the shared receiver wire.
//!
//! ```text
//! AwaitingPoll -> ReceivingPoll -> AwaitingTransmitWindow -> Transmitting
//!      ^                |                                        |
//!      |                +--- timeout / garbage / not ours        v
//!      +---------------------------------------------- EndingTransmission
//! ```
//!
//! [`HottTelemetry::handle`] is called periodically with the current time. It
//! never blocks: every guard compares elapsed time against the timing policy,
//! and at most one byte is written per call.

use std::io;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::checksum::TxCursor;
use super::dispatcher::{Dispatcher, Poll, PollOutcome};
use super::encoder::FrameBuilder;
use super::protocol::FrameKind;
use super::textmode::TextModeAdapter;
use crate::serial::port_trait::{HottTransport, TransportProvider};
use crate::serial::PortOptions;
use crate::telemetry::SensorSource;

/// Resync timeout while receiving a poll
pub const HOTT_RX_SCHEDULE: Duration = Duration::from_micros(4_000);
/// Quiet time between a poll and our response
pub const HOTT_TX_SCHEDULE: Duration = Duration::from_micros(5_000);
/// Gap between response bytes
pub const HOTT_TX_DELAY: Duration = Duration::from_micros(2_000);

/// Resync timeout while a text-mode session is alive
pub const HOTT_TEXTMODE_RX_SCHEDULE: Duration = Duration::from_micros(5_000);
/// Gap between response bytes while a text-mode session is alive
pub const HOTT_TEXTMODE_TX_DELAY: Duration = Duration::from_micros(1_000);

/// Protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HottState {
    AwaitingPoll,
    ReceivingPoll,
    AwaitingTransmitWindow,
    Transmitting,
    EndingTransmission,
}

/// Receive timeout and transmit pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingPolicy {
    /// Give up on a partial poll after this long
    pub rx_timeout: Duration,
    /// Gap between response bytes, and the quiet time after the checksum
    pub tx_delay: Duration,
}

impl TimingPolicy {
    pub const BINARY: TimingPolicy = TimingPolicy {
        rx_timeout: HOTT_RX_SCHEDULE,
        tx_delay: HOTT_TX_DELAY,
    };

    pub const TEXT: TimingPolicy = TimingPolicy {
        rx_timeout: HOTT_TEXTMODE_RX_SCHEDULE,
        tx_delay: HOTT_TEXTMODE_TX_DELAY,
    };
}

/// Everything needed to set up the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HottSettings {
    pub port: PortOptions,
    pub timing: TimingPolicy,
    pub text_timing: TimingPolicy,
    pub tx_schedule: Duration,
    pub alarm_interval: Duration,
    pub gps_fix_estimation: bool,
}

impl Default for HottSettings {
    fn default() -> Self {
        Self {
            port: PortOptions::hott(true),
            timing: TimingPolicy::BINARY,
            text_timing: TimingPolicy::TEXT,
            tx_schedule: HOTT_TX_SCHEDULE,
            alarm_interval: Duration::from_secs(5),
            gps_fix_estimation: false,
        }
    }
}

/// HoTT sensor protocol instance
///
/// # Examples
///
/// ```no_run
/// use std::time::{Duration, Instant};
/// use hott_telemetry::hott::state_machine::{HottSettings, HottTelemetry};
/// use hott_telemetry::serial::SerialPortProvider;
/// use hott_telemetry::telemetry::SensorSnapshot;
///
/// let provider = SerialPortProvider::new("/dev/ttyUSB0", Duration::from_millis(100));
/// let mut telemetry = HottTelemetry::new(provider, HottSettings::default());
/// telemetry.check_state(true);
///
/// let sensors = SensorSnapshot::default();
/// let start = Instant::now();
/// loop {
///     telemetry.handle(start.elapsed(), &sensors);
///     std::thread::sleep(Duration::from_millis(2));
/// }
/// ```
pub struct HottTelemetry<P: TransportProvider> {
    provider: P,
    port: Option<P::Transport>,
    settings: HottSettings,

    state: HottState,
    state_changed_at: Duration,

    request: [u8; 2],
    request_len: usize,

    cursor: Option<TxCursor>,
    byte_sent_at: Option<Duration>,

    dispatcher: Dispatcher,
    textmode: Option<TextModeAdapter>,
}

impl<P: TransportProvider> HottTelemetry<P> {
    /// Create a disabled protocol instance; call [`check_state`](Self::check_state)
    /// to open the port
    pub fn new(provider: P, settings: HottSettings) -> Self {
        let builder = FrameBuilder::new(settings.alarm_interval, settings.gps_fix_estimation);
        Self {
            provider,
            port: None,
            settings,
            state: HottState::AwaitingPoll,
            state_changed_at: Duration::ZERO,
            request: [0; 2],
            request_len: 0,
            cursor: None,
            byte_sent_at: None,
            dispatcher: Dispatcher::new(builder),
            textmode: None,
        }
    }

    /// Enable text-mode (menu) support
    pub fn with_textmode(mut self, adapter: TextModeAdapter) -> Self {
        self.textmode = Some(adapter);
        self
    }

    pub fn state(&self) -> HottState {
        self.state
    }

    /// Whether the port is open and owned by this protocol
    pub fn is_enabled(&self) -> bool {
        self.port.is_some()
    }

    /// Timing currently in force
    pub fn timing(&self) -> TimingPolicy {
        match &self.textmode {
            Some(adapter) if adapter.is_alive() => self.settings.text_timing,
            _ => self.settings.timing,
        }
    }

    /// Bytes of one of the response frames
    pub fn frame(&self, kind: FrameKind) -> &[u8] {
        frame_bytes(&self.dispatcher, self.textmode.as_ref(), kind)
    }

    pub fn textmode(&self) -> Option<&TextModeAdapter> {
        self.textmode.as_ref()
    }

    /// Open or release the port to follow the enablement decision
    ///
    /// A failed open leaves telemetry disabled; the next call retries.
    pub fn check_state(&mut self, enabled: bool) {
        if enabled == self.is_enabled() {
            return;
        }

        if enabled {
            self.configure_port();
        } else {
            self.release_port();
        }
    }

    fn configure_port(&mut self) {
        match self.provider.open(&self.settings.port) {
            Ok(port) => {
                self.port = Some(port);
                self.reset();
                info!("HoTT telemetry enabled");
            }
            Err(e) => warn!("HoTT telemetry port unavailable: {}", e),
        }
    }

    fn release_port(&mut self) {
        if self.port.take().is_some() {
            info!("HoTT telemetry disabled, port released");
        }
    }

    fn reset(&mut self) {
        self.state = HottState::AwaitingPoll;
        self.request_len = 0;
        self.cursor = None;
        self.byte_sent_at = None;
    }

    fn switch_state(&mut self, new_state: HottState, now: Duration) {
        if self.state != new_state {
            trace!("HoTT state {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
            self.state_changed_at = now;
        }
    }

    fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.state_changed_at)
    }

    /// Advance the protocol
    ///
    /// No-op while disabled. A transport I/O error releases the port; the
    /// next [`check_state`](Self::check_state) reopens it.
    pub fn handle<S: SensorSource + ?Sized>(&mut self, now: Duration, sensors: &S) {
        if !self.is_enabled() {
            return;
        }

        if let Err(e) = self.process(now, sensors) {
            warn!("HoTT transport error: {}", e);
            self.release_port();
        }
    }

    fn process<S: SensorSource + ?Sized>(&mut self, now: Duration, sensors: &S) -> io::Result<()> {
        loop {
            let reprocess = match self.state {
                HottState::AwaitingPoll => self.await_poll(now)?,
                HottState::ReceivingPoll => self.receive_poll(now, sensors)?,
                HottState::AwaitingTransmitWindow => {
                    if self.elapsed(now) >= self.settings.tx_schedule {
                        if let Some(cursor) = self.cursor.as_mut() {
                            cursor.reset_checksum();
                        }
                        self.byte_sent_at = None;
                        self.switch_state(HottState::Transmitting, now);
                    }
                    false
                }
                HottState::Transmitting => {
                    if self.send_telemetry_byte(now)? {
                        self.switch_state(HottState::EndingTransmission, now);
                    }
                    false
                }
                HottState::EndingTransmission => {
                    if self.elapsed(now) >= self.timing().tx_delay {
                        // Whatever arrived while we were talking is our own echo
                        self.port()?.discard_input()?;
                        self.switch_state(HottState::AwaitingPoll, now);
                        true
                    } else {
                        false
                    }
                }
            };

            if !reprocess {
                return Ok(());
            }
        }
    }

    fn port(&mut self) -> io::Result<&mut P::Transport> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "HoTT port closed"))
    }

    fn await_poll(&mut self, now: Duration) -> io::Result<bool> {
        if self.port()?.bytes_available()? == 0 {
            return Ok(false);
        }
        self.request_len = 0;
        self.switch_state(HottState::ReceivingPoll, now);
        Ok(true)
    }

    fn receive_poll<S: SensorSource + ?Sized>(
        &mut self,
        now: Duration,
        sensors: &S,
    ) -> io::Result<bool> {
        if self.elapsed(now) >= self.timing().rx_timeout {
            debug!("HoTT poll timed out after {} byte(s), resyncing", self.request_len);
            self.port()?.discard_input()?;
            self.switch_state(HottState::AwaitingPoll, now);
            return Ok(false);
        }

        while self.request_len < self.request.len() {
            let port = self.port()?;
            if port.bytes_available()? == 0 {
                break;
            }
            let byte = port.read_byte()?;
            self.request[self.request_len] = byte;
            self.request_len += 1;
        }

        if self.request_len < self.request.len() {
            return Ok(false);
        }

        let poll = Poll::from_bytes(self.request);
        let snapshot = sensors.snapshot();
        let outcome = self
            .dispatcher
            .dispatch(poll, self.textmode.as_mut(), &snapshot, now);

        match outcome {
            PollOutcome::Respond(kind) => {
                debug!("Answering HoTT poll {:02X?} with {:?} frame", self.request, kind);
                self.cursor = Some(TxCursor::new(kind));
                self.switch_state(HottState::AwaitingTransmitWindow, now);
            }
            PollOutcome::NoMatch => {
                trace!("HoTT poll {:02X?} not for us", self.request);
                self.switch_state(HottState::AwaitingPoll, now);
            }
            PollOutcome::Garbage => {
                debug!("HoTT garbage {:02X?}, resyncing", self.request);
                self.port()?.discard_input()?;
                self.switch_state(HottState::AwaitingPoll, now);
            }
        }
        Ok(true)
    }

    /// Write the next response byte if the inter-byte gap has passed
    ///
    /// Returns `true` once the checksum byte has been written.
    fn send_telemetry_byte(&mut self, now: Duration) -> io::Result<bool> {
        if let Some(sent_at) = self.byte_sent_at {
            if now.saturating_sub(sent_at) < self.timing().tx_delay {
                return Ok(false);
            }
        }

        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(true);
        };
        let bytes = frame_bytes(&self.dispatcher, self.textmode.as_ref(), cursor.frame());
        let step = cursor.advance(bytes);

        self.port()?.write_byte(step.byte())?;
        self.byte_sent_at = Some(now);

        if step.is_complete() {
            self.cursor = None;
            return Ok(true);
        }
        Ok(false)
    }
}

fn frame_bytes<'a>(
    dispatcher: &'a Dispatcher,
    textmode: Option<&'a TextModeAdapter>,
    kind: FrameKind,
) -> &'a [u8] {
    match kind {
        FrameKind::Eam => dispatcher.eam_message().as_bytes(),
        FrameKind::Gps => dispatcher.gps_message().as_bytes(),
        FrameKind::Text => textmode.map(|t| t.message().as_bytes()).unwrap_or(&[]),
    }
}

//! # HoTT Text Mode
//!
//! The transmitter can open a sensor "menu" and page through it with its
//! navigation keys. Text-mode polls carry the key in the low nibble of the
//! address; the response is a full character grid instead of telemetry.
//!
//! This module adapts those polls to a [`TextOverlay`] (the menu renderer)
//! and speeds up the telemetry task through a [`TaskScheduler`] while a
//! session is alive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::protocol::{TextModeMessage, HOTT_EAM_SENSOR_TEXT_ID};

/// HoTT key codes (low nibble of a text-mode address)
pub const HOTT_KEY_DEC: u8 = 0x0B;
pub const HOTT_KEY_INC: u8 = 0x0D;
pub const HOTT_KEY_SET: u8 = 0x09;
pub const HOTT_KEY_NEXT: u8 = 0x0E;
pub const HOTT_KEY_PREV: u8 = 0x07;
pub const HOTT_KEY_NIL: u8 = 0x0F;

/// Menu navigation key forwarded to the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKey {
    None,
    Up,
    Down,
    Left,
    Right,
    Save,
}

impl MenuKey {
    /// Map a HoTT key nibble to a navigation key
    pub fn from_hott(key: u8) -> Self {
        match key & 0x0F {
            HOTT_KEY_DEC => MenuKey::Up,
            HOTT_KEY_INC => MenuKey::Down,
            HOTT_KEY_SET => MenuKey::Save,
            HOTT_KEY_NEXT => MenuKey::Right,
            HOTT_KEY_PREV => MenuKey::Left,
            HOTT_KEY_NIL => MenuKey::None,
            other => {
                debug!("Unknown HoTT key 0x{:X}", other);
                MenuKey::None
            }
        }
    }
}

/// Menu renderer drawing into the text-mode screen
#[cfg_attr(test, mockall::automock)]
pub trait TextOverlay {
    /// Open (or keep open) the menu
    fn open(&mut self, screen: &mut TextModeMessage);

    /// Handle one key press; `exiting` is set while the receiver is being
    /// told to leave the menu
    fn key_press(&mut self, key: MenuKey, exiting: bool, screen: &mut TextModeMessage);
}

/// Owner of the telemetry task period
#[cfg_attr(test, mockall::automock)]
pub trait TaskScheduler {
    fn task_period(&self) -> Duration;

    fn reschedule(&mut self, period: Duration);
}

/// Task period shared between the protocol and the loop that ticks it
#[derive(Debug, Clone)]
pub struct SharedTaskPeriod {
    micros: Arc<AtomicU64>,
}

impl SharedTaskPeriod {
    pub fn new(period: Duration) -> Self {
        Self {
            micros: Arc::new(AtomicU64::new(period.as_micros() as u64)),
        }
    }

    /// Period for a task running at `rate_hz`
    pub fn from_rate_hz(rate_hz: u32) -> Self {
        Self::new(period_from_rate_hz(rate_hz))
    }

    pub fn get(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::Relaxed))
    }
}

impl TaskScheduler for SharedTaskPeriod {
    fn task_period(&self) -> Duration {
        self.get()
    }

    fn reschedule(&mut self, period: Duration) {
        self.micros.store(period.as_micros() as u64, Ordering::Relaxed);
    }
}

/// Convert a task rate into its period (a zero rate is treated as 1 Hz)
pub fn period_from_rate_hz(rate_hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(rate_hz.max(1)))
}

/// Bridges text-mode polls to a menu overlay
pub struct TextModeAdapter {
    overlay: Box<dyn TextOverlay + Send>,
    scheduler: Box<dyn TaskScheduler + Send>,
    session_period: Duration,
    message: TextModeMessage,
    alive: bool,
    saved_period: Option<Duration>,
    set_esc_back: bool,
}

impl TextModeAdapter {
    /// Create an adapter
    ///
    /// # Arguments
    ///
    /// * `overlay` - Menu renderer
    /// * `scheduler` - Telemetry task scheduler hook
    /// * `session_period` - Task period while a text session is alive
    pub fn new(
        overlay: Box<dyn TextOverlay + Send>,
        scheduler: Box<dyn TaskScheduler + Send>,
        session_period: Duration,
    ) -> Self {
        Self {
            overlay,
            scheduler,
            session_period,
            message: TextModeMessage::new(),
            alive: false,
            saved_period: None,
            set_esc_back: false,
        }
    }

    /// Whether a text session currently owns the link
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// The character-grid response frame
    pub fn message(&self) -> &TextModeMessage {
        &self.message
    }

    fn start_session(&mut self) {
        let current = self.scheduler.task_period();
        self.saved_period = Some(current);
        self.scheduler.reschedule(self.session_period);
        self.alive = true;
        info!(
            "HoTT text mode started (task period {:?} -> {:?})",
            current, self.session_period
        );
    }

    /// Leave text mode, restoring the task period
    ///
    /// No-op when no session is alive.
    pub fn end_session(&mut self) {
        if !self.alive {
            return;
        }
        if let Some(period) = self.saved_period.take() {
            self.scheduler.reschedule(period);
        }
        self.alive = false;
        info!("HoTT text mode ended");
    }

    /// Handle a text-mode poll
    ///
    /// Returns `true` when the text frame should be sent back.
    pub fn process_request(&mut self, address: u8) -> bool {
        if !self.alive {
            self.start_session();
        }

        if address & 0xF0 != HOTT_EAM_SENSOR_TEXT_ID {
            debug!("Ignoring text-mode poll for 0x{:02X}", address);
            return false;
        }

        // Exit requested on the previous poll has been sent; take the screen back
        if self.set_esc_back {
            self.message.grab();
            self.set_esc_back = false;
        }

        if self.message.is_exiting() {
            self.set_esc_back = true;
        } else {
            self.overlay.open(&mut self.message);
        }

        let key = MenuKey::from_hott(address);
        let exiting = self.message.is_exiting();
        self.overlay.key_press(key, exiting, &mut self.message);
        true
    }
}

//! LED panel output.
//!
//! The panel is a strip of addressable RGB pixels that always shows one solid
//! colour.  [`PixelStrip`] keeps the frame in memory and logs each write; the
//! driver that clocks the frame out to the pixels is board-specific and sits
//! behind the same [`Actuator`] trait.
//!
//! # Sub-modules
//!
//! - **`mock`** – A recording actuator for tests.  Stores every call in memory
//!   so assertions can check which states were shown and when.

pub mod mock;

use std::sync::{Mutex, PoisonError};

use semaforo_core::SignalState;
use tracing::debug;

use crate::application::ports::{Actuator, ActuatorError};

/// One pixel colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Colour shown for `state`.
    pub fn for_state(state: SignalState) -> Self {
        match state {
            SignalState::Green => Self::GREEN,
            SignalState::Yellow => Self::YELLOW,
            SignalState::Red => Self::RED,
        }
    }
}

/// In-memory frame for a strip of `len` pixels.
pub struct PixelStrip {
    pixels: Mutex<Vec<Rgb>>,
}

impl PixelStrip {
    /// Creates a strip with every pixel off.
    pub fn new(len: usize) -> Self {
        Self {
            pixels: Mutex::new(vec![Rgb::OFF; len]),
        }
    }

    pub fn len(&self) -> usize {
        self.frame().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current frame.
    pub fn frame(&self) -> Vec<Rgb> {
        self.pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fill(&self, colour: Rgb) -> Result<(), ActuatorError> {
        let mut pixels = self.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        if pixels.is_empty() {
            return Err(ActuatorError::Write("strip has no pixels".to_string()));
        }
        pixels.fill(colour);
        debug!(
            "panel: wrote {} pixels ({}, {}, {})",
            pixels.len(),
            colour.r,
            colour.g,
            colour.b
        );
        Ok(())
    }
}

impl Actuator for PixelStrip {
    fn render(&self, state: SignalState) -> Result<(), ActuatorError> {
        self.fill(Rgb::for_state(state))
    }

    fn blank(&self) -> Result<(), ActuatorError> {
        self.fill(Rgb::OFF)
    }
}

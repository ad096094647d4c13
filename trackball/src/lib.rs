//! PMW3360 trackball firmware core
//!
//! Drives a PMW3360 optical sensor over SPI (power-up, SROM upload and verification,
//! interrupt-driven motion capture), debounces the buttons and turns both into mouse reports
//! with scroll-lock scrolling. Hardware is reached only through `embedded-hal` traits.
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod config;
pub mod controls;
pub mod debounce;
pub mod driver;
pub mod health;
pub mod input_device;
pub mod trackball;

pub use config::TrackballConfig;
pub use controls::{Control, Controls, MouseButton, MouseState};
pub use input_device::pmw3360::{CaptureError, InitError, Pmw3360, Srom};
pub use input_device::shared::SharedSensor;
pub use input_device::MotionSensor;
pub use trackball::Trackball;

use embedded_hal::digital::OutputPin;

/// The chip-select driver is a wrapper for the embedded-hal digital output pin trait.
/// It wraps the low-active and high-active pins and reports whether the last pin operation failed.
pub(crate) struct ChipSelect<P: OutputPin> {
    pin: P,
    low_active: bool,
}

impl<P: OutputPin> ChipSelect<P> {
    /// Create a new ChipSelect instance
    pub fn new(pin: P, low_active: bool) -> Self {
        Self { pin, low_active }
    }

    /// Assert the chip-select line. Returns `false` if the pin reported an error.
    pub fn select(&mut self) -> bool {
        if self.low_active {
            self.pin.set_low().is_ok()
        } else {
            self.pin.set_high().is_ok()
        }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }

    /// Release the chip-select line. Returns `false` if the pin reported an error.
    pub fn deselect(&mut self) -> bool {
        if self.low_active {
            self.pin.set_high().is_ok()
        } else {
            self.pin.set_low().is_ok()
        }
    }
}

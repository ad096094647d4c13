//! Motion interrupt control
//!
//! The sensor transport is not reentrant: the motion interrupt handler issues a burst read, so
//! any register access from the main loop has to run with the motion interrupt masked.
//! [`IrqMask`] is the scoped guard that does this and restores the line on every exit path.

use crate::config::MotionTrigger;

/// GPIO interrupt control for the sensor's MOTION line, provided by the board.
pub trait MotionInterrupt {
    /// Select the trigger mode of the interrupt
    fn configure(&mut self, trigger: MotionTrigger);
    /// Unmask the interrupt
    fn enable(&mut self);
    /// Mask the interrupt. Must not return while a handler invocation is still running.
    fn disable(&mut self);
    /// Whether the interrupt is currently unmasked
    fn is_enabled(&self) -> bool;
}

impl<T: MotionInterrupt + ?Sized> MotionInterrupt for &mut T {
    fn configure(&mut self, trigger: MotionTrigger) {
        (**self).configure(trigger)
    }

    fn enable(&mut self) {
        (**self).enable()
    }

    fn disable(&mut self) {
        (**self).disable()
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
}

/// Scoped mask of the motion interrupt.
///
/// Masks the line on creation; on drop the line is re-enabled only if it was enabled before,
/// so guards nest.
pub struct IrqMask<'a, I: MotionInterrupt> {
    irq: &'a mut I,
    restore: bool,
}

impl<'a, I: MotionInterrupt> IrqMask<'a, I> {
    pub fn new(irq: &'a mut I) -> Self {
        let restore = irq.is_enabled();
        if restore {
            irq.disable();
        }
        Self { irq, restore }
    }

    /// Drop the guard without unmasking the line
    pub fn keep_masked(mut self) {
        self.restore = false;
    }
}

impl<I: MotionInterrupt> Drop for IrqMask<'_, I> {
    fn drop(&mut self) {
        if self.restore {
            self.irq.enable();
        }
    }
}

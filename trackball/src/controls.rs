//! Mouse event state machine
//!
//! Turns drained sensor motion and debounced button edges into one [`MouseState`] per polling
//! cycle. While scroll-lock is held, motion becomes scroll steps, and releasing scroll-lock
//! without scrolling produces a one-cycle middle click.

use usbd_hid::descriptor::MouseReport;

use crate::config::ControlsConfig;
use crate::debounce::ButtonEdge;

/// Logical control an input line is mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    Left,
    Middle,
    Right,
    Back,
    Forward,
    ScrollLock,
}

/// Mouse buttons, in report state order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MouseButton {
    Left = 0,
    Middle = 1,
    Right = 2,
    Back = 3,
    Forward = 4,
}

impl MouseButton {
    pub const COUNT: usize = 5;

    /// Bit in the HID report's button byte
    pub const fn report_bit(self) -> u8 {
        match self {
            MouseButton::Left => 1 << 0,
            MouseButton::Right => 1 << 1,
            MouseButton::Middle => 1 << 2,
            MouseButton::Back => 1 << 3,
            MouseButton::Forward => 1 << 4,
        }
    }

    const ALL: [MouseButton; Self::COUNT] = [
        MouseButton::Left,
        MouseButton::Middle,
        MouseButton::Right,
        MouseButton::Back,
        MouseButton::Forward,
    ];
}

/// Output of one polling cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseState {
    /// The report differs from the previous cycle and has to be sent
    pub changed: bool,
    pub buttons: [bool; MouseButton::COUNT],
    pub delta_x: i32,
    pub delta_y: i32,
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub scroll_lock: bool,
    /// The middle button is a synthesized click and is released next cycle
    pub fake_middle: bool,
    /// Locked motion not yet converted to a scroll step
    pub scroll_remainder_x: i32,
    pub scroll_remainder_y: i32,
}

impl MouseState {
    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.buttons[button as usize]
    }

    /// HID mouse report of this state: axis inversion applied, values clamped to the report range
    pub fn report(&self, config: &ControlsConfig) -> MouseReport {
        let buttons = MouseButton::ALL
            .iter()
            .filter(|b| self.is_pressed(**b))
            .fold(0, |bits, b| bits | b.report_bit());

        MouseReport {
            buttons,
            x: to_report_axis(self.delta_x, config.invert_mouse_x),
            y: to_report_axis(self.delta_y, config.invert_mouse_y),
            wheel: to_report_axis(self.scroll_y, config.invert_scroll_y),
            pan: to_report_axis(self.scroll_x, config.invert_scroll_x),
        }
    }
}

fn to_report_axis(value: i32, invert: bool) -> i8 {
    let value = if invert { value.saturating_neg() } else { value };
    value.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// Move whole scroll steps out of `remainder`.
///
/// A step is emitted while the remainder magnitude is strictly above `threshold`, so the
/// remainder keeps its sign and ends within `-threshold..=threshold`.
fn take_scroll_steps(remainder: &mut i32, threshold: i32) -> i32 {
    let threshold = threshold.max(1) as u32;
    let magnitude = remainder.unsigned_abs();
    if magnitude <= threshold {
        return 0;
    }

    let steps = (magnitude - 1) / threshold;
    let consumed = (steps * threshold) as i32;
    if *remainder > 0 {
        *remainder -= consumed;
        steps as i32
    } else {
        *remainder += consumed;
        -(steps as i32)
    }
}

/// The mouse event state machine
pub struct Controls {
    config: ControlsConfig,
    state: MouseState,
    previous: MouseState,
    /// Raw motion magnitude seen since scroll-lock engaged
    scroll_motion: u32,
    /// Physical middle button, kept apart from a synthesized click
    middle_held: bool,
}

impl Controls {
    pub fn new(config: ControlsConfig) -> Self {
        Self {
            config,
            state: MouseState::default(),
            previous: MouseState::default(),
            scroll_motion: 0,
            middle_held: false,
        }
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    /// State produced by the last [`read`](Self::read)
    pub fn state(&self) -> &MouseState {
        &self.state
    }

    /// Apply a debounced edge of an input line, using the configured input map
    pub fn on_edge(&mut self, edge: ButtonEdge) {
        match self.config.input_map.get(edge.line) {
            Some(control) => self.on_control(*control, edge.pressed),
            None => warn!("No control mapped to input {}", edge.line),
        }
    }

    pub fn on_control(&mut self, control: Control, pressed: bool) {
        let button = match control {
            Control::Left => MouseButton::Left,
            Control::Right => MouseButton::Right,
            Control::Back => MouseButton::Back,
            Control::Forward => MouseButton::Forward,
            Control::Middle => {
                self.middle_held = pressed;
                MouseButton::Middle
            }
            Control::ScrollLock => {
                if pressed && !self.state.scroll_lock {
                    debug!("Scroll lock engaged");
                    self.scroll_motion = 0;
                    self.state.scroll_remainder_x = 0;
                    self.state.scroll_remainder_y = 0;
                } else if !pressed && self.state.scroll_lock {
                    debug!("Scroll lock released");
                }
                self.state.scroll_lock = pressed;
                return;
            }
        };
        self.state.buttons[button as usize] = pressed;
    }

    /// Run one polling cycle with the motion drained from the sensor
    pub fn read(&mut self, motion: Option<(i32, i32)>) -> MouseState {
        let (dx, dy) = motion.unwrap_or((0, 0));

        // A synthesized click lasts exactly one cycle
        if self.state.fake_middle {
            self.state.fake_middle = false;
            self.state.buttons[MouseButton::Middle as usize] = self.middle_held;
        }

        self.state.scroll_x = 0;
        self.state.scroll_y = 0;

        if self.state.scroll_lock {
            self.state.delta_x = 0;
            self.state.delta_y = 0;
            self.scroll(dx, dy);
        } else {
            self.state.delta_x = dx;
            self.state.delta_y = dy;
        }

        if self.previous.scroll_lock && !self.state.scroll_lock {
            self.on_scroll_lock_release();
        }

        self.state.changed = self.state.buttons != self.previous.buttons
            || self.state.delta_x != 0
            || self.state.delta_y != 0
            || self.state.scroll_x != 0
            || self.state.scroll_y != 0;

        self.previous = self.state;
        self.state
    }

    fn scroll(&mut self, dx: i32, dy: i32) {
        let threshold = self.config.scroll_reduce_sensitivity;
        let state = &mut self.state;

        state.scroll_remainder_x = state.scroll_remainder_x.saturating_add(dx);
        state.scroll_remainder_y = state.scroll_remainder_y.saturating_add(dy);
        state.scroll_x = take_scroll_steps(&mut state.scroll_remainder_x, threshold);
        state.scroll_y = take_scroll_steps(&mut state.scroll_remainder_y, threshold);

        self.scroll_motion = self
            .scroll_motion
            .saturating_add(dx.unsigned_abs())
            .saturating_add(dy.unsigned_abs());
    }

    fn on_scroll_lock_release(&mut self) {
        if self.scroll_motion < self.config.min_scroll_suppress_click {
            debug!("Fake middle click, scroll motion {}", self.scroll_motion);
            self.state.buttons[MouseButton::Middle as usize] = true;
            self.state.fake_middle = true;
        }

        self.scroll_motion = 0;
        self.state.scroll_remainder_x = 0;
        self.state.scroll_remainder_y = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls() -> Controls {
        Controls::new(ControlsConfig::default())
    }

    #[test]
    fn test_scroll_steps() {
        let mut rem = 45;
        assert_eq!(take_scroll_steps(&mut rem, 20), 2);
        assert_eq!(rem, 5);

        let mut rem = -45;
        assert_eq!(take_scroll_steps(&mut rem, 20), -2);
        assert_eq!(rem, -5);

        let mut rem = 40;
        assert_eq!(take_scroll_steps(&mut rem, 20), 1);
        assert_eq!(rem, 20);

        let mut rem = 20;
        assert_eq!(take_scroll_steps(&mut rem, 20), 0);
        assert_eq!(rem, 20);

        let mut rem = i32::MIN;
        assert_eq!(take_scroll_steps(&mut rem, 1), i32::MIN + 1);
        assert_eq!(rem, -1);
    }

    #[test]
    fn test_motion_passes_through() {
        let mut c = controls();
        let s = c.read(Some((3, -4)));
        assert_eq!((s.delta_x, s.delta_y), (3, -4));
        assert!(s.changed);

        let s = c.read(None);
        assert_eq!((s.delta_x, s.delta_y), (0, 0));
        assert!(!s.changed);
    }

    #[test]
    fn test_locked_motion_scrolls() {
        let mut c = controls();
        c.on_control(Control::ScrollLock, true);

        let s = c.read(Some((0, 45)));
        assert_eq!((s.delta_x, s.delta_y), (0, 0));
        assert_eq!(s.scroll_y, 2);
        assert_eq!(s.scroll_remainder_y, 5);
        assert!(s.changed);

        let s = c.read(Some((0, 10)));
        assert_eq!(s.scroll_y, 0);
        assert_eq!(s.scroll_remainder_y, 15);
        assert!(!s.changed);

        let s = c.read(Some((-45, 6)));
        assert_eq!((s.scroll_x, s.scroll_y), (-2, 1));
        assert_eq!((s.scroll_remainder_x, s.scroll_remainder_y), (-5, 1));
    }

    #[test]
    fn test_fake_click_after_small_motion() {
        let mut c = controls();
        c.on_control(Control::ScrollLock, true);
        c.read(Some((2, 2)));

        c.on_control(Control::ScrollLock, false);
        let s = c.read(None);
        assert!(s.is_pressed(MouseButton::Middle));
        assert!(s.fake_middle);
        assert!(s.changed);

        let s = c.read(None);
        assert!(!s.is_pressed(MouseButton::Middle));
        assert!(!s.fake_middle);
        assert!(s.changed);

        let s = c.read(None);
        assert!(!s.changed);
    }

    #[test]
    fn test_no_fake_click_after_scrolling() {
        let mut c = controls();
        c.on_control(Control::ScrollLock, true);
        c.read(Some((0, 30)));
        c.read(Some((0, 20)));

        c.on_control(Control::ScrollLock, false);
        let s = c.read(None);
        assert!(!s.is_pressed(MouseButton::Middle));
        assert_eq!((s.scroll_remainder_x, s.scroll_remainder_y), (0, 0));
    }

    #[test]
    fn test_suppression_counter_restarts_on_lock() {
        let mut c = controls();
        c.on_control(Control::ScrollLock, true);
        c.read(Some((50, 0)));
        c.on_control(Control::ScrollLock, false);
        c.read(None);

        c.on_control(Control::ScrollLock, true);
        c.read(Some((1, 1)));
        c.on_control(Control::ScrollLock, false);
        assert!(c.read(None).is_pressed(MouseButton::Middle));
    }

    #[test]
    fn test_lock_tap_within_one_cycle() {
        let mut c = controls();
        c.on_control(Control::ScrollLock, true);
        c.on_control(Control::ScrollLock, false);
        let s = c.read(None);
        assert!(!s.is_pressed(MouseButton::Middle));
        assert!(!s.changed);
    }

    #[test]
    fn test_fake_click_keeps_physical_middle() {
        let mut c = controls();
        c.on_control(Control::Middle, true);
        c.on_control(Control::ScrollLock, true);
        c.read(None);
        c.on_control(Control::ScrollLock, false);
        c.read(None);
        assert!(c.read(None).is_pressed(MouseButton::Middle));
    }

    #[test]
    fn test_buttons_through_input_map() {
        let mut c = controls();
        c.on_edge(ButtonEdge { line: 2, pressed: true });
        let s = c.read(None);
        assert!(s.is_pressed(MouseButton::Left));
        assert!(s.changed);

        c.on_edge(ButtonEdge { line: 0, pressed: true });
        c.on_edge(ButtonEdge { line: 3, pressed: true });
        c.on_edge(ButtonEdge { line: 9, pressed: true });
        let s = c.read(None);
        assert!(s.is_pressed(MouseButton::Back));
        assert!(s.is_pressed(MouseButton::Right));

        c.on_edge(ButtonEdge { line: 1, pressed: true });
        assert!(c.state().scroll_lock);
    }

    #[test]
    fn test_report_conversion() {
        let config = ControlsConfig::default();
        let mut state = MouseState {
            delta_x: 300,
            delta_y: 5,
            scroll_x: -2,
            scroll_y: 3,
            ..Default::default()
        };
        state.buttons[MouseButton::Left as usize] = true;
        state.buttons[MouseButton::Middle as usize] = true;
        state.buttons[MouseButton::Forward as usize] = true;

        let report = state.report(&config);
        assert_eq!(report.buttons, 0x01 | 0x04 | 0x10);
        assert_eq!(report.x, 127);
        assert_eq!(report.y, -5);
        assert_eq!(report.wheel, 3);
        assert_eq!(report.pan, -2);

        let state = MouseState {
            delta_y: i32::MIN,
            ..Default::default()
        };
        assert_eq!(state.report(&config).y, 127);
    }
}

//! # Input Dispatcher
//!
//! Turns successive [`InputState`] snapshots into host events: button
//! transitions, normalized analog ratios and raw motion vectors.

use serde::Serialize;

use super::calibration::AxisCalibration;
use crate::report::state::{Button, InputState, Vec3};

/// Edge of a button between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ButtonTransition {
    Pressed,
    Released,
}

/// Analog channel delivered as a ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
    LeftTrigger,
    RightTrigger,
}

/// Motion sensor delivered as a raw vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Motion {
    Gyroscope,
    Accelerometer,
}

/// Receiver of dispatched input events
pub trait InputSink {
    fn on_button(&mut self, button: Button, transition: ButtonTransition);

    /// Sticks in -1.0..=1.0, triggers in 0.0..=1.0
    fn on_analog(&mut self, axis: Axis, ratio: f32);

    fn on_motion(&mut self, motion: Motion, value: Vec3);
}

/// Stateful dispatcher remembering the previous snapshot.
pub struct InputDispatcher {
    calibration: AxisCalibration,
    previous: InputState,
}

impl InputDispatcher {
    pub fn new(calibration: AxisCalibration) -> Self {
        Self {
            calibration,
            previous: InputState::default(),
        }
    }

    /// Deliver the events for `current` to `sink`
    ///
    /// Button events are emitted only on change. All six analog axes and
    /// both motion vectors are delivered every call.
    pub fn dispatch<S: InputSink + ?Sized>(&mut self, current: &InputState, sink: &mut S) {
        for button in Button::ALL {
            match (self.previous.is_pressed(button), current.is_pressed(button)) {
                (false, true) => sink.on_button(button, ButtonTransition::Pressed),
                (true, false) => sink.on_button(button, ButtonTransition::Released),
                _ => {}
            }
        }

        let cal = &self.calibration;
        sink.on_analog(Axis::LeftStickX, cal.stick_ratio(current.left_stick.x));
        sink.on_analog(Axis::LeftStickY, cal.stick_ratio(current.left_stick.y));
        sink.on_analog(Axis::RightStickX, cal.stick_ratio(current.right_stick.x));
        sink.on_analog(Axis::RightStickY, cal.stick_ratio(current.right_stick.y));
        sink.on_analog(Axis::LeftTrigger, cal.trigger_ratio(current.left_trigger));
        sink.on_analog(Axis::RightTrigger, cal.trigger_ratio(current.right_trigger));

        sink.on_motion(Motion::Gyroscope, current.gyroscope);
        sink.on_motion(Motion::Accelerometer, current.accelerometer);

        self.previous = *current;
    }

    /// Forget the previous snapshot, e.g. after a reconnect
    ///
    /// Buttons still held afterwards are reported as pressed again.
    pub fn reset(&mut self) {
        self.previous = InputState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::calibration::Deadzone;
    use crate::report::state::{AnalogStick, FaceButtons, SystemButtons};

    #[derive(Default)]
    struct RecordingSink {
        buttons: Vec<(Button, ButtonTransition)>,
        analogs: Vec<(Axis, f32)>,
        motions: Vec<(Motion, Vec3)>,
    }

    impl InputSink for RecordingSink {
        fn on_button(&mut self, button: Button, transition: ButtonTransition) {
            self.buttons.push((button, transition));
        }

        fn on_analog(&mut self, axis: Axis, ratio: f32) {
            self.analogs.push((axis, ratio));
        }

        fn on_motion(&mut self, motion: Motion, value: Vec3) {
            self.motions.push((motion, value));
        }
    }

    impl RecordingSink {
        fn analog(&self, axis: Axis) -> f32 {
            self.analogs
                .iter()
                .rev()
                .find(|(a, _)| *a == axis)
                .map(|(_, r)| *r)
                .unwrap()
        }
    }

    #[test]
    fn test_press_and_release_transitions() {
        let mut dispatcher = InputDispatcher::new(AxisCalibration::default());
        let mut sink = RecordingSink::default();

        let pressed = InputState {
            face_buttons: FaceButtons::CROSS,
            system_buttons: SystemButtons::MIC,
            ..Default::default()
        };

        dispatcher.dispatch(&pressed, &mut sink);
        assert_eq!(
            sink.buttons,
            vec![
                (Button::Cross, ButtonTransition::Pressed),
                (Button::Mic, ButtonTransition::Pressed)
            ]
        );

        // Held: no new events
        sink.buttons.clear();
        dispatcher.dispatch(&pressed, &mut sink);
        assert!(sink.buttons.is_empty());

        let released = InputState {
            system_buttons: SystemButtons::MIC,
            ..Default::default()
        };
        dispatcher.dispatch(&released, &mut sink);
        assert_eq!(sink.buttons, vec![(Button::Cross, ButtonTransition::Released)]);
    }

    #[test]
    fn test_analog_ratios_with_deadzone() {
        let cal = AxisCalibration {
            stick: Deadzone::new(0.1),
            trigger: Deadzone::new(0.1),
        };
        let mut dispatcher = InputDispatcher::new(cal);
        let mut sink = RecordingSink::default();

        let state = InputState {
            left_stick: AnalogStick { x: 5, y: -128 },
            right_stick: AnalogStick { x: 127, y: 0 },
            left_trigger: 10,
            right_trigger: 255,
            ..Default::default()
        };
        dispatcher.dispatch(&state, &mut sink);

        assert_eq!(sink.analogs.len(), 6);
        assert_eq!(sink.analog(Axis::LeftStickX), 0.0);
        assert!((sink.analog(Axis::LeftStickY) - (-1.0)).abs() < 0.001);
        assert!((sink.analog(Axis::RightStickX) - 1.0).abs() < 0.001);
        assert_eq!(sink.analog(Axis::RightStickY), 0.0);
        assert_eq!(sink.analog(Axis::LeftTrigger), 0.0);
        assert!((sink.analog(Axis::RightTrigger) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_motion_vectors_are_raw() {
        let mut dispatcher = InputDispatcher::new(AxisCalibration::default());
        let mut sink = RecordingSink::default();

        let state = InputState {
            gyroscope: Vec3 { x: -300, y: 12, z: 7 },
            accelerometer: Vec3 { x: 0, y: 8192, z: -1 },
            ..Default::default()
        };
        dispatcher.dispatch(&state, &mut sink);

        assert_eq!(
            sink.motions,
            vec![
                (Motion::Gyroscope, Vec3 { x: -300, y: 12, z: 7 }),
                (Motion::Accelerometer, Vec3 { x: 0, y: 8192, z: -1 }),
            ]
        );
    }

    #[test]
    fn test_reset_reports_held_buttons_again() {
        let mut dispatcher = InputDispatcher::new(AxisCalibration::default());
        let mut sink = RecordingSink::default();
        let held = InputState {
            face_buttons: FaceButtons::DPAD_UP,
            ..Default::default()
        };

        dispatcher.dispatch(&held, &mut sink);
        dispatcher.reset();
        dispatcher.dispatch(&held, &mut sink);

        assert_eq!(
            sink.buttons,
            vec![
                (Button::DpadUp, ButtonTransition::Pressed),
                (Button::DpadUp, ButtonTransition::Pressed)
            ]
        );
    }
}

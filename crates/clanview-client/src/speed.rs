//! Piecewise-linear mapping between the speed control and the server's
//! speed multiplier.
//!
//! Control values 1-100 cover 0.1x-1.0x and 100-200 cover 1.0x-5.0x, so the
//! slow half of the control gets finer resolution.

pub const SPEED_CONTROL_MIN: u16 = 1;
pub const SPEED_CONTROL_MID: u16 = 100;
pub const SPEED_CONTROL_MAX: u16 = 200;

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 5.0;

/// Multiplier for a control position. Out-of-range positions are clamped.
pub fn control_to_speed(control: u16) -> f64 {
    let v = control.clamp(SPEED_CONTROL_MIN, SPEED_CONTROL_MAX) as f64;
    if v <= SPEED_CONTROL_MID as f64 {
        MIN_SPEED + (v - 1.0) / 99.0 * (1.0 - MIN_SPEED)
    } else {
        1.0 + (v - 100.0) / 100.0 * (MAX_SPEED - 1.0)
    }
}

/// Control position showing `speed`, rounded to the nearest step.
pub fn speed_to_control(speed: f64) -> u16 {
    if !speed.is_finite() {
        return SPEED_CONTROL_MID;
    }
    let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    let v = if speed <= 1.0 {
        1.0 + (speed - MIN_SPEED) / (1.0 - MIN_SPEED) * 99.0
    } else {
        100.0 + (speed - 1.0) / (MAX_SPEED - 1.0) * 100.0
    };
    (v.round() as u16).clamp(SPEED_CONTROL_MIN, SPEED_CONTROL_MAX)
}

/// Clamp raw user input into the control range.
///
/// Returns the clamped value and whether clamping was needed.
pub fn clamp_control(raw: i64) -> (u16, bool) {
    let clamped = raw.clamp(SPEED_CONTROL_MIN as i64, SPEED_CONTROL_MAX as i64);
    (clamped as u16, clamped != raw)
}

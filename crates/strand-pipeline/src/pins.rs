//! Pin layout on a circle inscribed in the canvas.

use std::f64::consts::TAU;

use crate::types::{PipelineError, Pin, Point};

/// Distance in pixels between the canvas edge and the pin circle.
pub const PIN_INSET: f64 = 20.0;

/// Place `pin_count` pins evenly around the canvas.
///
/// Pin `i` sits at angle `2π·i / pin_count` (radians, measured from the
/// positive x axis toward positive y, i.e. clockwise on screen) at radius
/// `canvas_size / 2 - PIN_INSET` from the canvas center.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `pin_count < 2`.
#[allow(clippy::cast_precision_loss, clippy::suboptimal_flops)]
pub fn generate_pins(pin_count: usize, canvas_size: u32) -> Result<Vec<Pin>, PipelineError> {
    if pin_count < 2 {
        return Err(PipelineError::InvalidConfig(format!(
            "pin_count must be at least 2, got {pin_count}"
        )));
    }

    let center = f64::from(canvas_size) / 2.0;
    let radius = pin_radius(canvas_size);
    let pins = (0..pin_count)
        .map(|id| {
            let angle = id as f64 / pin_count as f64 * TAU;
            Pin {
                id,
                angle,
                x: center + angle.cos() * radius,
                y: center + angle.sin() * radius,
            }
        })
        .collect();
    Ok(pins)
}

/// Radius of the pin circle for a canvas of the given size.
#[must_use]
pub fn pin_radius(canvas_size: u32) -> f64 {
    f64::from(canvas_size) / 2.0 - PIN_INSET
}

/// Center of a square canvas.
#[must_use]
pub fn canvas_center(canvas_size: u32) -> Point {
    let c = f64::from(canvas_size) / 2.0;
    Point::new(c, c)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_fewer_than_two_pins() {
        assert!(matches!(
            generate_pins(1, 400),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(matches!(
            generate_pins(0, 400),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn ids_are_sequential() {
        let pins = generate_pins(12, 400).unwrap();
        assert_eq!(pins.len(), 12);
        for (i, pin) in pins.iter().enumerate() {
            assert_eq!(pin.id, i);
        }
    }

    #[test]
    fn pins_lie_on_the_circle() {
        let pins = generate_pins(200, 400).unwrap();
        let center = canvas_center(400);
        for pin in &pins {
            let d = pin.position().distance(center);
            assert!((d - 180.0).abs() < 1e-9, "pin {} at distance {d}", pin.id);
        }
    }

    #[test]
    fn angles_are_evenly_spaced() {
        let pins = generate_pins(7, 300).unwrap();
        let step = TAU / 7.0;
        for pair in pins.windows(2) {
            assert!(pair[1].angle > pair[0].angle);
            assert!((pair[1].angle - pair[0].angle - step).abs() < 1e-12);
        }
    }

    #[test]
    fn first_pin_is_on_positive_x_axis() {
        let pins = generate_pins(4, 100).unwrap();
        assert!((pins[0].x - 80.0).abs() < 1e-9);
        assert!((pins[0].y - 50.0).abs() < 1e-9);
        // Quarter turn lands below the center in image coordinates.
        assert!((pins[1].x - 50.0).abs() < 1e-9);
        assert!((pins[1].y - 80.0).abs() < 1e-9);
    }

    #[test]
    fn two_pins_are_diametrically_opposed() {
        let pins = generate_pins(2, 100).unwrap();
        assert!((pins[0].position().distance(pins[1].position()) - 60.0).abs() < 1e-9);
    }
}

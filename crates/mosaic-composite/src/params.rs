//! Auxiliary operator arguments
//!
//! Blend, Dissolve, Displace, Modulate and Threshold read numbers from a
//! geometry string.  A malformed string leaves the defaults in place.

use crate::operator::CompositeOperator;
use mosaic_core::{GeometryInfo, MAGICK_EPSILON, QUANTUM_RANGE_F};

/// Numeric arguments consumed by the composite operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeParams {
    /// Dissolve/Blend weight applied to the source alpha (0.0 - 1.0)
    pub source_dissolve: f64,
    /// Dissolve/Blend weight applied to the destination alpha (0.0 - 1.0)
    pub destination_dissolve: f64,
    /// Modulate brightness, in percent
    pub percent_brightness: f64,
    /// Modulate saturation, in percent
    pub percent_saturation: f64,
    /// Threshold blend amount
    pub amount: f64,
    /// Threshold color distance, on the Quantum scale
    pub threshold: f64,
    /// Displace horizontal scale, in pixels
    pub horizontal_scale: f64,
    /// Displace vertical scale, in pixels
    pub vertical_scale: f64,
    /// Whether destination pixels outside the overlay are redefined
    pub modify_outside_overlay: bool,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            source_dissolve: 1.0,
            destination_dissolve: 1.0,
            percent_brightness: 100.0,
            percent_saturation: 100.0,
            amount: 0.5,
            threshold: 0.05 * QUANTUM_RANGE_F,
            horizontal_scale: 20.0,
            vertical_scale: 20.0,
            modify_outside_overlay: false,
        }
    }
}

impl CompositeParams {
    /// Arguments for `compose`, reading `geometry` when the operator takes one
    pub fn new(compose: CompositeOperator, geometry: Option<&str>) -> Self {
        let mut params = Self {
            modify_outside_overlay: compose.modifies_outside_overlay(),
            ..Default::default()
        };
        if !compose.takes_geometry() {
            return params;
        }
        let Some(text) = geometry else {
            return params;
        };
        let info = match GeometryInfo::parse(text) {
            Ok(info) => info,
            Err(e) => {
                log::debug!("{compose} geometry ignored: {e}");
                return params;
            }
        };

        match compose {
            CompositeOperator::Dissolve => params.set_dissolve(&info, false),
            CompositeOperator::Blend => params.set_dissolve(&info, true),
            CompositeOperator::Displace => {
                params.horizontal_scale = info.rho;
                params.vertical_scale = if info.flags.sigma {
                    info.sigma
                } else {
                    info.rho
                };
            }
            CompositeOperator::Modulate => {
                params.percent_brightness = info.rho;
                if info.flags.sigma {
                    params.percent_saturation = info.sigma;
                }
            }
            CompositeOperator::Threshold => {
                params.amount = info.rho;
                let threshold = if info.flags.sigma { info.sigma } else { 0.05 };
                params.threshold = threshold * QUANTUM_RANGE_F;
            }
            _ => {}
        }
        params
    }

    fn set_dissolve(&mut self, info: &GeometryInfo, blend: bool) {
        let mut source = info.rho / 100.0;
        let mut destination;
        if source - MAGICK_EPSILON < 0.0 {
            source = 0.0;
        }
        if blend {
            // Blend snaps to 1 within epsilon; the destination is the rest
            if source + MAGICK_EPSILON > 1.0 {
                source = 1.0;
            }
            destination = 1.0 - source;
        } else {
            destination = 1.0;
            if source + MAGICK_EPSILON > 1.0 {
                destination = 2.0 - source;
                source = 1.0;
            }
        }
        if info.flags.sigma {
            destination = info.sigma / 100.0;
        }
        if destination - MAGICK_EPSILON < 0.0 {
            destination = 0.0;
        }
        self.modify_outside_overlay = true;
        if destination + MAGICK_EPSILON > 1.0 {
            destination = 1.0;
            self.modify_outside_overlay = false;
        }
        self.source_dissolve = source;
        self.destination_dissolve = destination;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_geometry() {
        let p = CompositeParams::new(CompositeOperator::Displace, None);
        assert_eq!((p.horizontal_scale, p.vertical_scale), (20.0, 20.0));
        let p = CompositeParams::new(CompositeOperator::Threshold, None);
        assert_eq!(p.amount, 0.5);
        assert!((p.threshold - 0.05 * QUANTUM_RANGE_F).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_geometry_keeps_defaults() {
        let p = CompositeParams::new(CompositeOperator::Displace, Some("wide"));
        assert_eq!(p, CompositeParams::default());
    }

    #[test]
    fn test_dissolve() {
        let p = CompositeParams::new(CompositeOperator::Dissolve, Some("50"));
        assert_eq!((p.source_dissolve, p.destination_dissolve), (0.5, 1.0));
        assert!(!p.modify_outside_overlay);

        let p = CompositeParams::new(CompositeOperator::Dissolve, Some("150"));
        assert_eq!((p.source_dissolve, p.destination_dissolve), (1.0, 0.5));
        assert!(p.modify_outside_overlay);

        let p = CompositeParams::new(CompositeOperator::Dissolve, Some("30x60"));
        assert_eq!((p.source_dissolve, p.destination_dissolve), (0.3, 0.6));
        assert!(p.modify_outside_overlay);
    }

    #[test]
    fn test_blend() {
        let p = CompositeParams::new(CompositeOperator::Blend, Some("25"));
        assert_eq!((p.source_dissolve, p.destination_dissolve), (0.25, 0.75));
        assert!(p.modify_outside_overlay);

        let p = CompositeParams::new(CompositeOperator::Blend, Some("0"));
        assert_eq!((p.source_dissolve, p.destination_dissolve), (0.0, 1.0));
        assert!(!p.modify_outside_overlay);
    }

    #[test]
    fn test_blend_snaps_within_epsilon() {
        let p = CompositeParams::new(CompositeOperator::Blend, Some("99.99999999999"));
        assert_eq!((p.source_dissolve, p.destination_dissolve), (1.0, 0.0));
        assert!(p.modify_outside_overlay);

        let p = CompositeParams::new(CompositeOperator::Blend, Some("150"));
        assert_eq!((p.source_dissolve, p.destination_dissolve), (1.0, 0.0));

        let p = CompositeParams::new(CompositeOperator::Blend, Some("0.00000000001"));
        assert_eq!((p.source_dissolve, p.destination_dissolve), (0.0, 1.0));
        assert!(!p.modify_outside_overlay);
    }

    #[test]
    fn test_modulate_and_displace() {
        let p = CompositeParams::new(CompositeOperator::Modulate, Some("50"));
        assert_eq!((p.percent_brightness, p.percent_saturation), (50.0, 100.0));
        let p = CompositeParams::new(CompositeOperator::Modulate, Some("50x80"));
        assert_eq!(p.percent_saturation, 80.0);

        let p = CompositeParams::new(CompositeOperator::Displace, Some("5"));
        assert_eq!((p.horizontal_scale, p.vertical_scale), (5.0, 5.0));
        let p = CompositeParams::new(CompositeOperator::Displace, Some("5x3"));
        assert_eq!((p.horizontal_scale, p.vertical_scale), (5.0, 3.0));
    }

    #[test]
    fn test_geometry_ignored_by_plain_operators() {
        let p = CompositeParams::new(CompositeOperator::Over, Some("50"));
        assert_eq!(p, CompositeParams::default());
        let p = CompositeParams::new(CompositeOperator::In, Some("50"));
        assert!(p.modify_outside_overlay);
    }
}

//! Unit conversion utilities.
//!
//! Internal board units are nanometers held in `i32`, which covers a board
//! just over +/- 2 meters wide. Board files store distances in millimeters
//! and angles in degrees; both are converted at the point of each read or
//! write, never stored in file units.

/// Internal units per millimeter.
pub const IU_PER_MM: f64 = 1_000_000.0;

/// Internal units per mil (1/1000 inch), used by the legacy library format.
pub const IU_PER_MILS: f64 = IU_PER_MM * 0.0254;

/// Angles are stored in tenths of a degree.
pub const DECIDEGREES_PER_DEGREE: f64 = 10.0;

/// Converts a distance in millimeters to internal units, rounding to the
/// nearest unit.
pub fn mm_to_iu(mm: f64) -> i32 {
    let iu = mm * IU_PER_MM;
    if iu >= 0.0 {
        (iu + 0.5) as i32
    } else {
        (iu - 0.5) as i32
    }
}

/// Converts internal units back to millimeters.
pub fn iu_to_mm(iu: i32) -> f64 {
    iu as f64 / IU_PER_MM
}

/// Converts a distance in mils to internal units.
pub fn mils_to_iu(mils: f64) -> i32 {
    let iu = mils * IU_PER_MILS;
    if iu >= 0.0 {
        (iu + 0.5) as i32
    } else {
        (iu - 0.5) as i32
    }
}

/// Converts an angle in degrees to decidegrees.
pub fn deg_to_decideg(deg: f64) -> i32 {
    let dd = deg * DECIDEGREES_PER_DEGREE;
    if dd >= 0.0 {
        (dd + 0.5) as i32
    } else {
        (dd - 0.5) as i32
    }
}

/// Converts decidegrees to degrees.
pub fn decideg_to_deg(decideg: i32) -> f64 {
    decideg as f64 / DECIDEGREES_PER_DEGREE
}

/// Formats an internal-unit value as millimeters for a board file.
///
/// The output is a plain decimal with trailing zeros trimmed, so a value
/// re-read through [`mm_to_iu`] yields the identical internal value. This
/// is what makes serialize/parse round trips lossless.
pub fn fmt_iu(iu: i32) -> String {
    // 1 iu = 1e-6 mm, so six fractional digits are always exact.
    let mut s = format!("{:.6}", iu_to_mm(iu));
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Formats a decidegree angle as degrees for a board file.
pub fn fmt_decideg(decideg: i32) -> String {
    let mut s = format!("{:.1}", decideg_to_deg(decideg));
    if s.ends_with(".0") {
        s.truncate(s.len() - 2);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_round_trips_through_internal_units() {
        for mm in [0.0, 1.0, 0.254, -3.81, 172.3456, 0.000001] {
            let iu = mm_to_iu(mm);
            assert_eq!(mm_to_iu(iu_to_mm(iu)), iu);
        }
    }

    #[test]
    fn fmt_iu_trims_trailing_zeros() {
        assert_eq!(fmt_iu(mm_to_iu(1.0)), "1");
        assert_eq!(fmt_iu(mm_to_iu(0.25)), "0.25");
        assert_eq!(fmt_iu(mm_to_iu(-3.81)), "-3.81");
        assert_eq!(fmt_iu(0), "0");
        assert_eq!(fmt_iu(1), "0.000001");
    }

    #[test]
    fn formatted_value_parses_back_to_same_iu() {
        for iu in [0, 1, -1, 500_000, 123_456_789, -250_000] {
            let text = fmt_iu(iu);
            let parsed: f64 = text.parse().unwrap();
            assert_eq!(mm_to_iu(parsed), iu, "text was {text}");
        }
    }

    #[test]
    fn angle_conversion() {
        assert_eq!(deg_to_decideg(90.0), 900);
        assert_eq!(deg_to_decideg(-45.5), -455);
        assert_eq!(fmt_decideg(900), "90");
        assert_eq!(fmt_decideg(-455), "-45.5");
    }

    proptest::proptest! {
        #[test]
        fn any_internal_value_survives_formatting(iu in -500_000_000i32..=500_000_000) {
            let text = fmt_iu(iu);
            let parsed: f64 = text.parse().unwrap();
            proptest::prop_assert_eq!(mm_to_iu(parsed), iu);
        }
    }
}

//! Meter calibration: raw 0..=255 readings to display strings

use cat_protocol::Meter;

/// Converts raw meter readings to human-readable values
pub trait MeterCalibration: Send + Sync {
    fn render(&self, meter: Meter, raw: u8) -> String;
}

struct CalPoint {
    raw: u8,
    value: f64,
    label: &'static str,
}

const fn cal(raw: u8, value: f64, label: &'static str) -> CalPoint {
    CalPoint { raw, value, label }
}

// S-meter points after Hamlib's FT891_STR_CAL
const SIG_CAL: &[CalPoint] = &[
    cal(0, -54.0, "S0"),
    cal(12, -48.0, "S1"),
    cal(27, -42.0, "S2"),
    cal(40, -36.0, "S3"),
    cal(55, -30.0, "S4"),
    cal(65, -24.0, "S5"),
    cal(80, -18.0, "S6"),
    cal(95, -12.0, "S7"),
    cal(112, -6.0, "S8"),
    cal(130, 0.0, "S9"),
    cal(150, 10.0, "S9+10"),
    cal(172, 20.0, "S9+20"),
    cal(190, 30.0, "S9+30"),
    cal(220, 40.0, "S9+40"),
    cal(240, 50.0, "S9+50"),
    cal(255, 60.0, "S9+60"),
];

const ALC_CAL: &[CalPoint] = &[cal(0, 0.0, ""), cal(157, 100.0, ""), cal(255, 200.0, "")];

// After Hamlib's FT891_RFPOWER_METER_CAL
const PWR_CAL: &[CalPoint] = &[
    cal(0, 0.0, ""),
    cal(10, 0.8, ""),
    cal(50, 8.0, ""),
    cal(100, 26.0, ""),
    cal(150, 54.0, ""),
    cal(200, 92.0, ""),
    cal(250, 140.0, ""),
    cal(255, 145.0, ""),
];

// Read off the front panel scale: 1, 1.5, 2 and 3 at 0, 19, 37 and 52 of 97 pixels
const SWR_LIMIT: u8 = (52 * 255 / 97) as u8;
const SWR_CAL: &[CalPoint] = &[
    cal(0, 1.0, ""),
    cal((19 * 255 / 97) as u8, 1.5, ""),
    cal((37 * 255 / 97) as u8, 2.0, ""),
    cal(SWR_LIMIT, 3.0, ""),
];

const IDD_CAL: &[CalPoint] = &[cal(0, 0.0, ""), cal(255, 30.0, "")];

/// Linear interpolation between the two calibration points around `raw`.
/// Readings outside the table clamp to its ends.
fn interpolate(raw: u8, points: &[CalPoint]) -> (f64, &'static str) {
    let Some(first) = points.first() else {
        return (f64::from(raw), "");
    };
    if raw <= first.raw {
        return (first.value, first.label);
    }

    for pair in points.windows(2) {
        let (lo, hi) = (&pair[0], &pair[1]);
        if raw == hi.raw {
            return (hi.value, hi.label);
        }
        if raw < hi.raw {
            let frac = f64::from(raw - lo.raw) / f64::from(hi.raw - lo.raw);
            return (lo.value + (hi.value - lo.value) * frac, lo.label);
        }
    }

    let last = &points[points.len() - 1];
    (last.value, last.label)
}

/// Calibration of the FT-891 front panel meters
#[derive(Debug, Clone, Copy, Default)]
pub struct Ft891Calibration;

impl MeterCalibration for Ft891Calibration {
    fn render(&self, meter: Meter, raw: u8) -> String {
        match meter {
            Meter::Sig => {
                let (db, label) = interpolate(raw, SIG_CAL);
                format!("{:<5} ({:<3.0} dB)", label, db)
            }
            Meter::Alc => format!("{:3.0}%", interpolate(raw, ALC_CAL).0),
            // No published curve; show percent of full scale
            Meter::Comp => format!("{:3.0}%", f64::from(raw) * 100.0 / 255.0),
            Meter::Pwr => format!("{:5.1} W", interpolate(raw, PWR_CAL).0),
            Meter::Swr if raw > SWR_LIMIT => "TOO MUCH".to_string(),
            Meter::Swr => format!("{:4.2}", interpolate(raw, SWR_CAL).0),
            Meter::Idd => format!("{:4.1} A", interpolate(raw, IDD_CAL).0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sig_exact_and_interpolated() {
        let cal = Ft891Calibration;
        assert_eq!(cal.render(Meter::Sig, 130), "S9    (0   dB)");
        assert_eq!(cal.render(Meter::Sig, 0), "S0    (-54 dB)");
        // halfway between S9 and S9+10
        assert_eq!(cal.render(Meter::Sig, 140), "S9    (5   dB)");
        assert_eq!(cal.render(Meter::Sig, 255), "S9+60 (60  dB)");
    }

    #[test]
    fn test_tx_meters() {
        let cal = Ft891Calibration;
        assert_eq!(cal.render(Meter::Alc, 157), "100%");
        assert_eq!(cal.render(Meter::Pwr, 100), " 26.0 W");
        assert_eq!(cal.render(Meter::Pwr, 75), " 17.0 W");
        assert_eq!(cal.render(Meter::Idd, 255), "30.0 A");
        assert_eq!(cal.render(Meter::Idd, 0), " 0.0 A");
        assert_eq!(cal.render(Meter::Comp, 255), "100%");
    }

    #[test]
    fn test_swr() {
        let cal = Ft891Calibration;
        assert_eq!(cal.render(Meter::Swr, 0), "1.00");
        assert_eq!(cal.render(Meter::Swr, SWR_LIMIT), "3.00");
        assert_eq!(cal.render(Meter::Swr, SWR_LIMIT + 1), "TOO MUCH");
    }

    #[test]
    fn test_interpolate_clamps() {
        assert_eq!(interpolate(255, SWR_CAL).0, 3.0);
        assert_eq!(interpolate(0, &[]).0, 0.0);
    }
}

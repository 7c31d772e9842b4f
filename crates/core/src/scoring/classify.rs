use crate::domain::category::{Polarity, Thresholds};
use crate::domain::level::{Level, Scale, Tier};
use crate::domain::stock::CellValue;

/// Place a number relative to the middle band. Bounds are inclusive.
pub fn tier(value: f64, thresholds: Thresholds, polarity: Polarity) -> Tier {
    let Thresholds { lo, hi } = thresholds;
    let in_band = lo <= value && value <= hi;
    match polarity {
        Polarity::HigherIsBetter if value > hi => Tier::Top,
        Polarity::LowerIsBetter if value < lo => Tier::Top,
        _ if in_band => Tier::Middle,
        _ => Tier::Bottom,
    }
}

/// Classify a cell. Missing or non-numeric cells map to `Level::Unavailable`.
pub fn classify(
    value: Option<&CellValue>,
    thresholds: Thresholds,
    polarity: Polarity,
    scale: Scale,
) -> Level {
    match value.and_then(CellValue::as_number) {
        Some(v) => scale.level(tier(v, thresholds, polarity)),
        None => Level::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T: Thresholds = Thresholds::new(1.0, 2.0);

    #[test]
    fn higher_is_better_boundaries() {
        let p = Polarity::HigherIsBetter;
        assert_eq!(tier(2.5, T, p), Tier::Top);
        assert_eq!(tier(2.0, T, p), Tier::Middle);
        assert_eq!(tier(1.0, T, p), Tier::Middle);
        assert_eq!(tier(0.999, T, p), Tier::Bottom);
    }

    #[test]
    fn lower_is_better_boundaries() {
        let p = Polarity::LowerIsBetter;
        assert_eq!(tier(0.5, T, p), Tier::Top);
        assert_eq!(tier(1.0, T, p), Tier::Middle);
        assert_eq!(tier(2.0, T, p), Tier::Middle);
        assert_eq!(tier(2.001, T, p), Tier::Bottom);
    }

    #[test]
    fn degenerate_band_still_classifies() {
        let t = Thresholds::new(0.0, 0.0);
        assert_eq!(tier(0.0, t, Polarity::HigherIsBetter), Tier::Middle);
        assert_eq!(tier(-0.1, t, Polarity::HigherIsBetter), Tier::Bottom);
        assert_eq!(tier(0.1, t, Polarity::LowerIsBetter), Tier::Bottom);
    }

    #[test]
    fn non_finite_cells_are_unavailable() {
        let p = Polarity::HigherIsBetter;
        for raw in ["inf", "-inf", "infinity", "NaN"] {
            let cell = CellValue::parse(raw);
            assert_eq!(classify(Some(&cell), T, p, Scale::Risk), Level::Unavailable, "{raw}");
        }
        let cell = CellValue::Number(f64::INFINITY);
        assert_eq!(classify(Some(&cell), T, p, Scale::Investment), Level::Unavailable);
    }

    #[test]
    fn infinities_fall_outside_the_band() {
        let p = Polarity::HigherIsBetter;
        assert_eq!(tier(f64::INFINITY, T, p), Tier::Top);
        assert_eq!(tier(f64::NEG_INFINITY, T, p), Tier::Bottom);
    }

    #[test]
    fn maps_tiers_to_scale_labels() {
        let sharpe = CellValue::Number(2.4);
        let level = classify(Some(&sharpe), T, Polarity::HigherIsBetter, Scale::Investment);
        assert_eq!(level, Level::Excellent);

        let vol = CellValue::Number(2.4);
        let level = classify(Some(&vol), T, Polarity::LowerIsBetter, Scale::Risk);
        assert_eq!(level, Level::Bad);

        let numeric_text = CellValue::Text(" 1.5".to_string());
        let level = classify(Some(&numeric_text), T, Polarity::LowerIsBetter, Scale::Risk);
        assert_eq!(level, Level::Neutral);
    }

    #[test]
    fn missing_and_text_cells_are_unavailable() {
        for scale in Scale::ALL {
            assert_eq!(
                classify(None, T, Polarity::HigherIsBetter, scale),
                Level::Unavailable
            );
            assert_eq!(
                classify(Some(&CellValue::Empty), T, Polarity::LowerIsBetter, scale),
                Level::Unavailable
            );
            assert_eq!(
                classify(
                    Some(&CellValue::not_available()),
                    T,
                    Polarity::HigherIsBetter,
                    scale
                ),
                Level::Unavailable
            );
        }
    }

    fn polarity() -> impl Strategy<Value = Polarity> {
        prop_oneof![Just(Polarity::HigherIsBetter), Just(Polarity::LowerIsBetter)]
    }

    fn bounds() -> impl Strategy<Value = Thresholds> {
        (-1.0e6..1.0e6f64, 0.0..1.0e6f64).prop_map(|(lo, width)| Thresholds::new(lo, lo + width))
    }

    proptest! {
        #[test]
        fn tier_is_monotonic(
            t in bounds(),
            p in polarity(),
            a in -2.0e6..2.0e6f64,
            b in -2.0e6..2.0e6f64,
        ) {
            let (small, large) = if a <= b { (a, b) } else { (b, a) };
            match p {
                Polarity::HigherIsBetter => prop_assert!(tier(small, t, p) <= tier(large, t, p)),
                Polarity::LowerIsBetter => prop_assert!(tier(small, t, p) >= tier(large, t, p)),
            }
        }

        #[test]
        fn non_numeric_text_is_always_unavailable(
            t in bounds(),
            p in polarity(),
            s in "[a-zA-Z /%-]{1,16}",
        ) {
            let cell = CellValue::Text(s);
            for scale in Scale::ALL {
                prop_assert_eq!(classify(Some(&cell), t, p, scale), Level::Unavailable);
            }
        }
    }
}

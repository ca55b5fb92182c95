//! Temperature-indexed gyro bias table with piecewise-linear interpolation.

use crate::vector::Vector3;

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationEntry {
    /// Raw die temperature reported by the IMU
    pub temperature: i16,
    /// Zero-rate offset in the gyro's native dps domain
    pub bias: Vector3,
}

impl CalibrationEntry {
    pub const fn new(temperature: i16, bias: Vector3) -> Self {
        Self { temperature, bias }
    }
}

/// Where a query temperature falls relative to the table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bracket<'a> {
    /// Strictly below the first entry
    Below(&'a CalibrationEntry),
    /// `lower.temperature <= t < upper.temperature`
    Within {
        lower: &'a CalibrationEntry,
        upper: &'a CalibrationEntry,
    },
    /// At or above the last entry
    Above(&'a CalibrationEntry),
}

/// Ordered, immutable bias table.
///
/// Entries must be strictly ascending in temperature. The order is checked by
/// `new` at compile time when the table is built as a `const`; lookups never
/// re-check it.
#[derive(Clone, Copy, Debug)]
pub struct CalibrationTable<'a> {
    entries: &'a [CalibrationEntry],
}

impl<'a> CalibrationTable<'a> {
    pub const fn new(entries: &'a [CalibrationEntry]) -> Self {
        assert!(!entries.is_empty(), "calibration table is empty");
        let mut i = 1;
        while i < entries.len() {
            assert!(
                entries[i - 1].temperature < entries[i].temperature,
                "calibration table must be strictly ascending in temperature"
            );
            i += 1;
        }
        Self { entries }
    }

    pub fn entries(&self) -> &'a [CalibrationEntry] {
        self.entries
    }

    /// First-strictly-exceeds scan. A query equal to an interior temperature
    /// lands in the bracket whose lower bound is that entry.
    pub fn classify(&self, temperature: i16) -> Bracket<'a> {
        let entries = self.entries;
        match entries.iter().position(|e| temperature < e.temperature) {
            Some(0) => Bracket::Below(&entries[0]),
            Some(i) => Bracket::Within {
                lower: &entries[i - 1],
                upper: &entries[i],
            },
            None => Bracket::Above(&entries[entries.len() - 1]),
        }
    }

    /// Gyro bias at `temperature`, clamped to the end entries outside the
    /// table range.
    pub fn bias_at(&self, temperature: i16) -> Vector3 {
        match self.classify(temperature) {
            Bracket::Below(entry) | Bracket::Above(entry) => entry.bias,
            Bracket::Within { lower, upper } => {
                let range = i32::from(upper.temperature) - i32::from(lower.temperature);
                let delta = i32::from(temperature) - i32::from(lower.temperature);
                let scale = delta as f32 / range as f32;
                lower.bias + (upper.bias - lower.bias) * scale
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    const TWO_POINT: [CalibrationEntry; 2] = [
        CalibrationEntry::new(3, Vector3::new(-0.618, 0.900, 1.000)),
        CalibrationEntry::new(43, Vector3::new(-0.500, 0.380, 4.200)),
    ];

    const THREE_POINT: [CalibrationEntry; 3] = [
        CalibrationEntry::new(-10, Vector3::new(1.0, 2.0, 3.0)),
        CalibrationEntry::new(10, Vector3::new(3.0, 2.0, 1.0)),
        CalibrationEntry::new(30, Vector3::new(-1.0, 0.0, 5.0)),
    ];

    fn assert_close(a: Vector3, b: Vector3) {
        assert!((a.x - b.x).abs() < EPSILON, "{:?} != {:?}", a, b);
        assert!((a.y - b.y).abs() < EPSILON, "{:?} != {:?}", a, b);
        assert!((a.z - b.z).abs() < EPSILON, "{:?} != {:?}", a, b);
    }

    #[test]
    fn midpoint_interpolates_linearly() {
        let table = CalibrationTable::new(&TWO_POINT);
        assert_close(table.bias_at(23), Vector3::new(-0.559, 0.640, 2.600));
    }

    #[test]
    fn clamps_below_and_at_the_lowest_entry() {
        let table = CalibrationTable::new(&TWO_POINT);
        for t in [i16::MIN, -40, 0, 2, 3] {
            assert_eq!(table.bias_at(t), TWO_POINT[0].bias, "t = {}", t);
        }
    }

    #[test]
    fn clamps_at_and_above_the_highest_entry() {
        let table = CalibrationTable::new(&TWO_POINT);
        for t in [43, 44, 100, i16::MAX] {
            assert_eq!(table.bias_at(t), TWO_POINT[1].bias, "t = {}", t);
        }
    }

    #[test]
    fn classify_reports_each_region() {
        let table = CalibrationTable::new(&THREE_POINT);
        assert_eq!(table.classify(-11), Bracket::Below(&THREE_POINT[0]));
        assert_eq!(
            table.classify(-10),
            Bracket::Within { lower: &THREE_POINT[0], upper: &THREE_POINT[1] }
        );
        assert_eq!(
            table.classify(29),
            Bracket::Within { lower: &THREE_POINT[1], upper: &THREE_POINT[2] }
        );
        assert_eq!(table.classify(30), Bracket::Above(&THREE_POINT[2]));
    }

    #[test]
    fn interior_tie_returns_that_entry_exactly() {
        let table = CalibrationTable::new(&THREE_POINT);
        assert_eq!(
            table.classify(10),
            Bracket::Within { lower: &THREE_POINT[1], upper: &THREE_POINT[2] }
        );
        assert_eq!(table.bias_at(10), THREE_POINT[1].bias);
    }

    #[test]
    fn interpolated_bias_stays_between_neighbours() {
        let table = CalibrationTable::new(&THREE_POINT);
        for t in 11..30 {
            let b = table.bias_at(t);
            let (lo, hi) = (THREE_POINT[1].bias, THREE_POINT[2].bias);
            assert!(b.x <= lo.x.max(hi.x) && b.x >= lo.x.min(hi.x));
            assert!(b.y <= lo.y.max(hi.y) && b.y >= lo.y.min(hi.y));
            assert!(b.z <= lo.z.max(hi.z) && b.z >= lo.z.min(hi.z));
        }
        assert_close(table.bias_at(20), Vector3::new(1.0, 1.0, 3.0));
    }

    #[test]
    fn single_entry_table_is_constant() {
        let only = [CalibrationEntry::new(25, Vector3::new(0.1, 0.2, 0.3))];
        let table = CalibrationTable::new(&only);
        assert_eq!(table.bias_at(-100), only[0].bias);
        assert_eq!(table.bias_at(25), only[0].bias);
        assert_eq!(table.bias_at(100), only[0].bias);
    }

    #[test]
    fn lookup_is_bit_identical_across_calls() {
        let table = CalibrationTable::new(&TWO_POINT);
        for t in -5..50 {
            let a = table.bias_at(t);
            let b = table.bias_at(t);
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            assert_eq!(a.y.to_bits(), b.y.to_bits());
            assert_eq!(a.z.to_bits(), b.z.to_bits());
        }
    }

    #[test]
    #[should_panic(expected = "strictly ascending")]
    fn rejects_unordered_entries() {
        let unordered = [
            CalibrationEntry::new(40, Vector3::ZERO),
            CalibrationEntry::new(10, Vector3::ZERO),
        ];
        let _ = CalibrationTable::new(&unordered);
    }
}

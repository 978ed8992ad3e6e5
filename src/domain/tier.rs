use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// One hour band of the overtime schedule.
///
/// Bounds are inclusive; `upper: None` marks the final, unbounded band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBand {
    pub lower: u32,
    pub upper: Option<u32>,
    pub multiplier: Decimal,
}

impl TierBand {
    /// Hours this band can absorb. The first band covers 0..=upper but only
    /// ever consumes `upper` hours of work.
    fn capacity(&self) -> Option<u32> {
        self.upper.map(|upper| upper + 1 - self.lower.max(1))
    }
}

/// Hours consumed from a single band during a calculation. Retained on the
/// record as the audit trail of a percentage-method calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierSlice {
    pub band: usize,
    pub hours: u32,
    pub multiplier: Decimal,
}

/// The ordered table of hour bands and rate multipliers used by the
/// percentage calculation method.
///
/// The default table is contractual configuration data; a custom schedule may
/// be supplied as long as it is contiguous, starts at zero and is unbounded
/// only in its last band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSchedule {
    bands: Vec<TierBand>,
}

impl Default for TierSchedule {
    fn default() -> Self {
        Self {
            bands: vec![
                TierBand { lower: 0, upper: Some(160), multiplier: dec!(1.00) },
                TierBand { lower: 161, upper: Some(180), multiplier: dec!(1.00) },
                TierBand { lower: 181, upper: Some(200), multiplier: dec!(1.25) },
                TierBand { lower: 201, upper: Some(220), multiplier: dec!(1.50) },
                TierBand { lower: 221, upper: Some(240), multiplier: dec!(1.50) },
                TierBand { lower: 241, upper: Some(260), multiplier: dec!(1.75) },
                TierBand { lower: 261, upper: None, multiplier: dec!(2.00) },
            ],
        }
    }
}

impl TierSchedule {
    /// Builds a custom schedule, validating its shape.
    pub fn new(bands: Vec<TierBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(PaymentError::validation("tier schedule must not be empty"));
        }
        if bands[0].lower != 0 {
            return Err(PaymentError::validation(
                "first tier band must start at 0 hours",
            ));
        }
        for (i, band) in bands.iter().enumerate() {
            if band.multiplier <= Decimal::ZERO {
                return Err(PaymentError::validation(format!(
                    "tier band {} has a non-positive multiplier",
                    i + 1
                )));
            }
            match band.upper {
                Some(upper) => {
                    if upper < band.lower {
                        return Err(PaymentError::validation(format!(
                            "tier band {} has upper bound below lower bound",
                            i + 1
                        )));
                    }
                    if band.capacity() == Some(0) {
                        return Err(PaymentError::validation(format!(
                            "tier band {} has zero capacity",
                            i + 1
                        )));
                    }
                    match bands.get(i + 1) {
                        Some(next) if next.lower != upper + 1 => {
                            return Err(PaymentError::validation(format!(
                                "tier band {} is not contiguous with its successor",
                                i + 1
                            )));
                        }
                        Some(_) => {}
                        None => {
                            return Err(PaymentError::validation(
                                "last tier band must be unbounded",
                            ));
                        }
                    }
                }
                None => {
                    if i + 1 != bands.len() {
                        return Err(PaymentError::validation(
                            "only the last tier band may be unbounded",
                        ));
                    }
                }
            }
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[TierBand] {
        &self.bands
    }

    /// Consumes `hours` into successive bands and returns the per-band
    /// slices. Zero hours yields an empty breakdown.
    pub fn breakdown(&self, hours: u32) -> Vec<TierSlice> {
        let mut remaining = hours;
        let mut slices = Vec::new();
        for (i, band) in self.bands.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let take = match band.capacity() {
                Some(capacity) => capacity.min(remaining),
                None => remaining,
            };
            if take > 0 {
                slices.push(TierSlice {
                    band: i + 1,
                    hours: take,
                    multiplier: band.multiplier,
                });
                remaining -= take;
            }
        }
        slices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_shape() {
        let schedule = TierSchedule::default();
        assert_eq!(schedule.bands().len(), 7);
        assert_eq!(schedule.bands()[0].upper, Some(160));
        assert_eq!(schedule.bands()[6].lower, 261);
        assert_eq!(schedule.bands()[6].upper, None);
        assert_eq!(schedule.bands()[6].multiplier, dec!(2.00));
    }

    #[test]
    fn test_breakdown_within_first_band() {
        let slices = TierSchedule::default().breakdown(160);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].hours, 160);
        assert_eq!(slices[0].multiplier, dec!(1.00));
    }

    #[test]
    fn test_breakdown_spans_four_bands() {
        let slices = TierSchedule::default().breakdown(220);
        let hours: Vec<u32> = slices.iter().map(|s| s.hours).collect();
        let multipliers: Vec<Decimal> = slices.iter().map(|s| s.multiplier).collect();
        assert_eq!(hours, vec![160, 20, 20, 20]);
        assert_eq!(
            multipliers,
            vec![dec!(1.00), dec!(1.00), dec!(1.25), dec!(1.50)]
        );
    }

    #[test]
    fn test_breakdown_zero_hours() {
        assert!(TierSchedule::default().breakdown(0).is_empty());
    }

    #[test]
    fn test_breakdown_beyond_last_band() {
        let slices = TierSchedule::default().breakdown(300);
        let last = slices.last().unwrap();
        assert_eq!(last.band, 7);
        assert_eq!(last.hours, 40);
        assert_eq!(last.multiplier, dec!(2.00));
        let total: u32 = slices.iter().map(|s| s.hours).sum();
        assert_eq!(total, 300);
    }

    #[test]
    fn test_custom_schedule_validation() {
        // Gap between bands
        let gap = vec![
            TierBand { lower: 0, upper: Some(100), multiplier: dec!(1.0) },
            TierBand { lower: 102, upper: None, multiplier: dec!(1.5) },
        ];
        assert!(matches!(
            TierSchedule::new(gap),
            Err(PaymentError::Validation(_))
        ));

        // Bounded last band
        let bounded = vec![TierBand { lower: 0, upper: Some(100), multiplier: dec!(1.0) }];
        assert!(matches!(
            TierSchedule::new(bounded),
            Err(PaymentError::Validation(_))
        ));

        // Valid two-band schedule
        let ok = vec![
            TierBand { lower: 0, upper: Some(100), multiplier: dec!(1.0) },
            TierBand { lower: 101, upper: None, multiplier: dec!(1.5) },
        ];
        assert!(TierSchedule::new(ok).is_ok());
    }

    #[test]
    fn test_zero_width_first_band_rejected() {
        // 0..=0 passes the bound-order check but can absorb no hours; it
        // must be rejected rather than reach the breakdown walk.
        let bands = vec![
            TierBand { lower: 0, upper: Some(0), multiplier: dec!(1.0) },
            TierBand { lower: 1, upper: None, multiplier: dec!(1.5) },
        ];
        assert!(matches!(
            TierSchedule::new(bands),
            Err(PaymentError::Validation(_))
        ));
    }
}

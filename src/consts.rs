//! Regulatory and statistical constants shared across detectors.

/// Micro-purchase threshold in USD (FAR 13.003).
pub const MICRO_PURCHASE_THRESHOLD: f64 = 10_000.0;

/// Simplified acquisition threshold in USD (FAR 13.003).
pub const SIMPLIFIED_ACQUISITION_THRESHOLD: f64 = 250_000.0;

/// Expected Benford's Law first-digit frequencies, log10(1 + 1/d) for d in 1..=9.
pub const BENFORD_EXPECTED: [f64; 9] = [
    0.301_029_995_663_981_2,
    0.176_091_259_055_681_24,
    0.124_938_736_608_299_95,
    0.096_910_013_008_056_41,
    0.079_181_246_047_624_83,
    0.066_946_789_630_613_2,
    0.057_991_946_977_686_75,
    0.051_152_522_447_381_29,
    0.045_757_490_560_675_12,
];

/// Chi-square critical value for df=8 at p=0.05.
pub const CHI_SQUARE_CRITICAL_P05: f64 = 15.51;

/// Federal fiscal year ends September 30.
pub(crate) const FISCAL_YEAR_END_MONTH: u32 = 9;
pub(crate) const FISCAL_YEAR_END_DAY: u32 = 30;

//! Pricing engine for multi-day guided bookings.
//!
//! Pure functions only: no clock, no repository. A quote is a function of
//! the day count and the daily window and nothing else.
//!
//! Day pricing is resolved by an ordered rule list:
//!
//! 1. exact preset windows (flat marketed rates),
//! 2. the hour-tier table for whole hour counts in `[3, 13]`,
//! 3. the hourly rate over the hour count clamped into `[3, 13]`.
//!
//! The discount is a non-cumulative step function of the day count; the
//! first matching tier in [`DISCOUNT_TIERS`] wins.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Earliest bookable start hour.
pub const OPENING_HOUR: u32 = 8;

/// Latest bookable end hour.
pub const CLOSING_HOUR: u32 = 21;

/// Shortest billable window per day, in hours.
pub const MIN_BILLABLE_HOURS: u32 = 3;

/// Longest billable window per day, in hours.
pub const MAX_BILLABLE_HOURS: u32 = CLOSING_HOUR - OPENING_HOUR;

/// Rate applied per billable hour when no preset or tier matches.
pub const HOURLY_RATE: u32 = 40;

/// A canonical window sold at a flat rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetWindow {
    /// 08:00 to 12:00.
    Morning,
    /// 13:00 to 18:00.
    Afternoon,
    /// 08:00 to 21:00.
    FullDay,
}

impl PresetWindow {
    /// Returns the window covered by this preset.
    #[must_use]
    pub const fn window(self) -> DailyWindow {
        match self {
            Self::Morning => DailyWindow::new(8, 12),
            Self::Afternoon => DailyWindow::new(13, 18),
            Self::FullDay => DailyWindow::new(8, 21),
        }
    }

    /// Returns the flat per-day price for this preset.
    #[must_use]
    pub fn price_per_day(self) -> Decimal {
        match self {
            Self::Morning => dec!(160),
            Self::Afternoon => dec!(200),
            Self::FullDay => dec!(400),
        }
    }
}

/// Presets in precedence order.
pub const PRESETS: [PresetWindow; 3] = [
    PresetWindow::Morning,
    PresetWindow::Afternoon,
    PresetWindow::FullDay,
];

/// Flat per-day price by whole hour count. Deliberately not linear.
const HOUR_TIERS: [(u32, u32); 11] = [
    (3, 120),
    (4, 160),
    (5, 200),
    (6, 230),
    (7, 260),
    (8, 290),
    (9, 320),
    (10, 340),
    (11, 360),
    (12, 380),
    (13, 400),
];

/// Discount tiers as `(minimum days, percent)`, highest first.
pub const DISCOUNT_TIERS: [(u32, u32); 3] = [(7, 20), (5, 15), (3, 10)];

/// Daily service window in whole hours, `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    /// Start hour (inclusive).
    pub start_hour: u32,
    /// End hour (exclusive).
    pub end_hour: u32,
}

impl DailyWindow {
    /// Creates a window. No validation is performed.
    #[must_use]
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    /// Signed hour span; negative for inverted windows.
    #[must_use]
    pub fn hours(self) -> i64 {
        i64::from(self.end_hour) - i64::from(self.start_hour)
    }
}

/// Which rule produced the per-day price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PricingBasis {
    /// An exact preset window matched.
    Preset {
        /// The matching preset.
        preset: PresetWindow,
    },
    /// The hour-tier table matched.
    HourTier {
        /// Hours per day.
        hours: u32,
    },
    /// Hourly rate over the clamped hour count.
    Hourly {
        /// Hours billed after clamping.
        billable_hours: u32,
    },
}

/// Price breakdown attached to a booking. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingQuote {
    /// Number of booked days.
    pub days: u32,
    /// The daily service window.
    pub daily_window: DailyWindow,
    /// Rule that priced a single day.
    pub pricing_basis: PricingBasis,
    /// Price of a single day.
    pub price_per_day: Decimal,
    /// `price_per_day * days`.
    pub base_price: Decimal,
    /// Applied discount rate (0, 0.10, 0.15 or 0.20).
    pub discount_rate: Decimal,
    /// `floor(base_price * discount_rate)`.
    pub discount_amount: Decimal,
    /// `base_price - discount_amount`.
    pub final_price: Decimal,
}

/// Computes a quote for `days` days of service in `[start_hour, end_hour)`.
///
/// Callers validate the input domain (`days >= 1`, a window of at least
/// three hours inside opening hours); out-of-domain windows are clamped
/// rather than rejected.
#[must_use]
pub fn compute_price(days: u32, start_hour: u32, end_hour: u32) -> BookingQuote {
    let daily_window = DailyWindow::new(start_hour, end_hour);
    let (pricing_basis, price_per_day) = resolve_day_price(daily_window);

    let base_price = price_per_day * Decimal::from(days);
    let discount_rate = discount_rate_for(days);
    let discount_amount = (base_price * discount_rate).floor();

    BookingQuote {
        days,
        daily_window,
        pricing_basis,
        price_per_day,
        base_price,
        discount_rate,
        discount_amount,
        final_price: base_price - discount_amount,
    }
}

/// Resolves the per-day price through presets, then tiers, then hourly.
#[must_use]
pub fn resolve_day_price(window: DailyWindow) -> (PricingBasis, Decimal) {
    if let Some(preset) = PRESETS.into_iter().find(|p| p.window() == window) {
        return (PricingBasis::Preset { preset }, preset.price_per_day());
    }

    let hours = window.hours();
    if let Some(&(tier_hours, price)) = HOUR_TIERS
        .iter()
        .find(|(tier_hours, _)| i64::from(*tier_hours) == hours)
    {
        return (
            PricingBasis::HourTier { hours: tier_hours },
            Decimal::from(price),
        );
    }

    let billable_hours = clamp_hours(hours);
    (
        PricingBasis::Hourly { billable_hours },
        Decimal::from(HOURLY_RATE) * Decimal::from(billable_hours),
    )
}

/// Returns the discount rate for a day count. Only the highest tier applies.
#[must_use]
pub fn discount_rate_for(days: u32) -> Decimal {
    DISCOUNT_TIERS
        .iter()
        .find(|(min_days, _)| days >= *min_days)
        .map_or(Decimal::ZERO, |(_, percent)| Decimal::new(i64::from(*percent), 2))
}

fn clamp_hours(hours: i64) -> u32 {
    let clamped = hours.clamp(i64::from(MIN_BILLABLE_HOURS), i64::from(MAX_BILLABLE_HOURS));
    // The clamp bounds fit in u32.
    u32::try_from(clamped).unwrap_or(MIN_BILLABLE_HOURS)
}

//! Time-slot normalization.
//!
//! Turns a tutor's raw availability windows into an hour-granular weekly
//! grid and a list of human-readable bookable ranges.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc, Weekday};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::{BookingError, Result};

/// Weekdays in grid order.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

// ============================================================================
// AvailabilitySlot
// ============================================================================

/// Bookability of an availability window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    /// Open for booking.
    Available,
    /// Already taken by a booking session.
    Booked,
    /// Withheld by the tutor.
    Blocked,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "AVAILABLE"),
            Self::Booked => write!(f, "BOOKED"),
            Self::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// A tutor-declared time window, as published by the availability service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    /// Slot identifier assigned by the service.
    pub id: String,
    /// Tutor who owns the slot.
    pub tutor_id: String,
    /// Start of the window.
    pub start_time: DateTime<Utc>,
    /// End of the window.
    pub end_time: DateTime<Utc>,
    /// Whether the window can be booked.
    pub status: SlotStatus,
}

impl AvailabilitySlot {
    /// Returns `true` if the slot can be booked.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }

    /// Returns `true` if `start_time < end_time`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time
    }

    /// Length of the window. Negative for inverted slots.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

// ============================================================================
// WeeklyGrid
// ============================================================================

/// Hour buckets per weekday, Monday through Sunday.
///
/// All seven days are always present. Serializes as a JSON object keyed by
/// the full weekday name, in weekday order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyGrid {
    days: [Vec<String>; 7],
}

impl WeeklyGrid {
    /// Returns the buckets recorded for `day`.
    #[must_use]
    pub fn day(&self, day: Weekday) -> &[String] {
        &self.days[day.num_days_from_monday() as usize]
    }

    /// Iterates over `(weekday, buckets)` pairs from Monday to Sunday.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &[String])> {
        WEEKDAYS
            .iter()
            .zip(self.days.iter())
            .map(|(day, buckets)| (*day, buckets.as_slice()))
    }

    /// Returns `true` if no day holds a bucket.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    /// Total number of hour buckets across the week.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.days.iter().map(Vec::len).sum()
    }

    fn push(&mut self, day: Weekday, bucket: String) {
        self.days[day.num_days_from_monday() as usize].push(bucket);
    }
}

/// Full English name of a weekday, as used for grid keys.
#[must_use]
pub const fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

impl Serialize for WeeklyGrid {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(WEEKDAYS.len()))?;
        for (day, buckets) in self.iter() {
            map.serialize_entry(weekday_name(day), buckets)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WeeklyGrid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct GridVisitor;

        impl<'de> Visitor<'de> for GridVisitor {
            type Value = WeeklyGrid;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from weekday name to hour buckets")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut grid = WeeklyGrid::default();
                while let Some((name, buckets)) = access.next_entry::<String, Vec<String>>()? {
                    let day: Weekday = name.parse().map_err(|_| {
                        serde::de::Error::custom(format!("invalid weekday '{name}'"))
                    })?;
                    grid.days[day.num_days_from_monday() as usize] = buckets;
                }
                Ok(grid)
            }
        }

        deserializer.deserialize_map(GridVisitor)
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Presentation-ready availability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAvailability {
    /// Hour buckets per weekday.
    pub weekly_grid: WeeklyGrid,
    /// One label per processed slot, in input order.
    pub readable_ranges: Vec<String>,
}

/// Normalizes raw availability into a weekly grid and readable ranges.
///
/// Only `AVAILABLE` slots are processed. Both the weekday bucket and the
/// label are computed in `offset`, so they always agree on the day. A slot
/// crossing midnight stays under the day it starts on.
///
/// # Errors
///
/// Returns `BookingError::InvalidSlot` if an available slot has
/// `end_time <= start_time`.
///
/// # Examples
///
/// ```
/// use chrono::{FixedOffset, TimeZone, Utc, Weekday};
/// use tutorhub_core::{normalize_availability, AvailabilitySlot, SlotStatus};
///
/// let slot = AvailabilitySlot {
///     id: "s1".to_string(),
///     tutor_id: "t1".to_string(),
///     start_time: Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
///     end_time: Utc.with_ymd_and_hms(2026, 1, 5, 11, 0, 0).unwrap(),
///     status: SlotStatus::Available,
/// };
/// let utc = FixedOffset::east_opt(0).unwrap();
///
/// let normalized = normalize_availability(&[slot], utc).unwrap();
/// assert_eq!(normalized.weekly_grid.day(Weekday::Mon), ["09:00-10:00", "10:00-11:00"]);
/// assert_eq!(normalized.readable_ranges, ["Mon 9:00 AM-11:00 AM"]);
/// ```
pub fn normalize_availability(
    slots: &[AvailabilitySlot],
    offset: FixedOffset,
) -> Result<NormalizedAvailability> {
    let mut normalized = NormalizedAvailability::default();

    for slot in slots {
        if !slot.is_available() {
            debug!(slot_id = %slot.id, status = %slot.status, "Skipping unavailable slot");
            continue;
        }

        if !slot.is_well_formed() {
            return Err(BookingError::invalid_slot(
                &slot.id,
                slot.start_time.to_rfc3339(),
                slot.end_time.to_rfc3339(),
            ));
        }

        let start = slot.start_time.with_timezone(&offset);
        let end = slot.end_time.with_timezone(&offset);
        let day = start.weekday();

        for bucket in hour_buckets(start, end) {
            normalized.weekly_grid.push(day, bucket);
        }
        normalized.readable_ranges.push(readable_range(start, end));
    }

    Ok(normalized)
}

/// Splits `[start, end)` into one-hour buckets, the last one bounded by `end`.
fn hour_buckets(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Vec<String> {
    let mut buckets = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = (cursor + Duration::hours(1)).min(end);
        buckets.push(format!("{}-{}", cursor.format("%H:%M"), next.format("%H:%M")));
        cursor = next;
    }
    buckets
}

/// Formats a slot as `"Mon 9:00 AM-11:00 AM"`.
fn readable_range(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> String {
    format!(
        "{} {}-{}",
        start.format("%a"),
        start.format("%-I:%M %p"),
        end.format("%-I:%M %p")
    )
}

// ============================================================================
// Tests
// ============================================================================

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    #[serde(serialize_with = "serialize_millis")]
    pub start: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub end: DateTime<Utc>,
}

fn serialize_millis<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Returns the gaps of at least `min_duration` between busy intervals inside
/// `[window_start, window_end]`, in chronological order.
///
/// Busy intervals may come from several calendars and may overlap; the cursor
/// only ever moves forward, so overlaps collapse naturally.
pub fn find_free_slots(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    min_duration: Duration,
    busy: &[Interval],
) -> Vec<TimeSlot> {
    let mut sorted = busy.to_vec();
    sorted.sort_by_key(|interval| interval.start);

    let mut slots = Vec::new();
    let mut cursor = window_start;

    for interval in &sorted {
        if interval.start - cursor >= min_duration {
            slots.push(TimeSlot {
                start: cursor,
                end: interval.start,
            });
        }
        if interval.end > cursor {
            cursor = interval.end;
        }
    }

    if window_end - cursor >= min_duration {
        slots.push(TimeSlot {
            start: cursor,
            end: window_end,
        });
    }

    slots
}

//! Workout ratio mapper
//!
//! Maps a free-text workout type to a conversion ratio: coding minutes
//! granted per workout minute. Classification is by case-insensitive
//! substring match against an ordered table; the first matching row wins.

/// Ratio used when the workout type matches no table row
pub const DEFAULT_RATIO: i64 = 12;

/// Ordered classification table: (substrings, ratio). First match wins.
const RATIO_TABLE: &[(&[&str], i64)] = &[
    (&["walk", "hik"], 8),
    (&["run", "cycl", "swim"], 12),
    (&["strength", "weight", "functional"], 15),
    (&["hiit", "interval", "cross"], 18),
    (&["yoga", "pilates"], 10),
];

/// Map a workout type to its conversion ratio.
///
/// The caller is expected to consult this only when the workout carries a
/// type and no explicit override was given; an override bypasses the table
/// entirely.
pub fn ratio_for_type(workout_type: &str) -> i64 {
    let normalized = workout_type.to_lowercase();

    for (needles, ratio) in RATIO_TABLE {
        if needles.iter().any(|n| normalized.contains(n)) {
            return *ratio;
        }
    }

    DEFAULT_RATIO
}

use chrono::{TimeDelta, TimeZone, Timelike, Utc};

use crate::{SAFETY_TIP_MAX_INTERVAL_MS, SAFETY_TIP_MIN_INTERVAL_MS};

const MORNING: &[&str] = &["Hello, good morning", "Welcome Back"];
const AFTERNOON: &[&str] = &["Nice afternoon", "It's Great having you here"];
const EVENING: &[&str] = &["Good Evening", "Welcome Back"];
const NIGHT: &[&str] = &["Welcome back"];

/// Hour of day (0-23) at `now_ms` in a zone `utc_offset_minutes` east of UTC.
#[must_use]
pub fn local_hour(now_ms: u64, utc_offset_minutes: i32) -> u32 {
    let millis = i64::try_from(now_ms).unwrap_or(i64::MAX);
    let offset = TimeDelta::try_minutes(i64::from(utc_offset_minutes)).unwrap_or(TimeDelta::zero());
    Utc.timestamp_millis_opt(millis)
        .single()
        .and_then(|utc| utc.checked_add_signed(offset))
        .map_or(0, |local| local.hour())
}

#[must_use]
pub fn candidates(hour: u32) -> &'static [&'static str] {
    match hour {
        5..=11 => MORNING,
        12..=16 => AFTERNOON,
        17..=20 => EVENING,
        _ => NIGHT,
    }
}

/// Picks one greeting for the hour. `seed` varies the choice between visits
/// while keeping `update` deterministic.
#[must_use]
pub fn greeting(hour: u32, seed: u64) -> &'static str {
    let options = candidates(hour);
    let index = usize::try_from(seed % options.len() as u64).unwrap_or(0);
    options[index]
}

pub const SAFETY_TIPS: [&str; 12] = [
    "Share your location with someone you trust whenever you go somewhere unfamiliar.",
    "Trust your instincts! if something feels wrong, move to a safe place.",
    "Carry a charged phone and a portable charger.",
    "Plan exit routes when you go into crowded places.",
    "Keep your keys in your hand when approaching your car or home.",
    "Avoid sharing exact real-time locations on public posts.",
    "Stay in well-lit, populated areas if possible.",
    "Tell a friend when you change plans or are running late.",
    "Use cab services with driver and plate verification.",
    "Keep emergency contacts at the top of your phone.",
    "Avoid isolated shortcuts, stick to main roads.",
    "If you feel unsafe, call local emergency services immediately.",
];

#[must_use]
pub fn safety_tip(index: usize) -> &'static str {
    SAFETY_TIPS[index % SAFETY_TIPS.len()]
}

#[must_use]
pub fn next_tip(index: usize) -> usize {
    (index + 1) % SAFETY_TIPS.len()
}

/// How long the current tip stays up, somewhere in the inclusive
/// `SAFETY_TIP_MIN_INTERVAL_MS..=SAFETY_TIP_MAX_INTERVAL_MS` window.
#[must_use]
pub fn tip_interval_ms(seed: u64) -> u64 {
    let span = SAFETY_TIP_MAX_INTERVAL_MS - SAFETY_TIP_MIN_INTERVAL_MS + 1;
    SAFETY_TIP_MIN_INTERVAL_MS + mix(seed) % span
}

// splitmix64 finalizer
fn mix(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

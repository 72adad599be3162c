// Time-of-day helpers for "HH:MM:SS" timestamps

pub const SECONDS_PER_DAY: u32 = 24 * 3600;

/// Seconds since midnight for an "HH:MM:SS" string.
/// Missing or unparsable components count as zero, so malformed stamps sort first.
/// Out-of-range components saturate at `u32::MAX` and sort last.
pub fn to_seconds(time: &str) -> u32 {
    let mut parts = time.trim().split(':').map(parse_component);
    let hours = parts.next().unwrap_or(0);
    let minutes = parts.next().unwrap_or(0);
    let seconds = parts.next().unwrap_or(0);
    hours
        .saturating_mul(3600)
        .saturating_add(minutes.saturating_mul(60))
        .saturating_add(seconds)
}

/// Hour component of an "HH:MM:SS" string, zero when unparsable.
pub fn hour_of(time: &str) -> u32 {
    time.trim().split(':').next().map(parse_component).unwrap_or(0)
}

/// "HH:MM" prefix used for peak labels.
pub fn short_label(time: &str) -> String {
    time.chars().take(5).collect()
}

pub fn format_hms(seconds: u32) -> String {
    let seconds = seconds % SECONDS_PER_DAY;
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

// Leading digits only, like a lenient integer parse.
fn parse_component(part: &str) -> u32 {
    let digits: String = part
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

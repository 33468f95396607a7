use time::{Date, OffsetDateTime, Time};

/// Current UTC date and time of day, truncated to whole seconds.
pub(crate) fn now() -> (Date, Time) {
    let now = OffsetDateTime::now_utc();
    let time = Time::from_hms(now.hour(), now.minute(), now.second()).unwrap_or(now.time());
    (now.date(), time)
}

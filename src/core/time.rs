use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    to_primitive_utc(OffsetDateTime::now_utc())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Whole milliseconds between two instants, `None` when `end` precedes `start`.
pub(crate) fn duration_ms(start: OffsetDateTime, end: OffsetDateTime) -> Option<i64> {
    let delta = end - start;
    if delta.is_negative() {
        return None;
    }
    i64::try_from(delta.whole_milliseconds()).ok()
}

use chrono::{DateTime, Utc};

pub fn now_utc() -> DateTime<Utc> {
    if let Ok(value) = std::env::var("FG_FIXED_TIME") {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
            return dt.with_timezone(&Utc);
        }
    }
    Utc::now()
}

/// Epoch milliseconds, honouring `FG_FIXED_TIME` for reproducible output.
pub fn now_millis() -> i64 {
    now_utc().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_are_positive() {
        assert!(now_millis() > 0);
    }
}

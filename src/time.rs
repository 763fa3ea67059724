//! Platform-aware time utilities.
//!
//! On native platforms, this uses `chrono::Utc::now()`.
//! On WASM, this uses `js_sys::Date` since `std::time::SystemTime`
//! is not available on `wasm32-unknown-unknown`.

/// Returns the current UTC time as an RFC 3339 string with second precision
/// (e.g. `2026-10-16T12:00:00Z`), the form stored in `sops.lastmodified`.
pub fn now_rfc3339() -> String {
    #[cfg(target_arch = "wasm32")]
    {
        let iso = String::from(js_sys::Date::new_0().to_iso_string());
        // `toISOString` always carries milliseconds: 2026-10-16T12:00:00.000Z
        match iso.split_once('.') {
            Some((seconds, _)) => format!("{}Z", seconds),
            None => iso,
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_rfc3339_shape() {
        let now = now_rfc3339();

        assert_eq!(now.len(), "2026-10-16T12:00:00Z".len(), "unexpected form {}", now);
        assert!(now.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }
}

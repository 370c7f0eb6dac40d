//! Fixed user-facing result strings.
//!
//! The service's users read Hebrew; these strings are a presentation
//! contract and are not localised further.

use std::fmt;
use std::time::Duration;

/// Shown when the camera cannot be acquired.
pub const CAMERA_UNAVAILABLE: &str = "לא הצלחנו לגשת למצלמה";

/// Shown when an upload starts before the session bootstrap completed.
pub const SESSION_LOADING: &str = "המערכת עדיין נטענת, נסי שוב בעוד רגע";

/// Shown when the capture cannot be decoded or re-encoded for upload.
pub const IMAGE_PROCESSING: &str = "שגיאה בעיבוד התמונה לפני העלאה";

/// Shown when the server could not be reached at all.
pub const NETWORK: &str = "שגיאת רשת או CORS — בדקי שהשרת רץ ושה‑CORS מוגדר נכון";

/// Shown for any failure that fits no other category.
pub const GENERIC_UPLOAD: &str = "שגיאה בהעלאה";

/// Shown when the upload exceeded the configured time bound.
///
/// Whole seconds are shown as `30s`; any other bound as milliseconds.
pub fn timeout(limit: Duration) -> String {
    let bound = if limit.subsec_millis() == 0 && limit.as_secs() > 0 {
        format!("{}s", limit.as_secs())
    } else {
        format!("{}ms", limit.as_millis())
    };
    format!("הבקשה התנתקה — חצית את זמן ההמתנה ({bound}). נסי שוב או בדקי חיבור רשת.")
}

/// Server-reported failure; the detail is embedded verbatim.
pub fn server_detail(detail: &str) -> String {
    format!("שגיאה מהשרת: {detail}")
}

/// Summary for a recognised scan.
pub fn scan_summary(sr: &str, rows: impl fmt::Display) -> String {
    format!("SR: {sr} (rows: {rows})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_names_the_configured_bound() {
        assert!(timeout(Duration::from_millis(30_000)).contains("(30s)"));
        assert!(timeout(Duration::from_secs(5)).contains("(5s)"));
    }

    #[test]
    fn timeout_keeps_sub_second_bounds() {
        assert!(timeout(Duration::from_millis(500)).contains("(500ms)"));
        assert!(timeout(Duration::from_millis(1500)).contains("(1500ms)"));
    }

    #[test]
    fn summary_format() {
        assert_eq!(scan_summary("SR123", 7), "SR: SR123 (rows: 7)");
    }
}

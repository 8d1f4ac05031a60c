//! Device classification via user agent parsing.

use woothee::parser::Parser;

use crate::events::AnalyticsEvent;

/// Fills device fields of an event from its request's user agent.
///
/// Uses the woothee library for fast UA parsing.
pub struct DeviceDetector {
    parser: Parser,
}

impl DeviceDetector {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Enrich an event from a user agent string.
    ///
    /// Fields the client already supplied are kept; only "unknown"
    /// values are overwritten.
    pub fn enrich(&self, event: &mut AnalyticsEvent, user_agent: &str) {
        if user_agent.is_empty() {
            return;
        }

        let Some(result) = self.parser.parse(user_agent) else {
            return;
        };

        if event.browser == "unknown" && !result.name.is_empty() && result.name != "UNKNOWN" {
            event.browser = result.name.to_string();
        }
        if event.os == "unknown" && !result.os.is_empty() && result.os != "UNKNOWN" {
            event.os = result.os.to_string();
        }
        if event.device_type == "unknown" {
            // woothee categories: pc, smartphone, mobilephone, crawler, appliance, misc
            let device_type = match result.category {
                "pc" => "desktop",
                "smartphone" | "mobilephone" => "mobile",
                "crawler" => "bot",
                "appliance" => "other",
                _ => "unknown",
            };
            event.device_type = device_type.to_string();
        }
    }
}

impl Default for DeviceDetector {
    fn default() -> Self {
        Self::new()
    }
}

//! Device enrichment via user agent parsing.
//!
//! Fills `browser`, `os` and `platform` from `device.userAgent` when the
//! caller left them empty. Caller-provided values always win.

use std::sync::LazyLock;
use woothee::parser::Parser;

use crate::events::{Device, Platform};

static PARSER: LazyLock<Parser> = LazyLock::new(Parser::new);

fn known(value: &str) -> Option<&str> {
    if value.is_empty() || value == "UNKNOWN" {
        None
    } else {
        Some(value)
    }
}

/// Enrich a device in place from its user agent.
pub fn enrich_device(device: &mut Device) {
    let Some(ua) = device.user_agent.as_deref().filter(|ua| !ua.is_empty()) else {
        return;
    };

    let Some(result) = PARSER.parse(ua) else {
        return;
    };

    if device.browser.is_none() {
        device.browser = known(result.name).map(str::to_string);
    }
    if device.os.is_none() {
        device.os = known(result.os).map(str::to_string);
    }

    // woothee categories: pc, smartphone, mobilephone, crawler, appliance, misc
    if device.platform.is_none() {
        device.platform = match result.category {
            "pc" => Some(Platform::Desktop),
            "smartphone" | "mobilephone" => Some(Platform::Mobile),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(ua: &str) -> Device {
        Device {
            user_agent: Some(ua.into()),
            ..Device::default()
        }
    }

    #[test]
    fn test_chrome_macos() {
        let mut d = device(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        );
        enrich_device(&mut d);

        assert_eq!(d.browser.as_deref(), Some("Chrome"));
        assert_eq!(d.os.as_deref(), Some("Mac OSX"));
        assert_eq!(d.platform, Some(Platform::Desktop));
    }

    #[test]
    fn test_iphone_is_mobile() {
        let mut d = device(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        );
        enrich_device(&mut d);

        assert_eq!(d.browser.as_deref(), Some("Safari"));
        assert_eq!(d.platform, Some(Platform::Mobile));
    }

    #[test]
    fn test_caller_values_are_kept() {
        let mut d = device(
            "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0",
        );
        d.platform = Some(Platform::Tablet);
        d.browser = Some("CustomShell".into());
        enrich_device(&mut d);

        assert_eq!(d.platform, Some(Platform::Tablet));
        assert_eq!(d.browser.as_deref(), Some("CustomShell"));
        assert_eq!(d.os.as_deref(), Some("Linux"));
    }

    #[test]
    fn test_unparseable_user_agent() {
        let mut d = device("some random string that is not a valid UA");
        enrich_device(&mut d);

        assert!(d.platform.is_none());
        assert!(d.browser.is_none());
    }
}

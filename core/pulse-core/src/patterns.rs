//! Compiled regex patterns.
//!
//! Compiled once on first use. Update these if the core tool changes how it
//! publishes its version.

use once_cell::sync::Lazy;
use regex::Regex;

/// `__version_info__ = ('13', '0', '7')` in the core tool's `__about__.py`.
pub static RE_VERSION_INFO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^__version_info__ = \('([0-9]+)', '([0-9]+)', '([0-9]+)'\)").unwrap()
});

/// Scans `body` line by line and returns the first `major.minor.patch` match.
pub fn find_version_info(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        RE_VERSION_INFO
            .captures(line)
            .map(|caps| format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins() {
        let body = "# -*- coding: utf-8 -*-\n\
                    __title__ = 'wakatime'\n\
                    __version_info__ = ('10', '2', '1')\n\
                    __version_info__ = ('9', '0', '0')\n";
        assert_eq!(find_version_info(body), Some("10.2.1".to_string()));
    }

    #[test]
    fn pattern_is_anchored_to_line_start() {
        let body = "    __version_info__ = ('1', '2', '3')\n";
        assert_eq!(find_version_info(body), None);
    }

    #[test]
    fn handles_crlf_bodies() {
        let body = "__title__ = 'wakatime'\r\n__version_info__ = ('4', '1', '8')\r\n";
        assert_eq!(find_version_info(body), Some("4.1.8".to_string()));
    }
}

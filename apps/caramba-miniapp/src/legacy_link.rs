//! Parser for the pre-`startapp` deep-link surface: plain query parameters
//! and hash fragments. Kept for links still circulating in old posts and
//! pinned messages.

use std::collections::HashMap;

use crate::deep_link::{self, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyAction {
    ActivateCode,
    Services,
    Gift,
    DailyBonus,
    News,
}

#[derive(Debug, Clone)]
pub struct LegacyRoute {
    pub screen: Screen,
    pub action: Option<LegacyAction>,
    /// Every original parameter, for the consuming screen to read
    /// (`service_id`, `subscription_id`, `mode`, ...).
    pub params: HashMap<String, String>,
}

/// Merges fragment-query and URL-query parameters (URL query wins) and
/// routes by key presence. `None` means the URL carries no deep link.
pub fn parse_legacy(search: &str, hash: &str) -> Option<LegacyRoute> {
    let mut params = deep_link::parse_query(deep_link::hash_query_part(hash));
    params.extend(deep_link::parse_query(search));

    let has = |keys: &[&str]| keys.iter().any(|key| params.contains_key(*key));

    // Action keys are recognized by mere presence; values may be empty.
    let action = if has(&["activate-code", "activate_code"]) {
        Some(LegacyAction::ActivateCode)
    } else if has(&["services", "service"]) {
        Some(LegacyAction::Services)
    } else if has(&["gift"]) {
        Some(LegacyAction::Gift)
    } else if has(&["daily-bonus", "daily_bonus", "bonus"]) {
        Some(LegacyAction::DailyBonus)
    } else if has(&["news"]) {
        Some(LegacyAction::News)
    } else {
        None
    };

    if action.is_some() {
        return Some(LegacyRoute {
            screen: Screen::Subscription,
            action,
            params,
        });
    }

    if let Some(screen) = params.get("screen").and_then(|name| Screen::from_name(name)) {
        return Some(LegacyRoute {
            screen,
            action: None,
            params,
        });
    }

    if let Some(screen) = Screen::from_name(deep_link::hash_segment(hash)) {
        return Some(LegacyRoute {
            screen,
            action: None,
            params,
        });
    }

    // An activation code with no screen lands on the instructions screen.
    if has(&["activate", "code"]) {
        return Some(LegacyRoute {
            screen: Screen::Instructions,
            action: None,
            params,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn services_with_mode_and_extra_params() {
        let route = parse_legacy("?services&mode=renew&subscription_id=42", "").unwrap();
        assert_eq!(route.screen, Screen::Subscription);
        assert_eq!(route.action, Some(LegacyAction::Services));
        assert_eq!(route.params.get("mode").unwrap(), "renew");
        assert_eq!(route.params.get("subscription_id").unwrap(), "42");
    }

    #[test]
    fn query_params_win_over_fragment_params() {
        let route = parse_legacy("?gift&mode=buy", "#x?mode=renew&service_id=7").unwrap();
        assert_eq!(route.action, Some(LegacyAction::Gift));
        assert_eq!(route.params.get("mode").unwrap(), "buy");
        assert_eq!(route.params.get("service_id").unwrap(), "7");
    }

    #[test]
    fn activate_code_by_key_presence() {
        let route = parse_legacy("?activate-code=PROMO", "").unwrap();
        assert_eq!(route.screen, Screen::Subscription);
        assert_eq!(route.action, Some(LegacyAction::ActivateCode));
        assert_eq!(route.params.get("activate-code").unwrap(), "PROMO");

        let route = parse_legacy("?activate_code", "").unwrap();
        assert_eq!(route.action, Some(LegacyAction::ActivateCode));
    }

    #[test]
    fn explicit_screen_parameter_is_validated() {
        let route = parse_legacy("?screen=referrals", "").unwrap();
        assert_eq!(route.screen, Screen::Referrals);
        assert_eq!(route.action, None);

        assert!(parse_legacy("?screen=nope", "").is_none());
    }

    #[test]
    fn bare_hash_segment_matches_known_screen() {
        let route = parse_legacy("", "#history").unwrap();
        assert_eq!(route.screen, Screen::History);
        assert!(parse_legacy("", "#elsewhere").is_none());
    }

    #[test]
    fn activate_or_code_without_screen_routes_to_instructions() {
        let route = parse_legacy("?code=XYZ", "").unwrap();
        assert_eq!(route.screen, Screen::Instructions);
        assert_eq!(route.action, None);
        assert_eq!(route.params.get("code").unwrap(), "XYZ");
    }

    #[test]
    fn empty_url_is_not_a_deep_link() {
        assert!(parse_legacy("", "").is_none());
        assert!(parse_legacy("?utm_source=tg", "").is_none());
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Telegram caps `startapp` payloads at 64 bytes of `[A-Za-z0-9_-]`.
pub const MAX_START_PARAM_LEN: usize = 64;

/// Reserved separator between the action token and its parameter. It cannot
/// appear inside action names or bare parameters by construction.
const PARAM_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Subscription,
    Keys,
    Referrals,
    History,
    Settings,
    Instructions,
}

impl Screen {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "subscription" => Some(Screen::Subscription),
            "keys" => Some(Screen::Keys),
            "referrals" => Some(Screen::Referrals),
            "history" => Some(Screen::History),
            "settings" => Some(Screen::Settings),
            "instructions" => Some(Screen::Instructions),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Screen::Subscription => "subscription",
            Screen::Keys => "keys",
            Screen::Referrals => "referrals",
            Screen::History => "history",
            Screen::Settings => "settings",
            Screen::Instructions => "instructions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    #[default]
    Buy,
    Renew,
    Gift,
}

impl ServiceMode {
    pub fn from_param(param: &str) -> Option<Self> {
        match param {
            "buy" => Some(ServiceMode::Buy),
            "renew" => Some(ServiceMode::Renew),
            "gift" => Some(ServiceMode::Gift),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMode::Buy => "buy",
            ServiceMode::Renew => "renew",
            ServiceMode::Gift => "gift",
        }
    }
}

/// One decoded start-parameter payload. Constructed by [`decode`], consumed
/// exactly once by whichever screen needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkAction {
    Navigate(Screen),
    ActivateCode { code: Option<String> },
    Services { mode: ServiceMode },
    Gift,
    DailyBonus,
    Instructions,
    Support,
    News,
}

/// Decodes a `startapp` payload of the form `action` or `action__param`.
/// Unknown tokens yield `None` and the caller falls back to legacy parsing.
pub fn decode(raw: &str) -> Option<DeepLinkAction> {
    if raw.is_empty() || raw.len() > MAX_START_PARAM_LEN {
        return None;
    }
    if !raw
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return None;
    }

    let (action, param) = match raw.split_once(PARAM_SEPARATOR) {
        Some((action, param)) => (action, Some(param)),
        None => (raw, None),
    };

    match action {
        "activate-code" | "activate_code" => Some(DeepLinkAction::ActivateCode {
            code: param.filter(|p| !p.is_empty()).map(str::to_string),
        }),
        "services" | "service" => Some(DeepLinkAction::Services {
            mode: param.and_then(ServiceMode::from_param).unwrap_or_default(),
        }),
        "gift" => Some(DeepLinkAction::Gift),
        "daily-bonus" | "daily_bonus" | "bonus" => Some(DeepLinkAction::DailyBonus),
        "instructions" => Some(DeepLinkAction::Instructions),
        "support" => Some(DeepLinkAction::Support),
        "news" => Some(DeepLinkAction::News),
        "screen" => param.and_then(Screen::from_name).map(DeepLinkAction::Navigate),
        _ => None,
    }
}

/// Left inverse of [`decode`] for every constructible action.
pub fn encode(action: &DeepLinkAction) -> String {
    match action {
        DeepLinkAction::Navigate(screen) => format!("screen{}{}", PARAM_SEPARATOR, screen.name()),
        DeepLinkAction::ActivateCode { code: Some(code) } => {
            format!("activate-code{}{}", PARAM_SEPARATOR, code)
        }
        DeepLinkAction::ActivateCode { code: None } => "activate-code".to_string(),
        DeepLinkAction::Services { mode } => {
            format!("services{}{}", PARAM_SEPARATOR, mode.as_str())
        }
        DeepLinkAction::Gift => "gift".to_string(),
        DeepLinkAction::DailyBonus => "daily-bonus".to_string(),
        DeepLinkAction::Instructions => "instructions".to_string(),
        DeepLinkAction::Support => "support".to_string(),
        DeepLinkAction::News => "news".to_string(),
    }
}

/// Referral payloads share the `start_param` channel with actions but are
/// never actions themselves. Must be checked before [`decode`].
pub fn is_referral_param(raw: &str) -> bool {
    if raw.is_empty() {
        return false;
    }
    raw.bytes().all(|b| b.is_ascii_digit()) || raw.starts_with("ref_")
}

/// Launch inputs captured from the Telegram host and the page URL. The
/// WebApp bridge itself is out of scope; its data is injected here.
#[derive(Debug, Clone, Default)]
pub struct LaunchContext {
    /// `start_param` from the Telegram host object.
    pub start_param: Option<String>,
    /// `location.search`, with or without the leading `?`.
    pub query: String,
    /// `location.hash`, with or without the leading `#`.
    pub hash: String,
}

/// First non-empty of: host `start_param`, URL query `startapp`/`start`,
/// the same two keys inside the fragment's query string.
pub fn extract_start_param(ctx: &LaunchContext) -> String {
    if let Some(param) = &ctx.start_param {
        if !param.is_empty() {
            return param.clone();
        }
    }

    let query = parse_query(&ctx.query);
    for key in ["startapp", "start"] {
        if let Some(value) = query.get(key) {
            if !value.is_empty() {
                return value.clone();
            }
        }
    }

    let hash_query = parse_query(hash_query_part(&ctx.hash));
    for key in ["startapp", "start"] {
        if let Some(value) = hash_query.get(key) {
            if !value.is_empty() {
                return value.clone();
            }
        }
    }

    String::new()
}

pub(crate) fn parse_query(raw: &str) -> HashMap<String, String> {
    let trimmed = raw.trim_start_matches('?');
    url::form_urlencoded::parse(trimmed.as_bytes())
        .into_owned()
        .collect()
}

/// Query part of a fragment like `#screen?startapp=x`.
pub(crate) fn hash_query_part(hash: &str) -> &str {
    let trimmed = hash.trim_start_matches('#');
    match trimmed.split_once('?') {
        Some((_, query)) => query,
        None => "",
    }
}

/// Segment of a fragment before any embedded query string.
pub(crate) fn hash_segment(hash: &str) -> &str {
    let trimmed = hash.trim_start_matches('#');
    trimmed.split('?').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_activate_code_with_parameter() {
        assert_eq!(
            decode("activate-code__ABC123"),
            Some(DeepLinkAction::ActivateCode {
                code: Some("ABC123".to_string())
            })
        );
        assert_eq!(
            decode("activate_code"),
            Some(DeepLinkAction::ActivateCode { code: None })
        );
    }

    #[test]
    fn services_mode_defaults_to_buy() {
        assert_eq!(
            decode("services"),
            Some(DeepLinkAction::Services {
                mode: ServiceMode::Buy
            })
        );
        assert_eq!(
            decode("services__unknown"),
            Some(DeepLinkAction::Services {
                mode: ServiceMode::Buy
            })
        );
        assert_eq!(
            decode("services__renew"),
            Some(DeepLinkAction::Services {
                mode: ServiceMode::Renew
            })
        );
        assert_eq!(
            decode("service__gift"),
            Some(DeepLinkAction::Services {
                mode: ServiceMode::Gift
            })
        );
    }

    #[test]
    fn decodes_zero_argument_actions_and_aliases() {
        assert_eq!(decode("gift"), Some(DeepLinkAction::Gift));
        assert_eq!(decode("daily-bonus"), Some(DeepLinkAction::DailyBonus));
        assert_eq!(decode("daily_bonus"), Some(DeepLinkAction::DailyBonus));
        assert_eq!(decode("bonus"), Some(DeepLinkAction::DailyBonus));
        assert_eq!(decode("instructions"), Some(DeepLinkAction::Instructions));
        assert_eq!(decode("support"), Some(DeepLinkAction::Support));
        assert_eq!(decode("news"), Some(DeepLinkAction::News));
    }

    #[test]
    fn decodes_screen_navigation() {
        assert_eq!(
            decode("screen__referrals"),
            Some(DeepLinkAction::Navigate(Screen::Referrals))
        );
        assert_eq!(decode("screen__unknown"), None);
        assert_eq!(decode("screen"), None);
    }

    #[test]
    fn rejects_bad_payloads() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("Gift"), None); // case-sensitive
        assert_eq!(decode("news?x=1"), None); // charset
        assert_eq!(decode(&"a".repeat(65)), None);
        assert_eq!(decode("whatever"), None);
    }

    #[test]
    fn round_trip_holds_for_every_constructible_action() {
        let actions = vec![
            DeepLinkAction::Navigate(Screen::Subscription),
            DeepLinkAction::Navigate(Screen::History),
            DeepLinkAction::ActivateCode { code: None },
            DeepLinkAction::ActivateCode {
                code: Some("XY-9_z".to_string()),
            },
            DeepLinkAction::Services {
                mode: ServiceMode::Buy,
            },
            DeepLinkAction::Services {
                mode: ServiceMode::Renew,
            },
            DeepLinkAction::Services {
                mode: ServiceMode::Gift,
            },
            DeepLinkAction::Gift,
            DeepLinkAction::DailyBonus,
            DeepLinkAction::Instructions,
            DeepLinkAction::Support,
            DeepLinkAction::News,
        ];
        for action in actions {
            assert_eq!(decode(&encode(&action)), Some(action));
        }
    }

    #[test]
    fn classifies_referral_params() {
        assert!(is_referral_param("123456789"));
        assert!(is_referral_param("ref_42"));
        assert!(!is_referral_param("gift"));
        assert!(!is_referral_param("12a"));
        assert!(!is_referral_param(""));
    }

    #[test]
    fn extraction_priority_host_then_query_then_hash() {
        let ctx = LaunchContext {
            start_param: Some("gift".to_string()),
            query: "?startapp=news".to_string(),
            hash: "#x?start=support".to_string(),
        };
        assert_eq!(extract_start_param(&ctx), "gift");

        let ctx = LaunchContext {
            start_param: None,
            query: "?startapp=news&start=gift".to_string(),
            hash: String::new(),
        };
        assert_eq!(extract_start_param(&ctx), "news");

        let ctx = LaunchContext {
            start_param: Some(String::new()),
            query: String::new(),
            hash: "#screen?start=support".to_string(),
        };
        assert_eq!(extract_start_param(&ctx), "support");

        assert_eq!(extract_start_param(&LaunchContext::default()), "");
    }
}

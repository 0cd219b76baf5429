use std::{fmt::Display, sync::LazyLock};

use regex::Regex;

/// Device category derived from a user agent string. Buckets are mutually
/// exclusive and collectively exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Pc,
    Mobile,
    Tablet,
    Other,
}

impl Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Pc => write!(f, "pc"),
            DeviceClass::Mobile => write!(f, "mobile"),
            DeviceClass::Tablet => write!(f, "tablet"),
            DeviceClass::Other => write!(f, "other"),
        }
    }
}

static TABLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tablet|ipad|playbook|silk").expect("valid tablet pattern"));

static ANDROID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)android").expect("valid android pattern"));

static MOBILE_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)mobi").expect("valid mobile hint pattern"));

static MOBILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Mobile|Android|iP(hone|od)|IEMobile|BlackBerry|Kindle|Silk-Accelerated|(hpw|web)OS|Opera M(obi|ini)")
        .expect("valid mobile pattern")
});

static DESKTOP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Macintosh|Windows|Linux").expect("valid desktop pattern"));

/// Classifies a user agent into a [DeviceClass]. Pure function, no side
/// effects.
///
/// Tablets are checked first: a tablet agent usually also matches the
/// generic android and mobile patterns. An android agent with no mobile
/// marker after the android token is treated as a tablet as well; a marker
/// before the token does not demote it.
pub fn classify(user_agent: &str) -> DeviceClass {
    let android_tablet = ANDROID
        .find(user_agent)
        .is_some_and(|android| !MOBILE_HINT.is_match(&user_agent[android.end()..]));

    if TABLET.is_match(user_agent) || android_tablet {
        DeviceClass::Tablet
    } else if MOBILE.is_match(user_agent) {
        DeviceClass::Mobile
    } else if DESKTOP.is_match(user_agent) {
        DeviceClass::Pc
    } else {
        DeviceClass::Other
    }
}

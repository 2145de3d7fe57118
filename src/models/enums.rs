use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ReviewStatus {
    New => "new",
    Reviewed => "reviewed",
    Flagged => "flagged",
});

str_enum!(MessageRole {
    User => "user",
    Assistant => "assistant",
});

str_enum!(BannerColor {
    Green => "green",
    Yellow => "yellow",
    Red => "red",
});

str_enum!(UrgencyLevel {
    Routine => "routine",
    Soon => "soon",
    Urgent => "urgent",
});

/// Ordinal severity derived from free-text statuses and risk levels.
///
/// Every raw status string maps to exactly one variant; unmatched input
/// defaults to `Normal`. Ordering is `Normal < Borderline < Alert`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Borderline,
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Borderline => "borderline",
            Self::Alert => "alert",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn review_status_round_trip() {
        for (variant, s) in [
            (ReviewStatus::New, "new"),
            (ReviewStatus::Reviewed, "reviewed"),
            (ReviewStatus::Flagged, "flagged"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ReviewStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn message_role_round_trip() {
        for (variant, s) in [
            (MessageRole::User, "user"),
            (MessageRole::Assistant, "assistant"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(MessageRole::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn banner_color_round_trip() {
        for (variant, s) in [
            (BannerColor::Green, "green"),
            (BannerColor::Yellow, "yellow"),
            (BannerColor::Red, "red"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(BannerColor::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(ReviewStatus::from_str("invalid").is_err());
        assert!(MessageRole::from_str("bot").is_err());
        assert!(BannerColor::from_str("").is_err());
    }

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Normal < Severity::Borderline);
        assert!(Severity::Borderline < Severity::Alert);
        assert_eq!(Severity::default(), Severity::Normal);
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Alert).unwrap();
        assert_eq!(json, "\"alert\"");
    }
}

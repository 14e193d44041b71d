use serde::{Deserialize, Serialize};

/// How well the user stayed away from blocked apps during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusQuality {
    Perfect,
    Good,
    Distracted,
}

impl FocusQuality {
    /// Maps shield attempts to a label. Sessions without configured
    /// blocking get no label at all rather than a default.
    pub fn classify(blocking_configured: bool, shield_attempts: Option<u32>) -> Option<Self> {
        if !blocking_configured {
            return None;
        }
        match shield_attempts? {
            0 => Some(FocusQuality::Perfect),
            1..=2 => Some(FocusQuality::Good),
            _ => Some(FocusQuality::Distracted),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FocusQuality::Perfect => "perfect",
            FocusQuality::Good => "good",
            FocusQuality::Distracted => "distracted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_map_to_quality() {
        assert_eq!(FocusQuality::classify(true, Some(0)), Some(FocusQuality::Perfect));
        assert_eq!(FocusQuality::classify(true, Some(1)), Some(FocusQuality::Good));
        assert_eq!(FocusQuality::classify(true, Some(2)), Some(FocusQuality::Good));
        assert_eq!(FocusQuality::classify(true, Some(3)), Some(FocusQuality::Distracted));
        assert_eq!(FocusQuality::classify(true, Some(40)), Some(FocusQuality::Distracted));
    }

    #[test]
    fn unconfigured_blocking_has_no_label() {
        for attempts in [None, Some(0), Some(2), Some(3)] {
            assert_eq!(FocusQuality::classify(false, attempts), None);
        }
    }

    #[test]
    fn unknown_attempts_have_no_label() {
        assert_eq!(FocusQuality::classify(true, None), None);
    }
}

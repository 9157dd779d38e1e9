use serde::{Deserialize, Serialize};

pub const DEFAULT_FREE_LIMIT: u32 = 2;
pub const DEFAULT_PRO_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
}

impl Tier {
    pub fn from_membership(has_active_membership: bool) -> Self {
        if has_active_membership {
            Tier::Pro
        } else {
            Tier::Free
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-tier document limits. Injected wherever quota is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub free: u32,
    pub pro: u32,
}

impl QuotaLimits {
    pub fn new(free: u32, pro: u32) -> Self {
        Self { free, pro }
    }

    /// `None` while the tier is unknown.
    pub fn limit_for(&self, tier: Option<Tier>) -> Option<u32> {
        match tier? {
            Tier::Free => Some(self.free),
            Tier::Pro => Some(self.pro),
        }
    }
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            free: DEFAULT_FREE_LIMIT,
            pro: DEFAULT_PRO_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_are_exact() {
        let limits = QuotaLimits::default();
        assert_eq!(limits.limit_for(Some(Tier::Free)), Some(2));
        assert_eq!(limits.limit_for(Some(Tier::Pro)), Some(20));
    }

    #[test]
    fn test_unknown_tier_has_no_limit() {
        assert_eq!(QuotaLimits::default().limit_for(None), None);
    }

    #[test]
    fn test_custom_limits() {
        let limits = QuotaLimits::new(5, 50);
        assert_eq!(limits.limit_for(Some(Tier::Free)), Some(5));
        assert_eq!(limits.limit_for(Some(Tier::Pro)), Some(50));
    }

    #[test]
    fn test_tier_from_membership() {
        assert_eq!(Tier::from_membership(true), Tier::Pro);
        assert_eq!(Tier::from_membership(false), Tier::Free);
        assert_eq!(Tier::Pro.to_string(), "pro");
    }
}

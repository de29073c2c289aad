//! Stealth identities and their rotation

use crate::browser::Identity;
use crate::config::{AntiDetectionConfig, RotationPolicy};
use rand::seq::SliceRandom;

/// Desktop browser user agents rotated when none are configured
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:120.0) Gecko/20100101 Firefox/120.0",
];

/// User agent sent when stealth is off
const PLAIN_USER_AGENT: &str = concat!("anjuke-harvest/", env!("CARGO_PKG_VERSION"));

const VIEWPORTS: &[(u32, u32)] = &[(1920, 1080), (1366, 768), (1440, 900)];

/// Picks identities for a session
///
/// User agent and viewport are drawn at random; proxies are handed out
/// round-robin so that a rotating run spreads over the whole pool.
#[derive(Debug, Clone)]
pub struct StealthProfile {
    stealth: bool,
    rotation: RotationPolicy,
    user_agents: Vec<String>,
    proxies: Vec<String>,
    next_proxy: usize,
}

impl StealthProfile {
    pub fn from_config(config: &AntiDetectionConfig) -> Self {
        let user_agents = if config.user_agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
        } else {
            config.user_agents.clone()
        };

        Self {
            stealth: config.stealth,
            rotation: config.rotation,
            user_agents,
            proxies: config.proxies.clone(),
            next_proxy: 0,
        }
    }

    pub fn rotation(&self) -> RotationPolicy {
        self.rotation
    }

    /// Draws the next identity
    pub fn next_identity(&mut self) -> Identity {
        let proxy = if self.proxies.is_empty() {
            None
        } else {
            let proxy = self.proxies[self.next_proxy % self.proxies.len()].clone();
            self.next_proxy = self.next_proxy.wrapping_add(1);
            Some(proxy)
        };

        if !self.stealth {
            return Identity {
                user_agent: PLAIN_USER_AGENT.to_string(),
                viewport: VIEWPORTS[0],
                proxy,
                stealth: false,
            };
        }

        let mut rng = rand::thread_rng();
        let user_agent = self
            .user_agents
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| PLAIN_USER_AGENT.to_string());
        let viewport = VIEWPORTS.choose(&mut rng).copied().unwrap_or(VIEWPORTS[0]);

        Identity {
            user_agent,
            viewport,
            proxy,
            stealth: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stealth_identity_uses_pool() {
        let mut profile = StealthProfile::from_config(&AntiDetectionConfig::default());
        let identity = profile.next_identity();

        assert!(identity.stealth);
        assert!(DEFAULT_USER_AGENTS.contains(&identity.user_agent.as_str()));
        assert!(VIEWPORTS.contains(&identity.viewport));
        assert_eq!(identity.proxy, None);
    }

    #[test]
    fn test_configured_user_agents_replace_defaults() {
        let config = AntiDetectionConfig {
            user_agents: vec!["TestAgent/1.0".to_string()],
            ..AntiDetectionConfig::default()
        };
        let mut profile = StealthProfile::from_config(&config);
        assert_eq!(profile.next_identity().user_agent, "TestAgent/1.0");
    }

    #[test]
    fn test_proxies_round_robin() {
        let config = AntiDetectionConfig {
            proxies: vec!["http://p1:8080".to_string(), "http://p2:8080".to_string()],
            ..AntiDetectionConfig::default()
        };
        let mut profile = StealthProfile::from_config(&config);

        let picked: Vec<_> = (0..3)
            .map(|_| profile.next_identity().proxy.unwrap())
            .collect();
        assert_eq!(picked, vec!["http://p1:8080", "http://p2:8080", "http://p1:8080"]);
    }

    #[test]
    fn test_plain_identity_without_stealth() {
        let config = AntiDetectionConfig {
            stealth: false,
            ..AntiDetectionConfig::default()
        };
        let mut profile = StealthProfile::from_config(&config);
        let identity = profile.next_identity();

        assert!(!identity.stealth);
        assert!(identity.user_agent.starts_with("anjuke-harvest/"));
    }
}

//! Stress alerts: severity bands plus a per-subject cooldown

use chrono::Utc;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

use crate::config::AlertConfig;
use crate::types::{AlertSeverity, StressAlert};

/// Severity band for a level, or `None` below the moderate threshold
pub fn classify(config: &AlertConfig, level: f64) -> Option<AlertSeverity> {
    if level >= config.critical {
        Some(AlertSeverity::Critical)
    } else if level >= config.high {
        Some(AlertSeverity::High)
    } else if level >= config.moderate {
        Some(AlertSeverity::Moderate)
    } else {
        None
    }
}

/// Decides when a level turns into an alert
///
/// Keyed by subject (a user id for the camera loop, a symbol for the market
/// worker). A subject that alerted within the cooldown stays quiet.
#[derive(Debug)]
pub struct AlertTracker {
    config: AlertConfig,
    last_alert: HashMap<String, Instant>,
}

impl AlertTracker {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            last_alert: HashMap::new(),
        }
    }

    pub fn check(&mut self, subject: &str, level: f64, symbol: Option<&str>, now: Instant) -> Option<StressAlert> {
        let severity = classify(&self.config, level)?;

        if let Some(last) = self.last_alert.get(subject) {
            if now.saturating_duration_since(*last) < self.config.cooldown() {
                return None;
            }
        }
        self.last_alert.insert(subject.to_string(), now);

        let alert = build_alert(subject, level, symbol, severity);
        info!(subject, severity = %severity, level, "Stress alert raised");
        Some(alert)
    }
}

fn build_alert(subject: &str, level: f64, symbol: Option<&str>, severity: AlertSeverity) -> StressAlert {
    let percent = level * 100.0;
    let (message, description) = match severity {
        AlertSeverity::Critical => (
            format!("CRITICAL STRESS ALERT: {:.1}%", percent),
            "Stress level critically high. Immediate intervention recommended.",
        ),
        AlertSeverity::High => (
            format!("HIGH STRESS ALERT: {:.1}%", percent),
            "Stress level elevated. Manager notification sent.",
        ),
        AlertSeverity::Moderate => (
            format!("MODERATE STRESS: {:.1}%", percent),
            "Stress level elevated. Logged for review.",
        ),
    };
    let critical = severity == AlertSeverity::Critical;

    StressAlert {
        subject: subject.to_string(),
        symbol: symbol.map(str::to_string),
        level,
        severity,
        message,
        description: description.to_string(),
        requires_approval: critical,
        escalated: critical,
        timestamp: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bands() {
        let config = AlertConfig::default();
        assert_eq!(classify(&config, 0.59), None);
        assert_eq!(classify(&config, 0.60), Some(AlertSeverity::Moderate));
        assert_eq!(classify(&config, 0.75), Some(AlertSeverity::High));
        assert_eq!(classify(&config, 0.85), Some(AlertSeverity::Critical));
        assert_eq!(classify(&config, 1.0), Some(AlertSeverity::Critical));
    }

    #[test]
    fn test_critical_is_escalated() {
        let mut tracker = AlertTracker::new(AlertConfig::default());
        let alert = tracker.check("user_default", 0.9, None, Instant::now()).unwrap();
        assert!(alert.escalated);
        assert!(alert.requires_approval);
        assert_eq!(alert.message, "CRITICAL STRESS ALERT: 90.0%");

        let alert = tracker.check("AAPL", 0.8, Some("AAPL"), Instant::now()).unwrap();
        assert_eq!(alert.severity, AlertSeverity::High);
        assert!(!alert.escalated);
        assert_eq!(alert.symbol.as_deref(), Some("AAPL"));
    }

    #[test]
    fn test_cooldown_per_subject() {
        let mut tracker = AlertTracker::new(AlertConfig::default());
        let t0 = Instant::now();
        assert!(tracker.check("a", 0.7, None, t0).is_some());
        assert!(tracker.check("a", 0.95, None, t0 + Duration::from_secs(10)).is_none());
        assert!(tracker.check("b", 0.7, None, t0 + Duration::from_secs(10)).is_some());
        assert!(tracker.check("a", 0.7, None, t0 + Duration::from_secs(300)).is_some());
    }

    #[test]
    fn test_quiet_levels_do_not_start_cooldown() {
        let mut tracker = AlertTracker::new(AlertConfig::default());
        let t0 = Instant::now();
        assert!(tracker.check("a", 0.2, None, t0).is_none());
        assert!(tracker.check("a", 0.7, None, t0).is_some());
    }
}

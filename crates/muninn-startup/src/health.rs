//! Health classification (spec.md §4.11 "Health classification").

use muninn_config::config::StartupConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthLevel {
    Critical,
    Attention,
    Good,
}

pub fn classify(
    config: &StartupConfig,
    critical_issue_count: u32,
    open_issue_count: u32,
    stale_file_count: u32,
    high_fragility_count: u32,
) -> HealthLevel {
    if critical_issue_count > 0 {
        HealthLevel::Critical
    } else if open_issue_count > config.open_issue_attention_threshold
        || stale_file_count > config.stale_file_attention_threshold
        || high_fragility_count > config.high_fragility_attention_threshold
    {
        HealthLevel::Attention
    } else {
        HealthLevel::Good
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_critical_issue_wins() {
        let config = StartupConfig::default();
        assert_eq!(classify(&config, 1, 0, 0, 0), HealthLevel::Critical);
    }

    #[test]
    fn test_open_issues_over_threshold_is_attention() {
        let config = StartupConfig::default();
        assert_eq!(classify(&config, 0, 6, 0, 0), HealthLevel::Attention);
    }

    #[test]
    fn test_nothing_elevated_is_good() {
        let config = StartupConfig::default();
        assert_eq!(classify(&config, 0, 5, 10, 5), HealthLevel::Good);
    }
}

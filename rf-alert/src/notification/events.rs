//! Alert occurrences and per-channel dispatch outcomes.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::domain::AlertCode;

/// One alert occurrence handed to every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertOccurrence {
    pub code: AlertCode,
    pub timestamp: DateTime<Local>,
    /// Description paired with the code, `None` when the code is not configured.
    pub description: Option<String>,
}

/// Result of one channel attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ChannelStatus {
    Delivered,
    /// Not attempted, e.g. the host did not answer the liveness probe.
    Skipped(String),
    Failed(String),
}

impl ChannelStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivered => write!(f, "delivered"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Failed(error) => write!(f, "failed ({error})"),
        }
    }
}

/// Outcome of one channel for one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelOutcome {
    pub channel: &'static str,
    pub target: String,
    pub status: ChannelStatus,
}

/// Outcomes of every channel attempted for one alert, in dispatch order.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub code: AlertCode,
    pub timestamp: DateTime<Local>,
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchReport {
    pub fn new(code: AlertCode, timestamp: DateTime<Local>) -> Self {
        Self {
            code,
            timestamp,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: ChannelOutcome) {
        self.outcomes.push(outcome);
    }

    /// True iff no channel failed. Skipped channels do not count as failures.
    pub fn is_success(&self) -> bool {
        !self.outcomes.iter().any(|o| o.status.is_failed())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChannelOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failed())
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == ChannelStatus::Delivered)
            .count()
    }

    /// Outcomes of one channel type.
    pub fn by_channel<'a>(&'a self, channel: &'a str) -> impl Iterator<Item = &'a ChannelOutcome> {
        self.outcomes.iter().filter(move |o| o.channel == channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(channel: &'static str, status: ChannelStatus) -> ChannelOutcome {
        ChannelOutcome {
            channel,
            target: "t".to_string(),
            status,
        }
    }

    #[test]
    fn skipped_is_not_failure() {
        let mut report = DispatchReport::new(AlertCode(1), Local::now());
        report.push(outcome("media_host", ChannelStatus::Skipped("down".into())));
        report.push(outcome("email", ChannelStatus::Delivered));
        assert!(report.is_success());
        assert_eq!(report.delivered(), 1);

        report.push(outcome("local", ChannelStatus::Failed("exit 1".into())));
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.by_channel("email").count(), 1);
    }

    #[test]
    fn report_serializes_for_the_debug_log() {
        let mut report = DispatchReport::new(AlertCode(1234), Local::now());
        report.push(outcome("local", ChannelStatus::Delivered));
        report.push(outcome("email", ChannelStatus::Failed("boom".into())));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["code"], 1234);
        assert_eq!(json["outcomes"][0]["status"]["status"], "delivered");
        assert_eq!(json["outcomes"][1]["channel"], "email");
        assert_eq!(json["outcomes"][1]["status"]["status"], "failed");
        assert_eq!(json["outcomes"][1]["status"]["detail"], "boom");
    }
}

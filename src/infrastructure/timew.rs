//! Argument lists for the Timewarrior operations the engine needs.

use crate::domain::ToolConfig;

/// Builds the invocations for export, start, stop and retag.
#[derive(Debug, Clone)]
pub struct TimewProfile {
    export_args: Vec<String>,
    retag_target: String,
}

impl TimewProfile {
    #[must_use]
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            export_args: config.export_args.clone(),
            retag_target: config.retag_target.clone(),
        }
    }

    /// `timew export :day`
    #[must_use]
    pub fn export(&self) -> Vec<String> {
        self.export_args.clone()
    }

    /// `timew start <tags…>`
    #[must_use]
    pub fn start(&self, tags: &[String]) -> Vec<String> {
        std::iter::once("start".to_string())
            .chain(tags.iter().cloned())
            .collect()
    }

    /// `timew stop`
    #[must_use]
    pub fn stop(&self) -> Vec<String> {
        vec!["stop".into()]
    }

    /// `timew retag @1 <tags…>`; the interval keeps its start time.
    #[must_use]
    pub fn retag(&self, tags: &[String]) -> Vec<String> {
        ["retag".to_string(), self.retag_target.clone()]
            .into_iter()
            .chain(tags.iter().cloned())
            .collect()
    }
}

impl Default for TimewProfile {
    fn default() -> Self {
        Self::new(&ToolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_default_invocations() {
        let profile = TimewProfile::default();
        assert_eq!(profile.export(), vec!["export", ":day"]);
        assert_eq!(profile.stop(), vec!["stop"]);
        assert_eq!(
            profile.start(&tags(&["work", "client a"])),
            vec!["start", "work", "client a"]
        );
        assert_eq!(
            profile.retag(&tags(&["review"])),
            vec!["retag", "@1", "review"]
        );
    }

    #[test]
    fn test_start_without_tags() {
        assert_eq!(TimewProfile::default().start(&[]), vec!["start"]);
    }
}

//! Minimal CLI parsing for run overrides.

use std::env;

use crate::config::Config;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub run_once: bool,
    pub interval_override: Option<u64>,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse(env::args().skip(1))
    }

    pub fn parse<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--once" => options.run_once = true,
                "--interval" => {
                    if let Some(value) = args.next() {
                        options.interval_override = value.parse().ok();
                    }
                }
                _ if arg.starts_with("--interval=") => {
                    if let Some(value) = arg.split_once('=').map(|(_, v)| v) {
                        options.interval_override = value.parse().ok();
                    }
                }
                _ => {}
            }
        }
        options
    }

    /// Apply the flags on top of the environment configuration
    pub fn apply(&self, config: &mut Config) {
        if self.run_once {
            config.run_once = true;
        }
        if let Some(interval) = self.interval_override {
            config.check_interval_seconds = interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_flags() {
        assert_eq!(
            parse(&["--once", "--interval", "120"]),
            CliOptions {
                run_once: true,
                interval_override: Some(120),
            }
        );
        assert_eq!(parse(&["--interval=30"]).interval_override, Some(30));
        assert_eq!(parse(&["--interval=soon"]).interval_override, None);
        assert_eq!(parse(&[]), CliOptions::default());
    }

    #[test]
    fn test_apply() {
        let mut config = Config::from_lookup(|_| None).unwrap();
        parse(&["--once", "--interval=5"]).apply(&mut config);
        assert!(config.run_once);
        assert_eq!(config.check_interval_seconds, 5);
    }
}

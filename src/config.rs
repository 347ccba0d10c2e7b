use std::ops::RangeInclusive;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::engine::Theme;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Base URL of the router administration API.
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub api_url: String,

    #[arg(long, value_enum, default_value_t = ThemeArg::Light)]
    pub theme: ThemeArg,

    #[arg(long, default_value_t = 25.0)]
    pub node_radius: f32,

    #[arg(long, default_value_t = 150.0)]
    pub link_distance: f32,

    /// Negative values repel nodes from each other.
    #[arg(long, default_value_t = -3000.0, allow_negative_numbers = true)]
    pub charge_strength: f32,

    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Give up on a scan job after this many status checks.
    #[arg(long, default_value_t = 600)]
    pub poll_max_attempts: u32,

    #[arg(long, default_value_t = 15)]
    pub request_timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub node_radius: f32,
    pub link_distance: f32,
    pub charge_strength: f32,
    pub collision_radius_factor: f32,
    pub center_strength: f32,
    pub min_link_width: f32,
    pub max_link_width: f32,
    pub max_bandwidth: f64,
    pub default_bandwidth: f64,
    pub flow_curve_offset: f32,
    pub theme: Theme,
    pub transition: Duration,
    pub scale_extent: RangeInclusive<f32>,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    pub reheat_alpha: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            node_radius: 20.0,
            link_distance: 200.0,
            charge_strength: -3000.0,
            collision_radius_factor: 1.5,
            center_strength: 0.1,
            min_link_width: 1.0,
            max_link_width: 8.0,
            max_bandwidth: 1000.0,
            default_bandwidth: 100.0,
            flow_curve_offset: 20.0,
            theme: Theme::Light,
            transition: Duration::from_millis(400),
            scale_extent: 0.2..=3.0,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            reheat_alpha: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub backoff_factor: f32,
    pub max_interval: Duration,
    pub max_attempts: u32,
    pub max_duration: Option<Duration>,
}

impl PollPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.backoff_factor <= 1.0 {
            return self.interval;
        }
        let cap = self.max_interval.max(self.interval);
        let factor = self.backoff_factor.powi(attempt.min(i32::MAX as u32) as i32);
        let scaled = (self.interval.as_secs_f32() * factor).min(cap.as_secs_f32());
        Duration::try_from_secs_f32(scaled).map_or(cap, |delay| delay.min(cap))
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            backoff_factor: 1.0,
            max_interval: Duration::from_secs(10),
            max_attempts: 600,
            max_duration: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    pub poll: PollPolicy,
    pub failed_reset_delay: Duration,
    pub notification_duration: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            failed_reset_delay: Duration::from_millis(2000),
            notification_duration: Duration::from_millis(5000),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    pub engine: EngineConfig,
    pub controller: ControllerConfig,
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        let engine = EngineConfig {
            node_radius: args.node_radius.clamp(4.0, 80.0),
            link_distance: args.link_distance.max(10.0),
            charge_strength: args.charge_strength,
            theme: args.theme.into(),
            ..EngineConfig::default()
        };
        let controller = ControllerConfig {
            poll: PollPolicy {
                interval: Duration::from_millis(args.poll_interval_ms.max(50)),
                max_attempts: args.poll_max_attempts.max(1),
                ..PollPolicy::default()
            },
            ..ControllerConfig::default()
        };

        Self {
            api_url: args.api_url,
            request_timeout: Duration::from_secs(args.request_timeout_secs.max(1)),
            engine,
            controller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_interval_by_default() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(25), Duration::from_millis(1000));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = PollPolicy {
            interval: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_interval: Duration::from_secs(3),
            ..PollPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
        assert_eq!(policy.delay_for(64), Duration::from_secs(3));
        assert_eq!(policy.delay_for(500), Duration::from_secs(3));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(3));

        let unbounded = PollPolicy {
            interval: Duration::from_secs(1),
            backoff_factor: 2.0,
            ..PollPolicy::default()
        };
        assert_eq!(unbounded.delay_for(63), Duration::from_secs(10));
        assert_eq!(unbounded.delay_for(64), Duration::from_secs(10));
    }

    #[test]
    fn cli_defaults_match_the_topology_page() {
        let args = Args::parse_from(["router-topology", "--theme", "dark"]);
        let config = AppConfig::from(args);
        assert_eq!(config.engine.node_radius, 25.0);
        assert_eq!(config.engine.link_distance, 150.0);
        assert_eq!(config.engine.theme, Theme::Dark);
        assert_eq!(config.controller.poll.interval, Duration::from_millis(1000));
    }

    #[test]
    fn negative_charge_is_accepted_on_the_command_line() {
        let args = Args::parse_from(["router-topology", "--charge-strength", "-1200"]);
        assert_eq!(args.charge_strength, -1200.0);
    }
}

//! Shared option parsing and configuration for the rig tools.

use std::env;
use std::time::Duration;

use getopts::Options;
use riglink::feed::FeedConfig;
use serde::Deserialize;

/// Base URL used when none is given, overridable via `RIG_URL`.
pub fn default_rig_url() -> String {
    env::var("RIG_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// Tool configuration, loadable from a YAML file. Missing fields
/// keep their defaults; command line flags override the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub url: String,
    pub scope: String,
    pub max_lines: usize,
    pub reconnect_ms: u64,
}

impl Default for RigConfig {
    fn default() -> RigConfig {
        RigConfig {
            url: default_rig_url(),
            scope: riglink::view::DEFAULT_SCOPE_ROLE.to_string(),
            max_lines: riglink::view::DEFAULT_MAX_LINES,
            reconnect_ms: 2000,
        }
    }
}

impl RigConfig {
    pub fn load(path: &str) -> Result<RigConfig, String> {
        let text = std::fs::read_to_string(path).map_err(|err| format!("{}: {}", path, err))?;
        serde_yaml::from_str(&text).map_err(|err| format!("{}: {}", path, err))
    }

    pub fn to_feed_config(&self) -> FeedConfig {
        let mut config = FeedConfig::new(&self.url);
        config.scope_role = self.scope.clone();
        config.max_log_lines = self.max_lines;
        config.reconnect_delay = Duration::from_millis(self.reconnect_ms);
        config
    }
}

pub fn rig_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt(
        "u",
        "url",
        &format!("rig server url (default {})", default_rig_url()),
        "url",
    );
    opts.optopt("c", "config", "YAML configuration file", "path");
    opts.optopt(
        "",
        "scope",
        "device name substring scoping the armed light (default simon)",
        "name",
    );
    opts.optopt("", "max-lines", "log lines to retain (default 400)", "n");
    opts.optopt(
        "",
        "reconnect-ms",
        "delay before reconnecting (default 2000)",
        "ms",
    );
    opts
}

pub fn rig_parseopts(opts: &Options, args: &[String]) -> (getopts::Matches, RigConfig) {
    let matches = match opts.parse(args) {
        Ok(m) => m,
        Err(f) => {
            panic!("{}", f.to_string())
        }
    };
    let mut config = if let Some(path) = matches.opt_str("c") {
        match RigConfig::load(&path) {
            Ok(config) => config,
            Err(err) => panic!("bad config: {}", err),
        }
    } else {
        RigConfig::default()
    };
    if let Some(url) = matches.opt_str("u") {
        config.url = url;
    }
    if let Some(scope) = matches.opt_str("scope") {
        config.scope = scope;
    }
    if let Some(n) = matches.opt_str("max-lines") {
        config.max_lines = n.parse().unwrap_or(config.max_lines);
    }
    if let Some(ms) = matches.opt_str("reconnect-ms") {
        config.reconnect_ms = ms.parse().unwrap_or(config.reconnect_ms);
    }
    (matches, config)
}

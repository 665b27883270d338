use log::{debug, trace};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::collector::Snapshot;
use crate::error::{AgentError, Result};
use crate::instance::LOCALHOST;
use crate::process::{Command, ProcessError, ProcessResult};
use crate::source::SnapshotSource;
use crate::stats::Variant;

/// Settings for the `varnishstat` source
#[derive(Debug, Clone, Deserialize)]
pub struct VarnishstatConfig {
    /// Program to run
    #[serde(default = "default_command")]
    pub command: String,
    /// Seconds to wait for the program to exit
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_command() -> String {
    "varnishstat".to_string()
}

fn default_timeout() -> u64 {
    5
}

impl Default for VarnishstatConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            timeout: default_timeout(),
        }
    }
}

/// Reads statistics by running `varnishstat -1`
pub struct VarnishstatSource {
    config: VarnishstatConfig,
    variant: Variant,
}

impl VarnishstatSource {
    pub fn new(config: VarnishstatConfig, variant: Variant) -> Self {
        Self { config, variant }
    }

    fn command(&self, instance: Option<&str>) -> Command {
        let command = Command::new(self.config.command.as_str()).arg("-1");
        match instance {
            Some(name) => command.arg("-n").arg(name),
            None => command,
        }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for VarnishstatSource {
    async fn fetch_snapshot(&self, instance: Option<&str>) -> Result<Snapshot> {
        let name = instance.unwrap_or(LOCALHOST);
        let limit = Duration::from_secs(self.config.timeout);

        let output = self
            .command(instance)
            .output(limit)
            .await
            .map_err(|e| AgentError::snapshot_fetch(name, AgentError::from(e)))?;

        let fields = parse_varnishstat(&output).map_err(|e| AgentError::snapshot_fetch(name, e))?;
        debug!("Read {} fields from varnishstat for {}", fields.len(), name);

        Ok(Snapshot::new(self.variant, fields))
    }

    fn name(&self) -> &str {
        "varnishstat"
    }
}

/// Parse `varnishstat -1` output into a field map.
///
/// Each line is `<name> <value> [<rate> <description>]`. A `MAIN.` prefix on
/// the name is dropped; lines whose value is not an unsigned integer are
/// ignored.
pub fn parse_varnishstat(output: &str) -> ProcessResult<HashMap<String, u64>> {
    let mut fields = HashMap::new();

    for line in output.lines() {
        let mut columns = line.split_whitespace();
        let (Some(name), Some(value)) = (columns.next(), columns.next()) else {
            continue;
        };

        match value.parse::<u64>() {
            Ok(value) => {
                let name = name.strip_prefix("MAIN.").unwrap_or(name);
                fields.insert(name.to_string(), value);
            }
            Err(_) => trace!("Skipping varnishstat line: {}", line),
        }
    }

    if fields.is_empty() {
        return Err(ProcessError::ParseError("no statistics in varnishstat output".to_string()));
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "\
client_conn            1024         0.05 Client connections accepted
client_drop               0         0.00 Connection dropped, no sess/wrk
cache_hit              9000         0.44 Cache hits
MAIN.cache_miss          12         0.00 Cache misses
n_wrk                    10          .   N worker threads
garbage
";

    #[test]
    fn test_parse_varnishstat() {
        let fields = parse_varnishstat(OUTPUT).unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields["client_conn"], 1024);
        assert_eq!(fields["cache_miss"], 12);
        assert_eq!(fields["n_wrk"], 10);
        assert!(!fields.contains_key("garbage"));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(matches!(parse_varnishstat("\n\n"), Err(ProcessError::ParseError(_))));
    }

    #[test]
    fn test_command_arguments() {
        let source = VarnishstatSource::new(VarnishstatConfig::default(), Variant::V3);
        assert_eq!(source.command(None).get_args(), ["-1"]);
        assert_eq!(source.command(Some("a")).get_args(), ["-1", "-n", "a"]);
        assert_eq!(source.command(None).program(), "varnishstat");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_failure_is_snapshot_error() {
        let config = VarnishstatConfig {
            command: "/nonexistent/varnishstat".to_string(),
            timeout: 1,
        };
        let source = VarnishstatSource::new(config, Variant::V2);
        let err = source.fetch_snapshot(Some("a")).await.unwrap_err();
        assert!(matches!(err, AgentError::SnapshotFetch { ref instance, .. } if instance == "a"));
    }
}

use crate::zabbix::Target;
use crate::{RelayError, RelayResult};

/// Strategy for mapping a raw stat name to a [`Target`].
///
/// Selected once at startup: stats either carry their destination embedded
/// in the name (`DecodeFromName`), or everything belongs to one statically
/// configured host (`FixedHost`).
#[derive(Debug, Clone)]
pub enum TargetResolver {
    /// Decode host and key from the stat name itself.
    DecodeFromName {
        /// This machine's own identity, used for `statsd.`-internal stats.
        local_host: String,
    },
    /// Use a fixed host; the full stat name becomes the key, unprocessed.
    FixedHost {
        /// The configured Zabbix host.
        host: String,
    },
}

impl TargetResolver {
    /// Creates a decoding resolver using this machine's own hostname for
    /// statsd-internal stats.
    #[must_use]
    pub fn decode_from_name() -> Self {
        Self::DecodeFromName {
            local_host: local_hostname(),
        }
    }

    /// Creates a fixed-host resolver.
    #[must_use]
    pub fn fixed_host(host: impl Into<String>) -> Self {
        Self::FixedHost { host: host.into() }
    }

    /// Resolves a stat name to a `{host, key}` target.
    ///
    /// # Errors
    /// Returns [`RelayError::Decode`] if host or key cannot be determined
    /// from the name. `FixedHost` resolution never fails.
    pub fn resolve(&self, stat: &str) -> RelayResult<Target> {
        match self {
            Self::DecodeFromName { local_host } => decode(local_host, stat),
            Self::FixedHost { host } => Ok(Target {
                host: host.clone(),
                key: stat.to_string(),
            }),
        }
    }
}

/// Namespaces whose 3-segment stats carry `<namespace>.<host>.<key>`.
const NAMESPACES: [&str; 2] = ["logstash", "kamon"];

fn decode(local_host: &str, stat: &str) -> RelayResult<Target> {
    // Stats from statsd itself belong to this machine, name kept verbatim.
    if stat.starts_with("statsd.") {
        return Ok(Target {
            host: local_host.to_string(),
            key: stat.to_string(),
        });
    }

    let parts: Vec<&str> = stat.split('.').collect();
    if parts.len() == 3 && NAMESPACES.contains(&parts[0]) {
        let (namespace, mut host, mut key) = (parts[0], parts[1].to_string(), parts[2].to_string());

        // Underscores stand in for dots inside a segment; kamon keys keep
        // theirs.
        host = host.replace('_', ".");
        if namespace == "logstash" {
            key = key.replace('_', ".");
        }

        return checked(stat, host, key);
    }

    // Bare `host_key` convention: first underscore splits the whole
    // original name, dots and any further underscores stay in the key.
    match stat.split_once('_') {
        Some((host, key)) => checked(stat, host.to_string(), key.to_string()),
        None => Err(RelayError::Decode(stat.to_string())),
    }
}

fn checked(stat: &str, host: String, key: String) -> RelayResult<Target> {
    if host.is_empty() || key.is_empty() {
        return Err(RelayError::Decode(stat.to_string()));
    }
    Ok(Target { host, key })
}

/// Returns this machine's hostname, resolved once at resolver construction.
fn local_hostname() -> String {
    rustix::system::uname().nodename().to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> TargetResolver {
        TargetResolver::DecodeFromName {
            local_host: "relay-box".to_string(),
        }
    }

    #[test]
    fn test_decode_conventions() {
        let cases = [
            ("host_first", "host", "first"),
            ("host.name_first", "host.name", "first"),
            ("host.name_first.second", "host.name", "first.second"),
            ("host.example.com_my.key", "host.example.com", "my.key"),
            ("host_first_second", "host", "first_second"),
            ("statsd.some_data", "relay-box", "statsd.some_data"),
            ("logstash.host.first", "host", "first"),
            ("logstash.host.first_second", "host", "first.second"),
            ("logstash.host_name.first_second", "host.name", "first.second"),
            ("kamon.host_name.first_second", "host.name", "first_second"),
        ];

        for (stat, host, key) in cases {
            let target = resolver().resolve(stat).unwrap();
            assert_eq!(target.host, host, "host for {stat}");
            assert_eq!(target.key, key, "key for {stat}");
        }
    }

    #[test]
    fn test_decode_four_segments_falls_back_to_underscore_split() {
        // Not a recognized namespace and not 3 segments: the underscore
        // split applies to the whole original name.
        let target = resolver().resolve("kamon.a.b_c.d").unwrap();
        assert_eq!(target.host, "kamon.a.b");
        assert_eq!(target.key, "c.d");
    }

    #[test]
    fn test_decode_rejects_undecodable_stats() {
        for stat in ["stat", "host_", "_key", "_"] {
            let err = resolver().resolve(stat).unwrap_err();
            assert!(
                matches!(&err, RelayError::Decode(s) if s == stat),
                "expected decode error for {stat}, got {err}"
            );
        }
    }

    #[test]
    fn test_decode_empty_namespaced_segment_fails() {
        assert!(resolver().resolve("logstash.host.").is_err());
    }

    #[test]
    fn test_fixed_host_passes_stat_through() {
        let resolver = TargetResolver::fixed_host("pinned");
        let target = resolver.resolve("my.statsd.key").unwrap();
        assert_eq!(target.host, "pinned");
        assert_eq!(target.key, "my.statsd.key");

        // Even names that would not decode resolve fine.
        let target = resolver.resolve("stat").unwrap();
        assert_eq!(target.key, "stat");
    }
}

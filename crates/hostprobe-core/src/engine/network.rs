//! Network sampler: interface totals and cursor-based rates.

use std::collections::HashMap;

use crate::cursor;
use crate::models::{NetCounters, NetInterfaceRate, NetLink, NetRateCursor, NetRateSnapshot};
use crate::probes::parser::{NetDevStats, parse_net_dev};
use crate::probes::{FileSystem, ProbeError, Probes};

use super::{Engine, now_unix_ms, rate_between};

/// Physical and container-facing interface prefixes. Everything else
/// (lo, docker bridges, veth pairs, tunnels) is noise for throughput.
const INTERFACE_PREFIXES: &[&str] = &["wlan", "wlo", "wlp", "eth", "eno", "enp", "ens", "lxc"];

fn matches_interface(name: &str) -> bool {
    INTERFACE_PREFIXES.iter().any(|p| name.starts_with(p))
}

impl<P: Probes> Engine<P> {
    fn read_interfaces(&self) -> Result<Vec<NetDevStats>, ProbeError> {
        let content = self
            .probes
            .read_to_string(&self.proc_path.join("net/dev"))?;
        Ok(parse_net_dev(&content)
            .into_iter()
            .filter(|d| matches_interface(&d.interface))
            .collect())
    }

    /// Cumulative rx/tx byte totals per allowed interface.
    pub fn network(&self) -> Result<Vec<NetLink>, ProbeError> {
        Ok(self
            .read_interfaces()?
            .into_iter()
            .map(|d| NetLink {
                interface: d.interface,
                rx_total: d.rx_bytes,
                tx_total: d.tx_bytes,
            })
            .collect())
    }

    /// Per-interface throughput derived against the prior cursor.
    ///
    /// Interfaces without a prior entry report zero rates; a fresh cursor
    /// carrying every current counter is always emitted.
    pub fn network_rates(&self, cursor_str: Option<&str>) -> Result<NetRateSnapshot, ProbeError> {
        let devices = self.read_interfaces()?;
        let now_ms = now_unix_ms();
        let prior: NetRateCursor = cursor_str.map(cursor::decode_or_default).unwrap_or_default();
        let dt = (now_ms - prior.timestamp) as f64 / 1000.0;
        let has_prior = prior.timestamp > 0 && dt > 0.0;

        let mut interfaces = Vec::with_capacity(devices.len());
        let mut next_counters = HashMap::with_capacity(devices.len());

        for dev in &devices {
            let (rx_rate, tx_rate) = match prior.interfaces.get(&dev.interface) {
                Some(prev) if has_prior => (
                    rate_between(prev.bytes_recv, dev.rx_bytes, dt),
                    rate_between(prev.bytes_sent, dev.tx_bytes, dt),
                ),
                _ => (0.0, 0.0),
            };

            interfaces.push(NetInterfaceRate {
                interface: dev.interface.clone(),
                rx_total: dev.rx_bytes,
                tx_total: dev.tx_bytes,
                rx_rate,
                tx_rate,
            });
            next_counters.insert(
                dev.interface.clone(),
                NetCounters {
                    bytes_recv: dev.rx_bytes,
                    bytes_sent: dev.tx_bytes,
                    packets_recv: dev.rx_packets,
                    packets_sent: dev.tx_packets,
                },
            );
        }

        Ok(NetRateSnapshot {
            interfaces,
            cursor: cursor::encode(&NetRateCursor {
                timestamp: now_ms,
                interfaces: next_counters,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::MockProbes;

    #[test]
    fn interface_allow_list() {
        assert!(matches_interface("eth0"));
        assert!(matches_interface("enp3s0"));
        assert!(matches_interface("wlan0"));
        assert!(matches_interface("wlp2s0"));
        assert!(matches_interface("lxcbr0"));
        assert!(!matches_interface("lo"));
        assert!(!matches_interface("docker0"));
        assert!(!matches_interface("veth1a2b"));
        assert!(!matches_interface("virbr0"));
        assert!(!matches_interface("tun0"));
    }

    #[test]
    fn totals_exclude_loopback_and_bridges() {
        let engine = Engine::new(MockProbes::typical_system());
        let links = engine.network().unwrap();

        let names: Vec<&str> = links.iter().map(|l| l.interface.as_str()).collect();
        assert_eq!(names, vec!["eth0", "wlan0"]);
        assert_eq!(links[0].rx_total, 9876543);
        assert_eq!(links[0].tx_total, 87654321);
    }

    #[test]
    fn rates_from_prior_cursor() {
        let engine = Engine::new(MockProbes::typical_system());

        // One mebibyte received one second ago.
        let mut interfaces = HashMap::new();
        interfaces.insert(
            "eth0".to_string(),
            NetCounters {
                bytes_recv: 9876543 - 1_048_576,
                bytes_sent: 87654321,
                packets_recv: 0,
                packets_sent: 0,
            },
        );
        let prior = cursor::encode(&NetRateCursor {
            timestamp: now_unix_ms() - 1000,
            interfaces,
        });

        let snap = engine.network_rates(Some(&prior)).unwrap();
        let eth0 = snap
            .interfaces
            .iter()
            .find(|i| i.interface == "eth0")
            .unwrap();

        // ~1 MiB/s; the window is measured against the real clock, so
        // allow a few percent of slack.
        assert!(eth0.rx_rate > 900_000.0 && eth0.rx_rate < 1_100_000.0);
        assert_eq!(eth0.tx_rate, 0.0);
        assert!(!snap.cursor.is_empty());
    }

    #[test]
    fn unknown_interfaces_in_cursor_are_ignored() {
        let engine = Engine::new(MockProbes::typical_system());

        let mut interfaces = HashMap::new();
        interfaces.insert(
            "eth9".to_string(),
            NetCounters {
                bytes_recv: 1,
                bytes_sent: 1,
                packets_recv: 1,
                packets_sent: 1,
            },
        );
        let prior = cursor::encode(&NetRateCursor {
            timestamp: now_unix_ms() - 1000,
            interfaces,
        });

        let snap = engine.network_rates(Some(&prior)).unwrap();
        for iface in &snap.interfaces {
            assert_eq!(iface.rx_rate, 0.0);
            assert_eq!(iface.tx_rate, 0.0);
        }
    }

    #[test]
    fn no_cursor_yields_zero_rates_and_fresh_cursor() {
        let engine = Engine::new(MockProbes::typical_system());
        let snap = engine.network_rates(None).unwrap();

        assert_eq!(snap.interfaces.len(), 2);
        for iface in &snap.interfaces {
            assert_eq!(iface.rx_rate, 0.0);
            assert_eq!(iface.tx_rate, 0.0);
        }

        let decoded: NetRateCursor = cursor::decode(&snap.cursor).unwrap();
        assert!(decoded.interfaces.contains_key("eth0"));
        assert!(decoded.timestamp > 0);
    }
}

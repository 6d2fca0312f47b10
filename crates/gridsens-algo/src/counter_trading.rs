//! Counter-trading pool.
//!
//! Counter-trading raises generation on one side of the border and lowers it on
//! the other. Each large generator of the two countries takes a share of the
//! move proportional to its headroom, so the pool acts as one synthetic lever.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use gridsens_core::Network;

/// Lever name of the counter-trading pool.
pub const COUNTER_TRADING_KEY: &str = "counter_trading";

/// Generators at or below this capacity stay out of the pool (MW).
pub const MIN_POOL_CAPACITY: f64 = 10.0;

/// Repartition keys of the counter-trading pool, by generator id.
///
/// Keys sum to 1 over `country1` and to -1 over `country2`. A country whose
/// generators have no headroom contributes no key.
pub fn proportional_redispatch_keys(
    network: &Network,
    country1: &str,
    country2: &str,
) -> BTreeMap<String, f64> {
    let mut per_country: BTreeMap<&str, Vec<(String, f64)>> = BTreeMap::new();
    for gen in network.generators.values() {
        if gen.fictitious || gen.max_p <= MIN_POOL_CAPACITY {
            continue;
        }
        let Some(country) = network.country_of(&gen.terminal.voltage_level_id) else {
            continue;
        };
        if country != country1 && country != country2 {
            continue;
        }
        let headroom = (gen.max_p - gen.target_p).min(gen.target_p - gen.min_p).max(0.0);
        per_country
            .entry(country)
            .or_default()
            .push((gen.id.clone(), headroom));
    }

    let mut keys = BTreeMap::new();
    for (country, generators) in per_country {
        let total: f64 = generators.iter().map(|(_, h)| h).sum();
        if total <= 0.0 {
            continue;
        }
        let sign = if country == country1 { 1.0 } else { -1.0 };
        for (id, headroom) in generators {
            keys.insert(id, sign * headroom / total);
        }
    }
    info!(generators = keys.len(), "counter-trading pool");
    keys
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterTradingBounds {
    pub min: f64,
    pub max: f64,
}

/// Lever metadata of the pool; empty when counter-trading is disabled.
pub fn counter_trading_info(max_counter_trading: f64) -> BTreeMap<String, CounterTradingBounds> {
    let mut info = BTreeMap::new();
    if max_counter_trading > 0.0 {
        info.insert(
            COUNTER_TRADING_KEY.to_string(),
            CounterTradingBounds {
                min: -max_counter_trading,
                max: max_counter_trading,
            },
        );
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{six_bus_network, ES, FR, GENERATOR};

    #[test]
    fn test_keys_are_normalised_per_country() {
        let network = six_bus_network();
        let keys = proportional_redispatch_keys(&network, FR, ES);
        assert_eq!(keys.len(), 6);

        let fr: f64 = ["ULYSS7G1_NGU_SM", GENERATOR, "HERA7G1_NGU_SM"]
            .iter()
            .map(|id| keys[*id])
            .sum();
        let es: f64 = ["ZEUS7G1_NGU_SM", "HADES7G1_NGU_SM", "AJAX7G1_NGU_SM"]
            .iter()
            .map(|id| keys[*id])
            .sum();
        assert!((fr - 1.0).abs() < 1e-12);
        assert!((es + 1.0).abs() < 1e-12);

        // FR headrooms: min(500, 500) = 500, min(600, 600) = 600, min(500, 300) = 300
        assert!((keys[GENERATOR] - 600.0 / 1400.0).abs() < 1e-12);
    }

    #[test]
    fn test_small_and_fictitious_generators_are_excluded() {
        let mut network = six_bus_network();
        let gen = network.generators.get_mut("HERA7G1_NGU_SM").unwrap();
        gen.max_p = 10.0;
        gen.target_p = 5.0;
        network.generators.get_mut(GENERATOR).unwrap().fictitious = true;
        let keys = proportional_redispatch_keys(&network, FR, ES);
        assert!(!keys.contains_key("HERA7G1_NGU_SM"));
        assert!(!keys.contains_key(GENERATOR));
        assert_eq!(keys["ULYSS7G1_NGU_SM"], 1.0);
    }

    #[test]
    fn test_info_only_when_enabled() {
        assert!(counter_trading_info(0.0).is_empty());
        let info = counter_trading_info(500.0);
        assert_eq!(
            info[COUNTER_TRADING_KEY],
            CounterTradingBounds {
                min: -500.0,
                max: 500.0
            }
        );
    }
}

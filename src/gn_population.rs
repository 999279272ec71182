// Population planning: per-location miner and non-miner counts.

use indexmap::IndexMap;

use crate::gn_interface::SimError;

/// Miners planned for one location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerAllocation {
    pub count: usize,
    /// Sampling range for per-miner hash-rate (mega-hash units).
    pub hashrate_range: (u64, u64),
}

/// Per-location node counts handed to the provisioner. Iteration order is
/// the supplied location order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PopulationPlan {
    pub miners: IndexMap<String, MinerAllocation>,
    pub non_miners: IndexMap<String, usize>,
}

impl PopulationPlan {
    /// Total number of nodes the plan will provision. Integer rounding may
    /// leave this below the requested total; the loss is accepted.
    pub fn total(&self) -> usize {
        let miners: usize = self.miners.values().map(|a| a.count).sum();
        let non_miners: usize = self.non_miners.values().sum();
        miners + non_miners
    }
}

/// Split `total_nodes` across `locations` by the index-aligned
/// `miner_ratios`.
///
/// Each location gets an equal base share (`total_nodes / locations`,
/// floored); within it, `floor(base * ratio)` miners and
/// `floor(base * (1 - ratio))` non-miners. A location appears in the miner
/// map only when its ratio is strictly positive; it always appears in the
/// non-miner map, so a zero ratio yields a full base share of non-miners.
pub fn plan_population(
    locations: &[String],
    miner_ratios: &[f64],
    total_nodes: usize,
    hashrate_range: (u64, u64),
) -> Result<PopulationPlan, SimError> {
    if locations.is_empty() {
        return Err(SimError::Configuration(
            "at least one location is required".to_string(),
        ));
    }
    if locations.len() != miner_ratios.len() {
        return Err(SimError::Configuration(format!(
            "{} locations but {} miner ratios",
            locations.len(),
            miner_ratios.len()
        )));
    }
    if total_nodes == 0 {
        return Err(SimError::Configuration(
            "total node count must be positive".to_string(),
        ));
    }
    if hashrate_range.0 > hashrate_range.1 || hashrate_range.1 == 0 {
        return Err(SimError::Configuration(format!(
            "invalid hashrate range ({}, {})",
            hashrate_range.0, hashrate_range.1
        )));
    }

    let base = total_nodes / locations.len();
    let mut plan = PopulationPlan::default();

    for (location, &ratio) in locations.iter().zip(miner_ratios) {
        if !(0.0..1.0).contains(&ratio) {
            return Err(SimError::Configuration(format!(
                "miner ratio {} for {} is outside [0, 1)",
                ratio, location
            )));
        }

        if ratio > 0.0 {
            plan.miners.insert(
                location.clone(),
                MinerAllocation {
                    count: (base as f64 * ratio).floor() as usize,
                    hashrate_range,
                },
            );
        }
        plan.non_miners
            .insert(location.clone(), (base as f64 * (1.0 - ratio)).floor() as usize);
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_splits_base_share_by_ratio() {
        let plan = plan_population(&names(&["A", "B"]), &[0.5, 0.0], 100, (20, 40)).unwrap();

        assert_eq!(plan.miners.len(), 1);
        assert_eq!(plan.miners["A"].count, 25);
        assert!(!plan.miners.contains_key("B"));

        assert_eq!(plan.non_miners["A"], 25);
        assert_eq!(plan.non_miners["B"], 50);
        assert_eq!(plan.total(), 100);
    }

    #[test]
    fn test_plan_preserves_location_order() {
        let plan = plan_population(
            &names(&["Ohio", "Tokyo", "Ireland"]),
            &[0.1, 0.1, 0.1],
            90,
            (20, 40),
        )
        .unwrap();

        let order: Vec<&String> = plan.non_miners.keys().collect();
        assert_eq!(order, ["Ohio", "Tokyo", "Ireland"]);
    }

    #[test]
    fn test_plan_rejects_bad_ratios() {
        let err = plan_population(&names(&["A"]), &[1.0], 10, (20, 40));
        assert!(matches!(err, Err(SimError::Configuration(_))));

        let err = plan_population(&names(&["A"]), &[-0.1], 10, (20, 40));
        assert!(matches!(err, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_plan_rejects_mismatched_lists() {
        let err = plan_population(&names(&["A", "B"]), &[0.5], 10, (20, 40));
        assert!(matches!(err, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_plan_rejects_empty_or_zero_inputs() {
        assert!(matches!(
            plan_population(&[], &[], 10, (20, 40)),
            Err(SimError::Configuration(_))
        ));
        assert!(matches!(
            plan_population(&names(&["A"]), &[0.5], 0, (20, 40)),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn test_rounding_loss_is_accepted() {
        // base = 33, 0.5 ratio: 16 miners + 16 non-miners per location
        let plan = plan_population(&names(&["A", "B", "C"]), &[0.5, 0.5, 0.5], 100, (20, 40))
            .unwrap();
        assert_eq!(plan.total(), 96);
    }
}

//! Per-action impact model.
//!
//! Maps a [`UserActions`] set to constant per-year deltas on the primary
//! metrics plus adjustments feeding the derived ones. The calculation is
//! deterministic; explanations are emitted in evaluation order, one per
//! triggered branch.

use serde::{Deserialize, Serialize};

use crate::actions::{FactoryType, UserActions};

/// Ambient per-year drift applied even with no actions.
pub const AMBIENT_AQI_CHANGE: f64 = 2.0;
/// Yearly water drift with no actions.
pub const AMBIENT_WATER_CHANGE: f64 = -1.0;
/// Yearly carbon drift with no actions.
pub const AMBIENT_CARBON_CHANGE: f64 = -5.0;

/// Per-year deltas derived from one request's actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactBundle {
    /// Yearly AQI delta.
    pub aqi_change: f64,
    /// Yearly water quality delta.
    pub water_change: f64,
    /// Yearly carbon budget delta.
    pub carbon_change: f64,
    /// Added to raw health each year.
    pub health_impact: f64,
    /// Added to the inequality accumulator each year.
    pub inequality_impact: f64,
    /// Added to happiness each year.
    pub happiness_base: f64,

    /// Human-readable reason per triggered action, in evaluation order.
    pub explanations: Vec<String>,
}

impl Default for ImpactBundle {
    fn default() -> Self {
        Self::ambient()
    }
}

impl ImpactBundle {
    /// Ambient degradation with no actions applied.
    #[must_use]
    pub fn ambient() -> Self {
        Self {
            aqi_change: AMBIENT_AQI_CHANGE,
            water_change: AMBIENT_WATER_CHANGE,
            carbon_change: AMBIENT_CARBON_CHANGE,
            health_impact: 0.0,
            inequality_impact: 0.0,
            happiness_base: 0.0,
            explanations: Vec::new(),
        }
    }

    fn explain(&mut self, text: impl Into<String>) {
        self.explanations.push(text.into());
    }
}

/// Computes the impact bundle for a set of actions.
///
/// Branches run in a fixed order: factory, trees cut, trees planted,
/// solar, waste management, public transport, green policy. They are
/// independent, so several may fire in one request.
#[must_use]
pub fn calculate_impacts(actions: &UserActions) -> ImpactBundle {
    let mut impact = ImpactBundle::ambient();

    match actions.factory_type {
        FactoryType::None => {}
        FactoryType::Textile => {
            impact.water_change -= 5.0;
            impact.inequality_impact -= 1.0;
            impact.explain("Textile factories pollute water significantly but provide jobs.");
        }
        FactoryType::Chemical => {
            impact.water_change -= 8.0;
            impact.aqi_change += 4.0;
            impact.health_impact -= 5.0;
            impact.explain("Chemical plants offer high risks to health and water quality.");
        }
        FactoryType::Electronics => {
            impact.carbon_change -= 15.0;
            impact.aqi_change += 1.0;
            impact.inequality_impact -= 2.0;
            impact.explain("Electronics manufacturing consumes high energy but boosts economy.");
        }
        FactoryType::Automobile => {
            impact.aqi_change += 6.0;
            impact.carbon_change -= 12.0;
            impact.explain("Auto factories contribute heavily to air pollution.");
        }
    }

    if actions.trees_cut > 0 {
        let cut = f64::from(actions.trees_cut);
        impact.aqi_change += cut / 50.0;
        impact.happiness_base -= cut / 10.0;
        impact.explain(format!(
            "Cutting {} trees has immediate negative effects on air and happiness.",
            actions.trees_cut
        ));
    }

    if actions.trees_planted > 0 {
        let planted = f64::from(actions.trees_planted);
        impact.aqi_change -= planted / 100.0;
        impact.carbon_change += planted / 20.0;
        impact.happiness_base += planted / 50.0;
        impact.explain(format!(
            "Planting {} trees will gradually improve air and carbon offset.",
            actions.trees_planted
        ));
    }

    if actions.add_solar {
        impact.carbon_change += 3.0;
        impact.aqi_change -= 1.5;
        impact.explain("Solar infrastructure slows carbon depletion.");
    }

    if actions.improve_waste_management {
        impact.water_change += 4.0;
        impact.health_impact += 1.5;
        impact.explain("Better waste management improves water quality.");
    }

    if actions.expand_public_transport {
        impact.aqi_change -= 2.0;
        impact.inequality_impact -= 1.0;
        impact.explain("Public transport improves social mobility.");
    }

    if actions.enforce_green_policy {
        impact.aqi_change -= 1.0;
        impact.carbon_change += 2.0;
        impact.explain("Green policies enforce stricter standards.");
    }

    impact
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn no_actions_is_ambient_drift_only() {
        let impact = calculate_impacts(&UserActions::none());
        assert_eq!(impact, ImpactBundle::ambient());
        assert!(impact.explanations.is_empty());
    }

    #[test]
    fn factory_categories_apply_their_coefficients() {
        let textile = calculate_impacts(&UserActions::none().with_factory(FactoryType::Textile));
        assert!(approx(textile.water_change, -6.0));
        assert!(approx(textile.inequality_impact, -1.0));

        let chemical = calculate_impacts(&UserActions::none().with_factory(FactoryType::Chemical));
        assert!(approx(chemical.water_change, -9.0));
        assert!(approx(chemical.aqi_change, 6.0));
        assert!(approx(chemical.health_impact, -5.0));

        let electronics =
            calculate_impacts(&UserActions::none().with_factory(FactoryType::Electronics));
        assert!(approx(electronics.carbon_change, -20.0));
        assert!(approx(electronics.aqi_change, 3.0));
        assert!(approx(electronics.inequality_impact, -2.0));

        let auto = calculate_impacts(&UserActions::none().with_factory(FactoryType::Automobile));
        assert!(approx(auto.aqi_change, 8.0));
        assert!(approx(auto.carbon_change, -17.0));
        assert_eq!(auto.explanations.len(), 1);
    }

    #[test]
    fn trees_cut_and_planted_both_fire() {
        let impact = calculate_impacts(
            &UserActions::none().with_trees_cut(100).with_trees_planted(200),
        );
        // 2 + 100/50 - 200/100
        assert!(approx(impact.aqi_change, 2.0));
        // -5 + 200/20
        assert!(approx(impact.carbon_change, 5.0));
        // -100/10 + 200/50
        assert!(approx(impact.happiness_base, -6.0));
        assert_eq!(
            impact.explanations,
            vec![
                "Cutting 100 trees has immediate negative effects on air and happiness."
                    .to_string(),
                "Planting 200 trees will gradually improve air and carbon offset.".to_string(),
            ]
        );
    }

    #[test]
    fn chemical_planting_and_solar_explain_in_order() {
        let actions = UserActions::none()
            .with_factory(FactoryType::Chemical)
            .with_trees_planted(100)
            .with_solar();
        let impact = calculate_impacts(&actions);
        assert_eq!(impact.explanations.len(), 3);
        assert!(impact.explanations[0].starts_with("Chemical plants"));
        assert!(impact.explanations[1].starts_with("Planting 100 trees"));
        assert!(impact.explanations[2].starts_with("Solar infrastructure"));
        // 2 + 4 - 1 - 1.5
        assert!(approx(impact.aqi_change, 3.5));
    }

    #[test]
    fn every_flag_contributes_one_explanation() {
        let actions = UserActions::none()
            .with_factory(FactoryType::Textile)
            .with_trees_cut(10)
            .with_trees_planted(10)
            .with_solar()
            .with_waste_management()
            .with_public_transport()
            .with_green_policy();
        let impact = calculate_impacts(&actions);
        assert_eq!(impact.explanations.len(), 7);
        assert!(impact.explanations[4].contains("waste management"));
        assert!(impact.explanations[5].contains("Public transport"));
        assert!(impact.explanations[6].contains("Green policies"));
        // -1 - 5 + 4
        assert!(approx(impact.water_change, -2.0));
        assert!(approx(impact.health_impact, 1.5));
        assert!(approx(impact.inequality_impact, -2.0));
    }

    #[test]
    fn impact_calculation_is_idempotent() {
        let actions = UserActions::none()
            .with_factory(FactoryType::Electronics)
            .with_trees_cut(40)
            .with_public_transport();
        assert_eq!(calculate_impacts(&actions), calculate_impacts(&actions));
    }
}

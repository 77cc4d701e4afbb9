//! Panel family: pooled OLS, one-way entity fixed effects and two-way
//! entity + time fixed effects.
//!
//! Fixed-effects models are estimated by within-demeaning; the reported
//! errors are for level predictions so they compare directly with pooled OLS.

use std::collections::BTreeMap;

use crate::data::RowIndex;
use crate::domain::ModelCandidate;
use crate::math::stats::{error_metrics, r_squared};
use crate::models::diagnostics::residual_diagnostics;
use crate::models::regression::{
    Observations, describe_fit, labels_with_intercept, ols, require_features, t_p_value,
};
use crate::models::{EstimationInput, Estimator, EstimatorError};

/// Complete observations with dense entity and time codes.
#[derive(Debug, Clone)]
struct PanelData {
    obs: Observations,
    entity: Vec<usize>,
    time: Vec<usize>,
    n_entities: usize,
    n_times: usize,
}

fn encode(keys: Vec<String>) -> (Vec<usize>, usize) {
    let mut codes: BTreeMap<String, usize> = BTreeMap::new();
    let encoded = keys
        .into_iter()
        .map(|k| {
            let next = codes.len();
            *codes.entry(k).or_insert(next)
        })
        .collect();
    (encoded, codes.len())
}

impl PanelData {
    fn collect(input: &EstimationInput<'_>) -> Result<Self, EstimatorError> {
        let obs = Observations::collect(input.dataset, input.target, input.features)?;

        let key_of: Box<dyn Fn(usize) -> Option<(String, String)> + '_> =
            match (&input.roles.entity, &input.roles.time, input.dataset.index()) {
                (Some(entity), Some(time), _) => {
                    let (Some(entity), Some(time)) = (input.dataset.column(entity), input.dataset.column(time))
                    else {
                        return Err(EstimatorError::NotApplicable("panel key columns are missing".to_string()));
                    };
                    Box::new(move |row| Some((entity.key_at(row)?, time.key_at(row)?)))
                }
                (_, _, Some(RowIndex::EntityTime { entities, times })) => {
                    Box::new(move |row| Some((entities.get(row)?.clone(), times.get(row)?.clone())))
                }
                _ => {
                    return Err(EstimatorError::NotApplicable(
                        "entity and time roles are unresolved".to_string(),
                    ));
                }
            };

        let mut kept = Observations {
            rows: Vec::new(),
            target: Vec::new(),
            features: Vec::new(),
        };
        let mut entity_keys = Vec::new();
        let mut time_keys = Vec::new();
        for i in 0..obs.len() {
            let Some((entity, time)) = key_of(obs.rows[i]) else {
                continue;
            };
            kept.rows.push(obs.rows[i]);
            kept.target.push(obs.target[i]);
            kept.features.push(obs.features[i].clone());
            entity_keys.push(entity);
            time_keys.push(time);
        }

        let (entity, n_entities) = encode(entity_keys);
        let (time, n_times) = encode(time_keys);
        Ok(Self {
            obs: kept,
            entity,
            time,
            n_entities,
            n_times,
        })
    }

    fn is_balanced(&self) -> bool {
        let mut cells = vec![0usize; self.n_entities * self.n_times];
        for (e, t) in self.entity.iter().zip(&self.time) {
            cells[e * self.n_times + t] += 1;
        }
        cells.iter().all(|c| *c == 1)
    }

    fn feature_column(&self, f: usize) -> Vec<f64> {
        self.obs.features.iter().map(|row| row[f]).collect()
    }
}

fn group_means(values: &[f64], groups: &[usize], n_groups: usize) -> Vec<f64> {
    let mut sums = vec![0.0; n_groups];
    let mut counts = vec![0usize; n_groups];
    for (v, g) in values.iter().zip(groups) {
        sums[*g] += v;
        counts[*g] += 1;
    }
    sums.iter()
        .zip(&counts)
        .map(|(s, c)| if *c > 0 { s / *c as f64 } else { 0.0 })
        .collect()
}

/// Pooled OLS ignoring the panel structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct PooledOls;

impl Estimator for PooledOls {
    fn name(&self) -> &str {
        "Pooled OLS"
    }

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError> {
        require_features(input.features)?;
        let obs = Observations::collect(input.dataset, input.target, input.features)?;
        obs.require(input.features.len() + 3)?;

        let (fit, y) = ols(&obs.features, &obs.target, true)?;
        let mut candidate = ModelCandidate::new(self.name(), input.target, obs.len());
        describe_fit(&mut candidate, &fit, &y, &labels_with_intercept(input.features));
        if let Some(diagnostics) = residual_diagnostics(&obs.features, fit.residuals.as_slice()) {
            diagnostics.attach(&mut candidate, input.config.significance_level);
        }
        Ok(candidate)
    }
}

/// Which effects are swept out before the slope regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effects {
    Entity,
    EntityAndTime,
}

fn within_estimate(
    name: &str,
    effects: Effects,
    input: &EstimationInput<'_>,
) -> Result<ModelCandidate, EstimatorError> {
    require_features(input.features)?;
    let panel = PanelData::collect(input)?;
    let n = panel.obs.len();
    let k = input.features.len();
    if panel.n_entities < 2 {
        return Err(EstimatorError::NotApplicable("fewer than two entities".to_string()));
    }
    if effects == Effects::EntityAndTime && !panel.is_balanced() {
        return Err(EstimatorError::NotApplicable(
            "two-way demeaning needs a balanced panel".to_string(),
        ));
    }
    let absorbed = match effects {
        Effects::Entity => panel.n_entities,
        Effects::EntityAndTime => panel.n_entities + panel.n_times - 1,
    };
    panel.obs.require(k + absorbed + 2)?;

    // (entity means, time means, grand mean) of a column.
    let sweep = |values: &[f64]| -> (Vec<f64>, Vec<f64>, f64) {
        let by_entity = group_means(values, &panel.entity, panel.n_entities);
        let by_time = group_means(values, &panel.time, panel.n_times);
        let grand = values.iter().sum::<f64>() / values.len() as f64;
        (by_entity, by_time, grand)
    };
    let demean = |values: &[f64], means: &(Vec<f64>, Vec<f64>, f64)| -> Vec<f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| match effects {
                Effects::Entity => v - means.0[panel.entity[i]],
                Effects::EntityAndTime => v - means.0[panel.entity[i]] - means.1[panel.time[i]] + means.2,
            })
            .collect()
    };

    let y_means = sweep(&panel.obs.target);
    let y_within = demean(&panel.obs.target, &y_means);
    let x_means: Vec<_> = (0..k).map(|f| sweep(&panel.feature_column(f))).collect();
    let x_within_cols: Vec<Vec<f64>> = (0..k)
        .map(|f| demean(&panel.feature_column(f), &x_means[f]))
        .collect();
    let x_within: Vec<Vec<f64>> = (0..n).map(|i| x_within_cols.iter().map(|c| c[i]).collect()).collect();

    let (fit, y_w) = ols(&x_within, &y_within, false)?;

    // Level predictions: fitted within part plus the swept-out effects.
    let predicted: Vec<f64> = (0..n)
        .map(|i| {
            let effect = match effects {
                Effects::Entity => y_means.0[panel.entity[i]],
                Effects::EntityAndTime => y_means.0[panel.entity[i]] + y_means.1[panel.time[i]] - y_means.2,
            };
            effect + fit.fitted[i]
        })
        .collect();

    let mut candidate = ModelCandidate::new(name, input.target, n);
    if let Some((mae, mse)) = error_metrics(&panel.obs.target, &predicted) {
        candidate.mae = Some(mae);
        candidate.mse = Some(mse);
    }
    candidate.r_squared = r_squared(&panel.obs.target, &predicted);
    if let Some(within) = fit.r_squared(&y_w) {
        candidate.metrics.insert("within_r_squared".to_string(), within);
    }

    // Standard errors corrected for the absorbed effects.
    let df = n - k - absorbed;
    let correction = ((n - k) as f64 / df as f64).sqrt();
    for (f, feature) in input.features.iter().enumerate() {
        candidate.coefficients.insert(feature.clone(), fit.beta[f]);
        let t = fit.beta[f] / (fit.std_errors[f] * correction);
        if let Some(p) = t_p_value(t, df) {
            candidate.metrics.insert(format!("p_value[{feature}]"), p);
        }
    }
    candidate.metrics.insert("entities".to_string(), panel.n_entities as f64);
    candidate.metrics.insert("periods".to_string(), panel.n_times as f64);
    Ok(candidate)
}

/// One-way (entity) fixed effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityFixedEffects;

impl Estimator for EntityFixedEffects {
    fn name(&self) -> &str {
        "Fixed effects (entity)"
    }

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError> {
        within_estimate(self.name(), Effects::Entity, input)
    }
}

/// Two-way (entity + time) fixed effects; balanced panels only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoWayFixedEffects;

impl Estimator for TwoWayFixedEffects {
    fn name(&self) -> &str {
        "Fixed effects (entity + time)"
    }

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError> {
        within_estimate(self.name(), Effects::EntityAndTime, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ResolvedRoles;
    use crate::data::sample::balanced_panel;
    use crate::data::{Column, Dataset};
    use crate::domain::AnalysisConfig;

    fn input_for<'a>(
        ds: &'a Dataset,
        roles: &'a ResolvedRoles,
        config: &'a AnalysisConfig,
        features: &'a [String],
    ) -> EstimationInput<'a> {
        EstimationInput {
            dataset: ds,
            target: "revenue",
            features,
            roles,
            integration: None,
            config,
        }
    }

    #[test]
    fn fixed_effects_absorb_firm_heterogeneity() {
        let ds = balanced_panel(6, 8, 5).unwrap();
        let roles = ResolvedRoles::resolve(&ds);
        let config = AnalysisConfig::default();
        let features = vec!["x".to_string()];
        let input = input_for(&ds, &roles, &config, &features);

        let pooled = PooledOls.estimate(&input).unwrap();
        let fe = EntityFixedEffects.estimate(&input).unwrap();
        let two_way = TwoWayFixedEffects.estimate(&input).unwrap();

        assert!((fe.coefficients["x"] - 1.5).abs() < 0.1);
        assert!(fe.mae.unwrap() < pooled.mae.unwrap());
        assert!((two_way.coefficients["x"] - 1.5).abs() < 0.1);
        assert_eq!(fe.metrics["entities"], 6.0);
        assert!(pooled.metrics.contains_key("breusch_pagan"));
        assert!(pooled.metrics.contains_key("residual_autocorrelation"));
        assert!(!fe.metrics.contains_key("breusch_pagan"));
    }

    #[test]
    fn two_way_rejects_unbalanced_panel() {
        let ds = Dataset::from_columns(vec![
            Column::text("firm_id", vec!["a", "a", "a", "b", "b", "c", "c", "c"]),
            Column::numeric("year", vec![1.0, 2.0, 3.0, 1.0, 2.0, 1.0, 2.0, 3.0]),
            Column::numeric("x", vec![1.0, 2.0, 4.0, 1.5, 2.5, 3.0, 1.0, 2.0]),
            Column::numeric("revenue", vec![2.0, 3.1, 5.0, 2.4, 3.6, 4.1, 1.9, 3.2]),
        ])
        .unwrap();
        let roles = ResolvedRoles::resolve(&ds);
        let config = AnalysisConfig::default();
        let features = vec!["x".to_string()];
        let input = input_for(&ds, &roles, &config, &features);

        assert!(matches!(
            TwoWayFixedEffects.estimate(&input),
            Err(EstimatorError::NotApplicable(_))
        ));
        assert!(EntityFixedEffects.estimate(&input).is_ok());
    }

    #[test]
    fn unresolved_roles_are_not_applicable() {
        let ds = Dataset::from_columns(vec![
            Column::numeric("x", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::numeric("revenue", vec![1.0, 2.0, 2.5, 4.0, 5.5]),
        ])
        .unwrap();
        let roles = ResolvedRoles::resolve(&ds);
        let config = AnalysisConfig::default();
        let features = vec!["x".to_string()];
        assert!(matches!(
            EntityFixedEffects.estimate(&input_for(&ds, &roles, &config, &features)),
            Err(EstimatorError::NotApplicable(_))
        ));
    }
}

//! Model scoring and selection.
//!
//! Every fitted model is scored with:
//! - AIC = 2k − 2ℓ
//! - BIC = k ln n − 2ℓ
//! - KS  = sup |F_n(x) − F(x)|
//!
//! Selection rules:
//! 1. The configured criterion (AIC or BIC) decides; lower is better
//! 2. Values within a relative `1e-9` of each other are ties
//! 3. Ties go to the model with fewer parameters, then to the family declared first

use std::cmp::Ordering;

use crate::domain::{Criterion, FittedModel, GoodnessOfFitScore, Metric, Sample};
use crate::error::EngineError;
use crate::math::ks_statistic;

/// Relative tolerance under which two criterion values are considered equal.
const TIE_TOLERANCE: f64 = 1e-9;

/// Score every model with every [`Metric`], keeping model order.
pub fn score<'a>(
    models: &'a [FittedModel],
    sample: &Sample,
) -> Result<Vec<GoodnessOfFitScore<'a>>, EngineError> {
    if models.is_empty() {
        return Err(EngineError::NoModelsToScore);
    }
    let sorted = sample.sorted();

    let mut scores = Vec::with_capacity(models.len() * Metric::ALL.len());
    for model in models {
        for metric in Metric::ALL {
            let value = match metric {
                Metric::Aic => model.aic(),
                Metric::Bic => model.bic(),
                Metric::Ks => ks_statistic(&sorted, |x| model.cdf(x)),
            };
            scores.push(GoodnessOfFitScore {
                model,
                metric,
                value,
                lower_is_better: metric.lower_is_better(),
            });
        }
    }
    Ok(scores)
}

/// Pick the best model under `criterion`.
pub fn select_best<'a>(
    scores: &[GoodnessOfFitScore<'a>],
    criterion: Criterion,
) -> Result<&'a FittedModel, EngineError> {
    rank(scores, criterion)
        .into_iter()
        .next()
        .ok_or(EngineError::NoModelsToScore)
}

/// All models scored under `criterion`, best first.
///
/// The tie relation is not transitive, so ranking repeatedly extracts the
/// best remaining candidate rather than sorting.
pub fn rank<'a>(scores: &[GoodnessOfFitScore<'a>], criterion: Criterion) -> Vec<&'a FittedModel> {
    let metric = criterion.metric();
    let mut remaining: Vec<&GoodnessOfFitScore<'a>> =
        scores.iter().filter(|s| s.metric == metric).collect();

    let mut ranked = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let mut best = 0;
        for i in 1..remaining.len() {
            if compare(remaining[i], remaining[best]) == Ordering::Less {
                best = i;
            }
        }
        ranked.push(remaining.swap_remove(best).model);
    }
    ranked
}

/// `Less` means `a` is preferred over `b`.
fn compare(a: &GoodnessOfFitScore<'_>, b: &GoodnessOfFitScore<'_>) -> Ordering {
    let scale = 1.0f64.max(a.value.abs()).max(b.value.abs());
    if (a.value - b.value).abs() > TIE_TOLERANCE * scale {
        let by_value = a.value.total_cmp(&b.value);
        return if a.lower_is_better {
            by_value
        } else {
            by_value.reverse()
        };
    }
    a.model
        .param_count()
        .cmp(&b.model.param_count())
        .then(a.model.family().cmp(&b.model.family()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_sample;
    use crate::domain::{DistributionFamily, FitOptions};
    use crate::fit::fit;
    use approx::assert_relative_eq;

    fn model(family: DistributionFamily, params: Vec<f64>, ll: f64) -> FittedModel {
        FittedModel::new(family, params, ll, 30).unwrap()
    }

    fn sample() -> Sample {
        Sample::new(vec![1.2, 1.5, 1.1, 1.8, 1.3, 2.0, 1.4]).unwrap()
    }

    #[test]
    fn empty_model_list_cannot_be_scored() {
        assert_eq!(score(&[], &sample()).unwrap_err(), EngineError::NoModelsToScore);
        assert_eq!(
            select_best(&[], Criterion::Aic).unwrap_err(),
            EngineError::NoModelsToScore
        );
    }

    #[test]
    fn scores_cover_every_metric_in_model_order() {
        let models = vec![
            model(DistributionFamily::Normal, vec![1.47, 0.3], -1.5),
            model(DistributionFamily::Gumbel, vec![1.3, 0.25], -1.2),
        ];
        let scores = score(&models, &sample()).unwrap();
        assert_eq!(scores.len(), 6);
        assert_eq!(scores[0].metric, Metric::Aic);
        assert_eq!(scores[2].metric, Metric::Ks);
        assert_eq!(scores[3].model.family(), DistributionFamily::Gumbel);
        assert_relative_eq!(scores[0].value, 2.0 * 2.0 + 3.0);
        assert!(scores.iter().all(|s| s.lower_is_better));
        assert!(scores[2].value > 0.0 && scores[2].value < 1.0);
    }

    #[test]
    fn lower_criterion_wins() {
        let models = vec![
            model(DistributionFamily::Normal, vec![0.0, 1.0], -12.0),
            model(DistributionFamily::Gumbel, vec![0.0, 1.0], -10.0),
        ];
        let scores = score(&models, &sample()).unwrap();
        let best = select_best(&scores, Criterion::Aic).unwrap();
        assert_eq!(best.family(), DistributionFamily::Gumbel);
    }

    #[test]
    fn ties_prefer_fewer_parameters_then_declaration_order() {
        // AIC: Exponential 2·1 + 20 = 22; Normal 2·2 + 18 = 22; Gumbel 22.
        let models = vec![
            model(DistributionFamily::Gumbel, vec![0.0, 1.0], -9.0),
            model(DistributionFamily::Normal, vec![0.0, 1.0], -9.0),
            model(DistributionFamily::Exponential, vec![1.0], -10.0),
        ];
        let scores = score(&models, &sample()).unwrap();
        let ranked: Vec<_> = rank(&scores, Criterion::Aic)
            .into_iter()
            .map(FittedModel::family)
            .collect();
        assert_eq!(
            ranked,
            vec![
                DistributionFamily::Exponential,
                DistributionFamily::Normal,
                DistributionFamily::Gumbel
            ]
        );
    }

    #[test]
    fn bic_penalises_extra_parameters_more() {
        // n = 30: ln 30 ≈ 3.40 per parameter.
        let models = vec![
            model(DistributionFamily::Gumbel, vec![0.0, 1.0], -10.0),
            model(DistributionFamily::Gev, vec![0.0, 1.0, 0.1], -8.5),
        ];
        let scores = score(&models, &sample()).unwrap();
        assert_eq!(select_best(&scores, Criterion::Aic).unwrap().family(), DistributionFamily::Gev);
        assert_eq!(select_best(&scores, Criterion::Bic).unwrap().family(), DistributionFamily::Gumbel);
    }

    #[test]
    fn lognormal_beats_normal_on_skewed_data() {
        let s = generate_sample(DistributionFamily::LogNormal, &[0.0, 0.8], 300, 42).unwrap();
        let opts = FitOptions::default();
        let models = vec![
            fit(&s, DistributionFamily::Normal, &opts).unwrap(),
            fit(&s, DistributionFamily::LogNormal, &opts).unwrap(),
        ];
        let scores = score(&models, &s).unwrap();
        assert!(models[1].aic() < models[0].aic());
        let best = select_best(&scores, Criterion::Aic).unwrap();
        assert_eq!(best.family(), DistributionFamily::LogNormal);
    }
}

use crate::codec::Table;
use crate::dispatch::{PredictError, Predictor};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;

/// A linear model artifact together with the feature scaling parameters
/// captured at training time. Artifacts are JSON documents named
/// `<selector>.json` under the model directory.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    /// Per-feature coefficients, in column order of the training frame.
    pub weights: Vec<f64>,
    pub intercept: f64,
    /// Per-feature means and scales of the fitted standard scaler.
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl LinearModel {
    /// Score one feature vector: standardize each feature, apply the
    /// decision function, and emit the predicted class as 1.0 or 0.0.
    fn score(&self, features: &[f64]) -> f64 {
        let mut acc = self.intercept;
        for (i, &x) in features.iter().enumerate() {
            acc += self.weights[i] * ((x - self.means[i]) / self.scales[i]);
        }
        if acc > 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

/// ModelSet holds every model artifact found under the model directory.
/// It's loaded once at startup and immutable thereafter; the table selector
/// of each call picks an artifact by file stem.
#[derive(Debug)]
pub struct ModelSet {
    models: HashMap<String, LinearModel>,
}

impl ModelSet {
    pub fn load(dir: &str) -> anyhow::Result<Self> {
        let mut models = HashMap::new();

        if !std::path::Path::new(dir).is_dir() {
            tracing::warn!(dir, "model directory not found, no artifacts loaded");
            return Ok(Self { models });
        }

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();

            let model: LinearModel = serde_json::from_slice(&std::fs::read(&path)?)
                .with_context(|| format!("parsing model artifact {}", path.display()))?;
            anyhow::ensure!(
                model.weights.len() == model.means.len()
                    && model.weights.len() == model.scales.len(),
                "model artifact {} has mismatched weight and scaler lengths",
                path.display(),
            );

            tracing::info!(model = %stem, features = model.weights.len(), "loaded model artifact");
            models.insert(stem, model);
        }
        Ok(Self { models })
    }

    pub fn get(&self, name: &str) -> Option<&LinearModel> {
        self.models.get(name)
    }
}

/// The analytic function bound into the dispatcher: resolve the model named
/// by the table selector, parse each data row as numeric features, and score
/// the rows in order. Feature engineering beyond standardization is the
/// host expression's responsibility.
pub struct ModelFunction {
    models: ModelSet,
}

impl ModelFunction {
    pub fn new(models: ModelSet) -> Self {
        Self { models }
    }
}

#[async_trait::async_trait]
impl Predictor for ModelFunction {
    async fn predict(&self, table: Table) -> Result<Vec<f64>, PredictError> {
        let model = self.models.get(&table.name).ok_or_else(|| {
            PredictError(anyhow::anyhow!(
                "no model artifact named {:?} is loaded",
                table.name
            ))
        })?;

        if table.columns.len() != model.weights.len() {
            return Err(PredictError(anyhow::anyhow!(
                "model {:?} expects {} feature columns but the table has {}",
                table.name,
                model.weights.len(),
                table.columns.len()
            )));
        }

        let mut results = Vec::with_capacity(table.rows.len());
        for (index, row) in table.rows.iter().enumerate() {
            let features = row
                .iter()
                .zip(&table.columns)
                .map(|(field, column)| {
                    field.trim().parse::<f64>().map_err(|_| {
                        PredictError(anyhow::anyhow!(
                            "row {index} column {column:?} holds non-numeric field {field:?}"
                        ))
                    })
                })
                .collect::<Result<Vec<f64>, PredictError>>()?;
            results.push(model.score(&features));
        }
        Ok(results)
    }
}

//! Trained classifiers exported to JSON.
//!
//! Each estimator is tagged by `model_type`:
//!
//! ```json
//! { "model_type": "logistic_regression", "coefficients": [0.4, -1.2], "intercept": 0.1 }
//! { "model_type": "linear_svm", "weights": [0.4, -1.2], "bias": 0.1 }
//! { "model_type": "decision_tree", "nodes": [
//!     { "feature": 0, "threshold": 12.5, "left": 1, "right": 2 },
//!     { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [30.0, 10.0] },
//!     { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [5.0, 15.0] }
//! ] }
//! { "model_type": "random_forest", "trees": [ { "nodes": [...] }, ... ] }
//! ```
//!
//! Estimators expose either class probabilities or a raw decision score.
//! [`Estimator::into_scorer`] wraps them in the matching [`Scorer`] adapter
//! so callers always get a probability in `[0, 1]`.

use serde::Deserialize;
use std::fmt::Debug;

use super::artifact::sigmoid;

/// Models that output the probability of the positive class
pub trait ProbabilisticClassifier: Debug + Send + Sync {
    fn predict_proba(&self, x: &[f64]) -> f64;
}

/// Models that output an unbounded margin
pub trait DecisionFunction: Debug + Send + Sync {
    fn decision_function(&self, x: &[f64]) -> f64;
}

/// Probability of a discount for one aligned feature vector
pub trait Scorer: Debug + Send + Sync {
    fn score(&self, x: &[f64]) -> f64;

    /// Which adapter is in use, for diagnostics
    fn kind(&self) -> &'static str;
}

/// Uses the classifier's own probability output
#[derive(Debug)]
pub struct ProbabilityScorer<M>(pub M);

impl<M: ProbabilisticClassifier> Scorer for ProbabilityScorer<M> {
    fn score(&self, x: &[f64]) -> f64 {
        self.0.predict_proba(x)
    }

    fn kind(&self) -> &'static str {
        "predict_proba"
    }
}

/// Maps a decision score into (0, 1) with the logistic function
#[derive(Debug)]
pub struct DecisionScoreScorer<M>(pub M);

impl<M: DecisionFunction> Scorer for DecisionScoreScorer<M> {
    fn score(&self, x: &[f64]) -> f64 {
        sigmoid(self.0.decision_function(x))
    }

    fn kind(&self) -> &'static str {
        "decision_function"
    }
}

/// sklearn exports either `[w...]` or `[[w...]]` for binary models
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Weights {
    Flat(Vec<f64>),
    Nested(Vec<Vec<f64>>),
}

impl Weights {
    fn into_flat(self) -> Result<Vec<f64>, String> {
        match self {
            Weights::Flat(w) => Ok(w),
            Weights::Nested(mut rows) if rows.len() == 1 => Ok(rows.remove(0)),
            Weights::Nested(rows) => Err(format!(
                "expected a single row of weights for a binary model, got {}",
                rows.len()
            )),
        }
    }
}

/// `b` or `[b]`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Bias {
    Scalar(f64),
    List(Vec<f64>),
}

impl Bias {
    fn into_scalar(self) -> Result<f64, String> {
        match self {
            Bias::Scalar(b) => Ok(b),
            Bias::List(v) if v.len() == 1 => Ok(v[0]),
            Bias::List(v) => Err(format!("expected one intercept, got {}", v.len())),
        }
    }
}

fn dot(weights: &[f64], x: &[f64]) -> f64 {
    weights.iter().zip(x).map(|(w, v)| w * v).sum()
}

#[derive(Debug, Clone, Deserialize)]
struct LinearJson {
    #[serde(alias = "weights")]
    coefficients: Weights,
    #[serde(alias = "bias")]
    intercept: Bias,
}

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl ProbabilisticClassifier for LogisticRegression {
    fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(dot(&self.coefficients, x) + self.intercept)
    }
}

/// Linear SVM: margin only, no probability output
#[derive(Debug, Clone)]
pub struct LinearSvm {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl DecisionFunction for LinearSvm {
    fn decision_function(&self, x: &[f64]) -> f64 {
        dot(&self.weights, x) + self.bias
    }
}

/// One node of a binary decision tree
#[derive(Debug, Clone, Deserialize)]
pub struct TreeNode {
    /// Split feature index, -1 for leaves
    pub feature: i32,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default = "no_child")]
    pub left: i32,
    #[serde(default = "no_child")]
    pub right: i32,
    /// Leaf class weights `[negative, positive]`, counts or probabilities
    #[serde(default)]
    pub value: Option<Vec<f64>>,
}

fn no_child() -> i32 {
    -1
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.feature < 0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("decision tree has no nodes".to_string());
        }
        let n_nodes = self.nodes.len() as i32;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match &node.value {
                    Some(v) if v.len() == 2 => {}
                    _ => return Err(format!("leaf {} must carry two class values", i)),
                }
                continue;
            }
            if node.feature as usize >= n_features {
                return Err(format!(
                    "node {} splits on feature {} but only {} features are declared",
                    i, node.feature, n_features
                ));
            }
            for child in [node.left, node.right] {
                // Children must come after their parent, which also rules out cycles
                if child <= i as i32 || child >= n_nodes {
                    return Err(format!("node {} has invalid child index {}", i, child));
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, x: &[f64]) -> Option<&[f64]> {
        let mut idx = 0usize;
        loop {
            let node = self.nodes.get(idx)?;
            if node.is_leaf() {
                return node.value.as_deref();
            }
            let v = x.get(node.feature as usize).copied().unwrap_or(f64::NAN);
            // NaN goes left
            idx = if v.is_nan() || v <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

impl ProbabilisticClassifier for DecisionTree {
    fn predict_proba(&self, x: &[f64]) -> f64 {
        match self.leaf_value(x) {
            Some([neg, pos]) if neg + pos > 0.0 => pos / (neg + pos),
            _ => 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
}

impl ProbabilisticClassifier for RandomForest {
    fn predict_proba(&self, x: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let total: f64 = self.trees.iter().map(|t| t.predict_proba(x)).sum();
        total / self.trees.len() as f64
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
enum EstimatorJson {
    #[serde(alias = "logistic", alias = "linear_model")]
    LogisticRegression(LinearJson),
    #[serde(alias = "svm_linear", alias = "linear_svc")]
    LinearSvm(LinearJson),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

/// A classifier decoded from an artifact
#[derive(Debug, Clone)]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    LinearSvm(LinearSvm),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl Estimator {
    /// Decode a classifier object
    pub fn from_value(value: serde_json::Value) -> Result<Self, String> {
        let raw: EstimatorJson =
            serde_json::from_value(value).map_err(|e| format!("invalid classifier: {}", e))?;
        Ok(match raw {
            EstimatorJson::LogisticRegression(l) => Estimator::LogisticRegression(LogisticRegression {
                coefficients: l.coefficients.into_flat()?,
                intercept: l.intercept.into_scalar()?,
            }),
            EstimatorJson::LinearSvm(l) => Estimator::LinearSvm(LinearSvm {
                weights: l.coefficients.into_flat()?,
                bias: l.intercept.into_scalar()?,
            }),
            EstimatorJson::DecisionTree(t) => Estimator::DecisionTree(t),
            EstimatorJson::RandomForest(f) => Estimator::RandomForest(f),
        })
    }

    pub fn model_type(&self) -> &'static str {
        match self {
            Estimator::LogisticRegression(_) => "logistic_regression",
            Estimator::LinearSvm(_) => "linear_svm",
            Estimator::DecisionTree(_) => "decision_tree",
            Estimator::RandomForest(_) => "random_forest",
        }
    }

    /// Check the classifier against the declared feature count
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        let check_len = |len: usize| {
            if len == n_features {
                Ok(())
            } else {
                Err(format!(
                    "{} has {} weights but {} features are declared",
                    self.model_type(),
                    len,
                    n_features
                ))
            }
        };
        match self {
            Estimator::LogisticRegression(m) => check_len(m.coefficients.len()),
            Estimator::LinearSvm(m) => check_len(m.weights.len()),
            Estimator::DecisionTree(t) => t.validate(n_features),
            Estimator::RandomForest(f) => {
                if f.trees.is_empty() {
                    return Err("random forest has no trees".to_string());
                }
                f.trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, t)| t.validate(n_features).map_err(|e| format!("tree {}: {}", i, e)))
            }
        }
    }

    /// Wrap in the adapter that matches the classifier's capability
    pub fn into_scorer(self) -> Box<dyn Scorer> {
        match self {
            Estimator::LogisticRegression(m) => Box::new(ProbabilityScorer(m)),
            Estimator::DecisionTree(m) => Box::new(ProbabilityScorer(m)),
            Estimator::RandomForest(m) => Box::new(ProbabilityScorer(m)),
            Estimator::LinearSvm(m) => Box::new(DecisionScoreScorer(m)),
        }
    }
}

//! Input containers produced by the upstream extraction stage
//!
//! Two containers feed the pipeline:
//!
//! - [`AggregatedFeatures`]: one pooled activation vector per role, loaded from
//!   a single JSON file and validated into a [`RoleFeatureMatrix`].
//! - Per-role raw containers ([`RawRoleContainer`]): one JSON file per role
//!   holding every response's pooled activations for each pooling strategy.
//!   They are accessed through [`RawResponseSource`] so roles can be streamed
//!   one at a time.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use atlas_stats::{descriptive, matrix::Matrix};
use serde::{Deserialize, Serialize};

use crate::{config::Strategy, error::DataIntegrityError};

/// Serialized form of the aggregated role x feature container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedFeatures {
    /// `n_roles` rows of `feature_width` values.
    pub features: Vec<Vec<f32>>,
    pub role_names: Vec<String>,
}

/// Validated role x feature activation matrix.
///
/// Rows are roles (unique names), columns are feature indices.
#[derive(Debug, Clone)]
pub struct RoleFeatureMatrix {
    role_names: Vec<String>,
    values: Matrix,
}

impl RoleFeatureMatrix {
    /// Validates and wraps a matrix with its role names.
    pub fn new(role_names: Vec<String>, values: Matrix) -> Result<Self, DataIntegrityError> {
        if role_names.is_empty() {
            return Err(DataIntegrityError::NoRoles);
        }
        if values.rows() != role_names.len() {
            return Err(DataIntegrityError::RoleCountMismatch {
                rows: values.rows(),
                names: role_names.len(),
            });
        }
        if values.cols() == 0 {
            return Err(DataIntegrityError::ZeroWidth);
        }
        let mut seen = HashSet::new();
        for name in &role_names {
            if !seen.insert(name.as_str()) {
                return Err(DataIntegrityError::DuplicateRole { role: name.clone() });
            }
        }
        for (name, row) in role_names.iter().zip(values.iter_rows()) {
            if let Some(feature) = row.iter().position(|v| !v.is_finite()) {
                return Err(DataIntegrityError::NonFiniteValue {
                    role: name.clone(),
                    feature,
                });
            }
        }
        Ok(Self { role_names, values })
    }

    #[must_use]
    pub fn role_names(&self) -> &[String] {
        &self.role_names
    }

    #[must_use]
    pub fn values(&self) -> &Matrix {
        &self.values
    }

    #[must_use]
    pub fn n_roles(&self) -> usize {
        self.values.rows()
    }

    #[must_use]
    pub fn feature_width(&self) -> usize {
        self.values.cols()
    }
}

impl TryFrom<AggregatedFeatures> for RoleFeatureMatrix {
    type Error = DataIntegrityError;

    fn try_from(value: AggregatedFeatures) -> Result<Self, Self::Error> {
        let AggregatedFeatures {
            features,
            role_names,
        } = value;
        let values = Matrix::from_rows(&features).ok_or(DataIntegrityError::RaggedMatrix)?;
        Self::new(role_names, values)
    }
}

/// Serialized per-role raw container: one response matrix per pooling strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRoleContainer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_features: Option<Vec<Vec<f32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_features: Option<Vec<Vec<f32>>>,
}

impl RawRoleContainer {
    /// Converts the responses for `strategy` into a matrix.
    ///
    /// Fails if the strategy key is absent or the rows are ragged.
    pub fn into_response_matrix(
        self,
        role: &str,
        strategy: Strategy,
    ) -> Result<Matrix, DataIntegrityError> {
        let rows = match strategy {
            Strategy::Mean => self.mean_features,
            Strategy::Max => self.max_features,
        }
        .ok_or_else(|| DataIntegrityError::MissingStrategyKey {
            role: role.to_owned(),
            key: strategy.container_key(),
        })?;
        Matrix::from_rows(&rows).ok_or_else(|| DataIntegrityError::RaggedResponses {
            role: role.to_owned(),
        })
    }
}

/// Source of per-role raw response matrices (`n_responses x feature_width`).
pub trait RawResponseSource {
    /// Loads the response matrix of one role.
    fn load_responses(&self, role: &str) -> Result<Matrix, DataIntegrityError>;
}

/// Per-role raw containers stored as `<dir>/<role>.json`.
#[derive(Debug, Clone)]
pub struct RawResponseDir {
    dir: PathBuf,
    strategy: Strategy,
}

impl RawResponseDir {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, strategy: Strategy) -> Self {
        Self {
            dir: dir.into(),
            strategy,
        }
    }

    #[must_use]
    pub fn role_path(&self, role: &str) -> PathBuf {
        self.dir.join(format!("{role}.json"))
    }
}

impl RawResponseSource for RawResponseDir {
    fn load_responses(&self, role: &str) -> Result<Matrix, DataIntegrityError> {
        let path = self.role_path(role);
        let container = read_role_container(role, &path)?;
        container.into_response_matrix(role, self.strategy)
    }
}

/// In-memory response matrices keyed by role name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResponses {
    roles: HashMap<String, Matrix>,
}

impl InMemoryResponses {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: impl Into<String>, responses: Matrix) {
        self.roles.insert(role.into(), responses);
    }
}

impl FromIterator<(String, Matrix)> for InMemoryResponses {
    fn from_iter<T: IntoIterator<Item = (String, Matrix)>>(iter: T) -> Self {
        Self {
            roles: iter.into_iter().collect(),
        }
    }
}

impl RawResponseSource for InMemoryResponses {
    fn load_responses(&self, role: &str) -> Result<Matrix, DataIntegrityError> {
        self.roles
            .get(role)
            .cloned()
            .ok_or_else(|| DataIntegrityError::MissingRoleFile {
                role: role.to_owned(),
                path: PathBuf::from(format!("<memory>/{role}")),
            })
    }
}

/// Reads one per-role raw container file.
pub fn read_role_container(role: &str, path: &Path) -> Result<RawRoleContainer, DataIntegrityError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DataIntegrityError::MissingRoleFile {
                role: role.to_owned(),
                path: path.to_owned(),
            }
        } else {
            DataIntegrityError::ReadRoleFile {
                role: role.to_owned(),
                path: path.to_owned(),
                source,
            }
        }
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        DataIntegrityError::ParseRoleFile {
            role: role.to_owned(),
            path: path.to_owned(),
            source,
        }
    })
}

/// Pools one role's response matrix into a single role vector.
///
/// `Mean` takes the column mean, `Max` the column maximum. Returns `None` if
/// the matrix has no responses.
#[must_use]
pub fn pool_responses(responses: &Matrix, strategy: Strategy) -> Option<Vec<f32>> {
    if responses.rows() == 0 {
        return None;
    }
    let pooled = match strategy {
        Strategy::Mean => descriptive::column_means(responses),
        Strategy::Max => {
            let mut max = responses.row(0).to_vec();
            for row in responses.iter_rows().skip(1) {
                for (m, &v) in max.iter_mut().zip(row) {
                    *m = m.max(v);
                }
            }
            max
        }
    };
    Some(pooled)
}

/// Builds the aggregated container from role response matrices.
///
/// Roles are emitted in key order of `roles`. Roles without responses are
/// skipped.
pub fn aggregate_roles(
    roles: &BTreeMap<String, Matrix>,
    strategy: Strategy,
) -> Result<AggregatedFeatures, DataIntegrityError> {
    let mut width = None;
    let mut aggregated = AggregatedFeatures::default();
    for (role, responses) in roles {
        let Some(vector) = pool_responses(responses, strategy) else {
            continue;
        };
        let expected = *width.get_or_insert(vector.len());
        if vector.len() != expected {
            return Err(DataIntegrityError::WidthMismatch {
                role: role.clone(),
                expected,
                actual: vector.len(),
            });
        }
        aggregated.role_names.push(role.clone());
        aggregated.features.push(vector);
    }
    if aggregated.role_names.is_empty() {
        return Err(DataIntegrityError::NoRoles);
    }
    Ok(aggregated)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "atlas-input-{label}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_role_matrix_validation() {
        let ok = AggregatedFeatures {
            features: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            role_names: vec!["a".into(), "b".into()],
        };
        let m = RoleFeatureMatrix::try_from(ok).unwrap();
        assert_eq!(m.n_roles(), 2);
        assert_eq!(m.feature_width(), 2);

        let ragged = AggregatedFeatures {
            features: vec![vec![1.0, 2.0], vec![3.0]],
            role_names: vec!["a".into(), "b".into()],
        };
        assert!(matches!(
            RoleFeatureMatrix::try_from(ragged),
            Err(DataIntegrityError::RaggedMatrix)
        ));

        let dup = AggregatedFeatures {
            features: vec![vec![1.0], vec![3.0]],
            role_names: vec!["a".into(), "a".into()],
        };
        assert!(matches!(
            RoleFeatureMatrix::try_from(dup),
            Err(DataIntegrityError::DuplicateRole { .. })
        ));

        assert!(matches!(
            RoleFeatureMatrix::try_from(AggregatedFeatures::default()),
            Err(DataIntegrityError::NoRoles)
        ));
    }

    #[test]
    fn test_overflowing_aggregated_value_is_rejected() {
        // 1e39 is valid JSON but overflows f32 to infinity.
        let aggregated: AggregatedFeatures = serde_json::from_str(
            r#"{"features": [[1.0, 2.0, 3.0], [1e39, 1.0, 2.0]], "role_names": ["a", "b"]}"#,
        )
        .unwrap();
        assert!(aggregated.features[1][0].is_infinite());
        assert!(matches!(
            RoleFeatureMatrix::try_from(aggregated),
            Err(DataIntegrityError::NonFiniteValue { ref role, feature: 0 }) if role == "b"
        ));
    }

    #[test]
    fn test_pool_responses() {
        let r = Matrix::from_rows(&[vec![1.0, 4.0], vec![3.0, 0.0]]).unwrap();
        assert_eq!(pool_responses(&r, Strategy::Mean), Some(vec![2.0, 2.0]));
        assert_eq!(pool_responses(&r, Strategy::Max), Some(vec![3.0, 4.0]));
        assert_eq!(pool_responses(&Matrix::zeros(0, 2), Strategy::Max), None);
    }

    #[test]
    fn test_aggregate_roles_sorted_and_width_checked() {
        let mut roles = BTreeMap::new();
        roles.insert("zeta".to_owned(), Matrix::from_rows(&[vec![1.0, 1.0]]).unwrap());
        roles.insert("alpha".to_owned(), Matrix::from_rows(&[vec![2.0, 0.0]]).unwrap());
        let agg = aggregate_roles(&roles, Strategy::Mean).unwrap();
        assert_eq!(agg.role_names, vec!["alpha", "zeta"]);
        assert_eq!(agg.features[0], vec![2.0, 0.0]);

        roles.insert("beta".to_owned(), Matrix::from_rows(&[vec![2.0]]).unwrap());
        assert!(matches!(
            aggregate_roles(&roles, Strategy::Mean),
            Err(DataIntegrityError::WidthMismatch { .. })
        ));
    }

    #[test]
    fn test_raw_response_dir_reads_strategy_key() {
        let dir = temp_dir("dir");
        fs::write(
            dir.join("pirate.json"),
            r#"{"mean_features": [[1.0, 2.0], [3.0, 4.0]], "max_features": [[5.0, 6.0]]}"#,
        )
        .unwrap();
        fs::write(dir.join("sage.json"), r#"{"max_features": [[1.0]]}"#).unwrap();

        let source = RawResponseDir::new(&dir, Strategy::Mean);
        let m = source.load_responses("pirate").unwrap();
        assert_eq!(m.shape(), (2, 2));

        assert!(matches!(
            source.load_responses("sage"),
            Err(DataIntegrityError::MissingStrategyKey { .. })
        ));
        assert!(matches!(
            source.load_responses("ghost"),
            Err(DataIntegrityError::MissingRoleFile { .. })
        ));

        let _ = fs::remove_dir_all(dir);
    }
}

//! CSV loading, mean imputation and standard scaling using Polars

use std::path::Path;

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use polars::prelude::*;

/// Numeric feature table ready for clustering
#[derive(Debug)]
pub struct FeatureTable {
    /// Names of the numeric columns kept, in matrix column order
    pub columns: Vec<String>,
    /// Imputed values before scaling, shape (n_samples, n_features)
    pub raw_features: Array2<f64>,
    /// Standard-scaled features
    pub features: Array2<f64>,
    /// Scaler fitted on `raw_features`
    pub scaler: StandardScaler,
}

/// Per-column standardization to zero mean and unit variance
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    /// Population standard deviation; constant columns use 1.0
    pub scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(features: &Array2<f64>) -> crate::Result<Self> {
        let mean = features
            .mean_axis(Axis(0))
            .ok_or_else(|| anyhow::anyhow!("Cannot fit a scaler on zero rows"))?;
        let scale = features
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std > 0.0 { std } else { 1.0 });

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, features: ArrayView2<'_, f64>) -> crate::Result<Array2<f64>> {
        if features.ncols() != self.mean.len() {
            anyhow::bail!(
                "Scaler was fitted on {} features, got {}",
                self.mean.len(),
                features.ncols()
            );
        }

        Ok((&features - &self.mean) / &self.scale)
    }
}

/// Load a CSV file, keep its numeric columns, impute and scale them.
///
/// Columns without a single observed value are dropped. Missing or
/// non-finite entries are replaced by the column mean.
pub fn load_feature_table(file_path: impl AsRef<Path>) -> crate::Result<FeatureTable> {
    let file_path = file_path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
        .finish()?;

    if df.height() == 0 {
        anyhow::bail!("No rows found in {}", file_path.display());
    }

    let (columns, values) = numeric_columns(&df)?;
    if columns.is_empty() {
        anyhow::bail!("No numeric columns found in {}", file_path.display());
    }
    info!(
        "Loaded {} rows, {} numeric columns from {}",
        df.height(),
        columns.len(),
        file_path.display()
    );

    let raw_features = Array2::from_shape_fn((df.height(), values.len()), |(row, col)| values[col][row]);
    let scaler = StandardScaler::fit(&raw_features)?;
    let features = scaler.transform(raw_features.view())?;

    Ok(FeatureTable {
        columns,
        raw_features,
        features,
        scaler,
    })
}

/// Mean-imputed values of every numeric column that has at least one observation
fn numeric_columns(df: &DataFrame) -> crate::Result<(Vec<String>, Vec<Vec<f64>>)> {
    let mut names = Vec::new();
    let mut values = Vec::new();

    for series in df.get_columns() {
        if !series.dtype().is_numeric() {
            debug!("Skipping non-numeric column {}", series.name());
            continue;
        }

        let cast = series.cast(&DataType::Float64)?;
        let observed: Vec<Option<f64>> = cast
            .f64()?
            .into_iter()
            .map(|value| value.filter(|v| v.is_finite()))
            .collect();

        match impute_mean(&observed) {
            Some(column) => {
                names.push(series.name().to_string());
                values.push(column);
            }
            None => debug!("Dropping column {} with no observed values", series.name()),
        }
    }

    Ok((names, values))
}

/// Replace missing entries with the mean of the observed ones; `None` if nothing was observed.
fn impute_mean(column: &[Option<f64>]) -> Option<Vec<f64>> {
    let observed: Vec<f64> = column.iter().flatten().copied().collect();
    if observed.is_empty() {
        return None;
    }

    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    Some(column.iter().map(|value| value.unwrap_or(mean)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "CustomerID,Region,MonthlyMinutes,Revenue,Churn").unwrap();
        writeln!(file, "1001,North,300.0,45.5,").unwrap();
        writeln!(file, "1002,South,,60.0,").unwrap();
        writeln!(file, "1003,North,500.0,30.5,").unwrap();
        writeln!(file, "1004,East,100.0,12.0,").unwrap();
        file
    }

    #[test]
    fn test_load_feature_table() {
        let test_file = create_test_csv();
        let table = load_feature_table(test_file.path()).unwrap();

        assert_eq!(table.columns, vec!["CustomerID", "MonthlyMinutes", "Revenue"]);
        assert_eq!(table.features.shape(), &[4, 3]);
        // Missing minutes imputed with the mean of 300, 500, 100
        assert_abs_diff_eq!(table.raw_features[[1, 1]], 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_scaled_columns_are_standardized() {
        let test_file = create_test_csv();
        let table = load_feature_table(test_file.path()).unwrap();

        for column in table.features.axis_iter(Axis(1)) {
            assert_abs_diff_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(column.std(0.0), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_missing_file() {
        assert!(load_feature_table("does/not/exist.csv").is_err());
    }

    #[test]
    fn test_scaler_constant_column() {
        let raw = array![[1.0, 5.0], [3.0, 5.0]];
        let scaler = StandardScaler::fit(&raw).unwrap();
        let scaled = scaler.transform(raw.view()).unwrap();

        assert_eq!(scaled, array![[-1.0, 0.0], [1.0, 0.0]]);
        assert!(scaler.transform(array![[1.0]].view()).is_err());
    }

    #[test]
    fn test_impute_mean() {
        assert_eq!(impute_mean(&[Some(1.0), None, Some(3.0)]), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(impute_mean(&[None, None]), None);
    }
}

//! Common types used throughout the Caduceus workspace.
//!
//! Two containers carry all time-indexed data:
//!
//! - [`TimeSeries`]: one value per date (macro inputs, regime labels, returns).
//! - [`Panel`]: a date × ticker matrix (prices, weights, volatilities,
//!   monthly feature tables).
//!
//! Both require a strictly increasing date index. Missing values are `NaN`.
//! Every transform returns a new container; inputs are never modified.

use ndarray::{Array2, ArrayView1};
use polars::prelude::*;
use serde::Serialize;

use crate::calendar::{date_from_epoch_days, date_to_epoch_days, month_end, month_ends_between};
use crate::{CaduceusError, Result};

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// A ticker identifier such as `"XBI"` or `"XLV"`.
pub type Ticker = String;

/// Daily adjusted closing prices, one column per ticker.
pub type PricePanel = Panel;

/// Target portfolio weights with the same shape as the matching [`PricePanel`].
pub type WeightSchedule = Panel;

fn ensure_strictly_increasing(index: &[Date]) -> Result<()> {
    if let Some(pair) = index.windows(2).find(|w| w[0] >= w[1]) {
        return Err(CaduceusError::InvalidData(format!(
            "date index must be strictly increasing, found {} followed by {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

/// Position of the last entry of `index` that is `<= date`.
fn asof_position(index: &[Date], date: Date) -> Option<usize> {
    index.partition_point(|d| *d <= date).checked_sub(1)
}

/// A single date-indexed series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries<T = f64> {
    index: Vec<Date>,
    values: Vec<T>,
}

impl<T> TimeSeries<T> {
    /// Creates a series from a strictly increasing index and matching values.
    ///
    /// # Errors
    ///
    /// Fails if the lengths differ or the index is not strictly increasing.
    pub fn new(index: Vec<Date>, values: Vec<T>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(CaduceusError::InvalidData(format!(
                "series index has {} dates but {} values",
                index.len(),
                values.len()
            )));
        }
        ensure_strictly_increasing(&index)?;
        Ok(Self { index, values })
    }

    /// An empty series.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            index: Vec::new(),
            values: Vec::new(),
        }
    }

    /// The date index.
    #[must_use]
    pub fn index(&self) -> &[Date] {
        &self.index
    }

    /// The values, aligned with [`Self::index`].
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(date, value)` pairs in date order.
    pub fn iter(&self) -> impl Iterator<Item = (Date, &T)> + '_ {
        self.index.iter().copied().zip(self.values.iter())
    }

    /// The value stamped exactly at `date`.
    #[must_use]
    pub fn get(&self, date: Date) -> Option<&T> {
        self.index
            .binary_search(&date)
            .ok()
            .map(|pos| &self.values[pos])
    }

    /// The latest value stamped at or before `date`.
    #[must_use]
    pub fn asof(&self, date: Date) -> Option<&T> {
        asof_position(&self.index, date).map(|pos| &self.values[pos])
    }

    /// Keeps the observations whose date satisfies `keep`.
    #[must_use]
    pub fn filter_dates(&self, mut keep: impl FnMut(Date) -> bool) -> Self
    where
        T: Clone,
    {
        let (index, values) = self
            .iter()
            .filter(|(d, _)| keep(*d))
            .map(|(d, v)| (d, v.clone()))
            .unzip();
        Self { index, values }
    }

    /// Applies `f` to every value, keeping the index.
    #[must_use]
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> TimeSeries<U> {
        TimeSeries {
            index: self.index.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }
}

impl TimeSeries<f64> {
    /// Buckets by calendar month-end keeping the last finite observation.
    #[must_use]
    pub fn resample_month_end_last(&self) -> Self {
        self.resample_month_end(|bucket| bucket.last().copied().unwrap_or(f64::NAN))
    }

    /// Buckets by calendar month-end taking the mean of finite observations.
    #[must_use]
    pub fn resample_month_end_mean(&self) -> Self {
        self.resample_month_end(|bucket| crate::stats::mean(bucket))
    }

    fn resample_month_end(&self, reduce: impl Fn(&[f64]) -> f64) -> Self {
        let (Some(&first), Some(&last)) = (self.index.first(), self.index.last()) else {
            return Self::empty();
        };
        let buckets = month_ends_between(first, last);
        let mut grouped: Vec<Vec<f64>> = vec![Vec::new(); buckets.len()];
        let mut bucket = 0;
        for (date, &value) in self.iter() {
            let end = month_end(date);
            while buckets[bucket] < end {
                bucket += 1;
            }
            if value.is_finite() {
                grouped[bucket].push(value);
            }
        }
        let values = grouped.iter().map(|g| reduce(g)).collect();
        Self {
            index: buckets,
            values,
        }
    }

    /// Shifts values forward by `periods` observations, filling the head with NaN.
    #[must_use]
    pub fn shift(&self, periods: usize) -> Self {
        let n = self.len();
        let values = (0..n)
            .map(|i| {
                if i >= periods {
                    self.values[i - periods]
                } else {
                    f64::NAN
                }
            })
            .collect();
        Self {
            index: self.index.clone(),
            values,
        }
    }

    /// `x[t] - x[t - periods]`.
    #[must_use]
    pub fn diff(&self, periods: usize) -> Self {
        let lagged = self.shift(periods);
        self.zip_with(&lagged, |now, then| now - then)
    }

    /// `x[t] / x[t - periods] - 1`.
    #[must_use]
    pub fn pct_change(&self, periods: usize) -> Self {
        let lagged = self.shift(periods);
        self.zip_with(&lagged, |now, then| now / then - 1.0)
    }

    /// Rolling mean over `window` observations; NaN unless all of them are finite.
    #[must_use]
    pub fn rolling_mean(&self, window: usize) -> Self {
        let values = (0..self.len())
            .map(|i| {
                if window == 0 || i + 1 < window {
                    return f64::NAN;
                }
                let slice = &self.values[i + 1 - window..=i];
                if slice.iter().all(|x| x.is_finite()) {
                    slice.iter().sum::<f64>() / window as f64
                } else {
                    f64::NAN
                }
            })
            .collect();
        Self {
            index: self.index.clone(),
            values,
        }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self {
            index: self.index.clone(),
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }
}

/// A date-indexed matrix with one named column per ticker (or feature).
///
/// Rows are dates, columns are labels. The index is strictly increasing and
/// the labels are unique; both are checked on construction.
///
/// # Example
///
/// ```
/// use caduceus_traits::{Date, Panel};
///
/// let dates = vec![
///     Date::from_ymd_opt(2020, 1, 2).unwrap(),
///     Date::from_ymd_opt(2020, 1, 3).unwrap(),
/// ];
/// let prices = Panel::from_columns(
///     dates,
///     vec![("XBI".to_string(), vec![100.0, 101.0]), ("XPH".to_string(), vec![50.0, 49.5])],
/// )
/// .unwrap();
/// assert_eq!(prices.n_cols(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    index: Vec<Date>,
    columns: Vec<Ticker>,
    values: Array2<f64>,
}

impl Panel {
    /// Creates a panel from its parts.
    ///
    /// # Errors
    ///
    /// Fails if the matrix shape does not match the index and columns, the
    /// index is not strictly increasing, or a column label repeats.
    pub fn new(index: Vec<Date>, columns: Vec<Ticker>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (index.len(), columns.len()) {
            return Err(CaduceusError::InvalidData(format!(
                "panel values have shape {:?}, expected ({}, {})",
                values.dim(),
                index.len(),
                columns.len()
            )));
        }
        ensure_strictly_increasing(&index)?;
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(CaduceusError::InvalidData(format!(
                    "duplicate column label '{name}'"
                )));
            }
        }
        Ok(Self {
            index,
            columns,
            values,
        })
    }

    /// A panel with every cell set to `value`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::new`].
    pub fn filled(index: Vec<Date>, columns: Vec<Ticker>, value: f64) -> Result<Self> {
        let values = Array2::from_elem((index.len(), columns.len()), value);
        Self::new(index, columns, values)
    }

    /// Builds a panel from named columns of equal length.
    ///
    /// # Errors
    ///
    /// Fails if a column's length differs from the index, or as [`Self::new`].
    pub fn from_columns(index: Vec<Date>, columns: Vec<(Ticker, Vec<f64>)>) -> Result<Self> {
        let n_rows = index.len();
        if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != n_rows) {
            return Err(CaduceusError::InvalidData(format!(
                "column '{name}' has {} values, expected {n_rows}",
                col.len()
            )));
        }
        let values = Array2::from_shape_fn((n_rows, columns.len()), |(i, j)| columns[j].1[i]);
        let labels = columns.into_iter().map(|(name, _)| name).collect();
        Self::new(index, labels, values)
    }

    /// The date index.
    #[must_use]
    pub fn index(&self) -> &[Date] {
        &self.index
    }

    /// The column labels, in order.
    #[must_use]
    pub fn columns(&self) -> &[Ticker] {
        &self.columns
    }

    /// The underlying matrix (rows = dates).
    #[must_use]
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of dates.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Whether the panel has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Position of a column label.
    #[must_use]
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether a column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_position(name).is_some()
    }

    /// A view of one column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_position(name).map(|j| self.values.column(j))
    }

    /// One column as a [`TimeSeries`].
    ///
    /// # Errors
    ///
    /// Returns [`CaduceusError::MissingColumn`] if the label is absent.
    pub fn column_series(&self, name: &str) -> Result<TimeSeries<f64>> {
        let col = self
            .column(name)
            .ok_or_else(|| CaduceusError::MissingColumn(name.to_string()))?;
        Ok(TimeSeries {
            index: self.index.clone(),
            values: col.to_vec(),
        })
    }

    /// A view of one row.
    #[must_use]
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }

    /// The cell at `(row, col)`.
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[[row, col]]
    }

    /// Position of the last row dated at or before `date`.
    #[must_use]
    pub fn asof_position(&self, date: Date) -> Option<usize> {
        asof_position(&self.index, date)
    }

    /// Position of the row dated exactly `date`.
    #[must_use]
    pub fn position(&self, date: Date) -> Option<usize> {
        self.index.binary_search(&date).ok()
    }

    /// Returns a panel restricted to `names`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`CaduceusError::MissingColumn`] for the first absent label.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let positions = names
            .iter()
            .map(|n| {
                self.column_position(n.as_ref())
                    .ok_or_else(|| CaduceusError::MissingColumn(n.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let values = Array2::from_shape_fn((self.n_rows(), positions.len()), |(i, k)| {
            self.values[[i, positions[k]]]
        });
        Self::new(
            self.index.clone(),
            names.iter().map(|n| n.as_ref().to_string()).collect(),
            values,
        )
    }

    /// Keeps the rows whose date satisfies `keep`.
    #[must_use]
    pub fn filter_rows(&self, mut keep: impl FnMut(Date) -> bool) -> Self {
        let rows: Vec<usize> = (0..self.n_rows()).filter(|&i| keep(self.index[i])).collect();
        let values = Array2::from_shape_fn((rows.len(), self.n_cols()), |(r, j)| {
            self.values[[rows[r], j]]
        });
        Self {
            index: rows.iter().map(|&i| self.index[i]).collect(),
            columns: self.columns.clone(),
            values,
        }
    }

    /// Drops every row that holds a missing value in any column.
    #[must_use]
    pub fn drop_incomplete_rows(&self) -> Self {
        let complete: Vec<bool> = (0..self.n_rows())
            .map(|i| self.values.row(i).iter().all(|v| v.is_finite()))
            .collect();
        let mut row = 0;
        self.filter_rows(|_| {
            let keep = complete[row];
            row += 1;
            keep
        })
    }

    /// Replaces NaN cells with `value`.
    #[must_use]
    pub fn fill_nan(&self, value: f64) -> Self {
        Self {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values: self.values.mapv(|v| if v.is_nan() { value } else { v }),
        }
    }

    /// Shifts every column forward by `periods` rows, filling the head with NaN.
    #[must_use]
    pub fn shift(&self, periods: usize) -> Self {
        let values = Array2::from_shape_fn(self.values.dim(), |(i, j)| {
            if i >= periods {
                self.values[[i - periods, j]]
            } else {
                f64::NAN
            }
        });
        Self {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values,
        }
    }

    /// Simple period-over-period returns of a price panel.
    ///
    /// The first row is 0.0. A missing close carries the last valid close
    /// forward, so it yields 0.0 and the next valid close is measured against
    /// the last valid one. Returns without a valid prior close are 0.0.
    #[must_use]
    pub fn simple_returns(&self) -> Self {
        let (n_rows, n_cols) = self.values.dim();
        let mut values = Array2::zeros((n_rows, n_cols));
        for j in 0..n_cols {
            let mut last_valid: Option<f64> = None;
            for i in 0..n_rows {
                let price = self.values[[i, j]];
                if !price.is_finite() {
                    continue;
                }
                if let Some(prev) = last_valid {
                    let ret = price / prev - 1.0;
                    values[[i, j]] = if ret.is_finite() { ret } else { 0.0 };
                }
                last_valid = Some(price);
            }
        }
        Self {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values,
        }
    }

    /// Buckets rows by calendar month-end keeping each column's last finite value.
    #[must_use]
    pub fn resample_month_end_last(&self) -> Self {
        let (Some(&first), Some(&last)) = (self.index.first(), self.index.last()) else {
            return Self {
                index: Vec::new(),
                columns: self.columns.clone(),
                values: Array2::zeros((0, self.n_cols())),
            };
        };
        let buckets = month_ends_between(first, last);
        let mut values = Array2::from_elem((buckets.len(), self.n_cols()), f64::NAN);
        let mut bucket = 0;
        for (i, &date) in self.index.iter().enumerate() {
            let end = month_end(date);
            while buckets[bucket] < end {
                bucket += 1;
            }
            for j in 0..self.n_cols() {
                let v = self.values[[i, j]];
                if v.is_finite() {
                    values[[bucket, j]] = v;
                }
            }
        }
        Self {
            index: buckets,
            columns: self.columns.clone(),
            values,
        }
    }

    /// Re-indexes onto `target` by as-of lookup: each target date takes the
    /// latest row dated at or before it, NaN when there is none.
    ///
    /// # Errors
    ///
    /// Fails if `target` is not strictly increasing.
    pub fn reindex_ffill(&self, target: &[Date]) -> Result<Self> {
        ensure_strictly_increasing(target)?;
        let rows: Vec<Option<usize>> = target.iter().map(|&d| self.asof_position(d)).collect();
        let values = Array2::from_shape_fn((target.len(), self.n_cols()), |(i, j)| {
            rows[i].map_or(f64::NAN, |r| self.values[[r, j]])
        });
        Ok(Self {
            index: target.to_vec(),
            columns: self.columns.clone(),
            values,
        })
    }

    /// Sum of absolute values across each row (gross exposure for weights).
    #[must_use]
    pub fn row_abs_sum(&self) -> Vec<f64> {
        self.values
            .rows()
            .into_iter()
            .map(|r| r.iter().filter(|v| v.is_finite()).map(|v| v.abs()).sum())
            .collect()
    }

    /// Checks that `other` has the same index and columns, in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`CaduceusError::Alignment`] describing the first mismatch.
    pub fn ensure_aligned(&self, other: &Self) -> Result<()> {
        if self.index != other.index {
            return Err(CaduceusError::Alignment(format!(
                "date indices differ ({} vs {} rows)",
                self.n_rows(),
                other.n_rows()
            )));
        }
        if self.columns != other.columns {
            return Err(CaduceusError::Alignment(format!(
                "columns must match and be ordered identically: {:?} vs {:?}",
                self.columns, other.columns
            )));
        }
        Ok(())
    }

    /// Returns a copy with every cell transformed by `f(row, col, value)`.
    #[must_use]
    pub fn map_cells(&self, f: impl Fn(usize, usize, f64) -> f64) -> Self {
        Self {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values: Array2::from_shape_fn(self.values.dim(), |(i, j)| f(i, j, self.values[[i, j]])),
        }
    }

    /// Reads a wide price table: a `Date` column plus one numeric column per ticker.
    ///
    /// Nulls become NaN. Integer columns are cast to `Float64`.
    ///
    /// # Errors
    ///
    /// Fails if the date column is missing or not of dtype `Date`, a value
    /// column cannot be cast to `Float64`, or the dates are not strictly increasing.
    pub fn from_dataframe(df: &DataFrame, date_column: &str) -> Result<Self> {
        if !df
            .get_column_names()
            .iter()
            .any(|s| s.as_str() == date_column)
        {
            return Err(CaduceusError::MissingColumn(date_column.to_string()));
        }
        let date_series = df.column(date_column)?.as_materialized_series();
        let index: Vec<Date> = match date_series.dtype() {
            DataType::Date => date_series
                .date()?
                .into_iter()
                .map(|d: Option<i32>| {
                    d.and_then(date_from_epoch_days).ok_or_else(|| {
                        CaduceusError::InvalidData(format!("null or invalid date in '{date_column}'"))
                    })
                })
                .collect::<Result<_>>()?,
            other => {
                return Err(CaduceusError::InvalidData(format!(
                    "column '{date_column}' has dtype {other}, expected Date"
                )));
            }
        };

        let mut columns = Vec::new();
        for name in df.get_column_names() {
            if name.as_str() == date_column {
                continue;
            }
            let series = df
                .column(name.as_str())?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            let values: Vec<f64> = series
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            columns.push((name.to_string(), values));
        }
        Self::from_columns(index, columns)
    }

    /// Writes the panel as a wide table with a leading `date` column.
    ///
    /// # Errors
    ///
    /// Propagates Polars construction errors.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let days: Vec<i32> = self.index.iter().map(|d| date_to_epoch_days(*d)).collect();
        let mut columns = Vec::with_capacity(self.n_cols() + 1);
        columns.push(
            Column::from(Series::new("date".into(), days).cast(&DataType::Date)?),
        );
        for (j, name) in self.columns.iter().enumerate() {
            let values: Vec<f64> = self.values.column(j).to_vec();
            columns.push(Column::new(name.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

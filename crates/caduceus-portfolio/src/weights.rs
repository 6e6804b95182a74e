//! Weight-shaping helpers: universe extension, daily forward-fill and gross caps.

use caduceus_traits::{
    CaduceusError, Date, Panel, PricePanel, Result, Ticker, WeightSchedule,
};
use ndarray::{Array1, Array2};

/// Scales a weight vector down so its gross exposure does not exceed `max_gross`.
///
/// Vectors already within the cap are returned unchanged.
pub(crate) fn cap_gross(weights: Array1<f64>, max_gross: f64) -> Array1<f64> {
    let gross: f64 = weights.iter().filter(|w| w.is_finite()).map(|w| w.abs()).sum();
    if gross > max_gross && gross > 0.0 {
        weights * (max_gross / gross)
    } else {
        weights
    }
}

/// Reshapes `weights` onto `universe`, zero-filling tickers it lacks.
///
/// Columns of `weights` outside the universe are dropped. The result keeps
/// the row index of `weights` and the column order of `universe`.
///
/// # Errors
///
/// Fails if `universe` contains duplicate tickers.
pub fn extend_to_universe(weights: &Panel, universe: &[Ticker]) -> Result<Panel> {
    let positions: Vec<Option<usize>> = universe
        .iter()
        .map(|ticker| weights.column_position(ticker))
        .collect();
    let values = Array2::from_shape_fn((weights.n_rows(), universe.len()), |(i, j)| {
        positions[j].map_or(0.0, |c| weights.value(i, c))
    });
    Panel::new(weights.index().to_vec(), universe.to_vec(), values)
}

/// Forward-fills a (typically monthly) weight panel onto a daily index.
///
/// Each day holds the weights of the latest row dated at or before it. Days
/// before the first row, and any NaN that survives the fill, become 0.0.
///
/// # Errors
///
/// Fails if `index` is not strictly increasing.
pub fn forward_fill_to_index(weights: &Panel, index: &[Date]) -> Result<Panel> {
    Ok(weights.reindex_ffill(index)?.fill_nan(0.0))
}

/// Caps the gross exposure of every row at `max_gross`.
///
/// # Errors
///
/// Fails if `max_gross` is not a positive number.
pub fn cap_gross_leverage(weights: &Panel, max_gross: f64) -> Result<Panel> {
    if max_gross.is_nan() || max_gross <= 0.0 {
        return Err(CaduceusError::InvalidParameter(format!(
            "max_gross_leverage must be positive, got {max_gross}"
        )));
    }
    let mut values = weights.values().clone();
    for mut row in values.rows_mut() {
        let capped = cap_gross(row.to_owned(), max_gross);
        row.assign(&capped);
    }
    Panel::new(weights.index().to_vec(), weights.columns().to_vec(), values)
}

/// Month-end target weights accumulated one rebalance at a time.
///
/// Strategies push one row per rebalance date and then expand the schedule
/// onto the daily price index with [`MonthlySchedule::into_daily`].
#[derive(Debug, Clone)]
pub struct MonthlySchedule {
    columns: Vec<Ticker>,
    dates: Vec<Date>,
    rows: Vec<Array1<f64>>,
}

impl MonthlySchedule {
    /// Empty schedule over the given columns.
    #[must_use]
    pub const fn new(columns: Vec<Ticker>) -> Self {
        Self {
            columns,
            dates: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Columns of the schedule.
    #[must_use]
    pub fn columns(&self) -> &[Ticker] {
        &self.columns
    }

    /// Number of rebalance rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True when no rebalance has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Appends the target weights for `date`.
    ///
    /// # Errors
    ///
    /// Fails if the row length differs from the column count or `date` does
    /// not follow the previous rebalance date.
    pub fn push(&mut self, date: Date, weights: Array1<f64>) -> Result<()> {
        if weights.len() != self.columns.len() {
            return Err(CaduceusError::Alignment(format!(
                "rebalance row has {} weights for {} columns",
                weights.len(),
                self.columns.len()
            )));
        }
        if self.dates.last().is_some_and(|&last| last >= date) {
            return Err(CaduceusError::InvalidData(format!(
                "rebalance date {date} does not follow the previous one"
            )));
        }
        self.dates.push(date);
        self.rows.push(weights);
        Ok(())
    }

    /// Appends an all-zero row for `date`.
    ///
    /// # Errors
    ///
    /// Fails if `date` does not follow the previous rebalance date.
    pub fn push_flat(&mut self, date: Date) -> Result<()> {
        let flat = Array1::zeros(self.columns.len());
        self.push(date, flat)
    }

    /// The rebalance rows as a panel indexed by rebalance date.
    ///
    /// # Errors
    ///
    /// Propagates panel construction failures.
    pub fn to_panel(&self) -> Result<Panel> {
        let values = Array2::from_shape_fn((self.rows.len(), self.columns.len()), |(i, j)| {
            self.rows[i][j]
        });
        Panel::new(self.dates.clone(), self.columns.clone(), values)
    }

    /// Expands the schedule onto the daily index and columns of `prices`.
    ///
    /// Days before the first rebalance, and tickers the schedule never names,
    /// carry zero weight.
    ///
    /// # Errors
    ///
    /// Propagates panel construction failures.
    pub fn into_daily(self, prices: &PricePanel) -> Result<WeightSchedule> {
        let monthly = self.to_panel()?;
        let daily = forward_fill_to_index(&monthly, prices.index())?;
        extend_to_universe(&daily, prices.columns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn tickers(names: &[&str]) -> Vec<Ticker> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_cap_gross() {
        let capped = cap_gross(array![1.0, -1.0], 1.5);
        assert_relative_eq!(capped[0], 0.75);
        assert_relative_eq!(capped[1], -0.75);
        let untouched = cap_gross(array![0.5, 0.5], 1.5);
        assert_eq!(untouched, array![0.5, 0.5]);
    }

    #[test]
    fn test_extend_to_universe() {
        let w = Panel::from_columns(
            vec![d(2020, 1, 31)],
            vec![("XBI".into(), vec![0.6]), ("OTHER".into(), vec![0.4])],
        )
        .unwrap();
        let universe = tickers(&["XPH", "XBI"]);
        let extended = extend_to_universe(&w, &universe).unwrap();
        assert_eq!(extended.columns(), universe.as_slice());
        assert_eq!(extended.value(0, 0), 0.0);
        assert_eq!(extended.value(0, 1), 0.6);
    }

    #[test]
    fn test_forward_fill_to_index() {
        let monthly = Panel::from_columns(
            vec![d(2020, 1, 31), d(2020, 2, 29)],
            vec![("A".into(), vec![1.0, 0.5])],
        )
        .unwrap();
        let daily_index = vec![d(2020, 1, 30), d(2020, 1, 31), d(2020, 2, 3), d(2020, 3, 2)];
        let daily = forward_fill_to_index(&monthly, &daily_index).unwrap();
        let col: Vec<f64> = daily.column("A").unwrap().to_vec();
        assert_eq!(col, vec![0.0, 1.0, 1.0, 0.5]);
    }

    #[test]
    fn test_cap_gross_leverage_panel() {
        let w = Panel::from_columns(
            vec![d(2020, 1, 2), d(2020, 1, 3)],
            vec![("A".into(), vec![2.0, 0.2]), ("B".into(), vec![-1.0, 0.3])],
        )
        .unwrap();
        let capped = cap_gross_leverage(&w, 1.5).unwrap();
        assert_relative_eq!(capped.row_abs_sum()[0], 1.5, epsilon = 1e-12);
        assert_relative_eq!(capped.value(0, 0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(capped.value(1, 1), 0.3);
        assert!(cap_gross_leverage(&w, 0.0).is_err());
    }

    #[test]
    fn test_monthly_schedule_into_daily() {
        let mut schedule = MonthlySchedule::new(tickers(&["A"]));
        schedule.push(d(2020, 1, 31), array![1.0]).unwrap();
        schedule.push_flat(d(2020, 2, 29)).unwrap();
        assert_eq!(schedule.len(), 2);
        assert!(schedule.push(d(2020, 2, 1), array![1.0]).is_err());
        assert!(schedule.push(d(2020, 3, 31), array![1.0, 2.0]).is_err());

        let prices = Panel::from_columns(
            vec![d(2020, 1, 30), d(2020, 2, 3), d(2020, 3, 2)],
            vec![("A".into(), vec![1.0; 3]), ("B".into(), vec![1.0; 3])],
        )
        .unwrap();
        let daily = schedule.into_daily(&prices).unwrap();
        prices.ensure_aligned(&daily).unwrap();
        assert_eq!(daily.column("A").unwrap().to_vec(), vec![0.0, 1.0, 0.0]);
        assert_eq!(daily.column("B").unwrap().to_vec(), vec![0.0; 3]);
    }

    #[test]
    fn test_empty_schedule_is_flat() {
        let prices = Panel::from_columns(
            vec![d(2020, 1, 30), d(2020, 2, 3)],
            vec![("A".into(), vec![1.0; 2])],
        )
        .unwrap();
        let daily = MonthlySchedule::new(tickers(&["A"])).into_daily(&prices).unwrap();
        assert!(daily.values().iter().all(|&w| w == 0.0));
    }
}

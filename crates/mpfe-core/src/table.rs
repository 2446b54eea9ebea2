/// Piecewise-linear lookup tables attached to properties
///
/// A table maps an input variable (e.g. TEMPERATURE) to an output
/// variable (e.g. YOUNG_MODULUS). Points are kept sorted by abscissa.
/// Outside the sampled range the first/last segment is extended linearly;
/// a single-point table is constant.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    points: Vec<(f64, f64)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from (x, y) samples in any order
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut table = Self::new();
        for (x, y) in points {
            table.insert(x, y);
        }
        table
    }

    /// Insert a sample, replacing an existing one at the same abscissa
    pub fn insert(&mut self, x: f64, y: f64) {
        match self
            .points
            .binary_search_by(|(px, _)| px.total_cmp(&x))
        {
            Ok(i) => self.points[i].1 = y,
            Err(i) => self.points.insert(i, (x, y)),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Interpolated value at `x`; `None` for an empty table
    pub fn value(&self, x: f64) -> Option<f64> {
        match self.points.len() {
            0 => None,
            1 => Some(self.points[0].1),
            n => {
                let upper = self.points.partition_point(|(px, _)| *px < x);
                let i = upper.clamp(1, n - 1);
                let (x0, y0) = self.points[i - 1];
                let (x1, y1) = self.points[i];
                Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
            }
        }
    }

    /// Slope dy/dx of the segment containing `x`
    pub fn derivative(&self, x: f64) -> Option<f64> {
        match self.points.len() {
            0 => None,
            1 => Some(0.0),
            n => {
                let upper = self.points.partition_point(|(px, _)| *px < x);
                let i = upper.clamp(1, n - 1);
                let (x0, y0) = self.points[i - 1];
                let (x1, y1) = self.points[i];
                Some((y1 - y0) / (x1 - x0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> Table {
        Table::from_points([(100.0, 200000.0), (0.0, 210000.0), (200.0, 180000.0)])
    }

    #[test]
    fn interpolates_inside_range() {
        let table = make_table();
        assert_eq!(table.len(), 3);
        assert!((table.value(50.0).unwrap() - 205000.0).abs() < 1e-9);
        assert!((table.value(150.0).unwrap() - 190000.0).abs() < 1e-9);
        assert!((table.value(100.0).unwrap() - 200000.0).abs() < 1e-9);
    }

    #[test]
    fn extrapolates_linearly() {
        let table = make_table();
        assert!((table.value(-100.0).unwrap() - 220000.0).abs() < 1e-9);
        assert!((table.value(300.0).unwrap() - 160000.0).abs() < 1e-9);
        assert!((table.derivative(250.0).unwrap() + 200.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_tables() {
        assert_eq!(Table::new().value(1.0), None);
        let single = Table::from_points([(1.0, 5.0)]);
        assert_eq!(single.value(-10.0), Some(5.0));
        assert_eq!(single.derivative(3.0), Some(0.0));
    }

    #[test]
    fn insert_replaces_duplicate_abscissa() {
        let mut table = Table::new();
        table.insert(1.0, 2.0);
        table.insert(1.0, 3.0);
        assert_eq!(table.points(), &[(1.0, 3.0)]);
    }
}

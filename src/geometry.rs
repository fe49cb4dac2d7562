use geo::{Coord, Line};

/// Reference line a trajectory has to cross, given by its two endpoints
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceLine(pub Line<f64>);

impl ReferenceLine {
    pub fn new(l0: (f64, f64), l1: (f64, f64)) -> Self {
        Self(Line::new(
            Coord { x: l0.0, y: l0.1 },
            Coord { x: l1.0, y: l1.1 },
        ))
    }

    pub fn start(&self) -> Coord<f64> {
        self.0.start
    }

    pub fn end(&self) -> Coord<f64> {
        self.0.end
    }
}

/// Intersection parameters of the segment `p -> p + s1` with the reference line.
///
/// Returns `(s, t)` where `s` is the position along the line and `t` the position
/// along the segment, or `None` for parallel segments.
///
fn intersection_params(p: &Coord<f64>, s1: &Coord<f64>, line: &ReferenceLine) -> Option<(f64, f64)> {
    let l0 = line.start();
    let s2 = line.0.delta();

    let den = -s2.x * s1.y + s1.x * s2.y;
    if den == 0.0 {
        return None;
    }

    let s = (-s1.y * (p.x - l0.x) + s1.x * (p.y - l0.y)) / den;
    let t = (s2.x * (p.y - l0.y) - s2.y * (p.x - l0.x)) / den;
    Some((s, t))
}

/// Index of the point right before the first crossing of the reference line.
///
/// Points are scanned first to last and only the first intersection counts, so
/// oscillating trajectories report the earliest crossing. The crossing happens
/// between the returned point and the next one.
///
/// # Parameters
/// * `points` - ordered trajectory points;
/// * `line` - the reference line.
///
/// Returns `None` when no segment of the trajectory intersects the line.
///
pub fn line_intersection_index(points: &[Coord<f64>], line: &ReferenceLine) -> Option<usize> {
    points.windows(2).position(|w| {
        let s1 = Coord {
            x: w[1].x - w[0].x,
            y: w[1].y - w[0].y,
        };
        match intersection_params(&w[0], &s1, line) {
            Some((s, t)) => (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t),
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::geometry::{line_intersection_index, ReferenceLine};
    use geo::Coord;

    fn coords(x: &[f64], y: &[f64]) -> Vec<Coord<f64>> {
        x.iter()
            .zip(y.iter())
            .map(|(x, y)| Coord { x: *x, y: *y })
            .collect()
    }

    #[test]
    fn empty() {
        let line = ReferenceLine::new((1.0, 1.0), (0.0, 0.0));
        assert_eq!(line_intersection_index(&[], &line), None);
        assert_eq!(
            line_intersection_index(&coords(&[0.5], &[0.5]), &line),
            None
        );
    }

    #[test]
    fn intersection_first() {
        let line = ReferenceLine::new((-6.0, -1.0), (-4.0, 1.0));
        let points = coords(&[-5.22, -4.79, -3.98, -3.19], &[0.35, -0.22, -0.58, -0.54]);
        assert_eq!(line_intersection_index(&points, &line), Some(0));
    }

    #[test]
    fn intersection_last() {
        let line = ReferenceLine::new((-6.0, -1.0), (-4.0, 1.0));
        let points = coords(&[-3.19, -3.98, -4.79, -5.22], &[-0.54, -0.58, -0.22, 0.35]);
        assert_eq!(line_intersection_index(&points, &line), Some(2));
    }

    #[test]
    fn intersection_middle() {
        let line = ReferenceLine::new((2.66, 7.04), (-2.09, 4.96));
        let points = coords(
            &[-3.47, -3.0, -2.33, -1.59, -1.16, -0.95, 1.86, 3.84, 6.28],
            &[10.96, 9.95, 8.41, 7.07, 5.93, 5.03, 4.73, 4.79, 4.83],
        );
        assert_eq!(line_intersection_index(&points, &line), Some(4));
    }

    #[test]
    fn first_of_several_crossings() {
        // vertical line x = 0 crossed three times
        let line = ReferenceLine::new((0.0, -10.0), (0.0, 10.0));
        let points = coords(&[-2.0, -1.0, 1.0, 2.0, -1.0, -2.0, 3.0], &[0.0; 7]);
        assert_eq!(line_intersection_index(&points, &line), Some(1));
    }

    #[test]
    fn no_crossing_and_parallel() {
        let line = ReferenceLine::new((0.0, 0.0), (0.0, 10.0));
        let beside = coords(&[1.0, 2.0, 3.0], &[0.0, 5.0, 10.0]);
        assert_eq!(line_intersection_index(&beside, &line), None);

        // collinear with the line, denominator is zero
        let along = coords(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]);
        assert_eq!(line_intersection_index(&along, &line), None);

        // would cross if the line were longer
        let past_end = coords(&[-1.0, 1.0], &[11.0, 11.0]);
        assert_eq!(line_intersection_index(&past_end, &line), None);
    }
}

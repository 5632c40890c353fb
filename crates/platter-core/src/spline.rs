use thiserror::Error;

use crate::bend::ControlPoint;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplineError {
    #[error("curve fit needs at least two control points, got {0}")]
    InsufficientPoints(usize),
    #[error("control point offsets must increase strictly (index {index})")]
    NotIncreasing { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineSegment {
    pub x: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl SplineSegment {
    #[must_use]
    pub fn value(&self, t: f64) -> f64 {
        let dx = t - self.x;
        self.a + dx * (self.b + dx * (self.c + dx * self.d))
    }

    #[must_use]
    pub fn slope(&self, t: f64) -> f64 {
        let dx = t - self.x;
        self.b + dx * (2.0 * self.c + 3.0 * self.d * dx)
    }

    #[must_use]
    pub fn curvature(&self, t: f64) -> f64 {
        let dx = t - self.x;
        2.0 * self.c + 6.0 * self.d * dx
    }
}

#[derive(Debug, Clone, Default)]
pub struct CubicSpline {
    segments: Vec<SplineSegment>,
    end_x: f64,
    end_value: f64,
    h: Vec<f64>,
    alpha: Vec<f64>,
    l: Vec<f64>,
    mu: Vec<f64>,
    z: Vec<f64>,
    c: Vec<f64>,
}

impl CubicSpline {
    #[must_use]
    pub fn with_capacity(max_points: usize) -> Self {
        Self {
            segments: Vec::with_capacity(max_points),
            end_x: 0.0,
            end_value: 0.0,
            h: Vec::with_capacity(max_points),
            alpha: Vec::with_capacity(max_points),
            l: Vec::with_capacity(max_points),
            mu: Vec::with_capacity(max_points),
            z: Vec::with_capacity(max_points),
            c: Vec::with_capacity(max_points),
        }
    }

    pub fn fitted(points: &[ControlPoint]) -> Result<Self, SplineError> {
        let mut spline = Self::with_capacity(points.len());
        spline.fit(points)?;
        Ok(spline)
    }

    pub fn fit(&mut self, points: &[ControlPoint]) -> Result<(), SplineError> {
        self.segments.clear();
        if points.len() < 2 {
            return Err(SplineError::InsufficientPoints(points.len()));
        }
        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[1].offset <= pair[0].offset)
        {
            return Err(SplineError::NotIncreasing { index: index + 1 });
        }

        let n = points.len() - 1;
        let x = |i: usize| points[i].offset as f64;
        let a = |i: usize| points[i].value;

        reset(&mut self.h, n);
        reset(&mut self.alpha, n);
        reset(&mut self.l, n + 1);
        reset(&mut self.mu, n + 1);
        reset(&mut self.z, n + 1);
        reset(&mut self.c, n + 1);

        for i in 0..n {
            self.h[i] = x(i + 1) - x(i);
        }
        for i in 1..n {
            self.alpha[i] =
                3.0 * (a(i + 1) - a(i)) / self.h[i] - 3.0 * (a(i) - a(i - 1)) / self.h[i - 1];
        }

        self.l[0] = 1.0;
        for i in 1..n {
            self.l[i] = 2.0 * (x(i + 1) - x(i - 1)) - self.h[i - 1] * self.mu[i - 1];
            self.mu[i] = self.h[i] / self.l[i];
            self.z[i] = (self.alpha[i] - self.h[i - 1] * self.z[i - 1]) / self.l[i];
        }
        self.l[n] = 1.0;

        for j in (0..n).rev() {
            self.c[j] = self.z[j] - self.mu[j] * self.c[j + 1];
        }
        for j in 0..n {
            let h = self.h[j];
            self.segments.push(SplineSegment {
                x: x(j),
                a: a(j),
                b: (a(j + 1) - a(j)) / h - h * (self.c[j + 1] + 2.0 * self.c[j]) / 3.0,
                c: self.c[j],
                d: (self.c[j + 1] - self.c[j]) / (3.0 * h),
            });
        }

        self.end_x = x(n);
        self.end_value = a(n);
        Ok(())
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[SplineSegment] {
        &self.segments
    }

    #[must_use]
    pub fn domain(&self) -> Option<(f64, f64)> {
        self.segments.first().map(|first| (first.x, self.end_x))
    }

    // Holds the end values outside the knot range.
    #[must_use]
    pub fn value_at(&self, t: f64) -> f64 {
        let Some(first) = self.segments.first() else {
            return 0.0;
        };
        if t <= first.x {
            return first.a;
        }
        if t >= self.end_x {
            return self.end_value;
        }
        self.segments[self.segment_index(t)].value(t)
    }

    #[must_use]
    pub fn slope_at(&self, t: f64) -> f64 {
        match self.domain() {
            Some((start, end)) if t >= start && t < end => {
                self.segments[self.segment_index(t)].slope(t)
            }
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn curvature_at(&self, t: f64) -> f64 {
        match self.domain() {
            Some((start, end)) if t >= start && t < end => {
                self.segments[self.segment_index(t)].curvature(t)
            }
            _ => 0.0,
        }
    }

    pub fn evaluate_block(&self, block_len: usize, out: &mut Vec<f64>) {
        out.clear();
        let Some(first) = self.segments.first() else {
            return;
        };

        let mut index = 0;
        for sample in 0..block_len {
            let t = sample as f64;
            let value = if t <= first.x {
                first.a
            } else if t >= self.end_x {
                self.end_value
            } else {
                while index + 1 < self.segments.len() && self.segments[index + 1].x <= t {
                    index += 1;
                }
                self.segments[index].value(t)
            };
            out.push(value);
        }
    }

    fn segment_index(&self, t: f64) -> usize {
        self.segments
            .partition_point(|segment| segment.x <= t)
            .saturating_sub(1)
    }
}

fn reset(buffer: &mut Vec<f64>, len: usize) {
    buffer.clear();
    buffer.resize(len, 0.0);
}

/// `num` evenly spaced values from `start` to `stop`, both included:
/// value(i) = (1 - i/(num-1)) * start + i/(num-1) * stop
///
/// Used for the hitrate ticks and the evaluation grids of the density estimates.
#[derive(Clone, Debug)]
pub struct Linspace {
    front: usize,
    back: usize,
    num: usize,
    start: f64,
    stop: f64,
}

impl Linspace {
    pub fn new(start: f64, stop: f64, num: usize) -> Self {
        Linspace {
            front: 0,
            back: num,
            num,
            start,
            stop,
        }
    }

    /// values from `start` to `stop` with the given step, `stop` included when it is hit
    pub fn with_step(start: f64, stop: f64, step: f64) -> Self {
        let intervals = ((stop - start) / step).abs().round() as usize;
        Self::new(start, start + step * intervals as f64, intervals + 1)
    }

    fn at(&self, i: usize) -> f64 {
        if self.num < 2 {
            return self.start;
        }
        let p = i as f64 / (self.num - 1) as f64;
        (1. - p) * self.start + p * self.stop
    }
}

impl Iterator for Linspace {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.front >= self.back {
            return None;
        }
        let v = self.at(self.front);
        self.front += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let l = self.back - self.front;
        (l, Some(l))
    }
}

impl DoubleEndedIterator for Linspace {
    fn next_back(&mut self) -> Option<f64> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.at(self.back))
    }
}

impl ExactSizeIterator for Linspace {}

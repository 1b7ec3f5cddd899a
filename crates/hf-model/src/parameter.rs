//! Scalar and time-dependent model parameters.

use hf_core::{cycle_phase, ParamId};

use crate::error::{ModelError, ModelResult};

/// A model parameter: either a constant scalar or a piecewise-linear curve
/// over time.
///
/// Periodic curves wrap time modulo their cycle period; non-periodic curves
/// clamp at the endpoints. `to_steady` freezes the curve to its sample mean
/// and `to_unsteady` restores it exactly.
#[derive(Debug, Clone)]
pub struct Parameter {
    times: Vec<f64>,
    values: Vec<f64>,
    periodic: bool,
    /// Curve stashed away while the parameter is frozen for steady mode
    unsteady_values: Option<Vec<f64>>,
}

impl Parameter {
    /// Constant parameter.
    pub fn constant(value: f64) -> Self {
        Self {
            times: Vec::new(),
            values: vec![value],
            periodic: false,
            unsteady_values: None,
        }
    }

    /// Piecewise-linear curve sampled at strictly ascending times.
    ///
    /// A curve whose samples are all equal collapses to a constant, so it
    /// neither interpolates nor defines a cycle period.
    pub fn curve(times: Vec<f64>, values: Vec<f64>, periodic: bool) -> ModelResult<Self> {
        if values.len() == 1 || values.windows(2).all(|w| w[0] == w[1]) {
            let value = *values.first().unwrap_or(&0.0);
            return Ok(Self::constant(value));
        }
        if times.len() != values.len() {
            return Err(ModelError::CurveShape {
                times: times.len(),
                values: values.len(),
            });
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ModelError::NonMonotonicTimes);
        }
        Ok(Self {
            times,
            values,
            periodic,
            unsteady_values: None,
        })
    }

    /// Whether the parameter is a plain scalar.
    pub fn is_constant(&self) -> bool {
        self.values.len() == 1
    }

    /// Cycle period of a periodic curve.
    pub fn cycle_period(&self) -> Option<f64> {
        if self.periodic && !self.is_constant() {
            Some(self.times[self.times.len() - 1] - self.times[0])
        } else {
            None
        }
    }

    /// Evaluate the parameter at time `t`.
    pub fn get(&self, t: f64) -> f64 {
        if self.is_constant() {
            return self.values[0];
        }

        let t0 = self.times[0];
        let t_end = self.times[self.times.len() - 1];
        let t = if self.periodic {
            t0 + cycle_phase(t - t0, t_end - t0)
        } else if t <= t0 {
            return self.values[0];
        } else if t >= t_end {
            return self.values[self.values.len() - 1];
        } else {
            t
        };

        let upper = self.times.partition_point(|&tk| tk <= t).min(self.times.len() - 1);
        let lower = upper - 1;
        let span = self.times[upper] - self.times[lower];
        let frac = (t - self.times[lower]) / span;
        self.values[lower] + frac * (self.values[upper] - self.values[lower])
    }

    /// Freeze a curve to the mean of its samples.
    pub fn to_steady(&mut self) {
        if self.is_constant() || self.unsteady_values.is_some() {
            return;
        }
        let mean = self.values.iter().sum::<f64>() / self.values.len() as f64;
        self.unsteady_values = Some(std::mem::replace(&mut self.values, vec![mean]));
    }

    /// Restore the curve frozen by `to_steady`.
    pub fn to_unsteady(&mut self) {
        if let Some(values) = self.unsteady_values.take() {
            self.values = values;
        }
    }
}

/// Contiguous store of all model parameters.
///
/// Blocks hold [`ParamId`]s into this store; `refresh` evaluates every
/// parameter once per time update so block hooks read plain cached scalars.
#[derive(Debug, Default)]
pub struct ParameterStore {
    params: Vec<Parameter>,
    values: Vec<f64>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, returning its stable id.
    pub fn add(&mut self, param: Parameter) -> ParamId {
        let id = ParamId::from_index(self.params.len() as u32);
        self.values.push(param.get(0.0));
        self.params.push(param);
        id
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, id: ParamId) -> &Parameter {
        &self.params[id.index() as usize]
    }

    /// Cached value from the most recent `refresh`.
    pub fn value(&self, id: ParamId) -> f64 {
        self.values[id.index() as usize]
    }

    /// Iterate over all parameters in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Re-evaluate every parameter at time `t`.
    pub fn refresh(&mut self, t: f64) {
        for (value, param) in self.values.iter_mut().zip(&self.params) {
            *value = param.get(t);
        }
    }

    /// Freeze all curves; re-evaluates the cache.
    pub fn to_steady(&mut self) {
        for param in &mut self.params {
            param.to_steady();
        }
        self.refresh(0.0);
    }

    /// Restore all curves; re-evaluates the cache.
    pub fn to_unsteady(&mut self) {
        for param in &mut self.params {
            param.to_unsteady();
        }
        self.refresh(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_ignores_time() {
        let p = Parameter::constant(3.5);
        assert_eq!(p.get(0.0), 3.5);
        assert_eq!(p.get(17.2), 3.5);
        assert!(p.is_constant());
    }

    #[test]
    fn linear_interpolation() {
        let p = Parameter::curve(vec![0.0, 1.0, 2.0], vec![0.0, 10.0, 0.0], false).unwrap();
        assert_eq!(p.get(0.5), 5.0);
        assert_eq!(p.get(1.5), 5.0);
        assert_eq!(p.get(1.0), 10.0);
    }

    #[test]
    fn non_periodic_clamps() {
        let p = Parameter::curve(vec![1.0, 2.0], vec![4.0, 8.0], false).unwrap();
        assert_eq!(p.get(0.0), 4.0);
        assert_eq!(p.get(3.0), 8.0);
    }

    #[test]
    fn periodic_wraps_any_integer_cycle() {
        let p = Parameter::curve(vec![0.0, 0.5, 1.0], vec![0.0, 1.0, 0.0], true).unwrap();
        assert_eq!(p.cycle_period(), Some(1.0));
        for k in [-3_i32, -1, 0, 1, 5] {
            let t = 0.25 + k as f64;
            assert!(
                (p.get(t) - 0.5).abs() < 1e-12,
                "period shift by {k} changed the value"
            );
        }
    }

    #[test]
    fn ascending_times_enforced() {
        assert!(Parameter::curve(vec![0.0, 0.0], vec![1.0, 2.0], true).is_err());
        assert!(Parameter::curve(vec![0.0], vec![1.0, 2.0], true).is_err());
    }

    #[test]
    fn steady_freezes_to_mean_and_restores() {
        let times = vec![0.0, 1.0, 2.0, 3.0];
        let values = vec![1.0, 3.0, 5.0, 7.0];
        let mut p = Parameter::curve(times, values.clone(), true).unwrap();

        p.to_steady();
        assert!(p.is_constant());
        assert_eq!(p.get(0.0), 4.0);
        assert_eq!(p.get(2.5), 4.0);

        p.to_unsteady();
        assert!(!p.is_constant());
        for (t, v) in [(0.0, 1.0), (1.0, 3.0), (3.0, 7.0)] {
            assert_eq!(p.get(t), v, "round trip must restore samples bitwise");
        }
        let _ = values;
    }

    #[test]
    fn store_refresh_caches_values() {
        let mut store = ParameterStore::new();
        let a = store.add(Parameter::constant(2.0));
        let b = store.add(Parameter::curve(vec![0.0, 1.0], vec![0.0, 1.0], false).unwrap());
        assert_eq!(store.value(a), 2.0);
        assert_eq!(store.value(b), 0.0);

        store.refresh(0.5);
        assert_eq!(store.value(a), 2.0);
        assert_eq!(store.value(b), 0.5);
    }
}

//! Hyperparameter grid expansion.
//!
//! A [`ParamSpec`] is a mix of constants, swept axes, and grouped axes. The
//! grid is the Cartesian product of the swept/grouped axes, with constants
//! merged into every point. A grouped entry contributes a single axis whose
//! candidates are the concatenation of its inner `(name, value)` lists, so
//! alternative knobs of one family are swept one-at-a-time rather than
//! crossed against each other.

use crate::domain::{ParamEntry, ParamSet, ParamSpec, ParamValue};
use crate::error::AppError;

/// One candidate on a grid axis: the parameter name it sets and the value.
type AxisCandidate = (String, ParamValue);

/// Expand a spec into the full list of grid points, in deterministic order.
///
/// Axes vary in declaration order with the last axis fastest. An empty spec
/// (or a constants-only spec) yields exactly one point. An axis with no
/// candidates is a configuration error since the product would be empty.
pub fn expand(spec: &ParamSpec) -> Result<Vec<ParamSet>, AppError> {
    let mut constants: Vec<AxisCandidate> = Vec::new();
    let mut axes: Vec<Vec<AxisCandidate>> = Vec::new();

    for (name, entry) in spec.entries() {
        match entry {
            ParamEntry::Const(value) => constants.push((name.clone(), value.clone())),
            ParamEntry::Sweep(values) => {
                if values.is_empty() {
                    return Err(AppError::config(format!(
                        "Sweep axis '{name}' has no candidate values."
                    )));
                }
                axes.push(
                    values
                        .iter()
                        .map(|v| (name.clone(), v.clone()))
                        .collect(),
                );
            }
            ParamEntry::Group(sub_axes) => {
                let mut candidates: Vec<AxisCandidate> = Vec::new();
                for (inner, values) in sub_axes {
                    candidates.extend(values.iter().map(|v| (inner.clone(), v.clone())));
                }
                if candidates.is_empty() {
                    return Err(AppError::config(format!(
                        "Grouped axis '{name}' has no candidate values."
                    )));
                }
                axes.push(candidates);
            }
        }
    }

    let n_points: usize = axes.iter().map(Vec::len).product();
    let mut points = Vec::with_capacity(n_points);
    let mut indices = vec![0usize; axes.len()];

    loop {
        let mut point = ParamSet::default();
        for (axis, &idx) in axes.iter().zip(&indices) {
            let (name, value) = &axis[idx];
            point.insert(name, value.clone());
        }
        // Constants override any colliding axis value.
        for (name, value) in &constants {
            point.insert(name, value.clone());
        }
        points.push(point);

        // Odometer increment, last axis fastest.
        let mut pos = axes.len();
        loop {
            if pos == 0 {
                return Ok(points);
            }
            pos -= 1;
            indices[pos] += 1;
            if indices[pos] < axes[pos].len() {
                break;
            }
            indices[pos] = 0;
        }
    }
}

//! Result tables built from sampled states.

use hf_model::block::BlockType;
use hf_model::Model;
use hf_sim::SimulationOutput;

/// Output shaping options.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Collapse every series to its arithmetic mean (single row)
    pub mean_only: bool,
    /// Append time-derivative columns
    pub derivative: bool,
}

/// A flat result table: named columns plus rows, each optionally labeled
/// with the entity it belongs to.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone)]
pub struct Row {
    pub name: Option<String>,
    pub values: Vec<f64>,
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}

/// Vessel-centric table: inlet/outlet flow and pressure per vessel.
pub fn vessel_table(model: &Model, output: &SimulationOutput, opts: OutputOptions) -> Table {
    let mut columns = Vec::new();
    if !opts.mean_only {
        columns.push("time".to_string());
    }
    for field in ["flow_in", "flow_out", "pressure_in", "pressure_out"] {
        columns.push(field.to_string());
    }
    if opts.derivative {
        for field in ["d_flow_in", "d_flow_out", "d_pressure_in", "d_pressure_out"] {
            columns.push(field.to_string());
        }
    }

    let mut rows = Vec::new();
    for block in model.blocks() {
        if block.block_type() != BlockType::BloodVessel {
            continue;
        }
        let vars = &block.core().global_var_ids;
        let (p_in, q_in, p_out, q_out) = (vars[0], vars[1], vars[2], vars[3]);
        let dofs = [q_in, q_out, p_in, p_out];

        if opts.mean_only {
            let n = output.states.len();
            let mut values: Vec<f64> = dofs
                .iter()
                .map(|&dof| mean(output.states.iter().map(|s| s.y[dof]), n))
                .collect();
            if opts.derivative {
                values.extend(
                    dofs.iter()
                        .map(|&dof| mean(output.states.iter().map(|s| s.ydot[dof]), n)),
                );
            }
            rows.push(Row {
                name: Some(block.name().to_string()),
                values,
            });
        } else {
            for (time, state) in output.times.iter().zip(&output.states) {
                let mut values = vec![*time];
                values.extend(dofs.iter().map(|&dof| state.y[dof]));
                if opts.derivative {
                    values.extend(dofs.iter().map(|&dof| state.ydot[dof]));
                }
                rows.push(Row {
                    name: Some(block.name().to_string()),
                    values,
                });
            }
        }
    }
    Table { columns, rows }
}

/// Variable-centric table: one column per global DOF.
pub fn variable_table(model: &Model, output: &SimulationOutput, opts: OutputOptions) -> Table {
    let names = model.dofhandler.variable_names();
    let mut columns = Vec::new();
    if !opts.mean_only {
        columns.push("time".to_string());
    }
    columns.extend(names.iter().cloned());
    if opts.derivative {
        columns.extend(names.iter().map(|n| format!("d_{n}")));
    }

    let mut rows = Vec::new();
    if opts.mean_only {
        let n = output.states.len();
        let mut values: Vec<f64> = (0..names.len())
            .map(|dof| mean(output.states.iter().map(|s| s.y[dof]), n))
            .collect();
        if opts.derivative {
            values.extend(
                (0..names.len()).map(|dof| mean(output.states.iter().map(|s| s.ydot[dof]), n)),
            );
        }
        rows.push(Row { name: None, values });
    } else {
        for (time, state) in output.times.iter().zip(&output.states) {
            let mut values = vec![*time];
            values.extend(state.y.iter().copied());
            if opts.derivative {
                values.extend(state.ydot.iter().copied());
            }
            rows.push(Row { name: None, values });
        }
    }
    Table { columns, rows }
}

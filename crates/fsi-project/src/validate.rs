//! Case validation logic.

use crate::schema::{CaseDef, ModelDef};

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Row count mismatch in {field}: expected {expected}, got {actual}")]
    RowCount {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid coupling settings: {reason}")]
    Coupling { reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_case(case: &CaseDef) -> Result<(), ValidationError> {
    if case.version == 0 || case.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }

    validate_model(&case.model)?;

    case.coupling
        .validate()
        .map_err(|e| ValidationError::Coupling {
            reason: e.to_string(),
        })?;

    Ok(())
}

fn validate_model(model: &ModelDef) -> Result<(), ValidationError> {
    let num_node = model.nodes.len();
    if num_node == 0 {
        return Err(ValidationError::InvalidValue {
            field: "model.nodes".to_string(),
            value: "[]".to_string(),
            reason: "at least one structural node is required".to_string(),
        });
    }

    for (i, node) in model.nodes.iter().enumerate() {
        check_finite(&format!("model.nodes[{i}]"), node)?;
    }

    if let Some(reference) = &model.reference_nodes {
        check_rows("model.reference_nodes", num_node, reference.len())?;
        for (i, node) in reference.iter().enumerate() {
            check_finite(&format!("model.reference_nodes[{i}]"), node)?;
        }
    }

    for (i, vertex) in model.vertices.iter().enumerate() {
        if vertex.node >= num_node {
            return Err(ValidationError::MissingReference {
                id: vertex.node.to_string(),
                context: format!("model.vertices[{i}].node"),
            });
        }
        check_finite(&format!("model.vertices[{i}].position"), &vertex.position)?;
    }

    check_finite("model.for_vel", &model.for_vel)?;

    if let Some(steady) = &model.steady_forces {
        check_rows("model.steady_forces", num_node, steady.len())?;
        for (i, row) in steady.iter().enumerate() {
            check_finite(&format!("model.steady_forces[{i}]"), row)?;
        }
    }

    if let Some(dynamic) = &model.dynamic_forces {
        for (step, table) in dynamic.iter().enumerate() {
            check_rows(&format!("model.dynamic_forces[{step}]"), num_node, table.len())?;
            for (i, row) in table.iter().enumerate() {
                check_finite(&format!("model.dynamic_forces[{step}][{i}]"), row)?;
            }
        }
    }

    Ok(())
}

fn check_rows(field: &str, expected: usize, actual: usize) -> Result<(), ValidationError> {
    if expected != actual {
        return Err(ValidationError::RowCount {
            field: field.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_finite(field: &str, values: &[f64]) -> Result<(), ValidationError> {
    if let Some(v) = values.iter().find(|v| !v.is_finite()) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: v.to_string(),
            reason: "must be finite".to_string(),
        });
    }
    Ok(())
}

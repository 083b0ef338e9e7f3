//! Row estimates for candidate indexes.
//!
//! Two independent estimates are produced for every candidate: the rows
//! scanned to filter out residual predicates, and the rows scanned to
//! materialize a requested order the clustering key does not deliver.

use crate::model::{DomainModel, EntityId, ModelResult, PathSet};
use crate::planner::logical::Index;

/// Row estimates behind one candidate's cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    /// Rows scanned to satisfy the residual predicates.
    pub filter_rows: f64,
    /// Rows scanned to sort; 0 when the clustering key is already in order.
    pub sort_rows: f64,
    /// Final cost in scanned-row units.
    pub total: f64,
}

/// Rows read to collect one page of matches.
///
/// - nothing residual: a direct partition read, 1
/// - no effective partition key: every row of the entity
/// - otherwise the distribution's expected scan for the residual set,
///   capped at the entity size
///
/// A scan with residual predicates never reads fewer rows than a direct
/// read, so both scan branches are floored at 1.
pub fn filter_rows(model: &DomainModel, index: &Index) -> ModelResult<f64> {
    if index.remaining.is_empty() {
        return Ok(1.0);
    }

    let entity = model.entity(index.root_entity());
    let max_rows = entity.max_rows as f64;
    if index.effective_partition_key().is_empty() {
        return Ok(max_rows.max(1.0));
    }

    let selectivity = model.selectivity(entity.id, &index.remaining)?;
    Ok(selectivity.expected(index.page_size).min(max_rows).max(1.0))
}

/// Rows read to produce the requested order.
pub fn sort_rows(model: &DomainModel, index: &Index) -> ModelResult<f64> {
    let requested = &index.clause.order_by;
    if requested.is_empty() {
        return Ok(0.0);
    }

    let mut scanned = index.effective_partition_key();
    let mut matched = 0;
    for (physical, wanted) in index.clustering_key().iter().zip(requested) {
        if !physical.satisfies(wanted) {
            break;
        }
        scanned.insert(physical.path.clone());
        matched += 1;
    }

    if matched == requested.len() {
        return Ok(0.0);
    }

    rows_per_partition(model, index.root_entity(), &scanned)
}

/// Average rows sharing one value of `keys`.
fn rows_per_partition(model: &DomainModel, entity: EntityId, keys: &PathSet) -> ModelResult<f64> {
    let max_rows = model.entity(entity).max_rows as f64;
    if keys.is_empty() {
        return Ok(max_rows);
    }

    let selectivity = model.selectivity(entity, keys)?;
    Ok((max_rows / selectivity.distinct.max(1) as f64).max(1.0))
}

/// Combine filter and sort estimates into a final cost.
pub fn estimate(model: &DomainModel, index: &Index, row_scan_cost: f64) -> ModelResult<CostEstimate> {
    let filter_rows = filter_rows(model, index)?;
    let sort_rows = sort_rows(model, index)?;

    let total = if index.remaining.is_empty() && sort_rows == 0.0 {
        1.0
    } else {
        filter_rows.max(sort_rows) * row_scan_cost
    };

    Ok(CostEstimate {
        filter_rows,
        sort_rows,
        total,
    })
}

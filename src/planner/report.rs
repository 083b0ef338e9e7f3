//! Planning output.

use crate::cache::fingerprint;
use crate::model::{DomainModel, MutationKind};
use crate::planner::logical::{Plan, Workload};
use crate::planner::optimizer::{OptimizationOutcome, SolveStats};
use crate::planner::PlanResult;
use serde::Serialize;
use std::fmt::{self, Write as _};

/// Identity and selection flag of one physical table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub entity: String,
    pub partition_key: Vec<String>,
    pub clustering_key: Vec<String>,
    pub selected: bool,
}

impl TableReport {
    /// `Todo{user_id}[created_at DESC, id DESC]`
    pub fn describe(&self) -> String {
        format!(
            "{}{{{}}}[{}]",
            self.entity,
            self.partition_key.join(", "),
            self.clustering_key.join(", ")
        )
    }
}

/// A chosen candidate for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexAssignment {
    pub table: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAssignment {
    pub query: String,
    pub indexes: Vec<IndexAssignment>,
    /// Selections answered by identifier lookup.
    pub direct_lookups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationReport {
    pub mutation: String,
    pub entity: String,
    pub kind: String,
    pub max_tables: u32,
    /// Selected tables rooted at the mutated entity.
    pub tables_touched: usize,
}

/// The planning result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    pub phase1_cost: f64,
    pub phase2_cost: f64,
    pub table_count: usize,
    pub tables: Vec<TableReport>,
    pub queries: Vec<QueryAssignment>,
    pub mutations: Vec<MutationReport>,
    pub stats: Vec<SolveStats>,
    /// SHA-256 of the selected table identities.
    pub fingerprint: String,
}

impl PlanReport {
    pub fn build(
        model: &DomainModel,
        workload: &Workload,
        costs: &[f64],
        outcome: &OptimizationOutcome,
    ) -> PlanResult<Self> {
        let tables: Vec<TableReport> = outcome
            .tables
            .iter()
            .map(|t| TableReport {
                entity: model.entity(t.key.root_entity).name.clone(),
                partition_key: t.key.partition_key.iter().map(ToString::to_string).collect(),
                clustering_key: t.key.clustering_key.iter().map(ToString::to_string).collect(),
                selected: outcome.selected_tables.contains(&t.id),
            })
            .collect();

        let queries = model
            .query_ids()
            .map(|query| {
                let indexes = workload
                    .indexes_for(query)
                    .into_iter()
                    .filter(|id| outcome.selected_indexes.contains(id))
                    .map(|id| IndexAssignment {
                        table: workload.index(id).key.describe(model),
                        cost: costs[id.0],
                    })
                    .collect();
                let direct_lookups = workload
                    .direct_lookups()
                    .iter()
                    .filter(|d| d.query == query)
                    .map(|d| d.label.clone())
                    .collect();
                QueryAssignment {
                    query: model.query(query).name.clone(),
                    indexes,
                    direct_lookups,
                }
            })
            .collect();

        let mutations = model
            .mutations()
            .iter()
            .map(|m| MutationReport {
                mutation: m.name.clone(),
                entity: model.entity(m.entity).name.clone(),
                kind: match m.kind {
                    MutationKind::Insert => "insert",
                    MutationKind::Update => "update",
                    MutationKind::Delete => "delete",
                }
                .to_string(),
                max_tables: m.sla.max_tables,
                tables_touched: outcome
                    .tables
                    .rooted_at(m.entity)
                    .filter(|t| outcome.selected_tables.contains(&t.id))
                    .count(),
            })
            .collect();

        let selected: Vec<&TableReport> = tables.iter().filter(|t| t.selected).collect();
        let fingerprint = fingerprint(&selected)?;

        Ok(Self {
            phase1_cost: outcome.phase1_cost,
            phase2_cost: outcome.phase2_cost,
            table_count: outcome.table_count,
            tables,
            queries,
            mutations,
            stats: outcome.stats.clone(),
            fingerprint,
        })
    }

    pub fn selected_tables(&self) -> impl Iterator<Item = &TableReport> {
        self.tables.iter().filter(|t| t.selected)
    }

    pub fn to_json(&self) -> PlanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "phase 1 cost: {:.3}", self.phase1_cost)?;
        writeln!(f, "phase 2 cost: {:.3}", self.phase2_cost)?;
        writeln!(f, "tables: {}", self.table_count)?;
        for table in self.selected_tables() {
            writeln!(f, "  {}", table.describe())?;
        }
        writeln!(f, "queries:")?;
        for query in &self.queries {
            writeln!(f, "  {}", query.query)?;
            for index in &query.indexes {
                writeln!(f, "    {} cost={:.3}", index.table, index.cost)?;
            }
            for label in &query.direct_lookups {
                writeln!(f, "    {} by id", label)?;
            }
        }
        if !self.mutations.is_empty() {
            writeln!(f, "mutations:")?;
            for m in &self.mutations {
                writeln!(
                    f,
                    "  {} {} {} tables={}/{}",
                    m.kind, m.entity, m.mutation, m.tables_touched, m.max_tables
                )?;
            }
        }
        Ok(())
    }
}

/// Render every plan tree with candidate costs.
///
/// `costs` is indexed by `IndexId`, as returned by
/// [`CostModel::price_workload`](crate::planner::cost::CostModel::price_workload).
pub fn explain_workload(model: &DomainModel, workload: &Workload, costs: &[f64]) -> String {
    let mut out = String::new();
    for query_plan in workload.plans() {
        let _ = writeln!(out, "{}", query_plan.label);
        explain_level(model, workload, costs, &query_plan.plans, 1, &mut out);
    }
    for lookup in workload.direct_lookups() {
        let _ = writeln!(out, "{} by id", lookup.label);
    }
    out
}

fn explain_level(
    model: &DomainModel,
    workload: &Workload,
    costs: &[f64],
    plans: &[Plan],
    depth: usize,
    out: &mut String,
) {
    for plan in plans {
        let index = workload.index(plan.index);
        let _ = writeln!(
            out,
            "{}{} cost={:.3}",
            "  ".repeat(depth),
            index.key.describe(model),
            costs[plan.index.0]
        );
        explain_level(model, workload, costs, &plan.children, depth + 1, out);
    }
}

//! Span constructors used when the `tracing` feature is enabled.

use tracing::Span;

pub fn acquire_connection_span() -> Span {
    tracing::info_span!("dbshift.acquire_connection")
}

pub fn begin_transaction_span() -> Span {
    tracing::debug_span!("dbshift.transaction.begin")
}

pub fn commit_transaction_span() -> Span {
    tracing::debug_span!("dbshift.transaction.commit")
}

pub fn rollback_transaction_span() -> Span {
    tracing::debug_span!("dbshift.transaction.rollback")
}

pub fn execute_query_span(query: &str) -> Span {
    tracing::debug_span!("dbshift.execute_query", db.statement = %query)
}

/// Span covering one whole upgrade/downgrade/uninstall run.
pub fn migration_group_span(action: &str, stages: usize) -> Span {
    tracing::info_span!("dbshift.migration", action = %action, stages = stages)
}

pub fn stage_span(version: &str, direction: &str) -> Span {
    tracing::info_span!("dbshift.stage", version = %version, direction = %direction)
}

//! Per-query execution context
//!
//! Carries the executing node's identity, the scanned row type, the
//! cancellation signal and the values of correlated variables. Clones share
//! state, so a handle kept by the caller can cancel a scan that owns
//! another clone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::config::ExecutorConfig;
use crate::observability::MetricsRegistry;
use crate::planner::{CorrelationId, Correlations};
use crate::schema::{Row, RowType, Value};

/// Cluster node identifier
pub type NodeId = Uuid;

struct ContextInner {
    query_id: Uuid,
    local_node: NodeId,
    row_type: RowType,
    cancel_check_interval: usize,
    cancelled: AtomicBool,
    correlations: RwLock<HashMap<CorrelationId, Row>>,
    metrics: Arc<MetricsRegistry>,
}

/// Execution context shared by every operator of one query on one node
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    pub fn new(
        local_node: NodeId,
        row_type: RowType,
        config: &ExecutorConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                query_id: Uuid::new_v4(),
                local_node,
                row_type,
                cancel_check_interval: config.cancel_check_interval.max(1),
                cancelled: AtomicBool::new(false),
                correlations: RwLock::new(HashMap::new()),
                metrics,
            }),
        }
    }

    /// Context with default executor settings and private metrics
    pub fn for_node(local_node: NodeId, row_type: RowType) -> Self {
        Self::new(
            local_node,
            row_type,
            &ExecutorConfig::default(),
            Arc::new(MetricsRegistry::new()),
        )
    }

    pub fn query_id(&self) -> Uuid {
        self.inner.query_id
    }

    pub fn local_node(&self) -> NodeId {
        self.inner.local_node
    }

    pub fn row_type(&self) -> &RowType {
        &self.inner.row_type
    }

    pub fn cancel_check_interval(&self) -> usize {
        self.inner.cancel_check_interval
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.inner.metrics
    }

    /// Raises the cancellation signal
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Binds the outer row for a correlated variable.
    ///
    /// Scans created afterwards evaluate their bounds against it; a nested
    /// loop rebinds and re-scans once per outer row.
    pub fn set_correlated(&self, id: CorrelationId, row: Row) {
        self.inner
            .correlations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, row);
    }

    pub fn clear_correlated(&self, id: CorrelationId) {
        self.inner
            .correlations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }
}

impl Correlations for ExecutionContext {
    fn correlated(&self, id: CorrelationId, field: usize) -> Option<Value> {
        self.inner
            .correlations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .and_then(|row| row.get(field).cloned())
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("query_id", &self.inner.query_id)
            .field("local_node", &self.inner.local_node)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

//! Join handler
//!
//! The right side is collected in full before matching, so it is bounded by
//! the store's join limit. The operation may lower that limit but not raise
//! it.

use crate::operation::join::join_items;
use crate::operation::{Data, Item, Operation};
use crate::store::context::Context;
use crate::store::error::{StoreError, StoreResult};
use crate::store::handler::{Execution, OperationHandler};
use async_trait::async_trait;
use tracing::debug;

pub struct JoinHandler {
    limit: usize,
}

impl JoinHandler {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

#[async_trait]
impl OperationHandler for JoinHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, Join);
        let limit = op.collection_limit.map_or(self.limit, |l| l.min(self.limit));

        let left: Vec<Item> = op.input.into_items().collect();
        let right_data = execution.run_operation(*op.operation, context).await?;
        let right: Vec<Item> = right_data.into_items().take(limit.saturating_add(1)).collect();
        if right.len() > limit {
            return Err(StoreError::JoinLimitExceeded { limit });
        }

        debug!(left = left.len(), right = right.len(), "Joining");
        let output = join_items(
            left,
            right,
            &op.match_method,
            op.match_key,
            op.join_type,
            op.flatten,
        )?;
        Ok(Data::list(output))
    }
}

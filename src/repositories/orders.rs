use std::sync::Arc;

use crate::adapter::DocumentCollectionAdapter;
use crate::context::RunContext;
use crate::driver::CollectionDriver;
use crate::errors::StoreError;
use crate::model::ConsolidationOrder;
use crate::query::{Direction, Query, and, contains, equals, order_by};

const MODULE_NAME: &str = "CONSOLIDATION-ORDERS-REPOSITORY";
pub const COLLECTION_NAME: &str = "consolidations";

/// Order search filters; unset fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct OrdersSearchPredicate {
    pub division_codes: Option<Vec<String>>,
    pub consolidation_id: Option<String>,
}

impl OrdersSearchPredicate {
    fn to_query(&self) -> Option<Query> {
        let mut conditions = Vec::new();
        if let Some(codes) = &self.division_codes {
            conditions.push(contains("courtDivisionCode", codes.iter().map(String::as_str)));
        }
        if let Some(id) = &self.consolidation_id {
            conditions.push(equals("consolidationId", id.as_str()));
        }
        if conditions.is_empty() { None } else { Some(and(conditions)) }
    }
}

#[derive(Clone)]
pub struct ConsolidationOrdersRepository {
    adapter: DocumentCollectionAdapter<ConsolidationOrder>,
}

impl ConsolidationOrdersRepository {
    pub fn new(ctx: &RunContext) -> Result<Self, StoreError> {
        Ok(Self::from_collection(ctx.collection(COLLECTION_NAME)?))
    }

    pub fn from_collection(collection: Arc<dyn CollectionDriver>) -> Self {
        Self { adapter: DocumentCollectionAdapter::new(MODULE_NAME, collection) }
    }

    pub async fn search(
        &self,
        predicate: &OrdersSearchPredicate,
    ) -> Result<Vec<ConsolidationOrder>, StoreError> {
        let query = predicate.to_query();
        let sort = order_by(vec![("orderDate".to_string(), Direction::Ascending)]);
        self.adapter.find(query.as_ref(), Some(&sort)).await
    }

    pub async fn read(&self, id: &str) -> Result<ConsolidationOrder, StoreError> {
        self.adapter.find_one(&equals("id", id)).await
    }

    pub async fn create(&self, order: &ConsolidationOrder) -> Result<ConsolidationOrder, StoreError> {
        let id = self.adapter.insert_one(order).await?;
        Ok(ConsolidationOrder { id: Some(id), ..order.clone() })
    }

    pub async fn create_many(
        &self,
        orders: &[ConsolidationOrder],
    ) -> Result<Vec<ConsolidationOrder>, StoreError> {
        let ids = self.adapter.insert_many(orders).await?;
        Ok(orders
            .iter()
            .zip(ids)
            .map(|(order, id)| ConsolidationOrder { id: Some(id), ..order.clone() })
            .collect())
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.adapter.delete_one(&equals("id", id)).await.map(|_| ())
    }

    /// Read-modify-replace. The stored id, order type and case id always win
    /// over the values carried by `order`.
    ///
    /// # Errors
    /// `BadInput` when `order` has no id; `NotFound` when it does not exist.
    pub async fn update(&self, order: &ConsolidationOrder) -> Result<ConsolidationOrder, StoreError> {
        let Some(id) = order.id.as_deref() else {
            return Err(StoreError::bad_input(MODULE_NAME, "Order id is required for update."));
        };
        let existing = self.read(id).await?;
        let merged = ConsolidationOrder {
            id: existing.id.clone(),
            order_type: existing.order_type,
            case_id: existing.case_id.clone(),
            ..order.clone()
        };
        match self.adapter.replace_one(&equals("id", id), &merged, false).await? {
            Some(_) => Ok(merged),
            None => Err(StoreError::not_found(MODULE_NAME, format!("Order {id} disappeared during update."))),
        }
    }
}

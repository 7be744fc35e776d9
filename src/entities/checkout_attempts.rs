//! SeaORM Entity for the checkout_attempts table
//!
//! One row per admission attempt, in any terminal status.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "checkout_attempts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub sale_id: i32,
    pub item_id: String,
    /// Checkout code handed to the client; NULL for rejected attempts
    pub code: Option<String>,
    /// pending | success | out_of_stock | user_limit | sale_limit | expired | completed | unknown
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

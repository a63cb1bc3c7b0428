use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Identity resolved from a verified bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: ObjectId,
}

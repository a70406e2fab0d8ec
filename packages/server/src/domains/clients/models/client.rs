use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::common::ClientId;
use crate::error::MatchingResult;

/// A wholesale buyer.
#[derive(FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_buyer: bool,
    pub created_at: DateTime<Utc>,
}

/// The slice of a client exposed alongside matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: ClientId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<&Client> for ClientSummary {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id,
            name: client.name.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
        }
    }
}

impl Client {
    pub async fn find_by_id(id: ClientId, pool: &PgPool) -> MatchingResult<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_buyers(pool: &PgPool) -> MatchingResult<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM clients WHERE is_buyer ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type UserId = u64;

/// Display fields of an intern, joined onto evaluation listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserSummary {
    #[schema(example = 12)]
    pub id: u64,
    #[schema(example = "Siti Rahma")]
    pub name: String,
    #[schema(example = "siti@kampus.ac.id")]
    pub email: String,
    #[schema(example = "Universitas Indonesia", nullable = true)]
    pub instansi: Option<String>,
}

/// Who an evaluation belongs to. Storage only knows the id; listings
/// resolve it against the identity directory before aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Owner {
    Unresolved { id: UserId },
    Resolved(UserSummary),
}

impl Owner {
    pub fn id(&self) -> UserId {
        match self {
            Owner::Unresolved { id } => *id,
            Owner::Resolved(summary) => summary.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Owner::Unresolved { .. } => None,
            Owner::Resolved(summary) => Some(summary.name.as_str()),
        }
    }

    /// Swaps a bare id for its summary when the directory knows it.
    pub fn resolve(self, directory: &HashMap<UserId, UserSummary>) -> Owner {
        match self {
            Owner::Unresolved { id } => match directory.get(&id) {
                Some(summary) => Owner::Resolved(summary.clone()),
                None => Owner::Unresolved { id },
            },
            resolved => resolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: u64, name: &str) -> UserSummary {
        UserSummary {
            id,
            name: name.to_string(),
            email: format!("{}@mail.test", name.to_lowercase()),
            instansi: None,
        }
    }

    #[test]
    fn resolve_leaves_unknown_ids_unresolved() {
        let directory = HashMap::from([(1, summary(1, "Ayu"))]);

        let known = Owner::Unresolved { id: 1 }.resolve(&directory);
        let unknown = Owner::Unresolved { id: 2 }.resolve(&directory);

        assert_eq!(known.name(), Some("Ayu"));
        assert_eq!(unknown, Owner::Unresolved { id: 2 });
        assert_eq!(unknown.id(), 2);
    }

    #[test]
    fn serializes_with_explicit_kind_tag() {
        let json = serde_json::to_value(Owner::Unresolved { id: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "unresolved", "id": 4}));

        let json = serde_json::to_value(Owner::Resolved(summary(5, "Budi"))).unwrap();
        assert_eq!(json["kind"], "resolved");
        assert_eq!(json["name"], "Budi");
    }
}

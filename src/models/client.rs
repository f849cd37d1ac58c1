// src/models/client.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Contato comercial, sempre pertencente a um único vendedor
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Client {
    pub id: Uuid,
    #[schema(example = "Maria da Silva")]
    pub name: String,
    #[schema(example = "Acme Ltda")]
    pub company_name: String,
    pub contact_info: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub website: String,
    pub notes: String,

    #[serde(skip_serializing)]
    pub owner_id: Uuid,
    // Username do dono (JOIN com users)
    #[serde(rename = "created_by")]
    pub owner: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Só os campos presentes são alterados.
    pub fn apply_changes(&mut self, name: Option<String>, fields: ClientFields) {
        if let Some(name) = name {
            self.name = name;
        }
        let ClientFields {
            company_name,
            contact_info,
            email,
            phone,
            address,
            city,
            state,
            country,
            postal_code,
            website,
            notes,
        } = fields;

        for (slot, value) in [
            (&mut self.company_name, company_name),
            (&mut self.contact_info, contact_info),
            (&mut self.email, email),
            (&mut self.phone, phone),
            (&mut self.address, address),
            (&mut self.city, city),
            (&mut self.state, state),
            (&mut self.country, country),
            (&mut self.postal_code, postal_code),
            (&mut self.website, website),
            (&mut self.notes, notes),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Campos editáveis do cliente. Na criação os ausentes viram string vazia;
/// na edição os ausentes mantêm o valor gravado.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ClientFields {
    #[validate(length(max = 200, message = "too_long"))]
    pub company_name: Option<String>,
    pub contact_info: Option<String>,
    #[validate(length(max = 254, message = "too_long"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateClientPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Maria da Silva")]
    pub name: String,

    // Quem está cadastrando (dono do registro)
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "ana.vendas")]
    pub username: String,

    #[serde(flatten)]
    #[validate(nested)]
    pub fields: ClientFields,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateClientPayload {
    #[validate(length(min = 1, message = "required"))]
    pub username: String,

    #[validate(length(min = 1, message = "required"))]
    pub name: Option<String>,

    #[serde(flatten)]
    #[validate(nested)]
    pub fields: ClientFields,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OwnerPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "ana.vendas")]
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_reads_flattened_fields() {
        let payload: CreateClientPayload = serde_json::from_value(serde_json::json!({
            "name": "Maria",
            "username": "ana",
            "company_name": "Acme",
            "city": "Recife"
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        assert_eq!(payload.fields.company_name.as_deref(), Some("Acme"));
        assert_eq!(payload.fields.city.as_deref(), Some("Recife"));
        assert!(payload.fields.phone.is_none());
    }

    #[test]
    fn update_changes_only_present_fields() {
        let now = chrono::Utc::now();
        let mut client = Client {
            id: Uuid::new_v4(),
            name: "Maria".into(),
            company_name: "Acme".into(),
            contact_info: String::new(),
            email: "maria@acme.com".into(),
            phone: "123".into(),
            address: String::new(),
            city: "Recife".into(),
            state: String::new(),
            country: String::new(),
            postal_code: String::new(),
            website: String::new(),
            notes: String::new(),
            owner_id: Uuid::new_v4(),
            owner: "ana".into(),
            created_at: now,
            updated_at: now,
        };

        client.apply_changes(
            None,
            ClientFields {
                city: Some("Olinda".into()),
                phone: Some(String::new()),
                ..Default::default()
            },
        );

        assert_eq!(client.name, "Maria");
        assert_eq!(client.city, "Olinda");
        assert_eq!(client.phone, "");
        assert_eq!(client.email, "maria@acme.com");
    }

    #[test]
    fn blank_name_is_rejected() {
        let payload = CreateClientPayload {
            name: String::new(),
            username: "ana".into(),
            fields: ClientFields::default(),
        };
        assert!(payload.validate().unwrap_err().field_errors().contains_key("name"));
    }
}

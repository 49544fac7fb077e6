//! Catalog records, write requests and search filters for the four
//! administered resources.

use serde::{Deserialize, Serialize};

// ============================================================================
// Authors
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(rename = "criacao", default)]
    pub created_at: String,
    #[serde(rename = "edicao", default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRequest {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "nacionalidade", skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(rename = "dataNascimento", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(rename = "biografia", skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(rename = "ativo", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorFilters {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ============================================================================
// Genres
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "criacao", default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRequest {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreFilters {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "descricao", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ============================================================================
// Books
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    #[serde(rename = "idGenero", default)]
    pub genre_id: i64,
    #[serde(rename = "idAutor", default)]
    pub author_id: i64,
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "linguagem", default)]
    pub language: String,
    #[serde(rename = "qtdUnidade", default)]
    pub units: i64,
    #[serde(rename = "criacao", default)]
    pub created_at: String,
    #[serde(rename = "edicao", default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRequest {
    #[serde(rename = "idGenero")]
    pub genre_id: i64,
    #[serde(rename = "idAutor")]
    pub author_id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "linguagem")]
    pub language: String,
    #[serde(rename = "qtdUnidade")]
    pub units: i64,
}

impl From<&Book> for BookRequest {
    fn from(book: &Book) -> Self {
        Self {
            genre_id: book.genre_id,
            author_id: book.author_id,
            title: book.title.clone(),
            description: book.description.clone(),
            language: book.language.clone(),
            units: book.units,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFilters {
    #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "descricao", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "linguagem", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "idGenero", skip_serializing_if = "Option::is_none")]
    pub genre_id: Option<i64>,
    #[serde(rename = "idAutor", skip_serializing_if = "Option::is_none")]
    pub author_id: Option<i64>,
}

// ============================================================================
// Users
// ============================================================================

/// A user account as returned by the service (the password is never sent back).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Position code, see [`POSITIONS`].
    #[serde(rename = "cargo", default)]
    pub position: String,
    #[serde(rename = "criacao", default)]
    pub created_at: String,
    #[serde(rename = "edicao", default)]
    pub updated_at: String,
}

/// Create/update body. Updates leave `password` unset.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequest {
    #[serde(rename = "nome")]
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "cargo")]
    pub position: String,
    #[serde(rename = "senha", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl std::fmt::Debug for UserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRequest")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("position", &self.position)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilters {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "cargo", skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// A position a user account can be given from the admin screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub code: &'static str,
    pub description: &'static str,
}

/// Positions offered when creating users. Administrators are not created here.
pub const POSITIONS: &[Position] = &[
    Position {
        code: "C",
        description: "Cliente",
    },
    Position {
        code: "F",
        description: "Funcionário",
    },
];

/// Looks up a position by its code.
pub fn position(code: &str) -> Option<&'static Position> {
    POSITIONS.iter().find(|p| p.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_uses_service_field_names() {
        let book: Book = serde_json::from_value(serde_json::json!({
            "id": 3,
            "idGenero": 1,
            "idAutor": 2,
            "titulo": "Dom Casmurro",
            "descricao": "Romance",
            "linguagem": "pt",
            "qtdUnidade": 4,
            "criacao": "2024-01-01",
            "edicao": "2024-01-02"
        }))
        .unwrap();
        assert_eq!(book.title, "Dom Casmurro");
        assert_eq!(book.units, 4);

        let request = BookRequest::from(&book);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["idAutor"], 2);
        assert_eq!(json["qtdUnidade"], 4);
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_empty_filters_serialize_to_empty_object() {
        let json = serde_json::to_value(BookFilters::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_author_request_skips_unset_optionals() {
        let request = AuthorRequest {
            name: "Machado".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"nome": "Machado"}));
    }

    #[test]
    fn test_user_update_omits_password() {
        let request = UserRequest {
            name: "Ana".to_string(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            position: "C".to_string(),
            password: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("senha").is_none());
        assert_eq!(json["cargo"], "C");
        assert!(!format!("{request:?}").contains("senha"));
    }

    #[test]
    fn test_position_lookup() {
        assert_eq!(position("F").map(|p| p.description), Some("Funcionário"));
        assert!(position("A").is_none());
    }
}

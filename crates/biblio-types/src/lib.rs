//! Wire types for the biblio catalog REST service.
//!
//! Field names follow the service's JSON (Portuguese, camelCase); the Rust
//! side uses English names with explicit `serde` renames.

pub mod auth;
pub mod catalog;
pub mod envelope;
pub mod page;

pub use auth::{Credentials, LoginResponse, SessionUser};
pub use catalog::{
    Author, AuthorFilters, AuthorRequest, Book, BookFilters, BookRequest, Genre, GenreFilters,
    GenreRequest, User, UserFilters, UserRequest,
};
pub use envelope::ApiEnvelope;
pub use page::{Page, SearchFilter};

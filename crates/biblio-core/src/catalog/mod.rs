//! CRUD and search for the administered resources.
//!
//! Every resource follows one template: a [`Resource`] marker names its
//! wire types and endpoint, [`CatalogService`] issues the calls and
//! [`CatalogStore`] keeps the screen state (records, selection, paging).

use std::fmt::Debug;

use biblio_types::{
    Author, AuthorFilters, AuthorRequest, Book, BookFilters, BookRequest, Genre, GenreFilters,
    GenreRequest, User, UserFilters, UserRequest,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::nav::RouteMeta;

mod service;
mod store;

pub use service::CatalogService;
pub use store::{CatalogStore, Pagination};

/// Static description of one catalog resource.
pub trait Resource: Send + Sync + 'static {
    type Record: Serialize + DeserializeOwned + Clone + Debug + Send + Sync;
    type Request: Serialize + Send + Sync;
    type Filters: Serialize + Default + Clone + Debug + Send + Sync;

    /// Singular, lower-case display name.
    const NAME: &'static str;
    /// Endpoint relative to the API base URL.
    const BASE_PATH: &'static str;
    /// Default `ordenacao` for searches.
    const DEFAULT_ORDER: &'static str;
    /// Access rules for this resource's screens.
    const ROUTE: RouteMeta = RouteMeta::AUTHENTICATED;

    fn id(record: &Self::Record) -> i64;
}

#[derive(Debug)]
pub enum Authors {}

impl Resource for Authors {
    type Record = Author;
    type Request = AuthorRequest;
    type Filters = AuthorFilters;

    const NAME: &'static str = "author";
    const BASE_PATH: &'static str = "api/v1/autores";
    const DEFAULT_ORDER: &'static str = "nome";

    fn id(record: &Author) -> i64 {
        record.id
    }
}

#[derive(Debug)]
pub enum Genres {}

impl Resource for Genres {
    type Record = Genre;
    type Request = GenreRequest;
    type Filters = GenreFilters;

    const NAME: &'static str = "genre";
    const BASE_PATH: &'static str = "api/v1/generos";
    const DEFAULT_ORDER: &'static str = "nome";

    fn id(record: &Genre) -> i64 {
        record.id
    }
}

#[derive(Debug)]
pub enum Books {}

impl Resource for Books {
    type Record = Book;
    type Request = BookRequest;
    type Filters = BookFilters;

    const NAME: &'static str = "book";
    const BASE_PATH: &'static str = "api/v1/livros";
    const DEFAULT_ORDER: &'static str = "titulo";

    fn id(record: &Book) -> i64 {
        record.id
    }
}

/// User administration is restricted to administrators.
#[derive(Debug)]
pub enum Users {}

impl Resource for Users {
    type Record = User;
    type Request = UserRequest;
    type Filters = UserFilters;

    const NAME: &'static str = "user";
    const BASE_PATH: &'static str = "api/v1/usuarios";
    const DEFAULT_ORDER: &'static str = "nome";
    const ROUTE: RouteMeta = RouteMeta::ADMIN;

    fn id(record: &User) -> i64 {
        record.id
    }
}

//! Search/get/create/update/delete for every catalog resource.

use std::sync::Arc;

use anyhow::{Context, Result};
use biblio_core::catalog::{CatalogService, CatalogStore, Resource};
use biblio_types::catalog::position;
use biblio_types::{Author, Book, Genre, User};
use comfy_table::{ContentArrangement, Table};

use crate::cli::app::App;

/// What to do with a resource, independent of how it was parsed.
#[derive(Debug)]
pub enum Action<F, W> {
    Search {
        filters: F,
        page: u32,
        size: u32,
        order: Option<String>,
    },
    Get(i64),
    Create(W),
    Update(i64, W),
    Delete(i64),
}

/// Records that can be listed as table rows.
pub trait Tabular {
    const HEADERS: &'static [&'static str];

    fn row(&self) -> Vec<String>;
}

impl Tabular for Author {
    const HEADERS: &'static [&'static str] = &["ID", "Name", "Created", "Updated"];

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.created_at.clone(),
            self.updated_at.clone(),
        ]
    }
}

impl Tabular for Genre {
    const HEADERS: &'static [&'static str] = &["ID", "Name", "Description"];

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.description.clone(),
        ]
    }
}

impl Tabular for Book {
    const HEADERS: &'static [&'static str] =
        &["ID", "Title", "Language", "Units", "Author", "Genre"];

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.language.clone(),
            self.units.to_string(),
            self.author_id.to_string(),
            self.genre_id.to_string(),
        ]
    }
}

impl Tabular for User {
    const HEADERS: &'static [&'static str] = &["ID", "Name", "Username", "Email", "Position"];

    fn row(&self) -> Vec<String> {
        let position = position(&self.position)
            .map_or_else(|| self.position.clone(), |p| p.description.to_string());
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.username.clone(),
            self.email.clone(),
            position,
        ]
    }
}

fn render_table<T: Tabular>(records: &[T]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(T::HEADERS.to_vec());
    for record in records {
        table.add_row(record.row());
    }
    table.to_string()
}

fn print_record<T: serde::Serialize>(record: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("format record")?;
    println!("{json}");
    Ok(())
}

/// Runs `action` on resource `R` behind the screen at `path`.
pub async fn run<R>(app: &App, path: &str, action: Action<R::Filters, R::Request>) -> Result<()>
where
    R: Resource,
    R::Record: Tabular,
{
    app.enter(path, R::ROUTE)?;
    let store = CatalogStore::<R>::new(CatalogService::new(Arc::clone(&app.api)));

    match action {
        Action::Search {
            filters,
            page,
            size,
            order,
        } => {
            store
                .search(|f| {
                    f.filters = filters;
                    if let Some(order) = order {
                        f.order_by = order;
                    }
                    f.set_size(size);
                    f.set_page(page);
                })
                .await?;

            let records = store.records();
            if records.is_empty() {
                println!("No {}s found", R::NAME);
                return Ok(());
            }
            println!("{}", render_table(&records));
            let pagination = store.pagination();
            println!(
                "Page {} of {} ({} total){}",
                pagination.current_page + 1,
                pagination.total_pages.max(1),
                pagination.total_records,
                if pagination.last { "" } else { "; more with --page" }
            );
        }
        Action::Get(id) => print_record(&store.get(id).await?)?,
        Action::Create(request) => {
            let record = store.create(&request).await?;
            eprintln!("Created {} {}", R::NAME, R::id(&record));
            print_record(&record)?;
        }
        Action::Update(id, request) => {
            let record = store.update(id, &request).await?;
            eprintln!("Updated {} {id}", R::NAME);
            print_record(&record)?;
        }
        Action::Delete(id) => {
            store.delete(id).await?;
            println!("Deleted {} {id}", R::NAME);
        }
    }
    Ok(())
}

//! HTTP surface: routes, form parsing and mapping catalog results to pages.

pub mod flash;
pub mod pages;

use std::path::Path;

use axum::{
	extract::{Path as UrlPath, Query, State},
	http::StatusCode,
	response::{IntoResponse, Redirect, Response},
	routing::{get, post},
	Form, Router,
};
use maud::Markup;
use serde::Deserialize;
use tower_cookies::{CookieManagerLayer, Cookies};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::error;

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::model::{non_blank, AuthorSelection, Bid, BookSort, ListQuery, NewAuthor, NewBook};
use flash::Flash;

const AUTHOR_DELETED: &str = "Its author had no other books and was deleted as well.";

#[derive(Clone)]
pub struct AppState {
	pub catalog: Catalog,
}

pub fn router(catalog: Catalog, static_dir: &Path) -> Router {
	Router::new()
		.route("/", get(display_books).post(search_books))
		.route("/add_author", get(display_author_form).post(add_author))
		.route("/add_book", get(display_book_form).post(add_book))
		.route("/book/:book_id/delete", post(delete_book))
		.nest_service("/static", ServeDir::new(static_dir))
		.layer(CookieManagerLayer::new())
		.layer(TraceLayer::new_for_http())
		.with_state(AppState{ catalog })
}

/// Store failures, shown as a 500 page.
#[derive(Debug)]
pub struct WebError(CatalogError);

impl From<CatalogError> for WebError {
	fn from(err: CatalogError) -> Self {
		WebError(err)
	}
}

impl IntoResponse for WebError {
	fn into_response(self) -> Response {
		error!(error = %self.0, "request failed");
		let page = pages::error_page(&user_message(&self.0));
		(StatusCode::INTERNAL_SERVER_ERROR, page).into_response()
	}
}

/// What the user is told when their request can't be carried out.
pub fn user_message(err: &CatalogError) -> String {
	match err {
		CatalogError::Validation{ field } => match *field {
			"name" => "Please provide the author's name.".to_string(),
			"title" => "Please provide the book's title.".to_string(),
			"publication_year" => "The publication year must be a whole number.".to_string(),
			"author_id" => "Please choose an author from the list.".to_string(),
			other => format!("Please provide a valid {other}."),
		},
		CatalogError::Reserved{ name } => format!("\"{name}\" is reserved, please choose another name."),
		CatalogError::Referential{ .. } => "The selected author does not exist.".to_string(),
		CatalogError::NotFound{ entity, .. } => format!("That {entity} could not be found."),
		CatalogError::OrphanCleanup{ .. } => {
			"The book could not be deleted, nothing was changed. Please try again.".to_string()
		}
		CatalogError::Store(_) => {
			"The library database is unavailable right now. Please try again.".to_string()
		}
	}
}

// user errors become an error flash, anything else aborts the request
fn report(err: CatalogError) -> Result<Vec<Flash>, WebError> {
	if err.is_user_error() {
		Ok(vec![Flash::error(user_message(&err))])
	} else {
		Err(err.into())
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
	#[serde(default)]
	pub sort_by: Option<BookSort>,
	#[serde(default)]
	pub search_keyword: Option<String>,
}

impl ListParams {
	// form values win over the query string
	fn merge(self, form: ListParams) -> ListQuery {
		ListQuery{
			search_keyword: form.search_keyword.or(self.search_keyword),
			sort_by: form.sort_by.or(self.sort_by).unwrap_or_default(),
		}
	}
}

async fn display_books(
	State(state): State<AppState>,
	cookies: Cookies,
	Query(params): Query<ListParams>,
) -> Result<Markup, WebError> {
	let query = params.merge(ListParams::default());
	let books = state.catalog.list_books(&query).await?;
	Ok(pages::home(&books, &query, &flash::take(&cookies)))
}

async fn search_books(
	State(state): State<AppState>,
	cookies: Cookies,
	Query(params): Query<ListParams>,
	Form(form): Form<ListParams>,
) -> Result<Markup, WebError> {
	let query = params.merge(form);
	let books = state.catalog.list_books(&query).await?;
	Ok(pages::home(&books, &query, &flash::take(&cookies)))
}

async fn display_author_form(cookies: Cookies) -> Markup {
	pages::author_form(&flash::take(&cookies))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthorForm {
	#[serde(default)]
	pub name: String,
	pub birth_date: Option<String>,
	pub date_of_death: Option<String>,
}

impl From<AuthorForm> for NewAuthor {
	fn from(form: AuthorForm) -> Self {
		NewAuthor{
			name: form.name,
			birth_date: non_blank(form.birth_date),
			date_of_death: non_blank(form.date_of_death),
		}
	}
}

async fn add_author(
	State(state): State<AppState>,
	cookies: Cookies,
	Form(form): Form<AuthorForm>,
) -> Result<Redirect, WebError> {
	let flashes = match state.catalog.create_author(form.into()).await {
		Ok(author) => vec![Flash::success(format!("Author '{author}' added successfully!"))],
		Err(err) => report(err)?,
	};
	flash::push(&cookies, flashes);
	Ok(Redirect::to("/add_author"))
}

async fn display_book_form(
	State(state): State<AppState>,
	cookies: Cookies,
) -> Result<Markup, WebError> {
	let authors = state.catalog.list_authors().await?;
	Ok(pages::book_form(&authors, &flash::take(&cookies)))
}

#[derive(Debug, Default, Deserialize)]
pub struct BookForm {
	#[serde(default)]
	pub title: String,
	pub isbn: Option<String>,
	pub publication_year: Option<String>,
	pub author_id: Option<String>,
}

/// "unknown" or an empty choice means no author was picked.
pub fn parse_selection(value: Option<&str>) -> Result<AuthorSelection, CatalogError> {
	match value.map(str::trim) {
		None | Some("") | Some("unknown") => Ok(AuthorSelection::Unassigned),
		Some(id) => id.parse()
			.map(AuthorSelection::Specified)
			.map_err(|_| CatalogError::validation("author_id")),
	}
}

pub fn parse_year(value: Option<&str>) -> Result<Option<i64>, CatalogError> {
	match value.map(str::trim) {
		None | Some("") => Ok(None),
		Some(year) => year.parse()
			.map(Some)
			.map_err(|_| CatalogError::validation("publication_year")),
	}
}

impl TryFrom<BookForm> for NewBook {
	type Error = CatalogError;

	fn try_from(form: BookForm) -> Result<Self, Self::Error> {
		Ok(NewBook{
			author: parse_selection(form.author_id.as_deref())?,
			publication_year: parse_year(form.publication_year.as_deref())?,
			isbn: non_blank(form.isbn),
			title: form.title,
		})
	}
}

async fn add_book(
	State(state): State<AppState>,
	cookies: Cookies,
	Form(form): Form<BookForm>,
) -> Result<Redirect, WebError> {
	let created = match NewBook::try_from(form) {
		Ok(book) => state.catalog.create_book(book).await,
		Err(err) => Err(err),
	};
	let flashes = match created {
		Ok(book) => vec![Flash::success(format!("Book '{book}' added successfully!"))],
		Err(err) => report(err)?,
	};
	flash::push(&cookies, flashes);
	Ok(Redirect::to("/add_book"))
}

async fn delete_book(
	State(state): State<AppState>,
	cookies: Cookies,
	UrlPath(book_id): UrlPath<Bid>,
) -> Result<Redirect, WebError> {
	let flashes = match state.catalog.delete_book(book_id).await {
		Ok(deleted) => {
			let mut flashes = vec![Flash::success(format!("Book '{}' deleted successfully!", deleted.title))];
			if deleted.author_deleted {
				flashes.push(Flash::success(AUTHOR_DELETED));
			}
			flashes
		}
		Err(err) => report(err)?,
	};
	flash::push(&cookies, flashes);
	Ok(Redirect::to("/"))
}

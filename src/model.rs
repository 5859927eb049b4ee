use std::fmt;

use serde::Deserialize;

pub type Aid = i64;
pub type Bid = i64;

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

const COVER_URL_BASE: &str = "https://covers.openlibrary.org/b/isbn";

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Author {
	#[sqlx(rename = "author_id")]
	pub id: Aid,
	pub name: String,
	pub birth_date: Option<String>,
	pub date_of_death: Option<String>,
}

impl Author {
	pub fn is_unknown(&self) -> bool {
		self.name == UNKNOWN_AUTHOR
	}

	pub fn is_living(&self) -> bool {
		self.date_of_death.is_none()
	}
}

impl fmt::Display for Author {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
	#[sqlx(rename = "book_id")]
	pub id: Bid,
	pub author_id: Aid,
	pub isbn: Option<String>,
	pub title: String,
	pub publication_year: Option<i64>,
}

impl fmt::Display for Book {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.title)
	}
}

/// Who a new book should be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorSelection {
	Specified(Aid),
	/// Falls back to the "Unknown Author" record.
	Unassigned,
}

impl From<Option<Aid>> for AuthorSelection {
	fn from(id: Option<Aid>) -> Self {
		match id {
			Some(id) => AuthorSelection::Specified(id),
			None => AuthorSelection::Unassigned,
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct NewAuthor {
	pub name: String,
	pub birth_date: Option<String>,
	pub date_of_death: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBook {
	pub title: String,
	pub isbn: Option<String>,
	pub publication_year: Option<i64>,
	pub author: AuthorSelection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum BookSort {
	#[default]
	Title,
	Author,
}

// anything that isn't "author" sorts by title
impl From<&str> for BookSort {
	fn from(s: &str) -> Self {
		if s.trim().eq_ignore_ascii_case("author") {
			BookSort::Author
		} else {
			BookSort::Title
		}
	}
}

impl From<String> for BookSort {
	fn from(s: String) -> Self {
		BookSort::from(s.as_str())
	}
}

impl BookSort {
	pub fn as_str(self) -> &'static str {
		match self {
			BookSort::Title => "title",
			BookSort::Author => "author",
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
	pub search_keyword: Option<String>,
	pub sort_by: BookSort,
}

impl ListQuery {
	/// The keyword to filter on, if there is a non-blank one.
	pub fn keyword(&self) -> Option<&str> {
		self.search_keyword
			.as_deref()
			.map(str::trim)
			.filter(|k| !k.is_empty())
	}
}

/// A book as shown on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookListing {
	pub book: Book,
	pub author_name: String,
	pub cover_url: Option<String>,
}

impl BookListing {
	pub fn new(book: Book, author_name: String) -> Self {
		let cover_url = cover_url(book.isbn.as_deref());
		BookListing{ book, author_name, cover_url }
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedBook {
	pub title: String,
	pub author_deleted: bool,
}

pub fn cover_url(isbn: Option<&str>) -> Option<String> {
	let isbn = isbn.map(str::trim).filter(|i| !i.is_empty())?;
	Some(format!("{COVER_URL_BASE}/{isbn}-L.jpg"))
}

/// Trims a form value, mapping blank input to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}

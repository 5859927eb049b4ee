// SQLite persistence for authors and books.
//
// Every function takes an executor so the catalog decides whether it runs on
// the pool or inside a transaction.

use sqlx::{Executor, Sqlite, SqlitePool};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::model::{Aid, Author, Bid, Book, BookSort, NewAuthor};

pub const TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS authors (
	author_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	name TEXT NOT NULL,
	birth_date TEXT,
	date_of_death TEXT
);

CREATE TABLE IF NOT EXISTS books (
	book_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	author_id INTEGER NOT NULL,
	isbn TEXT,
	title TEXT NOT NULL,
	publication_year INTEGER,
	FOREIGN KEY(author_id) REFERENCES authors(author_id)
);

CREATE INDEX IF NOT EXISTS books_author_id ON books(author_id);
"#;

pub async fn connect(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<SqlitePool, sqlx::Error> {
	// foreign keys are on by default in sqlx, set it anyway since the
	// catalog depends on it
	let options = SqliteConnectOptions::from_str(url)?
		.foreign_keys(true)
		.create_if_missing(true);

	SqlitePoolOptions::new()
		.max_connections(max_connections)
		.acquire_timeout(acquire_timeout)
		.connect_with(options).await
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
	pool.execute(TABLE_SCHEMA).await?;
	Ok(())
}

pub async fn find_author_by_name<'e, E>(db: E, name: &str) -> Result<Option<Author>, sqlx::Error>
where E: Executor<'e, Database = Sqlite> {
	sqlx::query_as(r#"
SELECT author_id, name, birth_date, date_of_death
FROM authors
WHERE name = ?
ORDER BY author_id
LIMIT 1
	"#)
		.bind(name)
		.fetch_optional(db).await
}

pub async fn select_author<'e, E>(db: E, id: Aid) -> Result<Option<Author>, sqlx::Error>
where E: Executor<'e, Database = Sqlite> {
	sqlx::query_as("SELECT author_id, name, birth_date, date_of_death FROM authors WHERE author_id = ?")
		.bind(id)
		.fetch_optional(db).await
}

pub async fn select_authors<'e, E>(db: E) -> Result<Vec<Author>, sqlx::Error>
where E: Executor<'e, Database = Sqlite> {
	sqlx::query_as("SELECT author_id, name, birth_date, date_of_death FROM authors ORDER BY name, author_id")
		.fetch_all(db).await
}

pub async fn insert_author<'e, E>(db: E, author: &NewAuthor) -> Result<Author, sqlx::Error>
where E: Executor<'e, Database = Sqlite> {
	let id = sqlx::query(r#"
INSERT INTO authors
	(name, birth_date, date_of_death)
VALUES
	(?, ?, ?)
	"#)
		.bind(&author.name)
		.bind(&author.birth_date)
		.bind(&author.date_of_death)
		.execute(db).await?
		.last_insert_rowid();

	Ok(Author{
		id,
		name: author.name.clone(),
		birth_date: author.birth_date.clone(),
		date_of_death: author.date_of_death.clone(),
	})
}

pub async fn delete_author<'e, E>(db: E, id: Aid) -> Result<u64, sqlx::Error>
where E: Executor<'e, Database = Sqlite> {
	Ok(sqlx::query("DELETE FROM authors WHERE author_id = ?")
		.bind(id)
		.execute(db).await?
		.rows_affected())
}

pub async fn count_author_books<'e, E>(db: E, id: Aid) -> Result<i64, sqlx::Error>
where E: Executor<'e, Database = Sqlite> {
	let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books WHERE author_id = ?")
		.bind(id)
		.fetch_one(db).await?;
	Ok(count)
}

pub struct BookInsert<'a> {
	pub author_id: Aid,
	pub isbn: Option<&'a str>,
	pub title: &'a str,
	pub publication_year: Option<i64>,
}

pub async fn insert_book<'e, E>(db: E, book: &BookInsert<'_>) -> Result<Book, sqlx::Error>
where E: Executor<'e, Database = Sqlite> {
	let id = sqlx::query(r#"
INSERT INTO books
	(author_id, isbn, title, publication_year)
VALUES
	(?, ?, ?, ?)
	"#)
		.bind(book.author_id)
		.bind(book.isbn)
		.bind(book.title)
		.bind(book.publication_year)
		.execute(db).await?
		.last_insert_rowid();

	Ok(Book{
		id,
		author_id: book.author_id,
		isbn: book.isbn.map(str::to_string),
		title: book.title.to_string(),
		publication_year: book.publication_year,
	})
}

pub async fn select_author_books<'e, E>(db: E, id: Aid) -> Result<Vec<Book>, sqlx::Error>
where E: Executor<'e, Database = Sqlite> {
	sqlx::query_as(r#"
SELECT book_id, author_id, isbn, title, publication_year
FROM books
WHERE author_id = ?
ORDER BY title, book_id
	"#)
		.bind(id)
		.fetch_all(db).await
}

/// Deletes a book, returning it as it was.
pub async fn delete_book<'e, E>(db: E, id: Bid) -> Result<Option<Book>, sqlx::Error>
where E: Executor<'e, Database = Sqlite> {
	sqlx::query_as(r#"
DELETE FROM books
WHERE book_id = ?
RETURNING book_id, author_id, isbn, title, publication_year
	"#)
		.bind(id)
		.fetch_optional(db).await
}

#[derive(Debug, sqlx::FromRow)]
pub struct ListingRow {
	#[sqlx(flatten)]
	pub book: Book,
	pub author_name: String,
}

const LISTING_SELECT: &str = r#"
SELECT b.book_id, b.author_id, b.isbn, b.title, b.publication_year, a.name AS author_name
FROM books b
JOIN authors a ON a.author_id = b.author_id
"#;

fn order_clause(sort: BookSort) -> &'static str {
	// book_id breaks ties so equal keys keep a stable order
	match sort {
		BookSort::Title => "ORDER BY b.title ASC, b.book_id ASC",
		BookSort::Author => "ORDER BY a.name ASC, b.book_id ASC",
	}
}

/// Builds the listing query for an optional keyword and a sort order.
pub fn listing_sql(filtered: bool, sort: BookSort) -> String {
	let filter = if filtered {
		r"WHERE b.title LIKE ? ESCAPE '\'"
	} else {
		""
	};
	format!("{LISTING_SELECT}{filter}\n{}", order_clause(sort))
}

/// `%keyword%` with LIKE wildcards in the keyword escaped.
pub fn like_pattern(keyword: &str) -> String {
	let mut pattern = String::with_capacity(keyword.len() + 2);
	pattern.push('%');
	for c in keyword.chars() {
		if matches!(c, '%' | '_' | '\\') {
			pattern.push('\\');
		}
		pattern.push(c);
	}
	pattern.push('%');
	pattern
}

pub async fn select_listings<'e, E>(db: E, keyword: Option<&str>, sort: BookSort) -> Result<Vec<ListingRow>, sqlx::Error>
where E: Executor<'e, Database = Sqlite> {
	let sql = listing_sql(keyword.is_some(), sort);
	let query = sqlx::query_as::<_, ListingRow>(&sql);
	let query = match keyword {
		Some(keyword) => query.bind(like_pattern(keyword)),
		None => query,
	};
	query.fetch_all(db).await
}

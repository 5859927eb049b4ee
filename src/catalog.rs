//! Catalog service: authors, books and the rules tying them together.
//!
//! Each operation runs in its own transaction. A failure anywhere in an
//! operation drops the transaction, which rolls every write in it back.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{is_foreign_key_violation, CatalogError, CatalogResult};
use crate::model::{
	non_blank, Aid, Author, AuthorSelection, Bid, Book, BookListing, DeletedBook,
	ListQuery, NewAuthor, NewBook, UNKNOWN_AUTHOR,
};
use crate::store::{self, BookInsert};

#[derive(Debug, Clone)]
pub struct Catalog {
	pool: SqlitePool,
}

impl Catalog {
	pub fn new(pool: SqlitePool) -> Self {
		Catalog{ pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	pub async fn create_author(&self, author: NewAuthor) -> CatalogResult<Author> {
		let name = author.name.trim();
		if name.is_empty() {
			return Err(CatalogError::validation("name"));
		}
		// only the placeholder bootstrap may use this name
		if name.eq_ignore_ascii_case(UNKNOWN_AUTHOR) {
			return Err(CatalogError::Reserved{ name: UNKNOWN_AUTHOR });
		}
		let author = NewAuthor{
			name: name.to_string(),
			birth_date: non_blank(author.birth_date),
			date_of_death: non_blank(author.date_of_death),
		};

		let mut tx = self.pool.begin().await?;
		let author = store::insert_author(&mut *tx, &author).await?;
		tx.commit().await?;

		info!(author_id = author.id, name = %author.name, "created author");
		Ok(author)
	}

	/// Makes sure the "Unknown Author" record exists. Safe to call repeatedly.
	pub async fn ensure_unknown_author(&self) -> CatalogResult<Author> {
		let mut tx = self.pool.begin().await?;
		let author = unknown_author(&mut tx).await?;
		tx.commit().await?;
		Ok(author)
	}

	pub async fn create_book(&self, book: NewBook) -> CatalogResult<Book> {
		let title = book.title.trim();
		if title.is_empty() {
			return Err(CatalogError::validation("title"));
		}
		let isbn = non_blank(book.isbn);

		let mut tx = self.pool.begin().await?;
		let author_id = match book.author {
			AuthorSelection::Unassigned => unknown_author(&mut tx).await?.id,
			AuthorSelection::Specified(id) => {
				if store::select_author(&mut *tx, id).await?.is_none() {
					return Err(CatalogError::Referential{ author_id: id });
				}
				id
			}
		};

		let insert = BookInsert{
			author_id,
			isbn: isbn.as_deref(),
			title,
			publication_year: book.publication_year,
		};
		let book = store::insert_book(&mut *tx, &insert).await.map_err(|err| {
			if is_foreign_key_violation(&err) {
				CatalogError::Referential{ author_id }
			} else {
				CatalogError::Store(err)
			}
		})?;
		tx.commit().await?;

		info!(book_id = book.id, author_id, title = %book.title, "created book");
		Ok(book)
	}

	pub async fn list_books(&self, query: &ListQuery) -> CatalogResult<Vec<BookListing>> {
		let keyword = query.keyword();
		debug!(?keyword, sort_by = query.sort_by.as_str(), "listing books");

		let rows = store::select_listings(&self.pool, keyword, query.sort_by).await?;
		Ok(rows.into_iter()
			.map(|row| BookListing::new(row.book, row.author_name))
			.collect())
	}

	/// Deletes a book, and its author too when that author has no books
	/// left and isn't the "Unknown Author".
	pub async fn delete_book(&self, book_id: Bid) -> CatalogResult<DeletedBook> {
		let mut tx = self.pool.begin().await?;

		// the delete is the transaction's first statement, so it takes the
		// write lock before anything is read; a concurrent delete waits for
		// this one to commit instead of failing on a lock upgrade
		let book = store::delete_book(&mut *tx, book_id).await?
			.ok_or_else(|| CatalogError::book_not_found(book_id))?;

		let author_deleted = match remove_if_orphaned(&mut tx, book.author_id).await {
			Ok(deleted) => deleted,
			Err(source) => {
				warn!(book_id, author_id = book.author_id, error = %source, "orphan cleanup failed, rolling back");
				return Err(CatalogError::OrphanCleanup{
					book_id,
					author_id: book.author_id,
					source,
				});
			}
		};

		tx.commit().await?;

		info!(book_id, author_id = book.author_id, author_deleted, "deleted book");
		Ok(DeletedBook{ title: book.title, author_deleted })
	}

	pub async fn list_authors(&self) -> CatalogResult<Vec<Author>> {
		Ok(store::select_authors(&self.pool).await?)
	}

	pub async fn get_author(&self, id: Aid) -> CatalogResult<Author> {
		store::select_author(&self.pool, id).await?
			.ok_or_else(|| CatalogError::author_not_found(id))
	}

	/// Books written by an author.
	pub async fn author_books(&self, id: Aid) -> CatalogResult<Vec<Book>> {
		let mut tx = self.pool.begin().await?;
		if store::select_author(&mut *tx, id).await?.is_none() {
			return Err(CatalogError::author_not_found(id));
		}
		let books = store::select_author_books(&mut *tx, id).await?;
		tx.commit().await?;
		Ok(books)
	}
}

async fn unknown_author(conn: &mut SqliteConnection) -> CatalogResult<Author> {
	if let Some(author) = store::find_author_by_name(&mut *conn, UNKNOWN_AUTHOR).await? {
		return Ok(author);
	}
	let author = store::insert_author(&mut *conn, &NewAuthor{
		name: UNKNOWN_AUTHOR.to_string(),
		..Default::default()
	}).await?;
	info!(author_id = author.id, "created placeholder author");
	Ok(author)
}

async fn remove_if_orphaned(conn: &mut SqliteConnection, author_id: Aid) -> Result<bool, sqlx::Error> {
	let Some(author) = store::select_author(&mut *conn, author_id).await? else {
		return Ok(false);
	};
	if author.is_unknown() {
		return Ok(false);
	}
	if store::count_author_books(&mut *conn, author_id).await? > 0 {
		return Ok(false);
	}
	Ok(store::delete_author(&mut *conn, author_id).await? > 0)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::BookSort;
	use crate::testing::memory_catalog;

	fn book(title: &str, author: AuthorSelection) -> NewBook {
		NewBook{
			title: title.to_string(),
			isbn: None,
			publication_year: None,
			author,
		}
	}

	fn author(name: &str) -> NewAuthor {
		NewAuthor{ name: name.to_string(), ..Default::default() }
	}

	async fn count_authors(catalog: &Catalog) -> usize {
		catalog.list_authors().await.unwrap().len()
	}

	#[tokio::test]
	async fn empty_author_name_is_rejected() {
		let catalog = memory_catalog().await;
		let before = count_authors(&catalog).await;

		let err = catalog.create_author(author("   ")).await.unwrap_err();
		assert!(matches!(err, CatalogError::Validation{ field: "name" }));
		assert_eq!(count_authors(&catalog).await, before);
	}

	#[tokio::test]
	async fn author_dates_are_optional() {
		let catalog = memory_catalog().await;
		let created = catalog.create_author(NewAuthor{
			name: " Ursula K. Le Guin ".into(),
			birth_date: Some("1929-10-21".into()),
			date_of_death: Some("".into()),
		}).await.unwrap();

		assert_eq!(created.name, "Ursula K. Le Guin");
		assert!(created.is_living());

		let stored = catalog.get_author(created.id).await.unwrap();
		assert_eq!(stored, created);
	}

	#[tokio::test]
	async fn placeholder_name_is_reserved() {
		let catalog = memory_catalog().await;
		catalog.ensure_unknown_author().await.unwrap();

		for name in [UNKNOWN_AUTHOR, " unknown author "] {
			let err = catalog.create_author(author(name)).await.unwrap_err();
			assert!(matches!(err, CatalogError::Reserved{ .. }));
		}
		assert_eq!(count_authors(&catalog).await, 1);
	}

	#[tokio::test]
	async fn duplicate_author_names_are_allowed() {
		let catalog = memory_catalog().await;
		let a = catalog.create_author(author("Anonymous")).await.unwrap();
		let b = catalog.create_author(author("Anonymous")).await.unwrap();
		assert_ne!(a.id, b.id);
	}

	#[tokio::test]
	async fn unknown_author_bootstrap_is_idempotent() {
		let catalog = memory_catalog().await;
		let first = catalog.ensure_unknown_author().await.unwrap();
		let second = catalog.ensure_unknown_author().await.unwrap();
		assert_eq!(first.id, second.id);

		let unknowns = catalog.list_authors().await.unwrap()
			.into_iter()
			.filter(Author::is_unknown)
			.count();
		assert_eq!(unknowns, 1);
	}

	#[tokio::test]
	async fn empty_title_is_rejected() {
		let catalog = memory_catalog().await;
		let err = catalog.create_book(book("", AuthorSelection::Unassigned)).await.unwrap_err();
		assert!(matches!(err, CatalogError::Validation{ field: "title" }));
		assert!(catalog.list_books(&ListQuery::default()).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn unassigned_book_goes_to_unknown_author() {
		let catalog = memory_catalog().await;
		let created = catalog.create_book(book("Beowulf", AuthorSelection::Unassigned)).await.unwrap();
		let unknown = catalog.ensure_unknown_author().await.unwrap();
		assert_eq!(created.author_id, unknown.id);

		let listing = catalog.list_books(&ListQuery::default()).await.unwrap();
		assert_eq!(listing.len(), 1);
		assert_eq!(listing[0].author_name, UNKNOWN_AUTHOR);
	}

	#[tokio::test]
	async fn missing_author_is_referential_error() {
		let catalog = memory_catalog().await;
		let err = catalog.create_book(book("Ghost", AuthorSelection::Specified(404))).await.unwrap_err();
		assert!(matches!(err, CatalogError::Referential{ author_id: 404 }));
		assert!(catalog.list_books(&ListQuery::default()).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn search_is_case_insensitive_substring() {
		let catalog = memory_catalog().await;
		catalog.create_book(book("The Hobbit", AuthorSelection::Unassigned)).await.unwrap();
		catalog.create_book(book("Dune", AuthorSelection::Unassigned)).await.unwrap();

		for keyword in ["hobbit", "HOBBIT", "obb"] {
			let query = ListQuery{ search_keyword: Some(keyword.into()), ..Default::default() };
			let found = catalog.list_books(&query).await.unwrap();
			assert_eq!(found.len(), 1, "keyword {keyword}");
			assert_eq!(found[0].book.title, "The Hobbit");
		}

		let query = ListQuery{ search_keyword: Some("silmarillion".into()), ..Default::default() };
		assert!(catalog.list_books(&query).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn search_treats_wildcards_literally() {
		let catalog = memory_catalog().await;
		catalog.create_book(book("100% Cotton", AuthorSelection::Unassigned)).await.unwrap();
		catalog.create_book(book("1000 Cranes", AuthorSelection::Unassigned)).await.unwrap();

		let query = ListQuery{ search_keyword: Some("100%".into()), ..Default::default() };
		let found = catalog.list_books(&query).await.unwrap();
		assert_eq!(found.len(), 1);
		assert_eq!(found[0].book.title, "100% Cotton");
	}

	#[tokio::test]
	async fn sorting_by_title_and_author() {
		let catalog = memory_catalog().await;
		let zola = catalog.create_author(author("Zola")).await.unwrap();
		let austen = catalog.create_author(author("Austen")).await.unwrap();
		catalog.create_book(book("Atonement", AuthorSelection::Specified(zola.id))).await.unwrap();
		catalog.create_book(book("Persuasion", AuthorSelection::Specified(austen.id))).await.unwrap();
		catalog.create_book(book("Emma", AuthorSelection::Specified(austen.id))).await.unwrap();

		let titles = |listing: Vec<BookListing>| -> Vec<String> {
			listing.into_iter().map(|l| l.book.title).collect()
		};

		let by_title = catalog.list_books(&ListQuery::default()).await.unwrap();
		assert_eq!(titles(by_title), ["Atonement", "Emma", "Persuasion"]);

		let query = ListQuery{ sort_by: BookSort::Author, ..Default::default() };
		let by_author = catalog.list_books(&query).await.unwrap();
		let names: Vec<_> = by_author.iter().map(|l| l.author_name.clone()).collect();
		assert_eq!(names, ["Austen", "Austen", "Zola"]);
		// equal author names fall back to insertion order
		assert_eq!(titles(by_author), ["Persuasion", "Emma", "Atonement"]);
	}

	#[tokio::test]
	async fn deleting_last_book_removes_author() {
		let catalog = memory_catalog().await;
		let herbert = catalog.create_author(author("Frank Herbert")).await.unwrap();
		let dune = catalog.create_book(book("Dune", AuthorSelection::Specified(herbert.id))).await.unwrap();

		let deleted = catalog.delete_book(dune.id).await.unwrap();
		assert_eq!(deleted, DeletedBook{ title: "Dune".into(), author_deleted: true });
		assert!(matches!(
			catalog.get_author(herbert.id).await.unwrap_err(),
			CatalogError::NotFound{ entity: "author", .. },
		));
	}

	#[tokio::test]
	async fn author_with_remaining_books_is_kept() {
		let catalog = memory_catalog().await;
		let austen = catalog.create_author(author("Jane Austen")).await.unwrap();
		let emma = catalog.create_book(book("Emma", AuthorSelection::Specified(austen.id))).await.unwrap();
		catalog.create_book(book("Persuasion", AuthorSelection::Specified(austen.id))).await.unwrap();

		let deleted = catalog.delete_book(emma.id).await.unwrap();
		assert!(!deleted.author_deleted);

		let books = catalog.author_books(austen.id).await.unwrap();
		assert_eq!(books.len(), 1);
		assert_eq!(books[0].title, "Persuasion");
	}

	#[tokio::test]
	async fn unknown_author_survives_losing_every_book() {
		let catalog = memory_catalog().await;
		let beowulf = catalog.create_book(book("Beowulf", AuthorSelection::Unassigned)).await.unwrap();

		let deleted = catalog.delete_book(beowulf.id).await.unwrap();
		assert!(!deleted.author_deleted);

		let unknown = catalog.get_author(beowulf.author_id).await.unwrap();
		assert!(unknown.is_unknown());
		assert!(catalog.author_books(unknown.id).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn deleting_missing_book_changes_nothing() {
		let catalog = memory_catalog().await;
		catalog.create_book(book("Beowulf", AuthorSelection::Unassigned)).await.unwrap();

		let err = catalog.delete_book(9999).await.unwrap_err();
		assert!(matches!(err, CatalogError::NotFound{ entity: "book", id: 9999 }));
		assert_eq!(catalog.list_books(&ListQuery::default()).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn concurrent_deletes_of_last_books_remove_author_once() {
		let path = std::env::temp_dir().join(format!("bookshelf-concurrent-{}.sqlite", std::process::id()));
		let _ = std::fs::remove_file(&path);
		let url = format!("sqlite://{}", path.display());

		let pool = store::connect(&url, 2, std::time::Duration::from_secs(10)).await.unwrap();
		store::init_schema(&pool).await.unwrap();
		let catalog = Catalog::new(pool);

		let herbert = catalog.create_author(author("Frank Herbert")).await.unwrap();
		let dune = catalog.create_book(book("Dune", AuthorSelection::Specified(herbert.id))).await.unwrap();
		let messiah = catalog.create_book(book("Dune Messiah", AuthorSelection::Specified(herbert.id))).await.unwrap();

		let (first, second) = tokio::join!(
			catalog.delete_book(dune.id),
			catalog.delete_book(messiah.id),
		);
		let (first, second) = (first.unwrap(), second.unwrap());

		// exactly one of them saw the author's last book go
		assert!(first.author_deleted ^ second.author_deleted);
		assert!(matches!(
			catalog.get_author(herbert.id).await,
			Err(CatalogError::NotFound{ entity: "author", .. }),
		));

		catalog.pool().close().await;
		let _ = std::fs::remove_file(&path);
	}

	#[tokio::test]
	async fn failed_cleanup_rolls_back_book_delete() {
		let catalog = memory_catalog().await;
		let shelley = catalog.create_author(author("Mary Shelley")).await.unwrap();
		let frankenstein = catalog.create_book(book("Frankenstein", AuthorSelection::Specified(shelley.id))).await.unwrap();

		sqlx::query(r#"
CREATE TRIGGER keep_authors BEFORE DELETE ON authors
BEGIN
	SELECT RAISE(ABORT, 'authors are read only');
END
		"#).execute(catalog.pool()).await.unwrap();

		let err = catalog.delete_book(frankenstein.id).await.unwrap_err();
		assert!(matches!(
			err,
			CatalogError::OrphanCleanup{ book_id, author_id, .. }
				if book_id == frankenstein.id && author_id == shelley.id
		));
		assert_eq!(catalog.author_books(shelley.id).await.unwrap(), vec![frankenstein]);
	}

	#[tokio::test]
	async fn book_cannot_be_deleted_twice() {
		let catalog = memory_catalog().await;
		let beowulf = catalog.create_book(book("Beowulf", AuthorSelection::Unassigned)).await.unwrap();
		catalog.delete_book(beowulf.id).await.unwrap();
		assert!(catalog.delete_book(beowulf.id).await.unwrap_err().is_user_error());
	}
}

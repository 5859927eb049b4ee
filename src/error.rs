use thiserror::Error;

use crate::model::{Aid, Bid};

/// Errors raised by catalog operations.
///
/// The catalog never renders messages for users; the request layer decides
/// how each kind is presented.
#[derive(Debug, Error)]
pub enum CatalogError {
	/// A required field was missing or could not be parsed.
	#[error("{field} is required")]
	Validation { field: &'static str },

	/// The name belongs to the placeholder author.
	#[error("{name:?} is reserved")]
	Reserved { name: &'static str },

	/// A book referenced an author that does not exist.
	#[error("author {author_id} does not exist")]
	Referential { author_id: Aid },

	#[error("{entity} {id} not found")]
	NotFound { entity: &'static str, id: i64 },

	/// Removing the orphaned author failed, so the whole deletion of
	/// `book_id` was rolled back.
	#[error("deleting book {book_id} rolled back: cleanup of author {author_id} failed: {source}")]
	OrphanCleanup {
		book_id: Bid,
		author_id: Aid,
		#[source]
		source: sqlx::Error,
	},

	#[error("store error: {0}")]
	Store(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
	pub fn validation(field: &'static str) -> Self {
		CatalogError::Validation{ field }
	}

	pub fn book_not_found(id: Bid) -> Self {
		CatalogError::NotFound{ entity: "book", id }
	}

	pub fn author_not_found(id: Aid) -> Self {
		CatalogError::NotFound{ entity: "author", id }
	}

	/// Errors the user can fix by changing their input.
	pub fn is_user_error(&self) -> bool {
		matches!(
			self,
			CatalogError::Validation{..}
				| CatalogError::Reserved{..}
				| CatalogError::Referential{..}
				| CatalogError::NotFound{..}
		)
	}
}

// SQLITE_CONSTRAINT_FOREIGNKEY
const SQLITE_FOREIGN_KEY: &str = "787";

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
	match err {
		sqlx::Error::Database(db) => db.code().as_deref() == Some(SQLITE_FOREIGN_KEY),
		_ => false,
	}
}

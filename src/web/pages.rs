use maud::{html, Markup, DOCTYPE};

use crate::model::{Author, BookListing, BookSort, ListQuery, UNKNOWN_AUTHOR};
use super::flash::Flash;

fn layout(title: &str, flashes: &[Flash], content: Markup) -> Markup {
	html! {
		(DOCTYPE)
		html {
			head {
				meta charset="utf-8";
				title { (title) }
				link rel="stylesheet" href="/static/style.css";
			}
			body {
				nav {
					a href="/" { "Library" }
					a href="/add_author" { "Add author" }
					a href="/add_book" { "Add book" }
				}
				@for flash in flashes {
					div class={ "flash " (flash.level.as_str()) } { (flash.text) }
				}
				main { (content) }
			}
		}
	}
}

pub fn home(books: &[BookListing], query: &ListQuery, flashes: &[Flash]) -> Markup {
	let keyword = query.search_keyword.as_deref().unwrap_or_default();
	let sort = query.sort_by;

	layout("Library", flashes, html! {
		h1 { "Library" }

		form method="POST" action={ "/?sort_by=" (sort.as_str()) } {
			input name="search_keyword" type="search" placeholder="Search titles" value=(keyword);
			input name="sort_by" type="hidden" value=(sort.as_str());
			button { "Search" }
		}

		p class="sort" {
			"Sort by: "
			@for choice in [BookSort::Title, BookSort::Author] {
				@if choice == sort {
					strong { (choice.as_str()) }
				} @else {
					a href={ "/?sort_by=" (choice.as_str()) } { (choice.as_str()) }
				}
				" "
			}
		}

		@if books.is_empty() {
			p class="empty" {
				@if query.keyword().is_some() {
					"No books match your search."
				} @else {
					"The library is empty."
				}
			}
		} @else {
			table {
				thead{ tr {
					th { "Cover" }
					th { "Title" }
					th { "Author" }
					th { "Year" }
					th {}
				} }
				tbody {
					@for listing in books {
						tr {
							td {
								@if let Some(cover) = &listing.cover_url {
									img src=(cover) alt={ "Cover of " (listing.book.title) } loading="lazy";
								}
							}
							td { (listing.book.title) }
							td { (listing.author_name) }
							td {
								@if let Some(year) = listing.book.publication_year {
									(year)
								}
							}
							td {
								form method="POST" action={ "/book/" (listing.book.id) "/delete" } {
									button { "Delete" }
								}
							}
						}
					}
				}
			}
		}
	})
}

pub fn author_form(flashes: &[Flash]) -> Markup {
	layout("Add author", flashes, html! {
		h1 { "Add author" }
		form method="POST" action="/add_author" {
			label { "Name " input name="name" type="text" required; }
			label { "Birth date " input name="birth_date" type="date"; }
			label { "Date of death " input name="date_of_death" type="date"; }
			button { "Add author" }
		}
	})
}

pub fn book_form(authors: &[Author], flashes: &[Flash]) -> Markup {
	layout("Add book", flashes, html! {
		h1 { "Add book" }
		form method="POST" action="/add_book" {
			label { "Title " input name="title" type="text" required; }
			label { "ISBN " input name="isbn" type="text"; }
			label { "Publication year " input name="publication_year" type="number"; }
			label {
				"Author "
				select name="author_id" {
					option value="unknown" { (UNKNOWN_AUTHOR) }
					@for author in authors.iter().filter(|a| !a.is_unknown()) {
						option value=(author.id) { (author.name) }
					}
				}
			}
			button { "Add book" }
		}
	})
}

pub fn error_page(message: &str) -> Markup {
	layout("Error", &[], html! {
		h1 { "Something went wrong" }
		p { (message) }
		a href="/" { "Back to the library" }
	})
}

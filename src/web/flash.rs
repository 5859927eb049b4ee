// One-shot notices carried from a POST handler to the page it redirects to.

use tower_cookies::{Cookie, Cookies};

const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level { Success, Error }

impl Level {
	pub fn as_str(self) -> &'static str {
		match self {
			Level::Success => "success",
			Level::Error => "error",
		}
	}

	fn parse(s: &str) -> Option<Self> {
		match s {
			"success" => Some(Level::Success),
			"error" => Some(Level::Error),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
	pub level: Level,
	pub text: String,
}

impl Flash {
	pub fn success(text: impl Into<String>) -> Self {
		Flash{ level: Level::Success, text: text.into() }
	}

	pub fn error(text: impl Into<String>) -> Self {
		Flash{ level: Level::Error, text: text.into() }
	}
}

// one `level|text` per line
pub fn encode(flashes: &[Flash]) -> String {
	flashes.iter()
		.map(|f| format!("{}|{}", f.level.as_str(), f.text.replace('\n', " ")))
		.collect::<Vec<_>>()
		.join("\n")
}

pub fn decode(value: &str) -> Vec<Flash> {
	value.lines()
		.filter_map(|line| {
			let (level, text) = line.split_once('|')?;
			Some(Flash{ level: Level::parse(level)?, text: text.to_string() })
		})
		.collect()
}

/// Queues notices for the next page, after any still pending from the
/// request. Call once per response: the value written here is only decoded
/// when it comes back on the next request.
pub fn push(cookies: &Cookies, new: impl IntoIterator<Item = Flash>) {
	let mut flashes = cookies.get(FLASH_COOKIE)
		.map(|c| decode(c.value()))
		.unwrap_or_default();
	flashes.extend(new);
	if flashes.is_empty() {
		return;
	}

	// tower-cookies writes values verbatim but percent-decodes them on read
	let value = urlencoding::encode(&encode(&flashes)).into_owned();
	let cookie = Cookie::build((FLASH_COOKIE, value))
		.path("/")
		.http_only(true)
		.build();
	cookies.add(cookie);
}

/// Returns pending notices and clears them.
pub fn take(cookies: &Cookies) -> Vec<Flash> {
	let Some(cookie) = cookies.get(FLASH_COOKIE) else {
		return Vec::new();
	};
	let flashes = decode(cookie.value());

	let mut removal = Cookie::from(FLASH_COOKIE);
	removal.set_path("/");
	cookies.remove(removal);

	flashes
}

//! HTML rendering
//!
//! Both templates are embedded in the binary and compiled once. The page
//! template includes the fragment, so a full page and an in-place swap show
//! the same markup.

use crate::services::Navigation;
use serde::Serialize;
use tera::{Context, Tera};
use xkmini_common::Comic;

const INDEX_HTML: &str = include_str!("ui/index.html");
const FRAGMENT_HTML: &str = include_str!("ui/comic_fragment.html");

pub const MSG_ADDED: &str = "Comic added to favorites!";
pub const MSG_ALREADY_FAVORITE: &str = "Comic is already in your favorites.";
pub const MSG_SAVE_FAILED: &str = "Could not save favorite. Please try again.";

/// Banner shown instead of the comic after a favorite request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub text: &'static str,
    /// `success` or `info`
    pub kind: &'static str,
}

impl Notice {
    pub fn added() -> Self {
        Self {
            text: MSG_ADDED,
            kind: "success",
        }
    }

    pub fn already_favorite() -> Self {
        Self {
            text: MSG_ALREADY_FAVORITE,
            kind: "info",
        }
    }
}

/// Comic as shown on the page
#[derive(Debug, Clone, Serialize)]
pub struct ComicCard {
    pub num: i64,
    pub title: String,
    pub img: String,
    pub alt: String,
    pub date: String,
}

impl From<&Comic> for ComicCard {
    fn from(comic: &Comic) -> Self {
        Self {
            num: comic.num,
            title: comic.title.clone(),
            img: comic.img.clone(),
            alt: comic.alt.clone(),
            date: comic.display_date(),
        }
    }
}

/// Everything the fragment template can show
///
/// Precedence: `error`, then `notice`, then `comic`, else "No comic to display."
#[derive(Debug, Clone, Default, Serialize)]
pub struct FragmentView {
    pub error: Option<String>,
    pub notice: Option<Notice>,
    pub comic: Option<ComicCard>,
    pub nav: Option<Navigation>,
    /// Shown comic is already stored; the favorite button is disabled
    pub favorited: bool,
}

impl FragmentView {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn notice(notice: Notice) -> Self {
        Self {
            notice: Some(notice),
            ..Default::default()
        }
    }

    pub fn comic(comic: &Comic, nav: Navigation) -> Self {
        Self {
            comic: Some(ComicCard::from(comic)),
            nav: Some(nav),
            ..Default::default()
        }
    }

    pub fn favorited(mut self, favorited: bool) -> Self {
        self.favorited = favorited;
        self
    }
}

/// Compiled templates
#[derive(Debug)]
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("comic_fragment.html", FRAGMENT_HTML),
            ("index.html", INDEX_HTML),
        ])?;
        tera.set_escape_fn(escape_html);
        Ok(Self { tera })
    }

    /// Fragment only, for in-place swaps
    pub fn render_fragment(&self, view: &FragmentView) -> Result<String, tera::Error> {
        self.tera
            .render("comic_fragment.html", &Context::from_serialize(view)?)
    }

    /// Full page wrapping the fragment
    pub fn render_page(&self, view: &FragmentView) -> Result<String, tera::Error> {
        self.tera.render("index.html", &Context::from_serialize(view)?)
    }
}

/// Same as `tera::escape_html` except `/` is left alone, so image URLs in
/// attributes render unchanged
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

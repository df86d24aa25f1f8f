//! Server-rendered pages.
//!
//! Templates are compiled into the binary. Auto-escaping is off because user text is
//! escaped once on the way into the database; the few values stored raw (usernames, URL
//! segments) are escaped explicitly in the templates. Stored values placed in a link path
//! go through the `path_segment` filter.

use std::sync::LazyLock;

use axum::http::StatusCode;
use minijinja::{AutoEscape, Environment, context};
use serde::Serialize;

use crate::{
    sanitize::encode_path_segment,
    session::{Flash, Session},
};

const SOURCES: &[(&str, &str)] = &[
    ("base.jinja", include_str!("../templates/base.jinja")),
    ("pages/home.jinja", include_str!("../templates/pages/home.jinja")),
    ("pages/team.jinja", include_str!("../templates/pages/team.jinja")),
    ("pages/register.jinja", include_str!("../templates/pages/register.jinja")),
    ("pages/login.jinja", include_str!("../templates/pages/login.jinja")),
    ("pages/error.jinja", include_str!("../templates/pages/error.jinja")),
];

static TEMPLATES: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_filter("path_segment", |value: &str| encode_path_segment(value));
    for &(name, source) in SOURCES {
        env.add_template(name, source)
            .expect("bundled templates are checked by the test suite");
    }
    env
});

/// Navigation and notice data every page receives.
#[derive(Debug, Default, Serialize)]
pub struct Layout {
    pub logged_in: bool,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub flashes: Vec<Flash>,
}

impl Layout {
    /// Builds the layout and consumes the session's pending flashes.
    pub fn from_session(session: &mut Session) -> Self {
        Self {
            logged_in: session.logged_in,
            user_id: session.authenticated_user(),
            user_name: session.user_name.clone(),
            flashes: session.take_flashes(),
        }
    }
}

/// Renders `name` with the shared layout and page-specific data.
pub fn render<T: Serialize>(name: &str, layout: &Layout, page: T) -> Result<String, minijinja::Error> {
    TEMPLATES
        .get_template(name)?
        .render(context! { layout => layout, page => page })
}

pub fn render_error(status: StatusCode, message: &str) -> Result<String, minijinja::Error> {
    render(
        "pages/error.jinja",
        &Layout::default(),
        context! {
            status => status.as_u16(),
            reason => status.canonical_reason().unwrap_or("Error"),
            message => message,
        },
    )
}

//! Declarative route table. The router in [`crate::server`] is built from
//! [`Route::ALL`], so matching here and dispatch there cannot drift apart.

use axum::{http::Method, routing::MethodFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `GET /<app>/text`
    TextGet,
    /// `POST /<app>/text`
    TextPost,
    /// `POST /<app>/json`
    JsonPost,
    /// `GET /<app>/media`
    MediaGet,
    /// `GET /<app>`
    LandingGet,
    /// `POST /echo`
    EchoPost,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::TextGet,
        Route::TextPost,
        Route::JsonPost,
        Route::MediaGet,
        Route::LandingGet,
        Route::EchoPost,
    ];

    pub fn method(self) -> Method {
        match self {
            Self::TextGet | Self::MediaGet | Self::LandingGet => Method::GET,
            Self::TextPost | Self::JsonPost | Self::EchoPost => Method::POST,
        }
    }

    pub fn method_filter(self) -> MethodFilter {
        match self {
            Self::TextGet | Self::MediaGet | Self::LandingGet => MethodFilter::GET,
            Self::TextPost | Self::JsonPost | Self::EchoPost => MethodFilter::POST,
        }
    }

    /// Request path under the application prefix `app`.
    pub fn path(self, app: &str) -> String {
        match self {
            Self::TextGet | Self::TextPost => format!("/{app}/text"),
            Self::JsonPost => format!("/{app}/json"),
            Self::MediaGet => format!("/{app}/media"),
            Self::LandingGet => format!("/{app}"),
            Self::EchoPost => "/echo".to_string(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::TextGet => "text-get",
            Self::TextPost => "text-post",
            Self::JsonPost => "json-post",
            Self::MediaGet => "media-get",
            Self::LandingGet => "landing-get",
            Self::EchoPost => "echo-post",
        }
    }

    /// The route serving `method` on `path`, if any.
    pub fn resolve(method: &Method, path: &str, app: &str) -> Option<Route> {
        Self::ALL
            .into_iter()
            .find(|route| route.method() == *method && route.path(app) == path)
    }
}

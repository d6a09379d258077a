use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde::Serialize;

pub const USER_ID: &str = "userId";
pub const SESSION_ID: &str = "sessionId";
pub const IP_ADDRESS: &str = "ipAddress";
pub const ENVIRONMENT: &str = "environment";
pub const APP_NAME: &str = "appName";
pub const HOSTNAME: &str = "hostname";

/// Describes the request an evaluation is made for. Strategies, constraints and
/// variant overrides read their inputs from here.
///
/// The context is built by the caller from its own request, session and
/// authentication state, and passed to every evaluation call.
///
/// # Examples:
///
/// ```rust
/// use unleash_client::Context;
///
/// let context = Context::new()
///     .user_id("123")
///     .session_id("a4f2")
///     .ip_address("10.0.0.1")
///     .custom("tenant", "acme");
///
/// assert_eq!(context.get("userId"), Some("123"));
/// assert_eq!(context.get("tenant"), Some("acme"));
/// ```
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    properties: HashMap<String, String>,
}

impl Context {
    /// Initializes a new, empty [`Context`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier of the authenticated user. Any displayable id is accepted and
    /// stored in its string form.
    ///
    /// # Examples:
    ///
    /// ```rust
    /// use unleash_client::Context;
    ///
    /// let context = Context::new().user_id(42);
    /// assert_eq!(context.get_user_id(), Some("42"));
    /// ```
    pub fn user_id(mut self, user_id: impl ToString) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    /// Identifier of the current session.
    pub fn session_id(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_owned());
        self
    }

    /// Address of the client that issued the request.
    pub fn ip_address(mut self, ip_address: &str) -> Self {
        self.ip_address = Some(ip_address.to_owned());
        self
    }

    /// Name of the environment the application runs in.
    pub fn environment(mut self, environment: &str) -> Self {
        self.environment = Some(environment.to_owned());
        self
    }

    /// Name of the application.
    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_owned());
        self
    }

    /// Host name the request was addressed to.
    pub fn hostname(mut self, hostname: &str) -> Self {
        self.hostname = Some(hostname.to_owned());
        self
    }

    /// Custom property, usable by constraints, variant overrides and custom stickiness.
    ///
    /// A standard field name (`userId`, `sessionId`, `ipAddress`, `environment`,
    /// `appName` or `hostname`) sets that field, the same as its dedicated setter.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::Context;
    ///
    /// let context = Context::new().custom("userId", 42).custom("tenant", "acme");
    /// assert_eq!(context.get_user_id(), Some("42"));
    /// assert_eq!(context.get("tenant"), Some("acme"));
    /// ```
    pub fn custom(mut self, key: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        match key {
            USER_ID => self.user_id(value),
            SESSION_ID => self.session_id(value.as_str()),
            IP_ADDRESS => self.ip_address(value.as_str()),
            ENVIRONMENT => self.environment(value.as_str()),
            APP_NAME => self.app_name(value.as_str()),
            HOSTNAME => self.hostname(value.as_str()),
            _ => {
                self.properties.insert(key.to_owned(), value);
                self
            }
        }
    }

    /// Removes a custom property.
    pub fn remove_custom(mut self, key: &str) -> Self {
        self.properties.remove(key);
        self
    }

    /// The user id, if set.
    pub fn get_user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// The session id, if set.
    pub fn get_session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// The client IP address, if set.
    pub fn get_ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// The environment name, if set.
    pub fn get_environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// The application name, if set.
    pub fn get_app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    /// The host name, if set.
    pub fn get_hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Looks up a context value by its attribute name: one of the standard field
    /// names (`userId`, `sessionId`, `ipAddress`, `environment`, `appName`,
    /// `hostname`) or a custom property.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            USER_ID => self.get_user_id(),
            SESSION_ID => self.get_session_id(),
            IP_ADDRESS => self.get_ip_address(),
            ENVIRONMENT => self.get_environment(),
            APP_NAME => self.get_app_name(),
            HOSTNAME => self.get_hostname(),
            _ => self.properties.get(name).map(String::as_str),
        }
    }

    /// Fills the fields that are unset here from `fallback`.
    pub(crate) fn or(&self, fallback: &Context) -> Context {
        let mut merged = self.clone();
        merged.user_id = merged.user_id.or_else(|| fallback.user_id.clone());
        merged.session_id = merged.session_id.or_else(|| fallback.session_id.clone());
        merged.ip_address = merged.ip_address.or_else(|| fallback.ip_address.clone());
        merged.environment = merged.environment.or_else(|| fallback.environment.clone());
        merged.app_name = merged.app_name.or_else(|| fallback.app_name.clone());
        merged.hostname = merged.hostname.or_else(|| fallback.hostname.clone());
        for (k, v) in fallback.properties.iter() {
            merged.properties.entry(k.clone()).or_insert_with(|| v.clone());
        }
        merged
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(str) => write!(f, "{str}"),
            Err(_) => f.write_str("<invalid context>"),
        }
    }
}

//! Execution context

use crate::operation::Data;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// The requesting user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    /// Authorisations checked against element visibility expressions
    pub data_auths: HashSet<String>,
}

impl User {
    pub const UNKNOWN_USER_ID: &'static str = "UNKNOWN";

    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            data_auths: HashSet::new(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN_USER_ID)
    }

    /// Builder method: add a data authorisation
    pub fn data_auth(mut self, auth: impl Into<String>) -> Self {
        self.data_auths.insert(auth.into());
        self
    }

    pub fn data_auths<I, S>(mut self, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_auths.extend(auths.into_iter().map(Into::into));
        self
    }
}

/// Per-execution scope, created for one `execute` call
#[derive(Debug)]
pub struct Context {
    user: User,
    variables: HashMap<String, Data>,
    execution_id: Uuid,
    started_at: DateTime<Utc>,
}

impl Context {
    pub fn new(user: User) -> Self {
        Self {
            user,
            variables: HashMap::new(),
            execution_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Store a variable. Streams are drained first so the value can be read
    /// any number of times.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Data) {
        self.variables.insert(name.into(), value.materialise());
    }

    pub fn variable(&self, name: &str) -> Option<&Data> {
        self.variables.get(name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(User::unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Value;
    use crate::operation::{Item, ItemStream};

    #[test]
    fn test_contexts_are_distinct() {
        let a = Context::new(User::new("alice").data_auths(["public", "private"]));
        let b = Context::default();
        assert_ne!(a.execution_id(), b.execution_id());
        assert_eq!(a.user().data_auths.len(), 2);
        assert_eq!(b.user().user_id, User::UNKNOWN_USER_ID);
    }

    #[test]
    fn test_stream_variables_are_materialised() {
        let mut context = Context::default();
        let stream = ItemStream::new(vec![Item::Value(Value::Long(1))].into_iter());
        context.set_variable("x", Data::stream(stream));
        let first = context.variable("x").cloned().map(|d| d.into_items().count());
        let second = context.variable("x").cloned().map(|d| d.into_items().count());
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(1));
    }
}

//! Join
//!
//! The operation's input is the left side; running `operation` produces the
//! right side. Items from the side named by `match_key` are keyed, and each
//! collects its matches from the other side.
//!
//! | join type | keys kept |
//! |---|---|
//! | `Inner` | keys with at least one match |
//! | `Full` | every key |
//! | `Outer` | keys with no match |

use crate::element::Element;
use crate::function::{Function, FunctionResult};
use crate::operation::data::{Data, Item};
use crate::operation::{wire, Operation, Options};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    Full,
    Outer,
    #[default]
    Inner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchKey {
    #[default]
    Left,
    Right,
}

/// How a left item and a right item are compared
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "class")]
pub enum Match {
    #[default]
    Equal,
    /// Same identity and equal values for the listed properties
    ElementMatch {
        #[serde(default, rename = "groupByProperties")]
        group_by_properties: Vec<String>,
    },
    /// Compare the outputs of per-side key functions
    KeyFunctions {
        #[serde(default, rename = "firstKeyFunction")]
        left: Vec<Function>,
        #[serde(default, rename = "secondKeyFunction")]
        right: Vec<Function>,
    },
}

impl Match {
    /// Precompute the comparison key for an item on the given side
    pub fn key_for(&self, item: &Item, side: MatchKey) -> FunctionResult<Item> {
        match self {
            Match::KeyFunctions { left, right } => {
                let functions = if side == MatchKey::Left { left } else { right };
                Function::apply_all(functions, item.clone())
            }
            Match::Equal | Match::ElementMatch { .. } => Ok(item.clone()),
        }
    }

    /// Compare precomputed keys
    pub fn matches(&self, a: &Item, b: &Item) -> bool {
        match self {
            Match::ElementMatch {
                group_by_properties,
            } => match (a.as_element(), b.as_element()) {
                (Some(x), Some(y)) => element_match(x, y, group_by_properties),
                _ => false,
            },
            Match::Equal | Match::KeyFunctions { .. } => a == b,
        }
    }
}

fn element_match(a: &Element, b: &Element, group_by: &[String]) -> bool {
    a.core_equals(b)
        && group_by
            .iter()
            .all(|p| a.get_property(p) == b.get_property(p))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Join {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    /// Produces the right side
    pub operation: Box<Operation>,

    #[serde(default)]
    pub match_method: Match,

    #[serde(default)]
    pub match_key: MatchKey,

    #[serde(default)]
    pub join_type: JoinType,

    /// Emit `(left, right)` pairs instead of keyed groups
    #[serde(default)]
    pub flatten: bool,

    /// Lower the store's limit on the right side's size
    #[serde(default)]
    pub collection_limit: Option<usize>,

    #[serde(default)]
    pub options: Options,
}

impl Join {
    pub fn new(right: impl Into<Operation>) -> Self {
        Self {
            input: Data::Empty,
            operation: Box::new(right.into()),
            match_method: Match::Equal,
            match_key: MatchKey::Left,
            join_type: JoinType::Inner,
            flatten: false,
            collection_limit: None,
            options: Options::new(),
        }
    }

    pub fn input(mut self, input: impl Into<Data>) -> Self {
        self.input = input.into();
        self
    }

    pub fn match_method(mut self, method: Match) -> Self {
        self.match_method = method;
        self
    }

    pub fn match_key(mut self, key: MatchKey) -> Self {
        self.match_key = key;
        self
    }

    pub fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    pub fn flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    pub fn collection_limit(mut self, limit: usize) -> Self {
        self.collection_limit = Some(limit);
        self
    }
}

/// Join two materialised sides
pub fn join_items(
    left: Vec<Item>,
    right: Vec<Item>,
    method: &Match,
    match_key: MatchKey,
    join_type: JoinType,
    flatten: bool,
) -> FunctionResult<Vec<Item>> {
    let (keyed, other) = match match_key {
        MatchKey::Left => (left, right),
        MatchKey::Right => (right, left),
    };
    let other_side = match match_key {
        MatchKey::Left => MatchKey::Right,
        MatchKey::Right => MatchKey::Left,
    };

    let other_keys = other
        .iter()
        .map(|item| method.key_for(item, other_side))
        .collect::<FunctionResult<Vec<_>>>()?;

    let mut output = Vec::new();
    for item in keyed {
        let key = method.key_for(&item, match_key)?;
        let matches: Vec<Item> = other
            .iter()
            .zip(other_keys.iter())
            .filter(|(_, other_key)| method.matches(&key, other_key))
            .map(|(other_item, _)| other_item.clone())
            .collect();

        let keep = match join_type {
            JoinType::Inner => !matches.is_empty(),
            JoinType::Full => true,
            JoinType::Outer => matches.is_empty(),
        };
        if !keep {
            continue;
        }

        if flatten {
            let orient = |keyed_item: Item, matched: Item| match match_key {
                MatchKey::Left => Item::pair(keyed_item, matched),
                MatchKey::Right => Item::pair(matched, keyed_item),
            };
            if matches.is_empty() {
                output.push(orient(item, Item::Null));
            } else {
                for matched in matches {
                    output.push(orient(item.clone(), matched));
                }
            }
        } else {
            output.push(Item::keyed(item, matches));
        }
    }
    Ok(output)
}

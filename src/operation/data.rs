//! Runtime values flowing between operations
//!
//! - `Item`: one object (a value, element, seed, pair, keyed group, list or
//!   raw JSON that could not be decoded)
//! - `Data`: what an operation receives or returns: nothing, one item, or a
//!   lazy `ItemStream`
//!
//! Streams may hold backend resources. An `ItemStream` runs its release hook
//! exactly once: when it is exhausted, explicitly closed or dropped.

use crate::element::{Element, ElementSeed, Value};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Null,
    Value(Value),
    Element(Element),
    Seed(ElementSeed),
    Pair(Box<Item>, Box<Item>),
    Keyed { key: Box<Item>, values: Vec<Item> },
    List(Vec<Item>),
    Raw(serde_json::Value),
}

impl Item {
    pub fn type_name(&self) -> &'static str {
        match self {
            Item::Null => "Null",
            Item::Value(v) => v.type_name(),
            Item::Element(Element::Entity(_)) => "Entity",
            Item::Element(Element::Edge(_)) => "Edge",
            Item::Seed(ElementSeed::Entity { .. }) => "EntitySeed",
            Item::Seed(ElementSeed::Edge { .. }) => "EdgeSeed",
            Item::Pair(..) => "Pair",
            Item::Keyed { .. } => "Keyed",
            Item::List(_) => "List",
            Item::Raw(_) => "Raw",
        }
    }

    /// View this item as a plain value. Lists convert only when every
    /// member is itself a value.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Item::Value(v) => Some(v.clone()),
            Item::List(items) => items
                .iter()
                .map(Item::to_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Item::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn keyed(key: Item, values: Vec<Item>) -> Self {
        Item::Keyed {
            key: Box::new(key),
            values,
        }
    }

    pub fn pair(first: Item, second: Item) -> Self {
        Item::Pair(Box::new(first), Box::new(second))
    }
}

impl From<Value> for Item {
    fn from(v: Value) -> Self {
        Item::Value(v)
    }
}

impl From<Element> for Item {
    fn from(e: Element) -> Self {
        Item::Element(e)
    }
}

impl From<ElementSeed> for Item {
    fn from(s: ElementSeed) -> Self {
        Item::Seed(s)
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A lazy sequence of items with an optional release hook
pub struct ItemStream {
    iter: Box<dyn Iterator<Item = Item> + Send>,
    on_close: Option<ReleaseHook>,
}

impl ItemStream {
    pub fn new(iter: impl Iterator<Item = Item> + Send + 'static) -> Self {
        Self {
            iter: Box::new(iter),
            on_close: None,
        }
    }

    /// Builder method: run `hook` when the stream is released
    pub fn on_close(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    /// Release the stream's resources. Idempotent.
    pub fn close(&mut self) {
        self.iter = Box::new(std::iter::empty());
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl Iterator for ItemStream {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        match self.iter.next() {
            Some(item) => Some(item),
            None => {
                self.close();
                None
            }
        }
    }
}

impl Drop for ItemStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// A stream handle that can be shared by shallow operation clones.
/// The first consumer takes the stream; later consumers see it exhausted.
#[derive(Clone)]
pub struct SharedStream(Arc<Mutex<Option<ItemStream>>>);

impl SharedStream {
    fn new(stream: ItemStream) -> Self {
        Self(Arc::new(Mutex::new(Some(stream))))
    }

    fn take(&self) -> Option<ItemStream> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Input or output of an operation
#[derive(Clone, Default)]
pub enum Data {
    #[default]
    Empty,
    Item(Item),
    Stream(SharedStream),
}

impl Data {
    pub fn stream(stream: ItemStream) -> Self {
        Data::Stream(SharedStream::new(stream))
    }

    pub fn list(items: Vec<Item>) -> Self {
        Data::Item(Item::List(items))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Data::Empty)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Data::Stream(_))
    }

    /// Iterate the data as a collection. A single non-list item is a
    /// collection of one.
    pub fn into_items(self) -> Box<dyn Iterator<Item = Item> + Send> {
        match self {
            Data::Empty => Box::new(std::iter::empty()),
            Data::Item(Item::List(items)) => Box::new(items.into_iter()),
            Data::Item(item) => Box::new(std::iter::once(item)),
            Data::Stream(shared) => match shared.take() {
                Some(stream) => Box::new(stream),
                None => Box::new(std::iter::empty()),
            },
        }
    }

    /// Collapse into one item; streams are drained into a list
    pub fn into_item(self) -> Option<Item> {
        match self {
            Data::Empty => None,
            Data::Item(item) => Some(item),
            stream @ Data::Stream(_) => Some(Item::List(stream.into_items().collect())),
        }
    }

    /// Drain any stream so the data can be read more than once
    pub fn materialise(self) -> Data {
        match self {
            Data::Stream(_) => match self.into_item() {
                Some(item) => Data::Item(item),
                None => Data::Empty,
            },
            other => other,
        }
    }

    /// Close the underlying stream, if any, without reading it
    pub fn close(self) {
        if let Data::Stream(shared) = self {
            if let Some(mut stream) = shared.take() {
                stream.close();
            }
        }
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Empty => f.write_str("Empty"),
            Data::Item(item) => f.debug_tuple("Item").field(item).finish(),
            Data::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Item> for Data {
    fn from(item: Item) -> Self {
        Data::Item(item)
    }
}

impl From<Vec<Item>> for Data {
    fn from(items: Vec<Item>) -> Self {
        Data::list(items)
    }
}

impl From<Vec<Element>> for Data {
    fn from(elements: Vec<Element>) -> Self {
        Data::list(elements.into_iter().map(Item::Element).collect())
    }
}

impl From<Vec<Value>> for Data {
    fn from(values: Vec<Value>) -> Self {
        Data::list(values.into_iter().map(Item::Value).collect())
    }
}

impl From<Option<Item>> for Data {
    fn from(item: Option<Item>) -> Self {
        item.map(Data::Item).unwrap_or_default()
    }
}

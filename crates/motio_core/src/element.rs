//! Element adapter capability and registry
//!
//! The engine never touches a concrete render target. Whatever embeds it
//! (DOM bindings, a GPU scene graph, a test double) implements
//! [`ElementAdapter`] and registers the element in an [`ElementRegistry`].

use crate::reactive::ReactiveValue;
use crate::value::Value;
use slotmap::{new_key_type, SlotMap};
use std::rc::Rc;

new_key_type! {
    pub struct ElementId;
}

/// Extent along one axis
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
}

impl Axis {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn length(&self) -> f64 {
        self.max - self.min
    }
}

/// An element's box in viewport coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x: Axis,
    pub y: Axis,
}

impl BoundingBox {
    pub fn new(x: Axis, y: Axis) -> Self {
        Self { x, y }
    }

    pub fn width(&self) -> f64 {
        self.x.length()
    }

    pub fn height(&self) -> f64 {
        self.y.length()
    }
}

/// What the engine needs from an animated element
pub trait ElementAdapter {
    /// Read the host's current value for `key`, e.g. a computed style
    fn read_value(&self, key: &str) -> Option<Value>;

    /// Flush pending value changes to the host synchronously
    fn render(&self);

    /// Measure the element's layout box
    fn measure_viewport_box(&self) -> BoundingBox;

    /// The element's reactive value for `key`, if one exists
    fn get_value(&self, key: &str) -> Option<ReactiveValue>;

    /// Attach a reactive value for `key`
    fn add_value(&self, key: &str, value: ReactiveValue);
}

/// Owner of every element the engine can address by id
#[derive(Default)]
pub struct ElementRegistry {
    elements: SlotMap<ElementId, Rc<dyn ElementAdapter>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self {
            elements: SlotMap::with_key(),
        }
    }

    pub fn insert(&mut self, element: Rc<dyn ElementAdapter>) -> ElementId {
        self.elements.insert(element)
    }

    pub fn get(&self, id: ElementId) -> Option<Rc<dyn ElementAdapter>> {
        self.elements.get(id).cloned()
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Rc<dyn ElementAdapter>> {
        self.elements.remove(id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

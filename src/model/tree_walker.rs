use crate::model::{Attributes, Element, Model, Node, Position, Range, Text};

/// A chunk of a text node that lies within a walked range.
#[derive(Debug, Clone, PartialEq)]
pub struct TextProxy<'a> {
    pub text: &'a Text,
    /// Character offset of the chunk inside `text`.
    pub offset_in_text: usize,
    pub length: usize,
}

impl TextProxy<'_> {
    pub fn data(&self) -> String { self.text.slice(self.offset_in_text, self.length) }

    pub fn attributes(&self) -> &Attributes { &self.text.attributes }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item<'a> {
    /// Yielded when the walk enters the element.
    Element(&'a Element),
    Text(TextProxy<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkerValue<'a> {
    pub item: Item<'a>,
    pub previous_position: Position,
    pub next_position: Position,
}

/// Lazy pre-order walk over the items between two positions. Element ends are
/// stepped over silently.
#[derive(Debug, Clone)]
pub struct RangeItems<'a> {
    model: &'a Model,
    position: Position,
    end: Position,
}

impl<'a> RangeItems<'a> {
    pub(crate) fn new(model: &'a Model, range: &Range) -> Self {
        Self {
            model,
            position: range.start().clone(),
            end: range.end().clone(),
        }
    }
}

impl<'a> Iterator for RangeItems<'a> {
    type Item = WalkerValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.position == self.end || !self.position.is_before(&self.end) {
                return None;
            }

            let parent = self.model.parent_of(&self.position).ok()?;
            let offset = self.position.offset();

            let Some((node, node_start)) = parent.child_at_offset(offset) else {
                // At the end of an element: leave it.
                let parent_position = self.position.parent_position()?;
                self.position = parent_position.with_offset(parent_position.offset() + 1);
                continue;
            };

            let previous_position = self.position.clone();

            return match node {
                Node::Element(element) => {
                    self.position = self.position.child(0);
                    Some(WalkerValue {
                        item: Item::Element(element),
                        previous_position: previous_position.clone(),
                        next_position: previous_position.with_offset(offset + 1),
                    })
                }
                Node::Text(text) => {
                    let node_end = node_start + text.len();
                    let chunk_end = if self.end.has_same_parent_as(&self.position) {
                        node_end.min(self.end.offset())
                    } else {
                        node_end
                    };

                    self.position = self.position.with_offset(chunk_end);
                    Some(WalkerValue {
                        item: Item::Text(TextProxy {
                            text,
                            offset_in_text: offset - node_start,
                            length: chunk_end - offset,
                        }),
                        previous_position,
                        next_position: self.position.clone(),
                    })
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn pos(path: &[usize]) -> Position { Position::new("main", path.to_vec()) }

    fn describe(value: &WalkerValue<'_>) -> String {
        match &value.item {
            Item::Element(element) => format!("<{}>", element.name),
            Item::Text(proxy) => proxy.data(),
        }
    }

    fn model() -> Model {
        let mut model = Model::new("main", "$root");
        model
            .root_mut("main")
            .unwrap()
            .insert_at_offset(
                0,
                [
                    Element::new("p")
                        .with_children([
                            Node::from("abc"),
                            Text::new("def").with_attribute("bold", json!(true)).into(),
                        ])
                        .into(),
                    Element::new("p").with_children([Node::from("xyz")]).into(),
                ],
            )
            .unwrap();
        model
    }

    #[test]
    fn test_walk_across_elements() {
        let model = model();
        let range = Range::new(pos(&[0, 1]), pos(&[1, 2]));

        let items = range.items(&model).map(|value| describe(&value)).collect::<Vec<_>>();

        assert_eq!(items, vec!["bc", "def", "<p>", "xy"]);
    }

    #[test]
    fn test_walk_is_restartable() {
        let model = model();
        let range = Range::create_in(&model, "main", &[]).unwrap();

        let first = range.items(&model).count();
        let second = range.items(&model).count();

        assert_eq!(first, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_positions_of_items() {
        let model = model();
        let range = Range::new(pos(&[0, 2]), pos(&[0, 4]));

        let values = range.items(&model).collect::<Vec<_>>();

        assert_eq!(values.len(), 2);
        assert_eq!(values[0].previous_position, pos(&[0, 2]));
        assert_eq!(values[0].next_position, pos(&[0, 3]));
        assert_eq!(values[1].next_position, pos(&[0, 4]));
        assert!(matches!(&values[1].item, Item::Text(proxy) if proxy.attributes().contains_key("bold")));
    }
}

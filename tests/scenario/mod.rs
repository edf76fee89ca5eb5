use pretty_assertions::assert_eq;
use reconcile_tree::{Document, Element, Node, Position, Range, transform_deltas};
use serde::Deserialize;
use serde_json::Value;

/// Two users editing copies of the same document. Each side's deltas are
/// transformed over the other side's and applied on top of it; both copies
/// have to end up with `expected`.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Text of each paragraph of the shared starting document.
    initial: Vec<String>,
    /// Commands are written as `- split: { at: [0, 2] }`.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    left: Vec<Command>,
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    right: Vec<Command>,
    /// Text of each child of the root, text directly in the root prefixed
    /// with `#`.
    expected: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Command {
    InsertText {
        at: Vec<usize>,
        text: String,
    },
    InsertParagraph {
        at: Vec<usize>,
        text: String,
    },
    Remove {
        from: Vec<usize>,
        to: Vec<usize>,
    },
    Split {
        at: Vec<usize>,
    },
    Merge {
        at: Vec<usize>,
    },
    Unwrap {
        at: Vec<usize>,
    },
    SetAttribute {
        from: Vec<usize>,
        to: Vec<usize>,
        key: String,
        value: Value,
    },
}

fn pos(path: &[usize]) -> Position { Position::new("main", path.to_vec()) }

fn paragraph(text: &str) -> Node { Element::new("p").with_children([Node::from(text)]).into() }

impl Scenario {
    pub fn run(&self) {
        let mut left = self.document();
        let mut right = self.document();
        let base_version = left.version();

        self.apply_commands(&mut left, &self.left);
        self.apply_commands(&mut right, &self.right);

        let left_deltas = left.history().deltas_since(base_version).to_vec();
        let right_deltas = right.history().deltas_since(base_version).to_vec();
        let (left_transformed, right_transformed) = transform_deltas(&left_deltas, &right_deltas, true);

        for delta in right_transformed {
            left.apply_delta(delta)
                .unwrap_or_else(|error| panic!("{}: remote right delta failed: {error}", self.name));
        }
        for delta in left_transformed {
            right
                .apply_delta(delta)
                .unwrap_or_else(|error| panic!("{}: remote left delta failed: {error}", self.name));
        }

        assert_eq!(texts(&left), texts(&right), "{}: documents diverged", self.name);
        assert_eq!(texts(&left), self.expected, "{}", self.name);
    }

    fn document(&self) -> Document {
        let mut document = Document::default();
        let paragraphs = self.initial.iter().map(|text| paragraph(text)).collect();
        document
            .batch()
            .insert(pos(&[0]), paragraphs)
            .unwrap_or_else(|error| panic!("{}: invalid initial document: {error}", self.name));

        document
    }

    fn apply_commands(&self, document: &mut Document, commands: &[Command]) {
        for command in commands {
            let mut batch = document.batch();
            let result = match command {
                Command::InsertText { at, text } => batch.insert_text(&pos(at), text, Default::default()),
                Command::InsertParagraph { at, text } => batch.insert(pos(at), vec![paragraph(text)]),
                Command::Remove { from, to } => batch.remove(&Range::new(pos(from), pos(to))),
                Command::Split { at } => batch.split(&pos(at)),
                Command::Merge { at } => batch.merge(&pos(at)),
                Command::Unwrap { at } => batch.unwrap(&pos(at)),
                Command::SetAttribute { from, to, key, value } => {
                    batch.set_attribute(&Range::new(pos(from), pos(to)), key, value.clone())
                }
            };

            if let Err(error) = result {
                panic!("{}: {command:?} failed: {error}", self.name);
            }
        }
    }
}

fn texts(document: &Document) -> Vec<String> {
    document
        .model()
        .root("main")
        .map(|root| {
            root.children
                .iter()
                .map(|child| match child {
                    Node::Element(element) => element.text_content(),
                    Node::Text(text) => format!("#{}", text.data),
                })
                .collect()
        })
        .unwrap_or_default()
}

mod scenario;

use std::{fs, path::Path};

use pretty_assertions::assert_eq;
use reconcile_tree::{Document, DocumentConfig, Element, LiveSelection, Node, Position, Range};
use scenario::Scenario;
use serde::Deserialize;

#[test]
fn test_concurrent_edits_converge() {
    let scenarios = get_all_scenarios();
    assert!(!scenarios.is_empty(), "No scenarios found");

    for scenario in &scenarios {
        scenario.run();
    }
}

#[test]
fn test_editing_session() {
    let config = DocumentConfig::from_yaml("default_root_name: body\nundo_depth: 10\n").unwrap();
    let mut document = Document::new(config);
    let mut selection = LiveSelection::new(&mut document);
    let at = |path: &[usize]| Position::new("body", path.to_vec());

    document
        .batch()
        .insert(at(&[0]), vec![Element::new("p").with_children([Node::from("Hello world")]).into()])
        .unwrap();
    selection.collapse(document.model(), at(&[0, 11]));
    document.batch().split(&at(&[0, 5])).unwrap();

    // A caret at the end of the split element follows the moved tail.
    assert_eq!(selection.ranges(), vec![Range::collapsed(at(&[1, 6]))]);

    document.undo().unwrap();
    let restored = Document::from_json(&document.to_json().unwrap(), document.config().clone()).unwrap();

    assert_eq!(restored.model(), document.model());
    assert_eq!(
        restored.model().element_at("body", &[0]).unwrap().text_content(),
        "Hello world"
    );
    assert_eq!(selection.ranges(), vec![Range::collapsed(at(&[0, 11]))]);
}

fn get_all_scenarios() -> Vec<Scenario> {
    let scenarios_dir = Path::new("tests/scenarios");
    let entries = fs::read_dir(scenarios_dir)
        .expect("Failed to read scenarios directory")
        .collect::<Vec<_>>();

    let mut scenarios = Vec::new();

    for entry in entries {
        let entry = entry.expect("Failed to read directory entry");
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("yml") {
            let file = fs::File::open(&path).expect("Failed to open scenario file");
            for document in serde_yaml::Deserializer::from_reader(file) {
                let scenario = Scenario::deserialize(document).expect("Failed to deserialize scenario");
                scenarios.push(scenario);
            }
        }
    }

    scenarios
}

//! End-to-end scenarios on realistic process models.

use procdiff::diff::{EditKind, EditOperation};
use procdiff::extract::{Extractor, HashExtractor};
use procdiff::matching::{MatchPipeline, Stage};
use procdiff::node::{deep_copy, resolve_path, NodeInner};
use procdiff::xml::print_to_string;
use procdiff::{
    diff, diff_with_pipeline, match_trees, parse_str, DiffConfig, EditScript, MatchMode, NodeRef,
    Patcher,
};

const TRAVEL: &str = r#"<?xml version="1.0"?>
<description xmlns="http://cpee.org/ns/description/1.0">
  <manipulate id="init" label="Init">data.from = "Vienna"; data.to = "Prague"</manipulate>
  <call id="a1" endpoint="bookAir">
    <parameters>
      <label>Book flight</label>
      <method>:post</method>
      <arguments><from>data.from</from><to>data.to</to></arguments>
    </parameters>
    <code><finalize output="result">data.flight = result</finalize></code>
  </call>
  <parallel wait="-1" cancel="last">
    <parallel_branch>
      <call id="a2" endpoint="bookHotel">
        <parameters><label>Book hotel</label><method>:post</method></parameters>
      </call>
    </parallel_branch>
    <parallel_branch>
      <call id="a3" endpoint="bookCar">
        <parameters><label>Rent car</label><method>:post</method></parameters>
      </call>
    </parallel_branch>
  </parallel>
  <loop mode="pre_test" condition="data.retries &lt; 3">
    <call id="a4" endpoint="approve"><parameters><label>Approve</label></parameters></call>
    <manipulate id="a5">data.retries += 1</manipulate>
  </loop>
  <choose mode="exclusive">
    <alternative condition="data.flight != nil">
      <call id="a6" endpoint="notify"><parameters><label>Notify</label></parameters></call>
    </alternative>
    <otherwise><stop id="a7"/></otherwise>
  </choose>
</description>"#;

fn travel_with(from: &str, to: &str) -> NodeRef {
    parse_str(&TRAVEL.replacen(from, to, 1)).unwrap()
}

fn kinds(script: &EditScript) -> Vec<EditKind> {
    script.iter().map(EditOperation::kind).collect()
}

/// Replays the script and checks the result against the new tree.
fn assert_replays(old: &NodeRef, new: &NodeRef, script: &EditScript) {
    let patched = Patcher::new(old).apply(script).unwrap();
    let hasher = HashExtractor::new();
    assert_eq!(hasher.get(&patched), hasher.get(new));
}

#[test]
fn test_insert_before_identical_call() {
    let old = parse_str(r#"<description><call id="a1" endpoint="E"/></description>"#).unwrap();
    let new = parse_str(
        r#"<description><call id="a2" endpoint="E"/><call id="a1" endpoint="E"/></description>"#,
    )
    .unwrap();

    let script = diff(&old, &new, &DiffConfig::default()).unwrap();
    assert_eq!(kinds(&script), vec![EditKind::Insert]);
    assert_eq!(script.operations()[0].new_path(), Some("0"));
    assert_eq!(script.cost(), 1);
    assert_replays(&old, &new, &script);
}

#[test]
fn test_swap_in_loop_is_single_move() {
    let old = parse_str(
        r#"<description><loop mode="pre_test"><call endpoint="A"/><call endpoint="B"/></loop></description>"#,
    )
    .unwrap();
    let new = parse_str(
        r#"<description><loop mode="pre_test"><call endpoint="B"/><call endpoint="A"/></loop></description>"#,
    )
    .unwrap();

    let script = diff(&old, &new, &DiffConfig::default()).unwrap();
    assert_eq!(kinds(&script), vec![EditKind::Move]);
    assert_eq!(script.cost(), 1);
    assert_replays(&old, &new, &script);
}

#[test]
fn test_identity_for_every_mode() {
    for mode in [MatchMode::Fast, MatchMode::Balanced, MatchMode::Quality] {
        let old = parse_str(TRAVEL).unwrap();
        let new = parse_str(TRAVEL).unwrap();
        let script = diff(&old, &new, &DiffConfig::for_mode(mode)).unwrap();
        assert!(script.is_empty(), "{} mode produced {:?}", mode, kinds(&script));
        assert_eq!(script.cost(), 0);
    }
}

#[test]
fn test_same_tree_against_itself() {
    let tree = parse_str(TRAVEL).unwrap();
    let loop_node = resolve_path(&tree, "3").unwrap();
    let twin = deep_copy(&loop_node);
    NodeInner::append_child(&tree, twin);

    for mode in [MatchMode::Fast, MatchMode::Balanced, MatchMode::Quality] {
        let script = diff(&tree, &tree, &DiffConfig::for_mode(mode)).unwrap();
        assert!(script.is_empty(), "{} mode produced {:?}", mode, kinds(&script));
        assert_eq!(script.cost(), 0);
    }
}

#[test]
fn test_label_change_is_single_update() {
    let old = parse_str(TRAVEL).unwrap();
    let new = travel_with("<label>Book flight</label>", "<label>Book a flight</label>");

    let script = diff(&old, &new, &DiffConfig::default()).unwrap();
    assert_eq!(kinds(&script), vec![EditKind::Update]);
    let update = &script.operations()[0];
    assert_eq!(update.old_path(), Some("1/0/0"));
    assert_eq!(update.payload().unwrap().borrow().text(), Some("Book a flight"));
    assert_replays(&old, &new, &script);
}

#[test]
fn test_removed_choice_is_single_delete() {
    let old = parse_str(TRAVEL).unwrap();
    let start = TRAVEL.find("<choose").unwrap();
    let end = TRAVEL.find("</choose>").unwrap() + "</choose>".len();
    let new = parse_str(&format!("{}{}", &TRAVEL[..start], &TRAVEL[end..])).unwrap();

    let script = diff(&old, &new, &DiffConfig::default()).unwrap();
    assert_eq!(kinds(&script), vec![EditKind::Delete]);
    assert_eq!(script.operations()[0].old_path(), Some("4"));
    // choose, alternative, call, parameters, label, otherwise, stop
    assert_eq!(script.cost(), 7);
    assert_replays(&old, &new, &script);
}

#[test]
fn test_reordered_loop_body() {
    let old = parse_str(TRAVEL).unwrap();
    let new = parse_str(&TRAVEL.replacen(
        r#"<call id="a4" endpoint="approve"><parameters><label>Approve</label></parameters></call>
    <manipulate id="a5">data.retries += 1</manipulate>"#,
        r#"<manipulate id="a5">data.retries += 1</manipulate>
    <call id="a4" endpoint="approve"><parameters><label>Approve</label></parameters></call>"#,
        1,
    ))
    .unwrap();

    let script = diff(&old, &new, &DiffConfig::default()).unwrap();
    assert_eq!(kinds(&script), vec![EditKind::Move]);
    assert_replays(&old, &new, &script);
}

#[test]
fn test_activity_moved_out_of_loop() {
    let old = parse_str(TRAVEL).unwrap();
    let approve = r#"<call id="a4" endpoint="approve"><parameters><label>Approve</label></parameters></call>"#;
    let without = TRAVEL.replacen(approve, "", 1);
    let new = parse_str(&without.replacen(
        r#"<call id="a1""#,
        &format!(r#"{}<call id="a1""#, approve),
        1,
    ))
    .unwrap();

    let script = diff(&old, &new, &DiffConfig::default()).unwrap();
    assert_eq!(kinds(&script), vec![EditKind::Move]);
    let moved = &script.operations()[0];
    assert_eq!(moved.old_path(), Some("3/0"));
    assert_eq!(moved.new_path(), Some("1"));
    assert_replays(&old, &new, &script);
}

#[test]
fn test_mixed_changes_replay_in_every_mode() {
    let old = parse_str(TRAVEL).unwrap();
    let edited = TRAVEL
        .replacen("bookCar", "rentCar", 1)
        .replacen("data.retries &lt; 3", "data.retries &lt; 5", 1)
        .replacen(r#"<stop id="a7"/>"#, r#"<manipulate id="a8">data.failed = true</manipulate>"#, 1)
        .replacen(
            "</parallel>",
            r#"<parallel_branch><call id="a9" endpoint="insure"><parameters><label>Insurance</label></parameters></call></parallel_branch></parallel>"#,
            1,
        );
    let new = parse_str(&edited).unwrap();

    for mode in [MatchMode::Fast, MatchMode::Balanced, MatchMode::Quality] {
        let script = diff(&old, &new, &DiffConfig::for_mode(mode)).unwrap();
        assert!(!script.is_empty());
        assert!(script.insertions() >= 1);
        assert_replays(&old, &new, &script);
    }
}

#[test]
fn test_delta_document_replays() {
    let old = parse_str(TRAVEL).unwrap();
    let new = travel_with(r#"<stop id="a7"/>"#, r#"<escape id="a7"/><stop id="a8"/>"#);

    let script = diff(&old, &new, &DiffConfig::default()).unwrap();
    let xml = script.to_xml_string().unwrap();
    let parsed = EditScript::from_xml_str(&xml).unwrap();
    assert_eq!(parsed.len(), script.len());
    assert_eq!(parsed.cost(), script.cost());

    let patched = Patcher::new(&old).apply(&parsed).unwrap();
    assert_eq!(print_to_string(&patched).unwrap(), print_to_string(&new).unwrap());
}

#[test]
fn test_matching_is_partial_bijection() {
    let old = parse_str(TRAVEL).unwrap();
    let new = travel_with("bookHotel", "reserveHotel");
    let matching = match_trees(&old, &new, &DiffConfig::default()).unwrap();

    let mut old_ids: Vec<u64> = matching.pairs().map(|(o, _)| o.borrow().id()).collect();
    let mut new_ids: Vec<u64> = matching.pairs().map(|(_, n)| n.borrow().id()).collect();
    old_ids.sort_unstable();
    old_ids.dedup();
    new_ids.sort_unstable();
    new_ids.dedup();
    assert_eq!(old_ids.len(), matching.len());
    assert_eq!(new_ids.len(), matching.len());
    for (old_node, new_node) in matching.pairs() {
        assert_eq!(
            matching.get_match_of_new(new_node).unwrap().borrow().id(),
            old_node.borrow().id()
        );
    }
}

#[test]
fn test_custom_pipeline_and_toml_config() {
    let config = DiffConfig::from_toml_str(
        r#"
        comparison_threshold = 0.3
        match_mode = "fast"
        exact_edit_script = true
        "#,
    )
    .unwrap();
    let old = parse_str(TRAVEL).unwrap();
    let new = travel_with("Rent car", "Rent a car");

    let pipeline = MatchPipeline::from_names(&["hash", "similarity", "path"]).unwrap();
    assert_eq!(pipeline.stages().first(), Some(&Stage::Fixed));
    assert_eq!(pipeline.stages().last(), Some(&Stage::Property));

    let script = diff_with_pipeline(&old, &new, &config, &pipeline).unwrap();
    assert_eq!(kinds(&script), vec![EditKind::Update]);
    assert_replays(&old, &new, &script);
}

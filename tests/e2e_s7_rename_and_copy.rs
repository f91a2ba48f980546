//! S7 — rename and copy (spec §4.2, §4.7): both commands are two-hop operations
//! where the destination filename travels in the payload to *both* the NN and the
//! SN, and both nodes enforce "fails if dst exists" independently.

mod common;

use scriptorium::wire::Command;

#[tokio::test]
async fn copy_registers_the_destination_at_the_name_node_so_it_is_resolvable() {
    let fixture = common::Fixture::new().await;
    let sn = fixture.spawn_storage_node("a").await;

    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::WriteCommit, "u1", "doc", b"0|0|Hello|1|world.|".to_vec()).await;

    common::expect_ok(&fixture.nn_addr, Command::Copy, "u1", "doc", b"copy".to_vec()).await;
    common::expect_ok(&sn.client_addr, Command::Copy, "u1", "doc", b"copy".to_vec()).await;

    let view = common::expect_ok(&fixture.nn_addr, Command::View, "u1", "doc", Vec::new()).await;
    assert!(view.data_str().contains("copy|u1|2|"), "dst not registered at NN: {}", view.data_str());

    let body = common::expect_ok(&sn.client_addr, Command::Read, "u1", "copy", Vec::new()).await;
    assert_eq!(body.data_str(), "Hello world.");
}

#[tokio::test]
async fn copy_onto_an_existing_destination_is_rejected_at_the_name_node() {
    let fixture = common::Fixture::new().await;
    let sn = fixture.spawn_storage_node("a").await;

    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "other", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "other", Vec::new()).await;

    common::expect_err(&fixture.nn_addr, Command::Copy, "u1", "doc", b"other".to_vec()).await;

    // Rejected before the SN ever saw the copy, so "other"'s body is untouched.
    let other = common::expect_ok(&sn.client_addr, Command::Read, "u1", "other", Vec::new()).await;
    assert_eq!(other.data_str(), "");
}

#[tokio::test]
async fn move_carries_the_destination_name_to_both_the_name_node_and_storage_node() {
    let fixture = common::Fixture::new().await;
    let sn = fixture.spawn_storage_node("a").await;

    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::WriteCommit, "u1", "doc", b"0|0|Hello|1|world.|".to_vec()).await;

    // Mirrors the client's two-hop dance: NN and SN each receive the real `dst`
    // in the payload, not an empty one.
    common::expect_ok(&fixture.nn_addr, Command::Move, "u1", "doc", b"doc2".to_vec()).await;
    common::expect_ok(&sn.client_addr, Command::Move, "u1", "doc", b"doc2".to_vec()).await;

    let view = common::expect_ok(&fixture.nn_addr, Command::View, "u1", "doc2", Vec::new()).await;
    assert!(view.data_str().starts_with("doc2|u1|"), "NN registry not renamed: {}", view.data_str());
    assert!(!view.data_str().contains("doc|u1|"), "old name still registered: {}", view.data_str());

    let body = common::expect_ok(&sn.client_addr, Command::Read, "u1", "doc2", Vec::new()).await;
    assert_eq!(body.data_str(), "Hello world.");
}

//! S1 — placement (spec §8): the NN hands a new file to the least-loaded
//! connected Storage Node, over the real wire protocol.

mod common;

use scriptorium::wire::Command;

#[tokio::test]
async fn create_lands_on_the_first_registered_node_when_load_is_tied() {
    let fixture = common::Fixture::new().await;
    let a = fixture.spawn_storage_node("a").await;
    let b = fixture.spawn_storage_node("b").await;

    let reply = common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc1", Vec::new()).await;
    assert_eq!(reply.data_str(), a.client_addr.replacen(':', "|", 1));

    let nodes = fixture.nn.nodes_snapshot();
    let a_rec = nodes.iter().find(|n| n.id == a.id).unwrap();
    let b_rec = nodes.iter().find(|n| n.id == b.id).unwrap();
    assert_eq!(a_rec.file_count, 1);
    assert_eq!(b_rec.file_count, 0);

    // The client must now create the content blob itself at the returned address.
    common::expect_ok(&a.client_addr, Command::Create, "u1", "doc1", Vec::new()).await;
}

#[tokio::test]
async fn view_lists_every_created_file_with_its_owner() {
    let fixture = common::Fixture::new().await;
    let sn = fixture.spawn_storage_node("a").await;
    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc1", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "doc1", Vec::new()).await;

    let view = common::expect_ok(&fixture.nn_addr, Command::View, "u1", "", Vec::new()).await;
    assert!(view.data_str().contains("doc1"));
    assert!(view.data_str().contains("u1"));
}

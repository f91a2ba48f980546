//! S5 — checkpoint (spec §8): checkpointing, editing, then reverting restores
//! the tagged body and leaves the edited body in the undo slot, two deep.

mod common;

use scriptorium::wire::Command;

#[tokio::test]
async fn revert_restores_the_checkpoint_and_undo_walks_back_through_both_states() {
    let fixture = common::Fixture::new().await;
    let sn = fixture.spawn_storage_node("a").await;
    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "doc", Vec::new()).await;

    common::expect_ok(&sn.client_addr, Command::WriteCommit, "u1", "doc", b"0|0|Alpha.|".to_vec()).await;
    let x0 = common::expect_ok(&sn.client_addr, Command::Read, "u1", "doc", Vec::new()).await;
    let x0 = x0.data_str().to_owned();

    common::expect_ok(&sn.client_addr, Command::Checkpoint, "u1", "doc", b"v1".to_vec()).await;

    common::expect_ok(&sn.client_addr, Command::WriteCommit, "u1", "doc", b"0|1|Beta.|".to_vec()).await;
    let x1 = common::expect_ok(&sn.client_addr, Command::Read, "u1", "doc", Vec::new()).await;
    let x1 = x1.data_str().to_owned();
    assert_ne!(x0, x1);

    common::expect_ok(&sn.client_addr, Command::Revert, "u1", "doc", b"v1".to_vec()).await;
    let reverted = common::expect_ok(&sn.client_addr, Command::Read, "u1", "doc", Vec::new()).await;
    assert_eq!(reverted.data_str(), x0);

    common::expect_ok(&sn.client_addr, Command::Undo, "u1", "doc", Vec::new()).await;
    let undo_one = common::expect_ok(&sn.client_addr, Command::Read, "u1", "doc", Vec::new()).await;
    assert_eq!(undo_one.data_str(), x1);

    common::expect_ok(&sn.client_addr, Command::Undo, "u1", "doc", Vec::new()).await;
    let undo_two = common::expect_ok(&sn.client_addr, Command::Read, "u1", "doc", Vec::new()).await;
    assert_eq!(undo_two.data_str(), x0);
}

#[tokio::test]
async fn checkpointing_requires_only_read_permission() {
    let fixture = common::Fixture::new().await;
    let sn = fixture.spawn_storage_node("a").await;
    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::AddAccess, "u1", "doc", b"u2|R".to_vec()).await;

    common::expect_ok(&sn.client_addr, Command::Checkpoint, "u2", "doc", b"v1".to_vec()).await;
}

//! S2 — lock-scoped edit (spec §8): acquire the sentence lock at the NN, commit
//! the edit at the SN, release the lock; Undo restores the pre-commit body.

mod common;

use scriptorium::wire::Command;

#[tokio::test]
async fn write_commit_under_a_lock_then_undo_round_trips() {
    let fixture = common::Fixture::new().await;
    let sn = fixture.spawn_storage_node("a").await;

    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "doc", Vec::new()).await;

    // Seed the body "Hello world. Goodbye world." via two WriteCommits.
    common::expect_ok(&sn.client_addr, Command::WriteCommit, "u1", "doc", b"0|0|Hello|1|world.|".to_vec()).await;
    common::expect_ok(&sn.client_addr, Command::WriteCommit, "u1", "doc", b"1|0|Goodbye|1|world.|".to_vec()).await;

    let before = common::expect_ok(&sn.client_addr, Command::Read, "u1", "doc", Vec::new()).await;
    assert_eq!(before.data_str(), "Hello world. Goodbye world.");

    common::expect_ok(&fixture.nn_addr, Command::LockAcquire, "u1", "doc", b"0".to_vec()).await;
    common::expect_ok(&sn.client_addr, Command::WriteCommit, "u1", "doc", b"0|1|cruel|".to_vec()).await;
    common::expect_ok(&fixture.nn_addr, Command::LockRelease, "u1", "doc", b"0".to_vec()).await;

    let after = common::expect_ok(&sn.client_addr, Command::Read, "u1", "doc", Vec::new()).await;
    assert_eq!(after.data_str(), "Hello cruel world. Goodbye world.");

    common::expect_ok(&sn.client_addr, Command::Undo, "u1", "doc", Vec::new()).await;
    let undone = common::expect_ok(&sn.client_addr, Command::Read, "u1", "doc", Vec::new()).await;
    assert_eq!(undone.data_str(), "Hello world. Goodbye world.");
}

#[tokio::test]
async fn lock_release_relays_the_commits_word_and_char_counts_to_the_name_node() {
    let fixture = common::Fixture::new().await;
    let sn = fixture.spawn_storage_node("a").await;

    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "doc", Vec::new()).await;

    let fresh = common::expect_ok(&fixture.nn_addr, Command::View, "u1", "doc", Vec::new()).await;
    assert_eq!(fresh.data_str(), "doc|u1|0|0|");

    common::expect_ok(&fixture.nn_addr, Command::LockAcquire, "u1", "doc", b"0".to_vec()).await;
    let commit = common::expect_ok(&sn.client_addr, Command::WriteCommit, "u1", "doc", b"0|0|Hello|1|world.|".to_vec()).await;
    let release_payload = format!("0|{}", commit.data_str()).into_bytes();
    common::expect_ok(&fixture.nn_addr, Command::LockRelease, "u1", "doc", release_payload).await;

    let view = common::expect_ok(&fixture.nn_addr, Command::View, "u1", "doc", Vec::new()).await;
    assert_eq!(view.data_str(), format!("doc|u1|{}", commit.data_str()));
}

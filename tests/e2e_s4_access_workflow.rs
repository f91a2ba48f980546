//! S4 — approve workflow (spec §8): a non-owner requests access, the owner
//! approves it (pushing an ACL grant to the file's home SN), and a denial of an
//! already-resolved request reports it as no longer pending.

mod common;

use scriptorium::error::Error;
use scriptorium::wire::Command;

#[tokio::test]
async fn approving_a_request_grants_the_requester_read_access() {
    let fixture = common::Fixture::new().await;
    let sn = fixture.spawn_storage_node("a").await;
    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "doc", Vec::new()).await;

    let denied = common::expect_err(&sn.client_addr, Command::Read, "u2", "doc", Vec::new()).await;
    assert_eq!(denied, Error::PermissionDenied.code());

    common::expect_ok(&fixture.nn_addr, Command::RequestAccess, "u2", "doc", Vec::new()).await;

    let pending = common::expect_ok(&fixture.nn_addr, Command::ViewRequests, "u1", "", Vec::new()).await;
    assert!(pending.data_str().contains("doc"));
    assert!(pending.data_str().contains("u2"));

    common::expect_ok(&fixture.nn_addr, Command::ApproveRequest, "u1", "doc", b"u2".to_vec()).await;

    common::expect_ok(&sn.client_addr, Command::Read, "u2", "doc", Vec::new()).await;

    let stale_deny = common::expect_err(&fixture.nn_addr, Command::DenyRequest, "u1", "doc", b"u2".to_vec()).await;
    assert_eq!(stale_deny, Error::InvalidParameters.code());
}

#[tokio::test]
async fn only_the_owner_may_approve_a_request() {
    let fixture = common::Fixture::new().await;
    let sn = fixture.spawn_storage_node("a").await;
    common::expect_ok(&fixture.nn_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&sn.client_addr, Command::Create, "u1", "doc", Vec::new()).await;
    common::expect_ok(&fixture.nn_addr, Command::RequestAccess, "u2", "doc", Vec::new()).await;

    let err = common::expect_err(&fixture.nn_addr, Command::ApproveRequest, "u3", "doc", b"u2".to_vec()).await;
    assert_eq!(err, Error::Unauthorized.code());
}

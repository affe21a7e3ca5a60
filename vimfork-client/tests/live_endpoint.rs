//! Integration tests against a live vCenter/ESX endpoint.
//!
//! These tests require network access to a management endpoint and a
//! resolvable test VM. Set `VSPHERE_HOST`, `VSPHERE_USERNAME`,
//! `VSPHERE_PASSWORD` and `VIMFORK_TEST_VM`, then run with:
//! `cargo test --test live_endpoint -- --ignored`

use vimfork_client::{SoapClient, VimClient};

fn env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set for live tests"))
}

async fn connect() -> SoapClient {
    SoapClient::connect(
        &env("VSPHERE_HOST"),
        &env("VSPHERE_USERNAME"),
        &env("VSPHERE_PASSWORD"),
        true,
    )
    .await
    .expect("connect failed")
}

#[tokio::test]
#[ignore = "requires a live vCenter/ESX endpoint"]
async fn connect_and_resolve_test_vm() {
    let client = connect().await;

    let vm = client
        .find_vm(&env("VIMFORK_TEST_VM"))
        .await
        .expect("resolve failed");
    println!("resolved {} -> {}", vm.name, vm.moref);

    let state = client.power_state(&vm.moref).await.expect("power state read failed");
    println!("power state: {state:?}");
}

#[tokio::test]
#[ignore = "requires a live vCenter/ESX endpoint"]
async fn quiescence_flag_is_readable() {
    let client = connect().await;

    let vm = client
        .find_vm(&env("VIMFORK_TEST_VM"))
        .await
        .expect("resolve failed");

    // Absent on endpoints without the fork feature; a read must still
    // succeed and report None.
    let flag = client
        .quiesced_fork_parent(&vm.moref)
        .await
        .expect("flag read failed");
    println!("quiescedForkParent: {flag:?}");
}

#[tokio::test]
#[ignore = "requires a live vCenter/ESX endpoint"]
async fn resolution_is_stable_across_calls() {
    let client = connect().await;
    let name = env("VIMFORK_TEST_VM");

    let first = client.find_vm(&name).await.expect("first resolve failed");
    let second = client.find_vm(&name).await.expect("second resolve failed");
    assert_eq!(
        first.moref, second.moref,
        "a stable name must resolve to a stable reference"
    );
}

#[tokio::test]
#[ignore = "requires a live vCenter/ESX endpoint"]
async fn unknown_vm_name_is_not_found() {
    let client = connect().await;

    let result = client.find_vm("vimfork-does-not-exist-zzz").await;
    assert!(
        matches!(result, Err(vimfork_core::VimError::NotFound { .. })),
        "unknown names must resolve to NotFound, got {result:?}"
    );
}

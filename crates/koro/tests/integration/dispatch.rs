//! Whole commands dispatched into a named namespace.

use koro::{Config, DispatchState, Dispatcher, Error};

use crate::common::{TestNamespace, TestResult};

/// A namespace with `dummy0` up on 192.168.1.1/24.
fn setup(prefix: &str) -> Result<TestNamespace, koro::netlink::Error> {
    let ns = TestNamespace::new(prefix)?;
    ns.add_dummy("dummy0")?;
    ns.add_addr("dummy0", "192.168.1.1/24")?;
    Ok(ns)
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(&Config::default())
}

#[tokio::test]
async fn test_route_add_and_del_with_dev() -> TestResult {
    require_root!();
    let ns = setup("rtdev")?;
    let d = dispatcher();

    d.dispatch(&format!("netns {} route add 10.0.0.0/8 dev dummy0", ns.name()))
        .await?;
    assert!(ns.route_show("10.0.0.0/8")?.contains("dev dummy0"));

    d.dispatch(&format!("netns {} route del 10.0.0.0/8 dev dummy0", ns.name()))
        .await?;
    assert!(ns.route_show("10.0.0.0/8")?.trim().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_route_interface_found_from_gateway() -> TestResult {
    require_root!();
    let ns = setup("rtgw")?;

    dispatcher()
        .dispatch(&format!(
            "netns {} route add 10.2.0.0/16 via 192.168.1.254",
            ns.name()
        ))
        .await?;

    let shown = ns.route_show("10.2.0.0/16")?;
    assert!(shown.contains("via 192.168.1.254"), "{shown}");
    assert!(shown.contains("dev dummy0"), "{shown}");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_gateway() -> TestResult {
    require_root!();
    let ns = setup("rtunreach")?;

    let err = dispatcher()
        .dispatch(&format!(
            "netns {} route add 10.3.0.0/16 via 172.31.0.1",
            ns.name()
        ))
        .await
        .unwrap_err();
    assert!(matches!(err.error, Error::NoRouteToGateway { .. }));
    assert_eq!(err.state, DispatchState::NamespaceResolved);
    Ok(())
}

#[tokio::test]
async fn test_address_add_and_del() -> TestResult {
    require_root!();
    let ns = setup("addr")?;
    let d = dispatcher();

    d.dispatch(&format!("netns {} address add 10.9.0.5/24 dev dummy0", ns.name()))
        .await?;
    assert!(ns.addr_show("dummy0")?.contains("10.9.0.5/24"));

    d.dispatch(&format!("netns {} address del 10.9.0.5/24 dev dummy0", ns.name()))
        .await?;
    assert!(!ns.addr_show("dummy0")?.contains("10.9.0.5/24"));
    Ok(())
}

#[tokio::test]
async fn test_namespace_by_path() -> TestResult {
    require_root!();
    let ns = setup("nspath")?;

    dispatcher()
        .dispatch(&format!(
            "netns {} address add 127.0.0.3/8 dev lo",
            ns.path().display()
        ))
        .await?;
    assert!(ns.addr_show("lo")?.contains("127.0.0.3/8"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_interface() -> TestResult {
    require_root!();
    let ns = setup("nodev")?;

    let err = dispatcher()
        .dispatch(&format!("netns {} route add 10.0.0.0/8 dev eth9", ns.name()))
        .await
        .unwrap_err();
    assert!(matches!(err.error, Error::InterfaceNotFound { ref name } if name == "eth9"));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_route_is_rejected_by_kernel() -> TestResult {
    require_root!();
    let ns = setup("rtdup")?;
    let d = dispatcher();
    let command = format!("netns {} route add 10.4.0.0/16 dev dummy0", ns.name());

    d.dispatch(&command).await?;
    let err = d.dispatch(&command).await.unwrap_err();
    assert_eq!(err.state, DispatchState::DescriptorBuilt);
    match err.error {
        Error::ApplyFailed { source, .. } => assert!(source.is_already_exists()),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

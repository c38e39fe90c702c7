//! The rtnetlink client inside a namespace.

use std::net::IpAddr;

use crate::common::{TestNamespace, TestResult};

#[tokio::test]
async fn test_link_lookup() -> TestResult {
    require_root!();
    let ns = TestNamespace::new("link")?;
    ns.add_dummy("dummy0")?;
    let conn = ns.connection()?;

    let lo = conn.get_link_by_name("lo").await?.expect("lo exists");
    assert_eq!(lo.ifindex(), 1);
    assert_eq!(lo.name(), Some("lo"));

    let dummy = conn.get_link_by_name("dummy0").await?.expect("dummy0 exists");
    assert_ne!(dummy.ifindex(), 0);

    assert!(conn.get_link_by_name("nope0").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_route_lookup() -> TestResult {
    require_root!();
    let ns = TestNamespace::new("rtget")?;
    ns.add_dummy("dummy0")?;
    ns.add_addr("dummy0", "192.168.7.1/24")?;
    let conn = ns.connection()?;
    let dummy = conn.get_link_by_name("dummy0").await?.expect("dummy0 exists");

    let routes = conn.get_routes_to("192.168.7.20".parse::<IpAddr>()?).await?;
    assert_eq!(routes.first().and_then(|r| r.oif()), Some(dummy.ifindex()));

    let routes = conn.get_routes_to("203.0.113.1".parse::<IpAddr>()?).await?;
    assert!(routes.is_empty());
    Ok(())
}

mod utils;
use utils::*;

use std::net::TcpListener;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn transport_errors_are_logged() {
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let stats = pka_probe::search_pka_event(&settings_for(addr))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(stats.iteration_errors, 1);
    assert!(logs_contain("iteration failed"));
    assert!(logs_contain("Scenario complete"));
}

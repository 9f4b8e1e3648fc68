use mock_service::{Behavior, MockState};
use pka_probe::ProbeSettings;
use std::net::{SocketAddr, TcpListener};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter("pka_probe=debug,mock_service=debug")
            .try_init();
    });
}

/// Start a mock search service and return probe settings pointing at it.
#[allow(unused)]
pub async fn mock(behavior: Behavior) -> (ProbeSettings, MockState) {
    init();
    let (addr, state) = mock_service::spawn(behavior)
        .await
        .expect("mock service failed to start");
    (settings_for(addr), state)
}

/// Settings for an address nothing listens on.
#[allow(unused)]
pub fn refused() -> ProbeSettings {
    init();
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("unable to reserve a port");
        listener.local_addr().expect("no local address")
    };
    settings_for(addr)
}

#[allow(unused)]
pub fn settings_for(addr: SocketAddr) -> ProbeSettings {
    ProbeSettings {
        base_url: format!("http://{addr}"),
        timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

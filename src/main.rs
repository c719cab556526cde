/// Entry point of the node health monitoring agent.
///
/// Reads its configuration from the environment, registers the built-in monitors and serves
/// the status API until interrupted.
///
/// # Examples
///
/// ```bash
/// HOST_ROOT=/ RUST_LOG=info cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    node_health_monitor::run().await
}

//! vecro-mongodb
//!
//! A node whose per-request work is reads and writes against a MongoDB
//! collection instead of the synthetic workload. Shares the decorator chain,
//! metrics and tracing of `vecro-node`.

use vecro_node::lifecycle::ServiceVariant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    vecro_node::cli::run(ServiceVariant::Storage).await
}

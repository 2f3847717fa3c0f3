//! Emyzelium demo
//!
//! Alice publishes a counter without telling anyone where she lives.
//! She beacons to a catalog; Bob reads the catalog directory, learns
//! Alice's address from it and subscribes to her `tick` topic.
//!
//! Run with `RUST_LOG=debug` to watch authorization and discovery.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::info;

use emyz_crypto::KeyPair;
use emyz_runtime::{init_logging, CatalogConfig, Ecataloguz, Efunguz, EfunguzConfig};
use emyz_transport::{Connpoint, MemoryNetwork};

const TOPIC: &str = "tick";
const DEADLINE: Duration = Duration::from_secs(5);

fn host(n: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, n))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    println!("=== Emyzelium Demo ===\n");

    // 1. Identities
    println!("1. Generating identities...");
    let catalog_keys = KeyPair::generate();
    let alice_keys = KeyPair::generate();
    let bob_keys = KeyPair::generate();
    println!("   Catalog: {}", catalog_keys.public_key());
    println!("   Alice:   {}", alice_keys.public_key());
    println!("   Bob:     {}", bob_keys.public_key());

    // 2. Catalog on its own thread
    println!("\n2. Starting catalog on {}...", host(100));
    let network = MemoryNetwork::new();
    let catalog_config = CatalogConfig {
        publish_interval: Duration::from_millis(100),
        ..CatalogConfig::default()
    };
    let beacon_cp = Connpoint::new(host(100), catalog_config.beacon_port).to_string();
    let directory_cp = Connpoint::new(host(100), catalog_config.pubsub_port).to_string();
    let mut catalog = Ecataloguz::new(
        Arc::new(network.context(host(100))),
        catalog_keys.secret_key(),
        catalog_config,
    )?;
    let stop = Arc::new(AtomicBool::new(false));
    let catalog_thread = {
        let stop = stop.clone();
        thread::spawn(move || {
            catalog.run(&stop);
            catalog
        })
    };
    println!("   Beacons to {}, directory at {}", beacon_cp, directory_cp);

    // 3. Peers
    println!("\n3. Starting peers...");
    let peer_config = EfunguzConfig {
        beacon_interval: Duration::from_millis(200),
        ..EfunguzConfig::default()
    };
    let mut alice = Efunguz::new(
        Arc::new(network.context(host(7))),
        alice_keys.secret_key(),
        peer_config.clone(),
    )?;
    let mut bob = Efunguz::new(
        Arc::new(network.context(host(8))),
        bob_keys.secret_key(),
        peer_config,
    )?;

    let _ = alice.add_catalog_target(catalog_keys.public_key().as_str(), &beacon_cp)?;
    let _ = bob.add_catalog_source(catalog_keys.public_key().as_str(), &directory_cp)?;
    let (ehypha, _) = bob.add_ehypha(alice_keys.public_key().as_str(), "", None)?;
    let _ = ehypha.add_topic(TOPIC)?;
    println!("   Alice beacons to the catalog");
    println!("   Bob follows Alice, address unknown");

    // 4. Run until Bob has heard from Alice
    println!("\n4. Running...");
    let started = Instant::now();
    let mut counter: u64 = 0;
    let mut received = None;
    while started.elapsed() < DEADLINE {
        counter += 1;
        alice.emit(TOPIC, vec![Bytes::copy_from_slice(&counter.to_le_bytes())])?;
        alice.update();
        bob.update();

        let etale = bob
            .ehypha(alice_keys.public_key().as_str())
            .and_then(|e| e.get(TOPIC))
            .filter(|t| t.has_data());
        if let Some(etale) = etale {
            let value = etale
                .parts()
                .first()
                .and_then(|p| <[u8; 8]>::try_from(p.as_ref()).ok())
                .map(u64::from_le_bytes);
            received = Some((value, etale.publish_time(), etale.receive_time()));
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    match received {
        Some((value, published, arrived)) => {
            let address = bob
                .ehypha(alice_keys.public_key().as_str())
                .and_then(|e| e.address())
                .unwrap_or("-");
            println!("   Bob found Alice at {}", address);
            println!("   Tick {:?} published {:?}, received {:?}", value, published, arrived);
            info!("Discovery took {:?}", started.elapsed());
        }
        None => println!("   Bob did not hear from Alice within {:?}", DEADLINE),
    }

    // 5. Shutdown
    println!("\n5. Stopping...");
    stop.store(true, Ordering::Relaxed);
    let catalog = catalog_thread
        .join()
        .map_err(|_| "catalog thread panicked")?;
    println!("   Catalog: {}", catalog.summary());
    println!("   Catalog stats: {}", serde_json::to_string(catalog.stats())?);
    println!("   Alice stats:   {}", serde_json::to_string(alice.stats())?);
    println!("   Bob stats:     {}", serde_json::to_string(bob.stats())?);

    println!("\n=== Demo Complete ===");
    Ok(())
}

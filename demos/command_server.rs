//! Runnable command server against a simulated capture source
//!
//! Serves the full command protocol on TCP port 8888 while a synthetic
//! rigid body sweeps a 30 cm circle at 60 Hz. Useful for exercising a
//! client (MATLAB, netcat) without a capture system on the network.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example command_server
//!
//! # then, from another terminal:
//! printf 'echosocket#' | nc 127.0.0.1 8888
//! printf 'getposition#1$RigidBody' | nc 127.0.0.1 8888
//! ```

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;

use mocaplink_rust::math::{Quaternion, Vector3};
use mocaplink_rust::server::{RigidBodyBridge, ServerConfig};
use mocaplink_rust::source::{
    MarkerDefinition, MarkerState, MocapSource, Pose, RigidBodyDefinition, ServerDescription,
};

/// Capture source that reports a rigid body circling in the XZ plane
struct CircularMotionSource {
    started: Instant,
}

impl CircularMotionSource {
    fn new() -> Self {
        CircularMotionSource {
            started: Instant::now(),
        }
    }

    fn angle(&self) -> f64 {
        // one revolution every 5 seconds
        self.started.elapsed().as_secs_f64() / 5.0 * TAU
    }
}

impl MocapSource for CircularMotionSource {
    fn register_rigid_body(&self, asset_id: i32) {
        info!(asset_id, "asset registered with simulated source");
    }

    fn latest_rigid_body_state(&self, _asset_id: i32, _compensation: bool) -> Option<Pose> {
        let angle = self.angle();
        Some(Pose::new(
            Vector3::new(0.3 * angle.cos(), 1.0, 0.3 * angle.sin()),
            Quaternion::new(0.0, (angle / 2.0).sin(), 0.0, (angle / 2.0).cos()),
        ))
    }

    fn rigid_body_definition(&self, asset_id: i32) -> Option<RigidBodyDefinition> {
        Some(RigidBodyDefinition {
            id: asset_id,
            name: "SimWand".into(),
            markers: vec![
                MarkerDefinition {
                    id: 1,
                    name: "SimWand:1".into(),
                    position: Vector3::new(0.02, 0.0, 0.0),
                },
                MarkerDefinition {
                    id: 2,
                    name: "SimWand:2".into(),
                    position: Vector3::new(-0.02, 0.0, 0.0),
                },
                MarkerDefinition {
                    id: 3,
                    name: "SimWand:3".into(),
                    position: Vector3::new(0.0, 0.03, 0.0),
                },
            ],
        })
    }

    fn latest_marker_states(&self) -> Vec<MarkerState> {
        vec![MarkerState {
            id: 100,
            name: "stray".into(),
            position: Vector3::new(0.05, 0.9, -0.1),
            labeled: false,
        }]
    }

    fn server_description(&self) -> ServerDescription {
        ServerDescription {
            host_name: "simulator".into(),
            host_app: "mocaplink demo".into(),
            host_app_version: env!("CARGO_PKG_VERSION").into(),
            natnet_version: "4.0".into(),
        }
    }

    fn enable_asset(&self, name: &str) -> mocaplink_rust::Result<()> {
        info!(name, "asset enabled");
        Ok(())
    }

    fn disable_asset(&self, name: &str) -> mocaplink_rust::Result<()> {
        info!(name, "asset disabled");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> mocaplink_rust::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let source = Arc::new(CircularMotionSource::new());

    let config = ServerConfig {
        bind_addr: "0.0.0.0:8888".into(),
        ..ServerConfig::default()
    };
    let mut bridge = RigidBodyBridge::new(config, source, 1);
    bridge.start().await?;
    info!("command server ready; press Ctrl-C to stop");

    // 60 Hz pose feed in place of a render loop
    let feed = bridge.feed().spawn_periodic(Duration::from_millis(16));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    feed.stop().await;
    bridge.stop().await;
    Ok(())
}

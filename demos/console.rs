//! # Example: interactive watch console
//!
//! Drives a [`Watchtower`] over an in-process [`LocalSubstrate`] from stdin.
//!
//! ```text
//! spawn <id>            start (or restart) a ping target
//! kill <id>             stop a ping target
//! partition <address>   make every target at <address> unreachable
//! heal <address>        undo partition
//! watch <id>            naive watch (halts on first failure)
//! reliable-watch <id>   self-healing watch
//! unwatch <id>          stop watching
//! ping <id>             one resolve + ask round trip
//! status                list watchers and live targets
//! ```
//!
//! `<id>` is either a full `name@address` locator or a bare address, which
//! maps to `ping@<address>`.
//!
//! Run with:
//! ```bash
//! RUST_LOG=info cargo run --example console --features logging
//! ```

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use watchvisor::{Config, LocalSubstrate, Locator, LogWriter, Watchtower, wait_for_shutdown_signal};

fn locator(id: &str) -> anyhow::Result<Locator> {
    if id.contains('@') {
        Ok(id.parse()?)
    } else {
        Ok(Locator::new("ping", id))
    }
}

async fn dispatch(
    line: &str,
    tower: &Watchtower,
    substrate: &LocalSubstrate,
) -> anyhow::Result<()> {
    let args: Vec<&str> = line.split_whitespace().collect();
    match args.as_slice() {
        [] => {}
        ["spawn", id] => {
            let target = substrate.spawn(locator(id)?);
            println!("Spawned {target}");
        }
        ["kill", id] => match substrate.kill(&locator(id)?) {
            Some(target) => println!("Killed {target}"),
            None => println!("Nothing running at {id}"),
        },
        ["partition", address] => {
            substrate.partition(address);
            println!("Partitioned {address}");
        }
        ["heal", address] => {
            substrate.heal(address);
            println!("Healed {address}");
        }
        ["watch", id] => {
            let loc = locator(id)?;
            tower.watch(loc.clone()).await?;
            println!("Watching {loc}");
        }
        ["reliable-watch", id] => {
            let loc = locator(id)?;
            tower.reliable_watch(loc.clone()).await?;
            println!("Reliably watching {loc}");
        }
        ["unwatch", id] => {
            let loc = locator(id)?;
            tower.unwatch(&loc).await?;
            println!("Unwatched {loc}");
        }
        ["ping", id] => match tower.ping(&locator(id)?).await {
            Ok(pong) => println!("Got ping response: {}", pong.text),
            Err(e) => println!("Got faulty ping response: {e}"),
        },
        ["status"] => {
            println!("Watchers:");
            for s in tower.status().await {
                println!("   {} [{}] {}", s.locator, s.kind.as_label(), s.phase);
            }
            println!("Live targets:");
            for target in substrate.live() {
                println!("   {target}");
            }
        }
        _ => println!("Don't know command \"{line}\""),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let substrate = LocalSubstrate::new();
    let tower = Watchtower::builder(Config::default(), Arc::new(substrate.clone()))
        .with_subscriber(Arc::new(LogWriter::default()))
        .build();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let signal = wait_for_shutdown_signal();
    tokio::pin!(signal);
    loop {
        tokio::select! {
            res = &mut signal => {
                res?;
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Err(e) = dispatch(line.trim(), &tower, &substrate).await {
                        println!("Error: {e}");
                    }
                }
                None => break,
            }
        }
    }

    tower.shutdown().await?;
    substrate.shutdown();
    Ok(())
}

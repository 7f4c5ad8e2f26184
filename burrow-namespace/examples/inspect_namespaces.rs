//! Print the namespaces of a process and what a bootstrap would request
//!
//! Run with: cargo run --example inspect_namespaces [PID]

use burrow_namespace::{NamespaceInfo, NamespaceRequest, Phase};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("debug").init();

    let info = match std::env::args().nth(1) {
        Some(pid) => NamespaceInfo::for_pid(pid.parse()?)?,
        None => NamespaceInfo::current()?,
    };

    println!("🔒 Burrow namespace inspection\n");
    print!("{info}");

    let host = NamespaceInfo::for_pid(1)?;
    let isolated = info.differs_from(&host);
    if isolated.is_empty() {
        println!("\n⚠️  Same namespaces as PID 1");
    } else {
        println!("\n✅ Isolated from PID 1 in: {}", isolated.join(", "));
    }

    let request = NamespaceRequest::standard();
    println!("\nPhase of this process: {}", Phase::from_env());
    println!(
        "A bootstrap would request: {}",
        request.enabled_namespaces().join(", ")
    );

    Ok(())
}

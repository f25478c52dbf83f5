//! Simple pipeline example: turn a detection bundle into a netlist.

use circuitlens::prelude::*;
use std::path::Path;

fn main() -> Result<(), CircuitLensError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/rc_detections.json".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example simple_pipeline [path/to/detections.json]");
        std::process::exit(1);
    }

    let request = PipelineRequest::load_bundle(path)?;
    let output = CircuitLensCore::default().run(request, &PipelineOptions::default())?;

    println!("Fused {} components from {}", output.fused.len(), path.display());
    if let Some(summary) = &output.summary {
        println!("Detection quality: {}", summary.quality);
    }
    println!();
    print!("{}", output.netlist);
    println!();

    for diagnostic in &output.diagnostics {
        println!("  - {}", diagnostic);
    }

    if !output.is_valid() {
        println!("\nNetlist is not valid:");
        for reason in &output.validation.reasons {
            println!("  - {}", reason);
        }
        std::process::exit(1);
    }

    println!("\nNetlist is valid.");
    Ok(())
}

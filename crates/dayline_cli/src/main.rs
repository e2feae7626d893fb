//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `dayline_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use dayline_core::{delete_segment, Segment, TimelineConfig};

fn main() {
    println!("dayline_core ping={}", dayline_core::ping());
    println!("dayline_core version={}", dayline_core::core_version());

    if let Err(err) = reflow_probe() {
        eprintln!("dayline_core reflow_probe error={err}");
        std::process::exit(1);
    }
}

/// Deletes the middle block of a three-block day and prints the result.
fn reflow_probe() -> Result<(), Box<dyn std::error::Error>> {
    let config = TimelineConfig::default();
    let day = vec![
        Segment::new("sleep", 0, 480, &config)?.locked(),
        Segment::new("work", 480, 480, &config)?.flexible(),
        Segment::new("evening", 960, 480, &config)?.flexible(),
    ];

    let outcome = delete_segment(&day, &"work".into(), &config)?;
    println!(
        "dayline_core reflow coverage_ok={} diagnostics={}",
        outcome.coverage_ok,
        outcome.diagnostics.len()
    );
    for segment in &outcome.segments {
        println!(
            "  {} [{}, {})",
            segment.id,
            segment.start,
            segment.end()
        );
    }
    Ok(())
}

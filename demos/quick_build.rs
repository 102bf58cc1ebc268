//! Quick NN-Descent Build
//!
//! The minimal example: build a k-NN graph over random vectors and watch the
//! passes converge.
//!
//! ```bash
//! cargo run --example quick_build --release
//! ```

use std::time::Instant;

use nndescent::{BuildState, DistanceMetric, NnDescent, NnDescentParams, VectorOracle};

fn main() -> nndescent::Result<()> {
    let dim = 16;
    let n = 2000;
    let data: Vec<f32> = (0..n * dim)
        .map(|i| ((i * 31 + 7) as f32 * 0.0137).sin())
        .collect();

    // 1. Wrap the vectors in an oracle
    let oracle = VectorOracle::new(&data, dim, DistanceMetric::L2)?;

    // 2. Validate parameters against the dataset size
    //    - k=10: neighbors per point
    //    - max_passes=20: stop even if not converged
    let builder = NnDescent::new(n, NnDescentParams::new(10).with_max_passes(20))?;

    // 3. Step through the run to see the state machine
    let start = Instant::now();
    let mut run = builder.start(&oracle);
    loop {
        let state = run.step();
        let mean_worst: f32 = run.max_distances().iter().sum::<f32>() / n as f32;
        println!("{state:?}: mean k-distance {mean_worst:.4}");
        if state.is_terminal() {
            break;
        }
        if let BuildState::Joining { passes } = state {
            if passes == 0 {
                println!("  (seeded with random neighbors)");
            }
        }
    }
    let graph = run.finish();
    let elapsed = start.elapsed();

    // 4. Inspect the result
    let stats = graph.stats();
    println!("\nBuilt in {elapsed:.2?}");
    println!("  passes:               {}", stats.passes);
    println!("  termination:          {:?}", stats.termination);
    println!("  updates per pass:     {:?}", stats.updates_per_pass);
    println!(
        "  distance evaluations: {} ({:.1}% of all pairs)",
        stats.distance_evaluations,
        100.0 * stats.distance_evaluations as f64 / (n * (n - 1) / 2) as f64
    );

    println!("\nNeighbors of point 0:");
    for neighbor in graph.neighbors(0) {
        println!("  id={:4}  distance={:.4}", neighbor.id, neighbor.distance);
    }

    let in_degree = graph.reverse_neighbor_counts();
    let max_hub = in_degree.iter().max().copied().unwrap_or(0);
    let antihubs = in_degree.iter().filter(|&&c| c == 0).count();
    println!("\nLargest in-degree: {max_hub}, points listed by nobody: {antihubs}");

    Ok(())
}

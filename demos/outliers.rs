//! Outlier Detection on an NN-Descent Graph
//!
//! Builds an approximate k-NN graph over two dense blobs plus a few isolated
//! points, then scores every point with LoOP and LID.
//!
//! ```bash
//! cargo run --example outliers --release
//! ```

use nndescent::outlier::LidStats;
use nndescent::{
    lid_scores, loop_scores, DistanceMetric, LidConfig, LidEstimator, LoopParams, NnDescent,
    NnDescentParams, VectorOracle,
};

fn main() -> nndescent::Result<()> {
    println!("LoOP and LID on a k-NN graph");
    println!("============================\n");

    let dim = 8;
    let mut data: Vec<f32> = Vec::new();

    // Two blobs of 150 points each
    for i in 0..300 {
        let offset = if i < 150 { 0.0 } else { 6.0 };
        for j in 0..dim {
            let seed = (i * dim + j) as f32;
            data.push(offset + (seed * 0.37).sin() * 0.8);
        }
    }
    // Outliers (5 points far from everything)
    for i in 0..5 {
        for j in 0..dim {
            let seed = (i * dim + j + 5000) as f32;
            data.push(25.0 + 8.0 * (seed * 0.11).cos());
        }
    }

    let oracle = VectorOracle::new(&data, dim, DistanceMetric::L2)?;
    let n = oracle.len();
    println!("Dataset: {n} points in {dim} dimensions (outliers: 300-304)\n");

    let k = 15;
    let graph = NnDescent::new(n, NnDescentParams::new(k))?.build(&oracle);
    println!(
        "Graph: k={}, {} passes, {:?}\n",
        graph.k(),
        graph.stats().passes,
        graph.stats().termination
    );

    // LoOP: probabilities in [0, 1)
    let scores = loop_scores(&graph, &LoopParams::new(k))?;
    println!("Top LoOP scores:");
    for (id, score) in scores.ranked().into_iter().take(8) {
        println!("  point {id:3}: {score:.3}");
    }
    println!();

    // LID: sparse or complex neighborhoods have high LID
    let estimates = lid_scores(&graph, &LidConfig::new(k, LidEstimator::Mle))?;
    let stats = LidStats::from_estimates(&estimates);
    println!(
        "LID median {:.2}, std {:.2} ({} degenerate)",
        stats.median, stats.std_dev, stats.degenerate
    );

    let high = stats.high_lid_points(&estimates);
    println!("High-LID points: {} (first: {:?})", high.len(), &high[..high.len().min(10)]);

    Ok(())
}

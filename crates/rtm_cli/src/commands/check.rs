//! Check command: resolved configuration, workspace and codec self-test.

use anyhow::{Context, Result};
use rtm_checkpoint::{
    CodecContext, CollectorConfig, CompressionParameters, RunWorkspace, StorageMode,
};
use rtm_core::types::WindowSize;

const PROBE_WINDOW: WindowSize = WindowSize::new(64, 1, 64);
const PROBE_FRAMES: usize = 4;

/// Runs `rtm check`.
pub fn run(config: &CollectorConfig) -> Result<()> {
    println!("RTM configuration");
    println!("----------------------------------------");
    println!("{:<22} {}", "Workspace root", config.workspace_root.display());
    println!("{:<22} {}", "Compression", config.compression);
    println!("{:<22} {}", "Tolerance", config.tolerance);
    println!("{:<22} {}", "Relative", config.relative);
    println!("{:<22} {}", "Parallelism", config.parallelism);
    println!(
        "{:<22} {}",
        "Max resident frames",
        config
            .max_resident_frames
            .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
    );
    println!(
        "{:<22} {}",
        "Memory budget",
        config
            .memory_budget_mb
            .map_or_else(|| "unbounded".to_string(), |mb| format!("{} MB", mb))
    );
    println!("{:<22} {}", "Keep workspace", config.keep_workspace);
    println!("{:<22} {}", "Log level", config.log_level);
    println!();

    let workspace = RunWorkspace::create(&config.workspace_root, false)
        .context("cannot create a run workspace")?;
    println!("[OK] workspace {} is writable", workspace.path().display());
    drop(workspace);

    match config.storage_mode()? {
        StorageMode::Raw => println!("[OK] raw storage, no codec to test"),
        StorageMode::Compressed(params) => {
            let max_error = codec_self_test(params)?;
            println!(
                "[OK] codec round trip, max error {:e} (bound {:e})",
                max_error,
                params.tolerance()
            );
        }
    }
    Ok(())
}

/// Encodes and decodes a few smooth probe frames and returns the largest
/// absolute error.
fn codec_self_test(params: CompressionParameters) -> Result<f32> {
    let context = CodecContext::quantizing(params).context("cannot start codec workers")?;
    let frames: Vec<f32> = (0..PROBE_FRAMES * PROBE_WINDOW.sample_count())
        .map(|i| (i as f32 * 0.013).sin())
        .collect();

    let blobs = context.encode_frames(&frames, PROBE_WINDOW, 0)?;
    let mut decoded = vec![0.0; frames.len()];
    context.decode_frames(&blobs, &mut decoded, PROBE_WINDOW, 0)?;

    Ok(frames
        .iter()
        .zip(&decoded)
        .fold(0.0f32, |m, (a, b)| m.max((a - b).abs())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_self_test_within_bound() {
        let params = CompressionParameters::new(1e-3, 2, false).unwrap();
        let err = codec_self_test(params).unwrap();
        assert!(err <= 1e-3);
    }

    #[test]
    fn test_check_runs_in_temp_root() {
        let root = tempfile::tempdir().unwrap();
        let config = CollectorConfig::builder()
            .workspace_root(root.path())
            .compression(true)
            .parallelism(1)
            .build()
            .unwrap();
        run(&config).unwrap();
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}

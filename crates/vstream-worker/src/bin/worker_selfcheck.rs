use std::path::Path;
use std::process::Command;

use vstream_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env()?;

    println!(
        "worker-selfcheck: starting with media_root={}",
        config.media_root.display()
    );
    ensure_media_root_writable(&config.media_root).await?;
    ensure_ffmpeg(&config.ffmpeg_bin)?;
    ensure_env_present(&["REDIS_URL", "DATABASE_URL"])?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_media_root_writable<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;

    let probe = path.join(".worker-selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("media root {} not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_ffmpeg(binary: &str) -> anyhow::Result<()> {
    let output = Command::new(binary)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", binary, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} -version failed: {:?}",
            binary,
            output.status
        ));
    }
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}

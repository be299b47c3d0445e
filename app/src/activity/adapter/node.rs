use std::path::Path;

use anyhow::Context as _;
use chrono::{DateTime, Utc};

use super::NodeInspector;

//Uses the access time on purpose: it moves on every open of the node, but also
//whenever something else reads the node, which can defeat the age check.
pub struct FsNodeInspector;

impl NodeInspector for FsNodeInspector {
    async fn last_accessed(&self, path: &Path) -> anyhow::Result<DateTime<Utc>> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Error reading metadata of {}", path.display()))?;

        let accessed = metadata
            .accessed()
            .with_context(|| format!("Access time not available for {}", path.display()))?;

        Ok(accessed.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_file_was_accessed_recently() {
        let path = std::env::temp_dir().join(format!("micwatch-node-test-{}", std::process::id()));
        tokio::fs::write(&path, b"x").await.unwrap();

        let accessed = FsNodeInspector.last_accessed(&path).await;
        tokio::fs::remove_file(&path).await.unwrap();

        let age = Utc::now() - accessed.unwrap();
        assert!(age.num_seconds().abs() < 60);
    }

    #[tokio::test]
    async fn missing_node_is_an_error() {
        let res = FsNodeInspector
            .last_accessed(Path::new("/nonexistent/dev/snd/pcm0c"))
            .await;

        assert!(res.is_err());
    }
}

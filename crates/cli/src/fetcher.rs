use async_trait::async_trait;
use engine::domain::split_chunk_id;
use engine::fetch::{FetchError, Fetcher};
use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Resolves content ids against a root directory.
///
/// Chunk ids (`"<id>@<offset>"`) read `chunk_size` bytes at the offset;
/// plain ids read the whole file.
#[derive(Debug, Clone)]
pub(crate) struct FileFetcher {
    root: PathBuf,
    chunk_size: u64,
}

impl FileFetcher {
    pub(crate) fn new(root: impl Into<PathBuf>, chunk_size: u64) -> Self {
        Self {
            root: root.into(),
            chunk_size,
        }
    }

    /// Reject ids that would escape the content root.
    fn resolve(&self, id: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(id);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(FetchError::new(format!("invalid content id: {id}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, id: &str) -> Result<Vec<u8>, FetchError> {
        let (base, offset) = split_chunk_id(id);
        let path = self.resolve(base)?;

        match offset {
            None => Ok(tokio::fs::read(&path).await?),
            Some(offset) => {
                let mut file = tokio::fs::File::open(&path).await?;
                file.seek(SeekFrom::Start(offset)).await?;

                let mut buf = vec![0u8; self.chunk_size as usize];
                let mut filled = 0;
                while filled < buf.len() {
                    let n = file.read(&mut buf[filled..]).await?;
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }
                buf.truncate(filled);
                Ok(buf)
            }
        }
    }
}

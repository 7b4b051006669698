use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::io::{AsyncRead, AsyncReadExt};

/// 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// Base64 encoded MD5 digest of `data`, as sent alongside each staged block.
pub fn content_md5(data: &[u8]) -> String {
    let digest = md5::compute(data);
    STANDARD.encode(digest.0)
}

/// Splits a sequential byte source into chunks of `chunk_size` bytes.
///
/// Short reads are accumulated, so every chunk except the last is full.
pub struct ChunkReader<R> {
    source: R,
    chunk_size: usize,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size,
            exhausted: false,
        }
    }

    /// Returns the next chunk, or `None` once the source is at end-of-data.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut chunk = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            let n = self.source.read(&mut chunk[filled..]).await?;
            if n == 0 {
                self.exhausted = true;
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        chunk.truncate(filled);
        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn collect(data: Vec<u8>, chunk_size: usize) -> Vec<Vec<u8>> {
        let mut reader = ChunkReader::new(Cursor::new(data), chunk_size);
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn test_chunk_counts_and_sizes() {
        for (len, size) in [(0usize, 4usize), (1, 4), (4, 4), (5, 4), (12, 4), (13, 5)] {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let chunks = collect(data.clone(), size).await;
            assert_eq!(chunks.len(), len.div_ceil(size), "len={len} size={size}");
            assert!(chunks.iter().all(|c| c.len() <= size));
            if let Some(last) = chunks.last() {
                let expected = if len % size == 0 { size } else { len % size };
                assert_eq!(last.len(), expected);
            }
            assert_eq!(chunks.concat(), data);
        }
    }

    #[tokio::test]
    async fn test_short_reads_are_filled() {
        let source = trickle_reader(&["ab", "c", "defg", "h"]);
        let mut reader = ChunkReader::new(source, 3);
        assert_eq!(reader.next_chunk().await.unwrap().unwrap(), b"abc");
        assert_eq!(reader.next_chunk().await.unwrap().unwrap(), b"def");
        assert_eq!(reader.next_chunk().await.unwrap().unwrap(), b"gh");
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    fn trickle_reader(parts: &[&str]) -> impl AsyncRead + Unpin {
        let (mut writer, reader) = tokio::io::duplex(64);
        let parts: Vec<Vec<u8>> = parts.iter().map(|p| p.as_bytes().to_vec()).collect();
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            for part in parts {
                writer.write_all(&part).await.unwrap();
                writer.flush().await.unwrap();
                tokio::task::yield_now().await;
            }
        });
        reader
    }

    #[test]
    fn test_content_md5() {
        assert_eq!(content_md5(b""), "1B2M2Y8AsgTpgAmY7PhCfg==");
        assert_eq!(content_md5(b"hello world"), "XrY7u+Ae7tCTyyK7j1rNww==");
    }
}

use std::io;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::{Body, FileBody, Response};

/// Size of the chunks a file body is streamed in.
const STREAM_CHUNK: usize = 512;

/// Writes a serialized response, then streams a file body if there is one.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
    file: Option<FileBody>,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        let file = match response.body() {
            Some(Body::File(file)) => Some(file.clone()),
            _ => None,
        };

        Self {
            buffer: response.to_bytes(),
            written: 0,
            file,
        }
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }

            self.written += n;
        }

        if let Some(file) = self.file.take() {
            stream_file(&file, stream).await?;
        }

        stream.flush().await
    }
}

/// Pipes the file to `stream` without buffering it whole.
async fn stream_file<W>(file: &FileBody, stream: &mut W) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut reader = File::open(file.path()).await?;
    let mut chunk = [0u8; STREAM_CHUNK];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        stream.write_all(&chunk[..n]).await?;
        total += n as u64;
    }

    Ok(total)
}
